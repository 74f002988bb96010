use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{
    AuditRecordId, BusinessId, EmployeeId, EngineError, EngineResult, LedgerEntryId, StockEventId,
};

/// Stable operator-action codes (audit-log page filters on these).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BusinessRegistered,
    AccountCreated,
    AccountDeactivated,
    ProductCreated,
    StockAdjusted,
    StockReceived,
    SaleRecorded,
    LedgerReversed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::BusinessRegistered => "business.registered",
            AuditAction::AccountCreated => "account.created",
            AuditAction::AccountDeactivated => "account.deactivated",
            AuditAction::ProductCreated => "product.created",
            AuditAction::StockAdjusted => "stock.adjusted",
            AuditAction::StockReceived => "stock.received",
            AuditAction::SaleRecorded => "sale.recorded",
            AuditAction::LedgerReversed => "ledger.reversed",
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub employee_id: EmployeeId,
    pub name: String,
}

impl Operator {
    pub fn new(employee_id: EmployeeId, name: impl Into<String>) -> Self {
        Self { employee_id, name: name.into() }
    }
}

/// Ids of the ledger entry / stock event an audit record accompanies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelatedIds {
    pub ledger_entry_id: Option<LedgerEntryId>,
    pub stock_event_id: Option<StockEventId>,
}

/// An immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub business_id: BusinessId,
    pub occurred_at: DateTime<Utc>,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub action: AuditAction,
    pub details: String,
    pub related: RelatedIds,
}

/// Input for `AuditTrail::record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAudit {
    pub operator: Operator,
    pub action: AuditAction,
    pub details: String,
    pub related: RelatedIds,
    pub occurred_at: DateTime<Utc>,
}

/// Query filter; all criteria are conjunctive, bounds inclusive.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub employee_id: Option<EmployeeId>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Per-tenant append-only audit store.
#[derive(Debug, Default)]
pub struct AuditTrail {
    records: RwLock<HashMap<BusinessId, Vec<AuditRecord>>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, business_id: BusinessId, input: RecordAudit) -> EngineResult<AuditRecord> {
        let mut map = self.records.write().map_err(|_| EngineError::CommitFailure {
            business_id,
            reason: "audit store lock poisoned".to_string(),
            reversal_entry_id: None,
        })?;
        let record = AuditRecord {
            id: AuditRecordId::new(),
            business_id,
            occurred_at: input.occurred_at,
            employee_id: input.operator.employee_id,
            employee_name: input.operator.name,
            action: input.action,
            details: input.details,
            related: input.related,
        };
        map.entry(business_id).or_default().push(record.clone());
        Ok(record)
    }

    /// Records ordered newest-first (the audit-log page's display contract),
    /// as a restartable snapshot.
    pub fn query(&self, business_id: BusinessId, filter: AuditFilter) -> Vec<AuditRecord> {
        let map = match self.records.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let Some(records) = map.get(&business_id) else {
            return vec![];
        };
        let mut out: Vec<AuditRecord> = records
            .iter()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.action.is_none_or(|a| r.action == a))
            .filter(|r| filter.from.is_none_or(|from| r.occurred_at >= from))
            .filter(|r| filter.to.is_none_or(|to| r.occurred_at <= to))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record_at(trail: &AuditTrail, business: BusinessId, operator: &Operator, action: AuditAction, at: DateTime<Utc>) {
        trail
            .record(
                business,
                RecordAudit {
                    operator: operator.clone(),
                    action,
                    details: action.as_str().to_string(),
                    related: RelatedIds::default(),
                    occurred_at: at,
                },
            )
            .unwrap();
    }

    #[test]
    fn query_returns_newest_first() {
        let trail = AuditTrail::new();
        let business = BusinessId::new();
        let operator = Operator::new(EmployeeId::new(), "Jo");
        let base = Utc::now();

        record_at(&trail, business, &operator, AuditAction::ProductCreated, base);
        record_at(&trail, business, &operator, AuditAction::StockAdjusted, base + Duration::seconds(5));

        let records = trail.query(business, AuditFilter::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::StockAdjusted);
        assert_eq!(records[1].action, AuditAction::ProductCreated);
    }

    #[test]
    fn filters_by_employee_action_and_time_range() {
        let trail = AuditTrail::new();
        let business = BusinessId::new();
        let jo = Operator::new(EmployeeId::new(), "Jo");
        let sam = Operator::new(EmployeeId::new(), "Sam");
        let base = Utc::now();

        record_at(&trail, business, &jo, AuditAction::StockAdjusted, base);
        record_at(&trail, business, &sam, AuditAction::StockAdjusted, base + Duration::seconds(1));
        record_at(&trail, business, &jo, AuditAction::SaleRecorded, base + Duration::seconds(2));

        let by_employee = trail.query(
            business,
            AuditFilter { employee_id: Some(jo.employee_id), ..Default::default() },
        );
        assert_eq!(by_employee.len(), 2);

        let by_action = trail.query(
            business,
            AuditFilter { action: Some(AuditAction::StockAdjusted), ..Default::default() },
        );
        assert_eq!(by_action.len(), 2);

        let by_range = trail.query(
            business,
            AuditFilter {
                from: Some(base + Duration::seconds(1)),
                to: Some(base + Duration::seconds(1)),
                ..Default::default()
            },
        );
        assert_eq!(by_range.len(), 1);
        assert_eq!(by_range[0].employee_name, "Sam");
    }

    #[test]
    fn records_are_tenant_isolated() {
        let trail = AuditTrail::new();
        let a = BusinessId::new();
        let b = BusinessId::new();
        record_at(&trail, a, &Operator::new(EmployeeId::new(), "Jo"), AuditAction::StockAdjusted, Utc::now());

        assert_eq!(trail.query(a, AuditFilter::default()).len(), 1);
        assert!(trail.query(b, AuditFilter::default()).is_empty());
    }
}
