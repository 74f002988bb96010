//! Mutation coordinator: the sole writer.
//!
//! External callers never touch the general ledger or stock ledger directly;
//! they submit intents here. Each intent moves Received → Validated →
//! Committed or Received → Rejected, with no partial state: validation runs
//! before any write, and the (ledger entry, stock event, audit record)
//! triple commits together.
//!
//! The one asymmetry is deliberate: the ledger never deletes. If a stock
//! write fails after its ledger entry was appended, the coordinator appends
//! a compensating reversal entry and reports `CommitFailure` with the
//! reversal's id, keeping the financial record trustworthy through partial
//! storage failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shopledger_accounting::{
    AccountSpec, ChartOfAccounts, EntryDraft, EntrySource, GeneralLedger, LedgerEntry, LedgerLine,
};
use shopledger_audit::{AuditAction, AuditTrail, Operator, RecordAudit, RelatedIds};
use shopledger_core::{
    AccountId, AuditRecordId, BusinessId, EngineError, EngineResult, LedgerEntryId, Money,
    ProductId, StockEventId, StockWarning,
};
use shopledger_inventory::{
    Product, ProductSpec, RecordStockEvent, StockEventKind, StockLedger,
};

use crate::accounts::{seed_default_chart, AccountMap, AccountRole};
use crate::registry::{Business, BusinessSpec, TenantRegistry};

/// Intent: apply a manual stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    /// Signed quantity change (negative for shrinkage/write-off).
    pub delta_qty: i64,
    /// Value per unit; zero only for quantity-only corrections.
    pub unit_cost: Money,
    pub reason: String,
    /// Explicit opt-in for a non-financial recount that bypasses the ledger.
    pub quantity_only: bool,
    pub operator: Operator,
}

/// Intent: receive goods into stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReceipt {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Defaults to the product's unit cost.
    pub unit_cost: Option<Money>,
    pub reference: String,
    pub operator: Operator,
}

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tender {
    Cash,
    OnCredit,
}

/// One sold line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Defaults to the product's unit price.
    pub unit_price: Option<Money>,
}

/// Intent: record a completed sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleIntent {
    pub lines: Vec<SaleLine>,
    pub tender: Tender,
    pub note: Option<String>,
    pub operator: Operator,
}

/// Result of a committed stock adjustment or receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCommit {
    /// Absent only for quantity-only corrections.
    pub ledger_entry_id: Option<LedgerEntryId>,
    pub stock_event_id: StockEventId,
    pub audit_record_id: AuditRecordId,
    pub quantity_on_hand: i64,
    pub warning: Option<StockWarning>,
}

/// Result of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleCommit {
    pub ledger_entry_id: LedgerEntryId,
    pub stock_event_ids: Vec<StockEventId>,
    pub audit_record_id: AuditRecordId,
    pub total: Money,
    pub warnings: Vec<StockWarning>,
}

// Validated sale line: priced and costed before any write.
struct PricedLine {
    product_id: ProductId,
    quantity: i64,
}

/// The orchestration layer over registry, chart, ledger, stock and audit.
///
/// Generic over the stock ledger seam so the compensation path is testable
/// against a failing implementation.
pub struct MutationCoordinator<S: StockLedger> {
    registry: Arc<TenantRegistry>,
    chart: Arc<ChartOfAccounts>,
    ledger: Arc<GeneralLedger>,
    stock: S,
    audit: Arc<AuditTrail>,
    account_maps: RwLock<HashMap<BusinessId, AccountMap>>,
    /// Single-writer-per-tenant: the guard is held for the whole commit step.
    tenant_locks: Mutex<HashMap<BusinessId, Arc<Mutex<()>>>>,
}

impl<S: StockLedger> MutationCoordinator<S> {
    pub fn new(
        registry: Arc<TenantRegistry>,
        chart: Arc<ChartOfAccounts>,
        ledger: Arc<GeneralLedger>,
        stock: S,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            registry,
            chart,
            ledger,
            stock,
            audit,
            account_maps: RwLock::new(HashMap::new()),
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The commit lock for one tenant. Writers hold it across the whole
    /// triple; the facade's reads take it too, so a reader never observes a
    /// ledger entry whose stock effect has not landed yet.
    pub(crate) fn tenant_lock(&self, business_id: BusinessId) -> Arc<Mutex<()>> {
        let mut locks = self
            .tenant_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(business_id).or_default().clone()
    }

    fn account_map(&self, business_id: BusinessId) -> EngineResult<AccountMap> {
        let maps = self
            .account_maps
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        maps.get(&business_id).cloned().ok_or_else(|| {
            EngineError::referential(business_id, "account roles not configured for business")
        })
    }

    /// Register a business, seed its default chart, and remember the role
    /// mapping the derivations below resolve accounts through.
    pub fn register_business(
        &self,
        spec: BusinessSpec,
        operator: &Operator,
    ) -> EngineResult<Business> {
        let business = self.registry.register(spec)?;
        let map = seed_default_chart(&self.chart, business.id)?;
        self.account_maps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(business.id, map);
        self.audit.record(
            business.id,
            RecordAudit {
                operator: operator.clone(),
                action: AuditAction::BusinessRegistered,
                details: format!("registered business '{}'", business.name),
                related: RelatedIds::default(),
                occurred_at: Utc::now(),
            },
        )?;
        info!(business_id = %business.id, name = %business.name, "business registered");
        Ok(business)
    }

    pub fn create_product(
        &self,
        business_id: BusinessId,
        spec: ProductSpec,
        operator: &Operator,
    ) -> EngineResult<Product> {
        self.registry.ensure_registered(business_id)?;
        let lock = self.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let product = self.stock.create_product(business_id, spec)?;
        self.audit.record(
            business_id,
            RecordAudit {
                operator: operator.clone(),
                action: AuditAction::ProductCreated,
                details: format!("created product '{}' ({})", product.name, product.id),
                related: RelatedIds::default(),
                occurred_at: Utc::now(),
            },
        )?;
        Ok(product)
    }

    pub fn create_account(
        &self,
        business_id: BusinessId,
        spec: AccountSpec,
        operator: &Operator,
    ) -> EngineResult<shopledger_accounting::Account> {
        self.registry.ensure_registered(business_id)?;
        let lock = self.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let account = self.chart.create_account(business_id, spec)?;
        self.audit.record(
            business_id,
            RecordAudit {
                operator: operator.clone(),
                action: AuditAction::AccountCreated,
                details: format!("created account {} '{}'", account.code, account.name),
                related: RelatedIds::default(),
                occurred_at: Utc::now(),
            },
        )?;
        Ok(account)
    }

    pub fn deactivate_account(
        &self,
        business_id: BusinessId,
        account_id: AccountId,
        operator: &Operator,
    ) -> EngineResult<()> {
        self.registry.ensure_registered(business_id)?;
        let lock = self.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.chart.deactivate(business_id, account_id)?;
        self.audit.record(
            business_id,
            RecordAudit {
                operator: operator.clone(),
                action: AuditAction::AccountDeactivated,
                details: format!("deactivated account {account_id}"),
                related: RelatedIds::default(),
                occurred_at: Utc::now(),
            },
        )?;
        Ok(())
    }

    /// Apply a manual stock adjustment.
    ///
    /// Shrinkage (negative delta) debits shrinkage expense and credits
    /// inventory; found stock debits inventory and credits adjustment gain.
    /// Quantity-only corrections skip the ledger entirely and must be
    /// explicitly flagged.
    pub fn adjust_stock(
        &self,
        business_id: BusinessId,
        intent: StockAdjustment,
    ) -> EngineResult<StockCommit> {
        self.registry.ensure_registered(business_id)?;
        let lock = self.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let product = self
            .stock
            .product(business_id, intent.product_id)
            .ok_or_else(|| {
                EngineError::referential(
                    business_id,
                    format!("no such product: {}", intent.product_id),
                )
            })?;

        if intent.quantity_only {
            return self.commit_quantity_only(business_id, &product, intent);
        }

        if intent.unit_cost.minor() < 0 {
            return Err(EngineError::validation(business_id, "unit cost cannot be negative"));
        }
        if intent.unit_cost.is_zero() {
            return Err(EngineError::ZeroValueAdjustment {
                business_id,
                product_id: intent.product_id,
            });
        }
        if intent.delta_qty == 0 {
            return Err(EngineError::validation(business_id, "quantity delta cannot be zero"));
        }

        let magnitude = intent
            .delta_qty
            .checked_abs()
            .ok_or(EngineError::AmountOverflow { business_id })?;
        let amount = intent
            .unit_cost
            .checked_mul(magnitude)
            .ok_or(EngineError::AmountOverflow { business_id })?;

        let map = self.account_map(business_id)?;
        let inventory = map.resolve(AccountRole::Inventory)?;
        let lines = if intent.delta_qty < 0 {
            vec![
                LedgerLine::debit(map.resolve(AccountRole::ShrinkageExpense)?, amount),
                LedgerLine::credit(inventory, amount),
            ]
        } else {
            vec![
                LedgerLine::debit(inventory, amount),
                LedgerLine::credit(map.resolve(AccountRole::AdjustmentGain)?, amount),
            ]
        };

        let intent_id = Uuid::now_v7();
        let entry = self.ledger.append(
            business_id,
            EntryDraft {
                source: EntrySource::StockAdjustment(intent_id),
                occurred_at: Utc::now(),
                memo: Some(intent.reason.clone()),
                lines,
            },
            &self.chart,
        )?;

        let recorded = match self.stock.record_event(
            business_id,
            RecordStockEvent {
                product_id: intent.product_id,
                kind: StockEventKind::ManualAdjustment,
                delta: intent.delta_qty,
                reason: intent.reason.clone(),
                ledger_entry_id: Some(entry.id),
                financial: true,
                occurred_at: Utc::now(),
            },
        ) {
            Ok(recorded) => recorded,
            Err(cause) => return Err(self.compensate(business_id, &entry, cause, &intent.operator)),
        };

        let audit = self.audit.record(
            business_id,
            RecordAudit {
                operator: intent.operator.clone(),
                action: AuditAction::StockAdjusted,
                details: format!(
                    "adjusted '{}' by {} ({}): entry {}",
                    product.name, intent.delta_qty, intent.reason, entry.id
                ),
                related: RelatedIds {
                    ledger_entry_id: Some(entry.id),
                    stock_event_id: Some(recorded.event.id),
                },
                occurred_at: Utc::now(),
            },
        )?;

        if let Some(StockWarning::NegativeStock { resulting_quantity, .. }) = recorded.warning {
            warn!(
                business_id = %business_id,
                product_id = %intent.product_id,
                resulting_quantity,
                "stock adjustment committed with negative resulting stock"
            );
        }
        info!(
            business_id = %business_id,
            entry_id = %entry.id,
            sequence = entry.sequence,
            stock_event_id = %recorded.event.id,
            "stock adjustment committed"
        );

        Ok(StockCommit {
            ledger_entry_id: Some(entry.id),
            stock_event_id: recorded.event.id,
            audit_record_id: audit.id,
            quantity_on_hand: recorded.quantity_on_hand,
            warning: recorded.warning,
        })
    }

    fn commit_quantity_only(
        &self,
        business_id: BusinessId,
        product: &Product,
        intent: StockAdjustment,
    ) -> EngineResult<StockCommit> {
        if !intent.unit_cost.is_zero() {
            return Err(EngineError::validation(
                business_id,
                "quantity-only correction cannot carry a unit cost",
            ));
        }
        if intent.delta_qty == 0 {
            return Err(EngineError::validation(business_id, "quantity delta cannot be zero"));
        }

        let recorded = self.stock.record_event(
            business_id,
            RecordStockEvent {
                product_id: intent.product_id,
                kind: StockEventKind::ManualAdjustment,
                delta: intent.delta_qty,
                reason: intent.reason.clone(),
                ledger_entry_id: None,
                financial: false,
                occurred_at: Utc::now(),
            },
        )?;

        let audit = self.audit.record(
            business_id,
            RecordAudit {
                operator: intent.operator.clone(),
                action: AuditAction::StockAdjusted,
                details: format!(
                    "quantity-only correction of '{}' by {} ({})",
                    product.name, intent.delta_qty, intent.reason
                ),
                related: RelatedIds {
                    ledger_entry_id: None,
                    stock_event_id: Some(recorded.event.id),
                },
                occurred_at: Utc::now(),
            },
        )?;

        info!(
            business_id = %business_id,
            stock_event_id = %recorded.event.id,
            "quantity-only correction committed"
        );

        Ok(StockCommit {
            ledger_entry_id: None,
            stock_event_id: recorded.event.id,
            audit_record_id: audit.id,
            quantity_on_hand: recorded.quantity_on_hand,
            warning: recorded.warning,
        })
    }

    /// Receive goods into stock: debit inventory, credit cash, positive
    /// receipt event linked to the entry.
    pub fn receive_stock(
        &self,
        business_id: BusinessId,
        intent: StockReceipt,
    ) -> EngineResult<StockCommit> {
        self.registry.ensure_registered(business_id)?;
        let lock = self.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let product = self
            .stock
            .product(business_id, intent.product_id)
            .ok_or_else(|| {
                EngineError::referential(
                    business_id,
                    format!("no such product: {}", intent.product_id),
                )
            })?;

        if intent.quantity <= 0 {
            return Err(EngineError::validation(business_id, "receipt quantity must be positive"));
        }
        let unit_cost = intent.unit_cost.unwrap_or(product.unit_cost);
        if !unit_cost.is_positive() {
            return Err(EngineError::validation(
                business_id,
                "receipt unit cost must be positive; use a quantity-only adjustment for free stock",
            ));
        }
        let amount = unit_cost
            .checked_mul(intent.quantity)
            .ok_or(EngineError::AmountOverflow { business_id })?;

        let map = self.account_map(business_id)?;
        let intent_id = Uuid::now_v7();
        let entry = self.ledger.append(
            business_id,
            EntryDraft {
                source: EntrySource::Receipt(intent_id),
                occurred_at: Utc::now(),
                memo: Some(intent.reference.clone()),
                lines: vec![
                    LedgerLine::debit(map.resolve(AccountRole::Inventory)?, amount),
                    LedgerLine::credit(map.resolve(AccountRole::Cash)?, amount),
                ],
            },
            &self.chart,
        )?;

        let recorded = match self.stock.record_event(
            business_id,
            RecordStockEvent {
                product_id: intent.product_id,
                kind: StockEventKind::Receipt,
                delta: intent.quantity,
                reason: intent.reference.clone(),
                ledger_entry_id: Some(entry.id),
                financial: true,
                occurred_at: Utc::now(),
            },
        ) {
            Ok(recorded) => recorded,
            Err(cause) => return Err(self.compensate(business_id, &entry, cause, &intent.operator)),
        };

        let audit = self.audit.record(
            business_id,
            RecordAudit {
                operator: intent.operator.clone(),
                action: AuditAction::StockReceived,
                details: format!(
                    "received {} x '{}' ({}): entry {}",
                    intent.quantity, product.name, intent.reference, entry.id
                ),
                related: RelatedIds {
                    ledger_entry_id: Some(entry.id),
                    stock_event_id: Some(recorded.event.id),
                },
                occurred_at: Utc::now(),
            },
        )?;

        info!(
            business_id = %business_id,
            entry_id = %entry.id,
            stock_event_id = %recorded.event.id,
            "stock receipt committed"
        );

        Ok(StockCommit {
            ledger_entry_id: Some(entry.id),
            stock_event_id: recorded.event.id,
            audit_record_id: audit.id,
            quantity_on_hand: recorded.quantity_on_hand,
            warning: recorded.warning,
        })
    }

    /// Record a completed sale: revenue against the tender account, cost of
    /// goods sold against inventory, and one negative sale event per line.
    /// Oversell commits with warnings; blocking it is caller policy.
    pub fn record_sale(&self, business_id: BusinessId, intent: SaleIntent) -> EngineResult<SaleCommit> {
        self.registry.ensure_registered(business_id)?;
        let lock = self.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if intent.lines.is_empty() {
            return Err(EngineError::validation(business_id, "sale must have lines"));
        }

        // Validation phase: price and cost every line before any write.
        let mut priced = Vec::with_capacity(intent.lines.len());
        let mut revenue_total = Money::ZERO;
        let mut cost_total = Money::ZERO;
        for line in &intent.lines {
            if line.quantity <= 0 {
                return Err(EngineError::validation(business_id, "sale quantity must be positive"));
            }
            let product = self
                .stock
                .product(business_id, line.product_id)
                .ok_or_else(|| {
                    EngineError::referential(
                        business_id,
                        format!("no such product: {}", line.product_id),
                    )
                })?;
            let unit_price = line.unit_price.unwrap_or(product.unit_price);
            if unit_price.minor() < 0 {
                return Err(EngineError::validation(business_id, "sale price cannot be negative"));
            }
            let revenue = unit_price
                .checked_mul(line.quantity)
                .ok_or(EngineError::AmountOverflow { business_id })?;
            let cost = product
                .unit_cost
                .checked_mul(line.quantity)
                .ok_or(EngineError::AmountOverflow { business_id })?;
            revenue_total = revenue_total
                .checked_add(revenue)
                .ok_or(EngineError::AmountOverflow { business_id })?;
            cost_total = cost_total
                .checked_add(cost)
                .ok_or(EngineError::AmountOverflow { business_id })?;
            priced.push(PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        if !revenue_total.is_positive() {
            return Err(EngineError::validation(business_id, "sale total must be positive"));
        }

        let map = self.account_map(business_id)?;
        let tender_account = match intent.tender {
            Tender::Cash => map.resolve(AccountRole::Cash)?,
            Tender::OnCredit => map.resolve(AccountRole::AccountsReceivable)?,
        };
        let mut lines = vec![
            LedgerLine::debit(tender_account, revenue_total),
            LedgerLine::credit(map.resolve(AccountRole::SalesRevenue)?, revenue_total),
        ];
        // Zero-cost catalogs (services, unsourced goods) skip the COGS pair;
        // line amounts must stay strictly positive.
        if cost_total.is_positive() {
            lines.push(LedgerLine::debit(map.resolve(AccountRole::CostOfGoodsSold)?, cost_total));
            lines.push(LedgerLine::credit(map.resolve(AccountRole::Inventory)?, cost_total));
        }

        let intent_id = Uuid::now_v7();
        let entry = self.ledger.append(
            business_id,
            EntryDraft {
                source: EntrySource::Sale(intent_id),
                occurred_at: Utc::now(),
                memo: intent.note.clone(),
                lines,
            },
            &self.chart,
        )?;

        let mut stock_event_ids = Vec::with_capacity(priced.len());
        let mut warnings = Vec::new();
        for line in &priced {
            match self.stock.record_event(
                business_id,
                RecordStockEvent {
                    product_id: line.product_id,
                    kind: StockEventKind::Sale,
                    delta: -line.quantity,
                    reason: format!("sale {intent_id}"),
                    ledger_entry_id: Some(entry.id),
                    financial: true,
                    occurred_at: Utc::now(),
                },
            ) {
                Ok(recorded) => {
                    stock_event_ids.push(recorded.event.id);
                    warnings.extend(recorded.warning);
                }
                Err(cause) => {
                    return Err(self.compensate_sale(
                        business_id,
                        &entry,
                        &priced,
                        stock_event_ids.len(),
                        cause,
                        &intent.operator,
                    ));
                }
            }
        }

        let audit = self.audit.record(
            business_id,
            RecordAudit {
                operator: intent.operator.clone(),
                action: AuditAction::SaleRecorded,
                details: format!(
                    "sale of {} line(s), total {} minor units: entry {}",
                    priced.len(),
                    revenue_total.minor(),
                    entry.id
                ),
                related: RelatedIds {
                    ledger_entry_id: Some(entry.id),
                    stock_event_id: (stock_event_ids.len() == 1).then(|| stock_event_ids[0]),
                },
                occurred_at: Utc::now(),
            },
        )?;

        for warning in &warnings {
            let StockWarning::NegativeStock { product_id, resulting_quantity } = warning;
            warn!(
                business_id = %business_id,
                product_id = %product_id,
                resulting_quantity,
                "sale committed with negative resulting stock (oversell)"
            );
        }
        info!(
            business_id = %business_id,
            entry_id = %entry.id,
            sequence = entry.sequence,
            total_minor = revenue_total.minor(),
            "sale committed"
        );

        Ok(SaleCommit {
            ledger_entry_id: entry.id,
            stock_event_ids,
            audit_record_id: audit.id,
            total: revenue_total,
            warnings,
        })
    }

    /// Compensate a failed single-event commit: append a reversing entry
    /// (never delete) and surface the reversal id to the caller.
    fn compensate(
        &self,
        business_id: BusinessId,
        entry: &LedgerEntry,
        cause: EngineError,
        operator: &Operator,
    ) -> EngineError {
        match self
            .ledger
            .append(business_id, entry.reversing_draft(Utc::now()), &self.chart)
        {
            Ok(reversal) => {
                warn!(
                    business_id = %business_id,
                    entry_id = %entry.id,
                    reversal_id = %reversal.id,
                    %cause,
                    "stock write failed after ledger append; entry compensated"
                );
                if let Err(audit_err) = self.audit.record(
                    business_id,
                    RecordAudit {
                        operator: operator.clone(),
                        action: AuditAction::LedgerReversed,
                        details: format!("entry {} reversed after stock write failure: {cause}", entry.id),
                        related: RelatedIds {
                            ledger_entry_id: Some(reversal.id),
                            stock_event_id: None,
                        },
                        occurred_at: Utc::now(),
                    },
                ) {
                    warn!(business_id = %business_id, %audit_err, "failed to audit compensation");
                }
                EngineError::CommitFailure {
                    business_id,
                    reason: cause.to_string(),
                    reversal_entry_id: Some(reversal.id),
                }
            }
            Err(reversal_err) => EngineError::CommitFailure {
                business_id,
                reason: format!("{cause}; compensating reversal also failed: {reversal_err}"),
                reversal_entry_id: None,
            },
        }
    }

    /// Compensate a sale that failed partway through its stock writes:
    /// reverse the entry, then offset the events already written (linked to
    /// the reversal so the financial trail stays closed).
    fn compensate_sale(
        &self,
        business_id: BusinessId,
        entry: &LedgerEntry,
        priced: &[PricedLine],
        written: usize,
        cause: EngineError,
        operator: &Operator,
    ) -> EngineError {
        let failure = self.compensate(business_id, entry, cause, operator);
        let reversal_id = match &failure {
            EngineError::CommitFailure { reversal_entry_id, .. } => *reversal_entry_id,
            _ => None,
        };
        if let Some(reversal_id) = reversal_id {
            for line in &priced[..written] {
                if let Err(offset_err) = self.stock.record_event(
                    business_id,
                    RecordStockEvent {
                        product_id: line.product_id,
                        kind: StockEventKind::ManualAdjustment,
                        delta: line.quantity,
                        reason: format!("offset for reversed entry {reversal_id}"),
                        ledger_entry_id: Some(reversal_id),
                        financial: true,
                        occurred_at: Utc::now(),
                    },
                ) {
                    warn!(
                        business_id = %business_id,
                        product_id = %line.product_id,
                        %offset_err,
                        "failed to offset stock event during sale compensation"
                    );
                }
            }
        }
        failure
    }
}
