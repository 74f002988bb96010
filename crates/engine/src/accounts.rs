//! Account roles: how the coordinator resolves "the Inventory account" for a
//! tenant without hard-coding account ids.
//!
//! Roles are seeded at business registration (or configured later); the
//! resulting `AccountMap` is the only account lookup the coordinator does.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use shopledger_accounting::{AccountSpec, AccountType, ChartOfAccounts};
use shopledger_core::{AccountId, BusinessId, EngineError, EngineResult};

/// The accounts the coordinator's derivations need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Cash,
    AccountsReceivable,
    Inventory,
    SalesRevenue,
    CostOfGoodsSold,
    ShrinkageExpense,
    AdjustmentGain,
}

/// Role → account id mapping for one business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMap {
    business_id: BusinessId,
    roles: HashMap<AccountRole, AccountId>,
}

impl AccountMap {
    pub fn new(business_id: BusinessId) -> Self {
        Self {
            business_id,
            roles: HashMap::new(),
        }
    }

    pub fn assign(&mut self, role: AccountRole, account_id: AccountId) {
        self.roles.insert(role, account_id);
    }

    pub fn resolve(&self, role: AccountRole) -> EngineResult<AccountId> {
        self.roles.get(&role).copied().ok_or_else(|| {
            EngineError::referential(
                self.business_id,
                format!("no account configured for role {role:?}"),
            )
        })
    }
}

/// The default small-business chart, with the roles the coordinator uses.
const DEFAULT_CHART: &[(AccountRole, &str, &str, AccountType)] = &[
    (AccountRole::Cash, "1000", "Cash", AccountType::Asset),
    (AccountRole::AccountsReceivable, "1100", "Accounts Receivable", AccountType::Asset),
    (AccountRole::Inventory, "1200", "Inventory", AccountType::Asset),
    (AccountRole::SalesRevenue, "4000", "Sales Revenue", AccountType::Revenue),
    (AccountRole::AdjustmentGain, "4900", "Stock Adjustment Gain", AccountType::Revenue),
    (AccountRole::CostOfGoodsSold, "5000", "Cost of Goods Sold", AccountType::Expense),
    (AccountRole::ShrinkageExpense, "5100", "Shrinkage Expense", AccountType::Expense),
];

/// Seed the default chart for a freshly registered business and return the
/// role mapping.
pub fn seed_default_chart(
    chart: &ChartOfAccounts,
    business_id: BusinessId,
) -> EngineResult<AccountMap> {
    let mut map = AccountMap::new(business_id);
    for (role, code, name, account_type) in DEFAULT_CHART {
        let account = chart.create_account(business_id, AccountSpec::new(*code, *name, *account_type))?;
        map.assign(*role, account.id);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_the_default_chart_once() {
        let chart = ChartOfAccounts::new();
        let business = BusinessId::new();

        let map = seed_default_chart(&chart, business).unwrap();
        assert_eq!(chart.accounts(business).len(), DEFAULT_CHART.len());
        map.resolve(AccountRole::Inventory).unwrap();
        map.resolve(AccountRole::ShrinkageExpense).unwrap();

        // Codes already exist; a second seeding attempt fails cleanly.
        assert!(seed_default_chart(&chart, business).is_err());
    }

    #[test]
    fn missing_role_is_a_referential_error() {
        let map = AccountMap::new(BusinessId::new());
        let err = map.resolve(AccountRole::Cash).unwrap_err();
        assert!(matches!(err, EngineError::Referential { .. }));
    }
}
