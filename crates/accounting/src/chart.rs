//! Chart of accounts: the fixed vocabulary of accounts a ledger entry may
//! reference, scoped per business.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use shopledger_core::{AccountId, BusinessId, EngineError, EngineResult};

/// High-level account kind (determines the expected normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Conventional normal balance side for this kind.
    pub fn normal_side(self) -> Side {
        match self {
            AccountType::Asset | AccountType::Expense => Side::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => Side::Credit,
        }
    }
}

/// Debit or credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Debit => Side::Credit,
            Side::Credit => Side::Debit,
        }
    }
}

/// A chart-of-accounts account. Never deleted once created; deactivation
/// closes it to new postings without touching history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub business_id: BusinessId,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub normal_side: Side,
    pub contra: bool,
    pub active: bool,
}

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub normal_side: Side,
    /// Contra accounts carry the opposite of their kind's normal side
    /// (e.g. accumulated depreciation: a credit-normal asset).
    pub contra: bool,
}

impl AccountSpec {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            normal_side: account_type.normal_side(),
            contra: false,
        }
    }
}

/// Per-tenant chart of accounts store.
///
/// In-memory, tenant-keyed. Reads snapshot under a shared lock; creation and
/// deactivation take the write lock.
#[derive(Debug, Default)]
pub struct ChartOfAccounts {
    accounts: RwLock<HashMap<BusinessId, Vec<Account>>>,
}

impl ChartOfAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account for a business.
    ///
    /// Fails with `Validation` if the code is blank, already taken within
    /// the tenant, or the normal side is inconsistent with the account type
    /// (contra accounts must carry the opposite side, all others the
    /// conventional one).
    pub fn create_account(
        &self,
        business_id: BusinessId,
        spec: AccountSpec,
    ) -> EngineResult<Account> {
        let code = spec.code.trim().to_string();
        let name = spec.name.trim().to_string();
        if code.is_empty() {
            return Err(EngineError::validation(business_id, "account code cannot be empty"));
        }
        if name.is_empty() {
            return Err(EngineError::validation(business_id, "account name cannot be empty"));
        }

        let expected = if spec.contra {
            spec.account_type.normal_side().opposite()
        } else {
            spec.account_type.normal_side()
        };
        if spec.normal_side != expected {
            return Err(EngineError::validation(
                business_id,
                format!(
                    "{:?} account '{code}' cannot be {:?}-normal (contra: {})",
                    spec.account_type, spec.normal_side, spec.contra
                ),
            ));
        }

        let mut map = self
            .accounts
            .write()
            .map_err(|_| EngineError::validation(business_id, "chart store lock poisoned"))?;
        let accounts = map.entry(business_id).or_default();

        if accounts.iter().any(|a| a.code == code) {
            return Err(EngineError::validation(
                business_id,
                format!("account code '{code}' already exists"),
            ));
        }

        let account = Account {
            id: AccountId::new(),
            business_id,
            code,
            name,
            account_type: spec.account_type,
            normal_side: spec.normal_side,
            contra: spec.contra,
            active: true,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    /// All accounts for a business, ordered by code.
    pub fn accounts(&self, business_id: BusinessId) -> Vec<Account> {
        let map = match self.accounts.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut out = map.get(&business_id).cloned().unwrap_or_default();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        out
    }

    pub fn get(&self, business_id: BusinessId, account_id: AccountId) -> Option<Account> {
        let map = self.accounts.read().ok()?;
        map.get(&business_id)?
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
    }

    pub fn find_by_code(&self, business_id: BusinessId, code: &str) -> Option<Account> {
        let map = self.accounts.read().ok()?;
        map.get(&business_id)?.iter().find(|a| a.code == code).cloned()
    }

    /// Close an account to new postings. Never deletes and never cascades;
    /// entries already referencing the account are untouched.
    pub fn deactivate(&self, business_id: BusinessId, account_id: AccountId) -> EngineResult<()> {
        let mut map = self
            .accounts
            .write()
            .map_err(|_| EngineError::validation(business_id, "chart store lock poisoned"))?;
        let account = map
            .get_mut(&business_id)
            .and_then(|accounts| accounts.iter_mut().find(|a| a.id == account_id))
            .ok_or_else(|| {
                EngineError::referential(business_id, format!("no such account: {account_id}"))
            })?;
        account.active = false;
        Ok(())
    }
}
