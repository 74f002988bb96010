//! Tenant registry: the set of known businesses. Every other component is
//! keyed by `BusinessId`; nothing is visible across tenants.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use shopledger_core::{BusinessId, EngineError, EngineResult};

/// Fiscal configuration for a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalSettings {
    /// First month of the fiscal year, 1..=12.
    pub fiscal_year_start_month: u8,
}

impl Default for FiscalSettings {
    fn default() -> Self {
        Self { fiscal_year_start_month: 1 }
    }
}

/// A registered business tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    /// ISO 4217 currency code, e.g. "USD".
    pub currency: String,
    pub fiscal: FiscalSettings,
}

/// Input for registering a business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSpec {
    pub name: String,
    pub currency: String,
    pub fiscal: FiscalSettings,
}

impl BusinessSpec {
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            currency: currency.into(),
            fiscal: FiscalSettings::default(),
        }
    }
}

/// In-memory tenant registry.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    businesses: RwLock<HashMap<BusinessId, Business>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, spec: BusinessSpec) -> EngineResult<Business> {
        let id = BusinessId::new();
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::validation(id, "business name cannot be empty"));
        }
        let currency = spec.currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::validation(
                id,
                format!("'{}' is not a 3-letter currency code", spec.currency),
            ));
        }
        if !(1..=12).contains(&spec.fiscal.fiscal_year_start_month) {
            return Err(EngineError::validation(
                id,
                "fiscal year start month must be 1..=12",
            ));
        }

        let business = Business {
            id,
            name,
            currency,
            fiscal: spec.fiscal,
        };
        let mut map = self.businesses.write().map_err(|_| EngineError::CommitFailure {
            business_id: id,
            reason: "registry lock poisoned".to_string(),
            reversal_entry_id: None,
        })?;
        map.insert(id, business.clone());
        Ok(business)
    }

    pub fn get(&self, business_id: BusinessId) -> Option<Business> {
        let map = self.businesses.read().ok()?;
        map.get(&business_id).cloned()
    }

    /// Fails with `UnknownBusiness` for unregistered tenants; every mutation
    /// goes through this gate first.
    pub fn ensure_registered(&self, business_id: BusinessId) -> EngineResult<()> {
        if self.get(business_id).is_some() {
            Ok(())
        } else {
            Err(EngineError::UnknownBusiness(business_id))
        }
    }

    pub fn list(&self) -> Vec<Business> {
        let map = match self.businesses.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut out: Vec<Business> = map.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_normalizes_currency() {
        let registry = TenantRegistry::new();
        let business = registry.register(BusinessSpec::new("Corner Store", "usd")).unwrap();
        assert_eq!(business.currency, "USD");
        assert_eq!(registry.get(business.id).unwrap().name, "Corner Store");
        registry.ensure_registered(business.id).unwrap();
    }

    #[test]
    fn rejects_bad_input() {
        let registry = TenantRegistry::new();
        assert!(registry.register(BusinessSpec::new("  ", "USD")).is_err());
        assert!(registry.register(BusinessSpec::new("Shop", "US")).is_err());

        let mut spec = BusinessSpec::new("Shop", "USD");
        spec.fiscal.fiscal_year_start_month = 13;
        assert!(registry.register(spec).is_err());
    }

    #[test]
    fn unknown_business_is_reported() {
        let registry = TenantRegistry::new();
        let err = registry.ensure_registered(BusinessId::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownBusiness(_)));
    }
}
