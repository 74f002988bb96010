//! Stock ledger: append-only stock events plus the cached quantity-on-hand.
//!
//! The write side sits behind the `StockLedger` trait so the coordinator's
//! compensation path can be exercised against a failing implementation in
//! tests; `InventoryStore` is the in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{
    BusinessId, EngineError, EngineResult, LedgerEntryId, ProductId, StockEventId, StockWarning,
};

use crate::product::{Product, ProductSpec};

/// What kind of movement a stock event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEventKind {
    Sale,
    ManualAdjustment,
    Receipt,
}

/// An immutable stock-affecting event.
///
/// `financial` events carry the ledger entry that accounts for them;
/// quantity-only recounts carry none and are flagged non-financial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEvent {
    pub id: StockEventId,
    pub business_id: BusinessId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
    pub kind: StockEventKind,
    /// Signed quantity delta (negative for sales and shrinkage).
    pub delta: i64,
    pub reason: String,
    pub ledger_entry_id: Option<LedgerEntryId>,
    pub financial: bool,
}

/// Input for `StockLedger::record_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStockEvent {
    pub product_id: ProductId,
    pub kind: StockEventKind,
    pub delta: i64,
    pub reason: String,
    pub ledger_entry_id: Option<LedgerEntryId>,
    pub financial: bool,
    pub occurred_at: DateTime<Utc>,
}

/// A committed stock event plus the post-commit quantity and any soft
/// warning (oversell is committed, not rejected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStockEvent {
    pub event: StockEvent,
    pub quantity_on_hand: i64,
    pub warning: Option<StockWarning>,
}

/// Write/read seam for the stock ledger.
pub trait StockLedger: Send + Sync {
    fn create_product(&self, business_id: BusinessId, spec: ProductSpec) -> EngineResult<Product>;

    fn product(&self, business_id: BusinessId, product_id: ProductId) -> Option<Product>;

    /// All products for a business, ordered by name.
    fn products(&self, business_id: BusinessId) -> Vec<Product>;

    /// Append a stock event and update the cached quantity in one critical
    /// section. Negative resulting stock commits with a warning.
    fn record_event(
        &self,
        business_id: BusinessId,
        input: RecordStockEvent,
    ) -> EngineResult<RecordedStockEvent>;

    /// Event history for one product, in append order (restartable snapshot).
    fn history(&self, business_id: BusinessId, product_id: ProductId) -> Vec<StockEvent>;

    /// All stock events for a business, in append order.
    fn events(&self, business_id: BusinessId) -> Vec<StockEvent>;

    fn quantity_on_hand(&self, business_id: BusinessId, product_id: ProductId) -> Option<i64>;

    /// Replay the event history and repair the cached quantity; returns the
    /// authoritative value. Usable in tests and after a detected mismatch.
    fn recompute(&self, business_id: BusinessId, product_id: ProductId) -> EngineResult<i64>;
}

impl<S> StockLedger for Arc<S>
where
    S: StockLedger + ?Sized,
{
    fn create_product(&self, business_id: BusinessId, spec: ProductSpec) -> EngineResult<Product> {
        (**self).create_product(business_id, spec)
    }

    fn product(&self, business_id: BusinessId, product_id: ProductId) -> Option<Product> {
        (**self).product(business_id, product_id)
    }

    fn products(&self, business_id: BusinessId) -> Vec<Product> {
        (**self).products(business_id)
    }

    fn record_event(
        &self,
        business_id: BusinessId,
        input: RecordStockEvent,
    ) -> EngineResult<RecordedStockEvent> {
        (**self).record_event(business_id, input)
    }

    fn history(&self, business_id: BusinessId, product_id: ProductId) -> Vec<StockEvent> {
        (**self).history(business_id, product_id)
    }

    fn events(&self, business_id: BusinessId) -> Vec<StockEvent> {
        (**self).events(business_id)
    }

    fn quantity_on_hand(&self, business_id: BusinessId, product_id: ProductId) -> Option<i64> {
        (**self).quantity_on_hand(business_id, product_id)
    }

    fn recompute(&self, business_id: BusinessId, product_id: ProductId) -> EngineResult<i64> {
        (**self).recompute(business_id, product_id)
    }
}

#[derive(Debug, Default)]
struct TenantInventory {
    products: HashMap<ProductId, Product>,
    /// Tenant-wide append-only event stream (per-product history filters it).
    events: Vec<StockEvent>,
}

/// In-memory stock ledger.
#[derive(Debug, Default)]
pub struct InventoryStore {
    tenants: RwLock<HashMap<BusinessId, TenantInventory>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit_failure(business_id: BusinessId) -> EngineError {
        EngineError::CommitFailure {
            business_id,
            reason: "inventory store lock poisoned".to_string(),
            reversal_entry_id: None,
        }
    }
}

impl StockLedger for InventoryStore {
    fn create_product(&self, business_id: BusinessId, spec: ProductSpec) -> EngineResult<Product> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::validation(business_id, "product name cannot be empty"));
        }
        if spec.unit_cost.minor() < 0 || spec.unit_price.minor() < 0 {
            return Err(EngineError::validation(business_id, "unit cost/price cannot be negative"));
        }

        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| Self::commit_failure(business_id))?;
        let tenant = tenants.entry(business_id).or_default();

        if tenant.products.values().any(|p| p.sku == spec.sku && !spec.sku.is_empty()) {
            return Err(EngineError::validation(
                business_id,
                format!("sku '{}' already exists", spec.sku),
            ));
        }

        let product = Product {
            id: ProductId::new(),
            business_id,
            name,
            sku: spec.sku,
            unit_cost: spec.unit_cost,
            unit_price: spec.unit_price,
            quantity_on_hand: 0,
        };
        tenant.products.insert(product.id, product.clone());
        Ok(product)
    }

    fn product(&self, business_id: BusinessId, product_id: ProductId) -> Option<Product> {
        let tenants = self.tenants.read().ok()?;
        tenants.get(&business_id)?.products.get(&product_id).cloned()
    }

    fn products(&self, business_id: BusinessId) -> Vec<Product> {
        let tenants = match self.tenants.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };
        let Some(tenant) = tenants.get(&business_id) else {
            return vec![];
        };
        let mut out: Vec<Product> = tenant.products.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    fn record_event(
        &self,
        business_id: BusinessId,
        input: RecordStockEvent,
    ) -> EngineResult<RecordedStockEvent> {
        if input.delta == 0 {
            return Err(EngineError::validation(business_id, "stock delta cannot be zero"));
        }
        if input.financial && input.ledger_entry_id.is_none() {
            return Err(EngineError::UnlinkedFinancialEvent {
                business_id,
                product_id: input.product_id,
            });
        }
        if !input.financial && input.ledger_entry_id.is_some() {
            return Err(EngineError::validation(
                business_id,
                "non-financial event cannot reference a ledger entry",
            ));
        }
        if input.kind == StockEventKind::Sale && !input.financial {
            return Err(EngineError::UnlinkedFinancialEvent {
                business_id,
                product_id: input.product_id,
            });
        }

        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| Self::commit_failure(business_id))?;
        let tenant = tenants.get_mut(&business_id).ok_or_else(|| {
            EngineError::referential(business_id, format!("no such product: {}", input.product_id))
        })?;
        let product = tenant.products.get_mut(&input.product_id).ok_or_else(|| {
            EngineError::referential(business_id, format!("no such product: {}", input.product_id))
        })?;

        // Event append and cache update share this critical section; readers
        // never observe a gap between the two.
        let event = StockEvent {
            id: StockEventId::new(),
            business_id,
            product_id: input.product_id,
            occurred_at: input.occurred_at,
            kind: input.kind,
            delta: input.delta,
            reason: input.reason,
            ledger_entry_id: input.ledger_entry_id,
            financial: input.financial,
        };
        product.quantity_on_hand += event.delta;
        let quantity_on_hand = product.quantity_on_hand;
        tenant.events.push(event.clone());

        let warning = (quantity_on_hand < 0).then_some(StockWarning::NegativeStock {
            product_id: input.product_id,
            resulting_quantity: quantity_on_hand,
        });

        Ok(RecordedStockEvent {
            event,
            quantity_on_hand,
            warning,
        })
    }

    fn history(&self, business_id: BusinessId, product_id: ProductId) -> Vec<StockEvent> {
        let tenants = match self.tenants.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };
        let Some(tenant) = tenants.get(&business_id) else {
            return vec![];
        };
        tenant
            .events
            .iter()
            .filter(|e| e.product_id == product_id)
            .cloned()
            .collect()
    }

    fn events(&self, business_id: BusinessId) -> Vec<StockEvent> {
        let tenants = match self.tenants.read() {
            Ok(t) => t,
            Err(_) => return vec![],
        };
        tenants
            .get(&business_id)
            .map(|t| t.events.clone())
            .unwrap_or_default()
    }

    fn quantity_on_hand(&self, business_id: BusinessId, product_id: ProductId) -> Option<i64> {
        let tenants = self.tenants.read().ok()?;
        tenants
            .get(&business_id)?
            .products
            .get(&product_id)
            .map(|p| p.quantity_on_hand)
    }

    fn recompute(&self, business_id: BusinessId, product_id: ProductId) -> EngineResult<i64> {
        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| Self::commit_failure(business_id))?;
        let tenant = tenants.get_mut(&business_id).ok_or_else(|| {
            EngineError::referential(business_id, format!("no such product: {product_id}"))
        })?;
        let replayed: i64 = tenant
            .events
            .iter()
            .filter(|e| e.product_id == product_id)
            .map(|e| e.delta)
            .sum();
        let product = tenant.products.get_mut(&product_id).ok_or_else(|| {
            EngineError::referential(business_id, format!("no such product: {product_id}"))
        })?;
        product.quantity_on_hand = replayed;
        Ok(replayed)
    }
}
