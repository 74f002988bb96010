//! Products: tenant-scoped catalog entries with a cached quantity-on-hand.

use serde::{Deserialize, Serialize};

use shopledger_core::{BusinessId, Money, ProductId};

/// A product. `quantity_on_hand` is derived from the stock event history
/// and only ever updated under the stock ledger's write lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub business_id: BusinessId,
    pub name: String,
    pub sku: String,
    /// Cost per unit in minor units (used for COGS and adjustment values).
    pub unit_cost: Money,
    /// Sale price per unit in minor units.
    pub unit_price: Money,
    pub quantity_on_hand: i64,
}

/// Input for creating a product. Stock always starts at zero; initial
/// quantities arrive as receipt events so history stays complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub name: String,
    pub sku: String,
    pub unit_cost: Money,
    pub unit_price: Money,
}

impl ProductSpec {
    pub fn new(
        name: impl Into<String>,
        sku: impl Into<String>,
        unit_cost: Money,
        unit_price: Money,
    ) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            unit_cost,
            unit_price,
        }
    }
}
