//! Inventory module: product catalog plus the stock ledger.
//!
//! Authoritative stock state is the append-only event history per product;
//! the quantity-on-hand on each product is a cached projection maintained
//! inside the same critical section as the event append.

pub mod product;
pub mod stock;

pub use product::{Product, ProductSpec};
pub use stock::{
    InventoryStore, RecordStockEvent, RecordedStockEvent, StockEvent, StockEventKind, StockLedger,
};
