//! `shopledger-engine` — tenant registry, mutation coordinator and the
//! engine facade.
//!
//! The coordinator is the only writer to the general ledger, stock ledger
//! and audit trail; it guarantees that each accepted intent commits its
//! (ledger entry, stock event, audit record) triple atomically per tenant,
//! or rejects with no writes at all.

pub mod accounts;
pub mod coordinator;
pub mod engine;
pub mod registry;

pub use accounts::{seed_default_chart, AccountMap, AccountRole};
pub use coordinator::{
    MutationCoordinator, SaleCommit, SaleIntent, SaleLine, StockAdjustment, StockCommit,
    StockReceipt, Tender,
};
pub use engine::ConsistencyEngine;
pub use registry::{Business, BusinessSpec, FiscalSettings, TenantRegistry};
