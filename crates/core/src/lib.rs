//! `shopledger-core` — shared domain primitives for the ledger & inventory
//! consistency engine.
//!
//! This crate contains **pure domain** building blocks (no storage, no IO):
//! strongly-typed identifiers, fixed-point money, and the engine-wide error
//! taxonomy.

pub mod error;
pub mod id;
pub mod money;

pub use error::{EngineError, EngineResult, StockWarning};
pub use id::{
    AccountId, AuditRecordId, BusinessId, EmployeeId, LedgerEntryId, ProductId, StockEventId,
};
pub use money::Money;
