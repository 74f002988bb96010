//! Audit trail: per-tenant append-only log of operator actions.
//!
//! Independent of financial correctness, but required to reconstruct who
//! caused a given ledger or stock change. No update or delete path exists.

pub mod trail;

pub use trail::{
    AuditAction, AuditFilter, AuditRecord, AuditTrail, Operator, RecordAudit, RelatedIds,
};
