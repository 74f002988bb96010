//! Engine error taxonomy.
//!
//! Every rejection carries the business id and the offending entity id or
//! constraint so the hosting layer can log and display it verbatim. Errors
//! are deterministic: a `Validation`/`Referential` rejection happens before
//! any write and is safe to retry after correction. `CommitFailure` is the
//! one mid-commit failure; it reports the compensating reversal entry the
//! coordinator appended (the ledger is never edited or deleted).

use thiserror::Error;

use crate::id::{AccountId, BusinessId, LedgerEntryId, ProductId};

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed input (empty code, zero quantity, bad currency, ...).
    #[error("validation failed for business {business_id}: {reason}")]
    Validation {
        business_id: BusinessId,
        reason: String,
    },

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The business itself is not registered.
    #[error("unknown business: {0}")]
    UnknownBusiness(BusinessId),

    /// A ledger entry's debits and credits do not match (minor units).
    #[error("unbalanced entry for business {business_id}: debits {debits} != credits {credits}")]
    UnbalancedEntry {
        business_id: BusinessId,
        debits: i128,
        credits: i128,
    },

    /// A ledger line references an account outside the business (or none).
    #[error("unknown account {account_id} for business {business_id}")]
    UnknownAccount {
        business_id: BusinessId,
        account_id: AccountId,
    },

    /// A dangling account/product reference.
    #[error("referential integrity violation for business {business_id}: {reason}")]
    Referential {
        business_id: BusinessId,
        reason: String,
    },

    /// A financial stock event was submitted without a ledger link.
    #[error("financial stock event for product {product_id} (business {business_id}) has no linked ledger entry")]
    UnlinkedFinancialEvent {
        business_id: BusinessId,
        product_id: ProductId,
    },

    /// Nonzero quantity delta with zero unit cost and no quantity-only flag.
    #[error("zero-value adjustment for product {product_id} (business {business_id}); set quantity_only for a non-financial correction")]
    ZeroValueAdjustment {
        business_id: BusinessId,
        product_id: ProductId,
    },

    /// A line amount or total exceeded the fixed-point range.
    #[error("amount overflow for business {business_id}")]
    AmountOverflow { business_id: BusinessId },

    /// Storage failed mid-commit; the ledger entry was compensated with a
    /// reversing entry rather than removed.
    #[error("commit failed for business {business_id}: {reason} (reversal entry: {reversal_entry_id:?})")]
    CommitFailure {
        business_id: BusinessId,
        reason: String,
        reversal_entry_id: Option<LedgerEntryId>,
    },
}

impl EngineError {
    pub fn validation(business_id: BusinessId, reason: impl Into<String>) -> Self {
        Self::Validation {
            business_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn referential(business_id: BusinessId, reason: impl Into<String>) -> Self {
        Self::Referential {
            business_id,
            reason: reason.into(),
        }
    }
}

/// Soft signal returned alongside a successful commit, never an error.
///
/// Oversell/backorder is business policy; the engine commits the event and
/// lets the caller decide whether to surface or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockWarning {
    NegativeStock {
        product_id: ProductId,
        resulting_quantity: i64,
    },
}
