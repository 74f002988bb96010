//! Accounting module: per-tenant chart of accounts and append-only general
//! ledger.
//!
//! The ledger is the financial record of truth. Entries are immutable after
//! commit; corrections are new reversal-tagged entries, never edits.

pub mod chart;
pub mod ledger;

pub use chart::{Account, AccountSpec, AccountType, ChartOfAccounts, Side};
pub use ledger::{
    EntryDraft, EntrySource, GeneralLedger, LedgerEntry, LedgerFilter, LedgerLine, SourceKind,
};
