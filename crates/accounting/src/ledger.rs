//! General ledger: per-tenant append-only journal of balanced entries.
//!
//! Entries are assigned a monotonically increasing per-business sequence
//! number under the same lock as the append, and are permanently retained.
//! Correcting a mistake means appending a reversal-tagged entry; there is no
//! update or delete path at all.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopledger_core::{AccountId, BusinessId, EngineError, EngineResult, LedgerEntryId, Money};

use crate::chart::{ChartOfAccounts, Side};

/// One side of a journal entry. Amounts are strictly positive; the side
/// carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub account_id: AccountId,
    pub side: Side,
    pub amount: Money,
}

impl LedgerLine {
    pub fn debit(account_id: AccountId, amount: Money) -> Self {
        Self { account_id, side: Side::Debit, amount }
    }

    pub fn credit(account_id: AccountId, amount: Money) -> Self {
        Self { account_id, side: Side::Credit, amount }
    }
}

/// What caused an entry. Reference ids point at the originating intent
/// (sale, adjustment, receipt) or, for reversals, the entry being undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reference", rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    Sale(Uuid),
    StockAdjustment(Uuid),
    Receipt(Uuid),
    Reversal(LedgerEntryId),
}

/// A not-yet-committed entry. Only the mutation coordinator (or a trusted
/// manual-journal path) builds these; everything else reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub source: EntrySource,
    pub occurred_at: DateTime<Utc>,
    pub memo: Option<String>,
    pub lines: Vec<LedgerLine>,
}

/// A committed, immutable journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub business_id: BusinessId,
    /// Per-business position, starting at 1. Total order for display and
    /// running-balance folds.
    pub sequence: u64,
    pub occurred_at: DateTime<Utc>,
    pub source: EntrySource,
    pub memo: Option<String>,
    pub lines: Vec<LedgerLine>,
}

impl LedgerEntry {
    /// Draft that exactly undoes this entry: same amounts, flipped sides,
    /// tagged as a reversal of this entry's id.
    pub fn reversing_draft(&self, occurred_at: DateTime<Utc>) -> EntryDraft {
        EntryDraft {
            source: EntrySource::Reversal(self.id),
            occurred_at,
            memo: Some(format!("reversal of entry {}", self.id)),
            lines: self
                .lines
                .iter()
                .map(|l| LedgerLine {
                    account_id: l.account_id,
                    side: l.side.opposite(),
                    amount: l.amount,
                })
                .collect(),
        }
    }
}

/// Source discriminant, for filtering without matching on reference ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Manual,
    Sale,
    StockAdjustment,
    Receipt,
    Reversal,
}

impl EntrySource {
    pub fn kind(&self) -> SourceKind {
        match self {
            EntrySource::Manual => SourceKind::Manual,
            EntrySource::Sale(_) => SourceKind::Sale,
            EntrySource::StockAdjustment(_) => SourceKind::StockAdjustment,
            EntrySource::Receipt(_) => SourceKind::Receipt,
            EntrySource::Reversal(_) => SourceKind::Reversal,
        }
    }
}

/// Query filter for `GeneralLedger::query`. All bounds inclusive.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub sequence_from: Option<u64>,
    pub sequence_to: Option<u64>,
    pub account_id: Option<AccountId>,
    pub source_kind: Option<SourceKind>,
}

/// Per-tenant append-only general ledger store.
#[derive(Debug, Default)]
pub struct GeneralLedger {
    streams: RwLock<HashMap<BusinessId, Vec<LedgerEntry>>>,
}

impl GeneralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and commit an entry, assigning the next per-business
    /// sequence number. Never partially commits: every check runs before
    /// the stream is touched.
    pub fn append(
        &self,
        business_id: BusinessId,
        draft: EntryDraft,
        chart: &ChartOfAccounts,
    ) -> EngineResult<LedgerEntry> {
        if draft.lines.is_empty() {
            return Err(EngineError::validation(business_id, "entry must have lines"));
        }

        let mut debits: i128 = 0;
        let mut credits: i128 = 0;
        for line in &draft.lines {
            if !line.amount.is_positive() {
                return Err(EngineError::validation(
                    business_id,
                    format!("line amount must be positive (account {})", line.account_id),
                ));
            }
            let account = chart.get(business_id, line.account_id).ok_or(
                EngineError::UnknownAccount {
                    business_id,
                    account_id: line.account_id,
                },
            )?;
            if !account.active {
                return Err(EngineError::validation(
                    business_id,
                    format!("account '{}' is deactivated", account.code),
                ));
            }
            match line.side {
                Side::Debit => debits += line.amount.as_i128(),
                Side::Credit => credits += line.amount.as_i128(),
            }
        }

        if debits != credits {
            return Err(EngineError::UnbalancedEntry {
                business_id,
                debits,
                credits,
            });
        }

        let mut streams = self.streams.write().map_err(|_| EngineError::CommitFailure {
            business_id,
            reason: "ledger store lock poisoned".to_string(),
            reversal_entry_id: None,
        })?;
        let stream = streams.entry(business_id).or_default();

        // Sequence assignment shares the critical section with the append.
        let entry = LedgerEntry {
            id: LedgerEntryId::new(),
            business_id,
            sequence: stream.len() as u64 + 1,
            occurred_at: draft.occurred_at,
            source: draft.source,
            memo: draft.memo,
            lines: draft.lines,
        };
        stream.push(entry.clone());
        Ok(entry)
    }

    /// Entries in sequence order, restartable (each call reads a snapshot).
    pub fn query(&self, business_id: BusinessId, filter: LedgerFilter) -> Vec<LedgerEntry> {
        let streams = match self.streams.read() {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let Some(stream) = streams.get(&business_id) else {
            return vec![];
        };
        stream
            .iter()
            .filter(|e| filter.sequence_from.is_none_or(|from| e.sequence >= from))
            .filter(|e| filter.sequence_to.is_none_or(|to| e.sequence <= to))
            .filter(|e| {
                filter
                    .account_id
                    .is_none_or(|account| e.lines.iter().any(|l| l.account_id == account))
            })
            .filter(|e| filter.source_kind.is_none_or(|kind| e.source.kind() == kind))
            .cloned()
            .collect()
    }

    pub fn get(&self, business_id: BusinessId, entry_id: LedgerEntryId) -> Option<LedgerEntry> {
        let streams = self.streams.read().ok()?;
        streams
            .get(&business_id)?
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
    }

    /// Highest assigned sequence number (0 for an empty ledger).
    pub fn entry_count(&self, business_id: BusinessId) -> u64 {
        let streams = match self.streams.read() {
            Ok(s) => s,
            Err(_) => return 0,
        };
        streams.get(&business_id).map(|s| s.len() as u64).unwrap_or(0)
    }

    /// Signed balance for one account, folded over the full sequence.
    /// Debit-positive convention; opening balances are ordinary entries.
    pub fn account_balance(&self, business_id: BusinessId, account_id: AccountId) -> i128 {
        let streams = match self.streams.read() {
            Ok(s) => s,
            Err(_) => return 0,
        };
        let Some(stream) = streams.get(&business_id) else {
            return 0;
        };
        stream
            .iter()
            .flat_map(|e| e.lines.iter())
            .filter(|l| l.account_id == account_id)
            .map(|l| match l.side {
                Side::Debit => l.amount.as_i128(),
                Side::Credit => -l.amount.as_i128(),
            })
            .sum()
    }
}
