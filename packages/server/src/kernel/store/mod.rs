//! Persistence contract: reads by id plus one atomic, conditional commit.
//!
//! A [`Commit`] is a set of guards and a list of writes. The store checks
//! every guard and applies every write as one indivisible unit, or applies
//! nothing. Ledger appends carry their own check: the account balance may
//! never go below zero, evaluated against the balance at the moment of the
//! write.
//!
//! ```text
//! Commit::new()
//!     .guard(Guard::listing(&listing))
//!     .guard(Guard::intent(&intent))
//!     .write(Write::AppendEntry(debit))
//!     .write(Write::AppendEntry(credit))
//!     .write(Write::PutListing(sold))
//!     .write(Write::PutIntent(completed))
//! ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use thiserror::Error;

use crate::common::{AccountId, IntentId, ListingId, MarketError, ReconciliationId};
use crate::domains::ledger::models::{Account, LedgerEntry};
use crate::domains::listings::models::DomainListing;
use crate::domains::payments::models::{ProcessedPayment, ReconciliationItem};
use crate::domains::settlement::models::PurchaseIntent;

/// A condition that must hold when the commit is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Listing still at the version that was read
    ListingVersion { id: ListingId, version: i64 },
    /// Intent still at the version that was read
    IntentVersion { id: IntentId, version: i64 },
    /// Reconciliation item not yet resolved
    ReconciliationOpen { id: ReconciliationId },
    /// No callback with this transaction id has been recorded
    PaymentUnseen { external_tx_id: String },
    /// No account with this id exists
    AccountAbsent { id: AccountId },
}

impl Guard {
    pub fn listing(listing: &DomainListing) -> Self {
        Guard::ListingVersion {
            id: listing.id,
            version: listing.version,
        }
    }

    pub fn intent(intent: &PurchaseIntent) -> Self {
        Guard::IntentVersion {
            id: intent.id,
            version: intent.version,
        }
    }

    pub fn payment_unseen(external_tx_id: &str) -> Self {
        Guard::PaymentUnseen {
            external_tx_id: external_tx_id.to_string(),
        }
    }
}

/// A mutation applied when every guard holds
#[derive(Debug, Clone)]
pub enum Write {
    OpenAccount(Account),
    PutListing(DomainListing),
    PutIntent(PurchaseIntent),
    AppendEntry(LedgerEntry),
    RecordPayment(ProcessedPayment),
    PutReconciliation(ReconciliationItem),
}

#[derive(Debug, Clone, Default)]
pub struct Commit {
    pub guards: Vec<Guard>,
    pub writes: Vec<Write>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn write(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn extend(mut self, writes: impl IntoIterator<Item = Write>) -> Self {
        self.writes.extend(writes);
        self
    }
}

/// Why a commit was not applied. Nothing was written in every case.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("guard failed: {0:?}")]
    GuardFailed(Guard),

    #[error("account {account_id} has balance {balance}, cannot debit {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: i64,
        requested: i64,
    },

    #[error("account {0} does not exist")]
    UnknownAccount(AccountId),

    /// The backing store aborted the transaction to break a lock cycle
    #[error("commit contended: {0}")]
    Contended(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<CommitError> for MarketError {
    fn from(error: CommitError) -> Self {
        match error {
            CommitError::GuardFailed(guard) => {
                MarketError::Conflict(format!("concurrent update detected ({:?})", guard))
            }
            CommitError::InsufficientFunds {
                account_id,
                balance,
                requested,
            } => MarketError::InsufficientFunds {
                account_id,
                balance,
                requested,
            },
            CommitError::UnknownAccount(id) => MarketError::not_found(format!("account {}", id)),
            CommitError::Contended(message) => MarketError::Conflict(message),
            CommitError::Storage(error) => MarketError::Storage(error),
        }
    }
}
