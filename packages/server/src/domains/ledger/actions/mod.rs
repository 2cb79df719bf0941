//! Ledger domain actions
//!
//! The ledger owns accounts and their append-only entries. Multi-account
//! movements (settlement, refunds) build their own commits; these actions
//! cover single-account operations and reads.

mod accounts;
mod entries;

pub use accounts::{balance_of, entries_for, get_account, open_account, verify_balance};
pub use entries::{credit, debit, top_up};
