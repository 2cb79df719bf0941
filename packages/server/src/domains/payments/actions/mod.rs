//! Payment reconciliation actions
//!
//! Provider callbacks are deduplicated on their external transaction id.
//! Payments that cannot be applied to their purchase stay in the wallet and
//! are queued for an operator.

mod reconcile;
mod receive;

pub use receive::receive_payment;
pub use reconcile::{open_items, prune_processed, resolve_item};
