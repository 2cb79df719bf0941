//! Purchase and settlement actions
//!
//! The settlement engine owns purchase intents and references listings and
//! accounts by id. Funds and ownership move together in a single commit.

mod complete;
mod expire;
mod initiate;
mod queries;
pub(crate) mod settle;

pub use complete::{complete_purchase, complete_with_external_payment, complete_with_wallet_funds};
pub use expire::sweep_expired;
pub use initiate::initiate_purchase;
pub use queries::{get_intent, list_for_buyer};
