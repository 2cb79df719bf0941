// Domain Market - marketplace core
//
// This crate provides the transactional core of a domain-name marketplace:
// listing lifecycle, wallet ledger, purchase settlement and payment
// reconciliation, plus the HTTP server that exposes them.
//
// Business logic lives in domains/*/actions as plain async functions over
// `ServerDeps`; the `Market` facade in kernel/ is the public entry point.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
pub use kernel::Market;
