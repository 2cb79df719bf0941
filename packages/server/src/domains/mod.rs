// Business domains
pub mod auth;
pub mod ledger;
pub mod listings;
pub mod payments;
pub mod settlement;
