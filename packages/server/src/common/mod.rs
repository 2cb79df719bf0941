// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod errors;
pub mod id;

pub use auth::{Action, Actor, AuthError, Decision, Principal, Role};
pub use entity_ids::*;
pub use errors::{MarketError, MarketResult};
pub use id::{Id, V4, V7};
