//! Authorization gate for the domain market
//!
//! A single pure policy decides every `(principal, action, owner)` triple:
//!
//! ```text
//! principal.actor()
//!     .can(Action::ReviewListing)
//!     .check()?;
//! ```
//!
//! Engines call it before any store mutation; the HTTP layer never makes its
//! own role decisions.

mod builder;
mod capability;
mod errors;

pub use builder::{authorize, Actor, CapabilityBuilder, Decision, Principal};
pub use capability::{Action, Role};
pub use errors::AuthError;
