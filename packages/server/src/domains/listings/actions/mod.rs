//! Listing lifecycle actions
//!
//! Every transition re-reads the listing and commits against the version it
//! read, so two admins (or an admin and the owner) racing on the same listing
//! resolve to one winner.

mod queries;
mod review;
mod submit;

pub use queries::{get_listing, list_by_owner, list_by_status};
pub use review::{delist_listing, review_listing};
pub use submit::{save_draft, submit_draft, submit_listing};
