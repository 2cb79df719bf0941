//! Auth domain - session tokens for buyers, sellers and admins
//!
//! Account creation and login happen outside this service. Callers present a
//! bearer token carrying `{account_id, role}`; the server middleware turns it
//! into a `Principal` that every action authorizes against.

pub mod jwt;

pub use jwt::{Claims, JwtService};
