// HTTP routes
pub mod health;
pub mod listings;
pub mod payments;
pub mod purchases;
pub mod reconciliation;
pub mod wallet;

pub use health::*;
pub use listings::*;
pub use payments::*;
pub use purchases::*;
pub use reconciliation::*;
pub use wallet::*;
