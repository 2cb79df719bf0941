//! Kernel module - server infrastructure and dependencies.

pub mod authority_client;
pub mod captcha;
pub mod deps;
pub mod market;
pub mod retry;
pub mod scheduled_tasks;
pub mod store;
pub mod test_dependencies;
pub mod traits;

pub use authority_client::{DisabledAuthorityScore, RapidApiAuthorityClient};
pub use captcha::ChallengeStore;
pub use deps::{MarketSettings, ServerDeps};
pub use market::Market;
pub use retry::retry_on_conflict;
pub use store::{MemoryStore, PostgresStore};
pub use test_dependencies::{MockAuthorityScore, MockCaptcha, TestDependencies};
pub use traits::*;
