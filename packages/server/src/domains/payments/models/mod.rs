pub mod callback;
pub mod reconciliation;

pub use callback::*;
pub use reconciliation::*;
