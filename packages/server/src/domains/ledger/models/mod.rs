pub mod account;
pub mod entry;

pub use account::*;
pub use entry::*;
