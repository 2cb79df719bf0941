use thiserror::Error;

use super::auth::AuthError;
use super::entity_ids::AccountId;

/// Errors returned by every core operation.
///
/// All variants are recoverable from the caller's side. Apart from `Storage`,
/// an error means no side effect took place.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Malformed input; fix and resubmit
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Role or ownership check failed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthenticated,

    /// Entity is not in the state the transition requires; refresh and retry
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: i64,
        requested: i64,
    },

    /// Lost a concurrent mutation race; safe to retry
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl MarketError {
    pub fn validation(message: impl Into<String>) -> Self {
        MarketError::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        MarketError::InvalidState(message.into())
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        MarketError::NotFound(what.to_string())
    }
}

impl From<AuthError> for MarketError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::AuthenticationRequired | AuthError::InvalidToken => {
                MarketError::Unauthenticated
            }
            other => MarketError::Forbidden(other.to_string()),
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
