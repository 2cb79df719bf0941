use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AccountId, Role};

/// Account - one wallet per principal
///
/// `balance` is a materialized fold over the account's ledger entries. Only
/// the store changes it, and only while appending an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A fresh account with an empty wallet
    pub fn open(id: AccountId, role: Role) -> Self {
        Self {
            id,
            role,
            balance: 0,
            created_at: Utc::now(),
        }
    }
}
