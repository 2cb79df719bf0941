use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AccountId, EntryId, IntentId, ReconciliationId};

/// Payment provider webhook payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    /// Provider transaction id; the deduplication key
    pub external_tx_id: String,
    /// Wallet the funds land in
    pub account_id: AccountId,
    pub amount: i64,
    /// Purchase this payment was made for, if any
    pub intent_id: Option<IntentId>,
}

/// What a processed callback ended up doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Plain wallet top-up
    TopUp,
    /// Credit landed and the attached purchase settled in the same commit
    PurchaseCompleted { intent_id: IntentId },
    /// Credit landed but could not be applied to its purchase
    Flagged {
        intent_id: Option<IntentId>,
        item_id: ReconciliationId,
        reason: String,
    },
}

/// Acknowledgement returned to the provider; replays return the stored copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAck {
    pub external_tx_id: String,
    pub account_id: AccountId,
    pub credited: i64,
    pub entry_id: EntryId,
    pub outcome: PaymentOutcome,
}

/// Deduplication record for a callback that has been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPayment {
    pub external_tx_id: String,
    pub ack: PaymentAck,
    pub received_at: DateTime<Utc>,
}

impl ProcessedPayment {
    pub fn new(ack: PaymentAck) -> Self {
        Self {
            external_tx_id: ack.external_tx_id.clone(),
            ack,
            received_at: Utc::now(),
        }
    }
}
