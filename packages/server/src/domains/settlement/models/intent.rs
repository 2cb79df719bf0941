use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AccountId, IntentId, ListingId, MarketError, MarketResult};

/// Purchase intent status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    AwaitingPayment,
    Completed,
    Failed,
    Expired,
}

impl IntentStatus {
    /// Still able to settle
    pub fn is_open(self) -> bool {
        matches!(self, IntentStatus::Pending | IntentStatus::AwaitingPayment)
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentStatus::Pending => write!(f, "pending"),
            IntentStatus::AwaitingPayment => write!(f, "awaiting_payment"),
            IntentStatus::Completed => write!(f, "completed"),
            IntentStatus::Failed => write!(f, "failed"),
            IntentStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for IntentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(IntentStatus::Pending),
            "awaiting_payment" => Ok(IntentStatus::AwaitingPayment),
            "completed" => Ok(IntentStatus::Completed),
            "failed" => Ok(IntentStatus::Failed),
            "expired" => Ok(IntentStatus::Expired),
            _ => Err(anyhow::anyhow!("Invalid intent status: {}", s)),
        }
    }
}

/// How the buyer settles an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Settle now from the buyer's wallet balance
    Wallet,
    /// Wait for the payment provider's callback
    External,
}

/// PurchaseIntent - a buyer's in-flight attempt to acquire a listing
///
/// References listing and accounts by id only; settlement mutates them through
/// the store, never through this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    pub id: IntentId,
    pub listing_id: ListingId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    /// Asking price captured at initiation; later price edits do not apply
    pub price: i64,
    pub status: IntentStatus,
    pub external_payment_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseIntent {
    pub fn new(
        listing_id: ListingId,
        buyer_id: AccountId,
        seller_id: AccountId,
        price: i64,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IntentId::new(),
            listing_id,
            buyer_id,
            seller_id,
            price,
            status: IntentStatus::Pending,
            external_payment_ref: None,
            failure_reason: None,
            expires_at: now + ttl,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Past its deadline while still open
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && now >= self.expires_at
    }

    /// The next revision of this intent in `next` status.
    pub fn transition(&self, next: IntentStatus) -> MarketResult<Self> {
        let allowed = match (self.status, next) {
            (IntentStatus::Pending, IntentStatus::AwaitingPayment) => true,
            (from, IntentStatus::Completed | IntentStatus::Failed | IntentStatus::Expired) => {
                from.is_open()
            }
            _ => false,
        };

        if !allowed {
            return Err(MarketError::invalid_state(format!(
                "purchase intent {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let mut updated = self.clone();
        updated.status = next;
        updated.version += 1;
        updated.updated_at = Utc::now();
        Ok(updated)
    }

    pub fn fail(&self, reason: impl Into<String>) -> MarketResult<Self> {
        let mut failed = self.transition(IntentStatus::Failed)?;
        failed.failure_reason = Some(reason.into());
        Ok(failed)
    }
}
