use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AccountId, ListingId, MarketError, MarketResult};

/// Listing status
///
/// ```text
/// draft -> pending_review -> approved -> sold
///                  |            |
///                  |            +-----> delisted
///                  +--> rejected
///                  +--> delisted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    PendingReview,
    Approved,
    Rejected,
    Sold,
    Delisted,
}

impl ListingStatus {
    /// The transition table. Nothing skips a state.
    pub fn can_transition_to(self, next: ListingStatus) -> bool {
        use ListingStatus::*;
        matches!(
            (self, next),
            (Draft, PendingReview)
                | (PendingReview, Approved)
                | (PendingReview, Rejected)
                | (PendingReview, Delisted)
                | (Approved, Sold)
                | (Approved, Delisted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ListingStatus::Rejected | ListingStatus::Sold | ListingStatus::Delisted
        )
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Draft => write!(f, "draft"),
            ListingStatus::PendingReview => write!(f, "pending_review"),
            ListingStatus::Approved => write!(f, "approved"),
            ListingStatus::Rejected => write!(f, "rejected"),
            ListingStatus::Sold => write!(f, "sold"),
            ListingStatus::Delisted => write!(f, "delisted"),
        }
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "draft" => Ok(ListingStatus::Draft),
            "pending_review" => Ok(ListingStatus::PendingReview),
            "approved" => Ok(ListingStatus::Approved),
            "rejected" => Ok(ListingStatus::Rejected),
            "sold" => Ok(ListingStatus::Sold),
            "delisted" => Ok(ListingStatus::Delisted),
            _ => Err(anyhow::anyhow!("Invalid listing status: {}", s)),
        }
    }
}

/// Descriptive data shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingMetadata {
    /// The domain name on offer, lowercased
    pub name: String,
    pub description: String,
    /// Cached domain-authority score; `None` when the lookup was unavailable
    pub authority_score: Option<f64>,
}

/// DomainListing - a domain name offered for sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainListing {
    pub id: ListingId,
    /// The seller until the listing is sold, the buyer afterwards
    pub owner_id: AccountId,
    pub asking_price: i64,
    pub status: ListingStatus,
    pub metadata: ListingMetadata,

    // Review
    pub reviewed_by: Option<AccountId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,

    /// Bumped on every committed change; guards optimistic writes
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DomainListing {
    pub fn new(owner_id: AccountId, draft: ListingDraft, status: ListingStatus) -> Self {
        let now = Utc::now();
        Self {
            id: ListingId::new(),
            owner_id,
            asking_price: draft.asking_price,
            status,
            metadata: ListingMetadata {
                name: draft.name,
                description: draft.description,
                authority_score: None,
            },
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// The next revision of this listing in `next` status.
    ///
    /// Fails with `InvalidState` when the transition table forbids the move.
    pub fn transition(&self, next: ListingStatus) -> MarketResult<Self> {
        if !self.status.can_transition_to(next) {
            return Err(MarketError::invalid_state(format!(
                "listing {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let mut updated = self.clone();
        updated.status = next;
        updated.version += 1;
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

/// Seller input for a new listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub name: String,
    pub description: String,
    pub asking_price: i64,
}

impl ListingDraft {
    /// Trim and lowercase the input, rejecting anything that cannot be listed
    pub fn normalized(self) -> MarketResult<Self> {
        if self.asking_price <= 0 {
            return Err(MarketError::validation("asking price must be positive"));
        }

        let name = self.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(MarketError::validation("domain name is required"));
        }
        if name.chars().any(char::is_whitespace)
            || !name.contains('.')
            || name.starts_with('.')
            || name.ends_with('.')
        {
            return Err(MarketError::validation(format!(
                "'{}' is not a valid domain name",
                name
            )));
        }

        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(MarketError::validation("description is required"));
        }

        Ok(Self {
            name,
            description,
            asking_price: self.asking_price,
        })
    }
}

/// Admin verdict on a pending listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}
