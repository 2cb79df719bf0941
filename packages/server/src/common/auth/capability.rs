use serde::{Deserialize, Serialize};

/// Account roles in the domain market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

/// Everything a principal can ask the core to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Put a new listing up for review (or save it as a draft)
    SubmitListing,

    /// Move one's own draft into the review queue
    SubmitDraft,

    /// Approve or reject a pending listing
    ReviewListing,

    /// Withdraw a listing from sale
    DelistListing,

    /// Open a purchase intent against someone else's listing
    PurchaseListing,

    /// Settle one's own purchase intent
    CompletePurchase,

    /// Read a purchase intent
    ViewPurchase,

    /// Read a wallet balance and its entries
    ViewWallet,

    /// Inspect and resolve the reconciliation queue
    ManageReconciliation,
}

impl Action {
    /// Actions only an admin may perform, regardless of ownership
    pub fn requires_admin(&self) -> bool {
        matches!(self, Action::ReviewListing | Action::ManageReconciliation)
    }
}
