//! Typed ID definitions for the market's entities.

pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for wallet-holding accounts (buyers, sellers, admins).
pub struct Account;

/// Marker type for domain listings.
pub struct Listing;

/// Marker type for purchase intents.
pub struct PurchaseIntent;

/// Marker type for ledger entries.
pub struct LedgerEntry;

/// Marker type for reconciliation queue items.
pub struct ReconciliationItem;

/// Marker type for CAPTCHA challenges.
pub struct CaptchaChallenge;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type AccountId = Id<Account>;

pub type ListingId = Id<Listing>;

pub type IntentId = Id<PurchaseIntent>;

pub type EntryId = Id<LedgerEntry>;

pub type ReconciliationId = Id<ReconciliationItem>;

/// Challenge ids are random so they cannot be guessed from issue time.
pub type ChallengeId = Id<CaptchaChallenge, V4>;
