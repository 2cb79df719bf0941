// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business rules live in the domain actions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseStore, BaseAuthorityScore)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::{AccountId, ChallengeId, IntentId, ListingId, ReconciliationId};
use crate::domains::ledger::models::{Account, LedgerEntry};
use crate::domains::listings::models::{DomainListing, ListingStatus};
use crate::domains::payments::models::{ProcessedPayment, ReconciliationItem};
use crate::domains::settlement::models::PurchaseIntent;
use crate::kernel::store::{Commit, CommitError};

// =============================================================================
// Store Trait (Infrastructure - persistence with atomic conditional commit)
// =============================================================================

#[async_trait]
pub trait BaseStore: Send + Sync {
    async fn account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Entries for one account, oldest first
    async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>>;

    async fn listing(&self, id: ListingId) -> Result<Option<DomainListing>>;

    async fn listings_by_status(&self, status: ListingStatus) -> Result<Vec<DomainListing>>;

    async fn listings_by_owner(&self, owner: AccountId) -> Result<Vec<DomainListing>>;

    async fn intent(&self, id: IntentId) -> Result<Option<PurchaseIntent>>;

    async fn intents_by_buyer(&self, buyer: AccountId) -> Result<Vec<PurchaseIntent>>;

    /// Pending or awaiting-payment intents whose deadline is at or before `cutoff`
    async fn open_intents_expiring_by(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseIntent>>;

    async fn processed_payment(&self, external_tx_id: &str) -> Result<Option<ProcessedPayment>>;

    /// Drop dedup records received before `cutoff`; returns how many were removed
    async fn prune_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn reconciliation_item(&self, id: ReconciliationId) -> Result<Option<ReconciliationItem>>;

    async fn open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>>;

    /// Apply every write if every guard holds, otherwise nothing
    async fn commit(&self, commit: Commit) -> Result<(), CommitError>;

    /// Cheap liveness probe for health checks
    async fn ping(&self) -> Result<()>;
}

// =============================================================================
// Authority Score Trait (Infrastructure - external domain-authority lookup)
// =============================================================================

#[async_trait]
pub trait BaseAuthorityScore: Send + Sync {
    /// Authority score for a domain name.
    ///
    /// `Ok(None)` means the provider had no score; `Err` means the lookup
    /// failed. Neither may block a submission.
    async fn score(&self, domain: &str) -> Result<Option<f64>>;
}

// =============================================================================
// CAPTCHA Oracle Trait (Infrastructure - pass/fail challenge check)
// =============================================================================

#[async_trait]
pub trait BaseCaptchaOracle: Send + Sync {
    /// Check an answer. A challenge is consumed by its first verification,
    /// pass or fail, and unknown or expired challenges never pass.
    async fn verify(&self, challenge_id: ChallengeId, answer: &str) -> bool;
}
