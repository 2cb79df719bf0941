// Market - the core's public face
//
// Holds the server dependencies and exposes every marketplace operation as a
// method. Transport layers (HTTP routes, scheduled jobs, tests) talk to this
// and never to the store directly.

use chrono::{DateTime, Utc};

use super::ServerDeps;
use crate::common::{
    AccountId, Action, IntentId, ListingId, MarketResult, Principal, ReconciliationId, Role,
};
use crate::domains::ledger::{actions as ledger, Account, LedgerEntry};
use crate::domains::listings::{
    actions as listings, DomainListing, ListingDraft, ListingStatus, ReviewDecision,
};
use crate::domains::payments::{
    actions as payments, PaymentAck, PaymentCallback, ReconciliationItem, Resolution,
};
use crate::domains::settlement::{actions as settlement, PaymentMethod, PurchaseIntent};

#[derive(Clone)]
pub struct Market {
    deps: ServerDeps,
}

impl Market {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &ServerDeps {
        &self.deps
    }

    // -------------------------------------------------------------------------
    // Accounts and ledger
    // -------------------------------------------------------------------------

    pub async fn open_account(&self, id: AccountId, role: Role) -> MarketResult<Account> {
        ledger::open_account(id, role, &self.deps).await
    }

    /// Wallet balance, visible to its owner and to admins
    pub async fn get_balance(&self, principal: &Principal, account_id: AccountId) -> MarketResult<i64> {
        principal.actor().can(Action::ViewWallet).on(account_id).check()?;
        ledger::balance_of(account_id, &self.deps).await
    }

    pub async fn ledger_entries(
        &self,
        principal: &Principal,
        account_id: AccountId,
    ) -> MarketResult<Vec<LedgerEntry>> {
        principal.actor().can(Action::ViewWallet).on(account_id).check()?;
        ledger::entries_for(account_id, &self.deps).await
    }

    pub async fn verify_balance(&self, account_id: AccountId) -> MarketResult<bool> {
        ledger::verify_balance(account_id, &self.deps).await
    }

    /// Fund a wallet directly (operator tooling, fixtures)
    pub async fn top_up(
        &self,
        account_id: AccountId,
        amount: i64,
        reference: &str,
    ) -> MarketResult<LedgerEntry> {
        ledger::top_up(account_id, amount, reference, &self.deps).await
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    pub async fn submit_listing(
        &self,
        principal: &Principal,
        draft: ListingDraft,
    ) -> MarketResult<DomainListing> {
        listings::submit_listing(principal, draft, &self.deps).await
    }

    pub async fn save_draft(
        &self,
        principal: &Principal,
        draft: ListingDraft,
    ) -> MarketResult<DomainListing> {
        listings::save_draft(principal, draft, &self.deps).await
    }

    pub async fn submit_draft(
        &self,
        principal: &Principal,
        listing_id: ListingId,
    ) -> MarketResult<DomainListing> {
        listings::submit_draft(principal, listing_id, &self.deps).await
    }

    pub async fn review_listing(
        &self,
        principal: &Principal,
        listing_id: ListingId,
        decision: ReviewDecision,
        reason: Option<String>,
    ) -> MarketResult<DomainListing> {
        listings::review_listing(principal, listing_id, decision, reason, &self.deps).await
    }

    pub async fn delist_listing(
        &self,
        principal: &Principal,
        listing_id: ListingId,
    ) -> MarketResult<DomainListing> {
        listings::delist_listing(principal, listing_id, &self.deps).await
    }

    pub async fn get_listing(&self, listing_id: ListingId) -> MarketResult<DomainListing> {
        listings::get_listing(listing_id, &self.deps).await
    }

    pub async fn listings_by_status(&self, status: ListingStatus) -> MarketResult<Vec<DomainListing>> {
        listings::list_by_status(status, &self.deps).await
    }

    pub async fn listings_by_owner(&self, owner: AccountId) -> MarketResult<Vec<DomainListing>> {
        listings::list_by_owner(owner, &self.deps).await
    }

    // -------------------------------------------------------------------------
    // Purchases
    // -------------------------------------------------------------------------

    pub async fn initiate_purchase(
        &self,
        principal: &Principal,
        listing_id: ListingId,
    ) -> MarketResult<PurchaseIntent> {
        settlement::initiate_purchase(principal, listing_id, &self.deps).await
    }

    pub async fn complete_purchase(
        &self,
        principal: &Principal,
        intent_id: IntentId,
        method: PaymentMethod,
    ) -> MarketResult<PurchaseIntent> {
        settlement::complete_purchase(principal, intent_id, method, &self.deps).await
    }

    pub async fn get_purchase(
        &self,
        principal: &Principal,
        intent_id: IntentId,
    ) -> MarketResult<PurchaseIntent> {
        settlement::get_intent(principal, intent_id, &self.deps).await
    }

    pub async fn purchases_for(
        &self,
        principal: &Principal,
        buyer: AccountId,
    ) -> MarketResult<Vec<PurchaseIntent>> {
        settlement::list_for_buyer(principal, buyer, &self.deps).await
    }

    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> MarketResult<usize> {
        settlement::sweep_expired(now, &self.deps).await
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    pub async fn receive_payment_callback(&self, callback: PaymentCallback) -> MarketResult<PaymentAck> {
        payments::receive_payment(callback, &self.deps).await
    }

    pub async fn open_reconciliation_items(
        &self,
        principal: &Principal,
    ) -> MarketResult<Vec<ReconciliationItem>> {
        payments::open_items(principal, &self.deps).await
    }

    pub async fn resolve_reconciliation(
        &self,
        principal: &Principal,
        item_id: ReconciliationId,
        resolution: Resolution,
    ) -> MarketResult<ReconciliationItem> {
        payments::resolve_item(principal, item_id, resolution, &self.deps).await
    }

    pub async fn prune_processed(&self, now: DateTime<Utc>) -> MarketResult<u64> {
        payments::prune_processed(now, &self.deps).await
    }
}
