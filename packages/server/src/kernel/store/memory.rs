//! In-process store used in development and tests.
//!
//! One `RwLock` covers all tables; a commit holds the write half for its
//! whole check-then-apply pass and never awaits while holding it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Commit, CommitError, Guard, Write};
use crate::common::{AccountId, IntentId, ListingId, ReconciliationId};
use crate::domains::ledger::models::{Account, LedgerEntry};
use crate::domains::listings::models::{DomainListing, ListingStatus};
use crate::domains::payments::models::{ProcessedPayment, ReconciliationItem, ReconciliationStatus};
use crate::domains::settlement::models::PurchaseIntent;
use crate::kernel::BaseStore;

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
    listings: HashMap<ListingId, DomainListing>,
    intents: HashMap<IntentId, PurchaseIntent>,
    payments: HashMap<String, ProcessedPayment>,
    reconciliation: HashMap<ReconciliationId, ReconciliationItem>,
}

impl Tables {
    fn guard_holds(&self, guard: &Guard) -> bool {
        match guard {
            Guard::ListingVersion { id, version } => self
                .listings
                .get(id)
                .is_some_and(|listing| listing.version == *version),
            Guard::IntentVersion { id, version } => self
                .intents
                .get(id)
                .is_some_and(|intent| intent.version == *version),
            Guard::ReconciliationOpen { id } => self
                .reconciliation
                .get(id)
                .is_some_and(|item| item.status == ReconciliationStatus::Open),
            Guard::PaymentUnseen { external_tx_id } => !self.payments.contains_key(external_tx_id),
            Guard::AccountAbsent { id } => !self.accounts.contains_key(id),
        }
    }

    /// Dry-run the writes that can fail so that applying them cannot
    fn stage(&self, writes: &[Write]) -> Result<(), CommitError> {
        let mut balances: HashMap<AccountId, i64> = HashMap::new();

        for write in writes {
            match write {
                Write::OpenAccount(account) => {
                    if self.accounts.contains_key(&account.id) || balances.contains_key(&account.id)
                    {
                        return Err(CommitError::GuardFailed(Guard::AccountAbsent {
                            id: account.id,
                        }));
                    }
                    balances.insert(account.id, 0);
                }
                Write::AppendEntry(entry) => {
                    let current = match balances.get(&entry.account_id) {
                        Some(balance) => *balance,
                        None => self
                            .accounts
                            .get(&entry.account_id)
                            .map(|account| account.balance)
                            .ok_or(CommitError::UnknownAccount(entry.account_id))?,
                    };
                    let next = current
                        .checked_add(entry.amount)
                        .ok_or_else(|| anyhow!("balance overflow on account {}", entry.account_id))?;
                    if next < 0 {
                        return Err(CommitError::InsufficientFunds {
                            account_id: entry.account_id,
                            balance: current,
                            requested: -entry.amount,
                        });
                    }
                    balances.insert(entry.account_id, next);
                }
                Write::RecordPayment(payment) => {
                    if self.payments.contains_key(&payment.external_tx_id) {
                        return Err(CommitError::GuardFailed(Guard::payment_unseen(
                            &payment.external_tx_id,
                        )));
                    }
                }
                Write::PutListing(_) | Write::PutIntent(_) | Write::PutReconciliation(_) => {}
            }
        }

        Ok(())
    }

    fn apply(&mut self, writes: Vec<Write>) {
        for write in writes {
            match write {
                Write::OpenAccount(account) => {
                    self.accounts.insert(account.id, Account { balance: 0, ..account });
                }
                Write::PutListing(listing) => {
                    self.listings.insert(listing.id, listing);
                }
                Write::PutIntent(intent) => {
                    self.intents.insert(intent.id, intent);
                }
                Write::AppendEntry(entry) => {
                    if let Some(account) = self.accounts.get_mut(&entry.account_id) {
                        account.balance += entry.amount;
                    }
                    self.entries.push(entry);
                }
                Write::RecordPayment(payment) => {
                    self.payments.insert(payment.external_tx_id.clone(), payment);
                }
                Write::PutReconciliation(item) => {
                    self.reconciliation.insert(item.id, item);
                }
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseStore for MemoryStore {
    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .filter(|entry| entry.account_id == id)
            .cloned()
            .collect())
    }

    async fn listing(&self, id: ListingId) -> Result<Option<DomainListing>> {
        Ok(self.tables.read().await.listings.get(&id).cloned())
    }

    async fn listings_by_status(&self, status: ListingStatus) -> Result<Vec<DomainListing>> {
        let tables = self.tables.read().await;
        let mut listings: Vec<_> = tables
            .listings
            .values()
            .filter(|listing| listing.status == status)
            .cloned()
            .collect();
        listings.sort_by_key(|listing| listing.created_at);
        Ok(listings)
    }

    async fn listings_by_owner(&self, owner: AccountId) -> Result<Vec<DomainListing>> {
        let tables = self.tables.read().await;
        let mut listings: Vec<_> = tables
            .listings
            .values()
            .filter(|listing| listing.owner_id == owner)
            .cloned()
            .collect();
        listings.sort_by_key(|listing| listing.created_at);
        Ok(listings)
    }

    async fn intent(&self, id: IntentId) -> Result<Option<PurchaseIntent>> {
        Ok(self.tables.read().await.intents.get(&id).cloned())
    }

    async fn intents_by_buyer(&self, buyer: AccountId) -> Result<Vec<PurchaseIntent>> {
        let tables = self.tables.read().await;
        let mut intents: Vec<_> = tables
            .intents
            .values()
            .filter(|intent| intent.buyer_id == buyer)
            .cloned()
            .collect();
        intents.sort_by_key(|intent| intent.created_at);
        Ok(intents)
    }

    async fn open_intents_expiring_by(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseIntent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .intents
            .values()
            .filter(|intent| intent.status.is_open() && intent.expires_at <= cutoff)
            .cloned()
            .collect())
    }

    async fn processed_payment(&self, external_tx_id: &str) -> Result<Option<ProcessedPayment>> {
        Ok(self.tables.read().await.payments.get(external_tx_id).cloned())
    }

    async fn prune_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.payments.len();
        tables.payments.retain(|_, payment| payment.received_at >= cutoff);
        Ok((before - tables.payments.len()) as u64)
    }

    async fn reconciliation_item(&self, id: ReconciliationId) -> Result<Option<ReconciliationItem>> {
        Ok(self.tables.read().await.reconciliation.get(&id).cloned())
    }

    async fn open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<_> = tables
            .reconciliation
            .values()
            .filter(|item| item.status == ReconciliationStatus::Open)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn commit(&self, commit: Commit) -> Result<(), CommitError> {
        let mut tables = self.tables.write().await;

        if let Some(failed) = commit.guards.iter().find(|guard| !tables.guard_holds(guard)) {
            return Err(CommitError::GuardFailed(failed.clone()));
        }
        tables.stage(&commit.writes)?;
        tables.apply(commit.writes);

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
