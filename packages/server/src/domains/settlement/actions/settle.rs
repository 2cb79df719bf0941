//! Shared settlement building blocks.
//!
//! A settlement is one commit: buyer debit, seller credit, optional platform
//! fee credit, listing to `sold` under the buyer, intent to `completed`. Both
//! the wallet path and the payment callback path assemble it here.

use chrono::{DateTime, Utc};

use crate::common::{MarketError, MarketResult};
use crate::domains::ledger::models::{EntryKind, LedgerEntry};
use crate::domains::listings::models::{DomainListing, ListingStatus};
use crate::domains::settlement::models::{IntentStatus, PurchaseIntent};
use crate::kernel::store::{Commit, Guard, Write};
use crate::kernel::{MarketSettings, ServerDeps};

/// Why an intent cannot be settled right now
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Blocker {
    /// Intent already left the open states
    Closed(IntentStatus),
    /// Open but past its deadline
    Expired,
    /// Listing was sold, delisted or changed hands
    ListingUnavailable(ListingStatus),
}

impl Blocker {
    pub(crate) fn reason(&self) -> String {
        match self {
            Blocker::Closed(status) => format!("purchase intent is {}", status),
            Blocker::Expired => "purchase intent expired".to_string(),
            Blocker::ListingUnavailable(status) => {
                format!("listing is no longer available ({})", status)
            }
        }
    }

    pub(crate) fn into_error(self, intent: &PurchaseIntent) -> MarketError {
        MarketError::invalid_state(format!("intent {}: {}", intent.id, self.reason()))
    }
}

pub(crate) fn check_settleable(
    intent: &PurchaseIntent,
    listing: Option<&DomainListing>,
    now: DateTime<Utc>,
) -> Result<(), Blocker> {
    if !intent.status.is_open() {
        return Err(Blocker::Closed(intent.status));
    }
    if intent.is_expired_at(now) {
        return Err(Blocker::Expired);
    }
    match listing {
        Some(listing)
            if listing.status == ListingStatus::Approved && listing.owner_id == intent.seller_id =>
        {
            Ok(())
        }
        Some(listing) => Err(Blocker::ListingUnavailable(listing.status)),
        None => Err(Blocker::ListingUnavailable(ListingStatus::Delisted)),
    }
}

/// The intent revision that closes it because of `blocker`
pub(crate) fn close_for(intent: &PurchaseIntent, blocker: &Blocker) -> MarketResult<PurchaseIntent> {
    match blocker {
        Blocker::Expired => intent.transition(IntentStatus::Expired),
        Blocker::ListingUnavailable(_) => intent.fail(blocker.reason()),
        Blocker::Closed(_) => Err(blocker.clone().into_error(intent)),
    }
}

/// Persist the closing revision for a blocked intent; guarded on its version
pub(crate) async fn close_blocked(
    intent: &PurchaseIntent,
    blocker: &Blocker,
    deps: &ServerDeps,
) -> MarketResult<()> {
    if matches!(blocker, Blocker::Closed(_)) {
        return Ok(());
    }
    let closed = close_for(intent, blocker)?;
    deps.store
        .commit(
            Commit::new()
                .guard(Guard::intent(intent))
                .write(Write::PutIntent(closed)),
        )
        .await?;
    Ok(())
}

pub(crate) struct Settlement {
    pub commit: Commit,
    pub completed: PurchaseIntent,
}

/// Assemble the settlement commit for an intent already known to be settleable
pub(crate) fn settle(
    intent: &PurchaseIntent,
    listing: &DomainListing,
    settings: &MarketSettings,
) -> MarketResult<Settlement> {
    let reference = intent.id.to_string();
    let fee = settings.fee_for(intent.price);
    let seller_share = intent.price - fee;

    let mut writes = vec![Write::AppendEntry(LedgerEntry::debit(
        intent.buyer_id,
        intent.price,
        EntryKind::PurchaseDebit,
        &reference,
    ))];
    if seller_share > 0 {
        writes.push(Write::AppendEntry(LedgerEntry::credit(
            intent.seller_id,
            seller_share,
            EntryKind::SaleCredit,
            &reference,
        )));
    }
    if let (Some(fee_account), true) = (settings.fee_account, fee > 0) {
        writes.push(Write::AppendEntry(LedgerEntry::credit(
            fee_account,
            fee,
            EntryKind::PlatformFee,
            &reference,
        )));
    }

    let mut sold = listing.transition(ListingStatus::Sold)?;
    sold.owner_id = intent.buyer_id;
    let completed = intent.transition(IntentStatus::Completed)?;

    writes.push(Write::PutListing(sold));
    writes.push(Write::PutIntent(completed.clone()));

    let commit = Commit::new()
        .guard(Guard::listing(listing))
        .guard(Guard::intent(intent))
        .extend(writes);

    Ok(Settlement { commit, completed })
}
