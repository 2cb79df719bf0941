//! Review and delist actions - moving listings out of the queue

use chrono::Utc;
use tracing::info;

use crate::common::{Action, ListingId, MarketError, MarketResult, Principal};
use crate::domains::listings::models::{DomainListing, ListingStatus, ReviewDecision};
use crate::kernel::retry_on_conflict;
use crate::kernel::store::{Commit, Guard, Write};
use crate::kernel::ServerDeps;

async fn load(listing_id: ListingId, deps: &ServerDeps) -> MarketResult<DomainListing> {
    deps.store
        .listing(listing_id)
        .await?
        .ok_or_else(|| MarketError::not_found(format!("listing {}", listing_id)))
}

async fn save(read: &DomainListing, next: DomainListing, deps: &ServerDeps) -> MarketResult<DomainListing> {
    deps.store
        .commit(
            Commit::new()
                .guard(Guard::listing(read))
                .write(Write::PutListing(next.clone())),
        )
        .await?;
    Ok(next)
}

/// Approve or reject a pending listing. Admin only.
pub async fn review_listing(
    principal: &Principal,
    listing_id: ListingId,
    decision: ReviewDecision,
    reason: Option<String>,
    deps: &ServerDeps,
) -> MarketResult<DomainListing> {
    principal.actor().can(Action::ReviewListing).check()?;
    let reason = reason.as_deref();

    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let listing = load(listing_id, deps).await?;

        let next_status = match decision {
            ReviewDecision::Approve => ListingStatus::Approved,
            ReviewDecision::Reject => ListingStatus::Rejected,
        };
        if listing.status != ListingStatus::PendingReview {
            return Err(MarketError::invalid_state(format!(
                "listing {} is {}, only pending_review listings can be reviewed",
                listing_id, listing.status
            )));
        }

        let mut reviewed = listing.transition(next_status)?;
        reviewed.reviewed_by = Some(principal.account_id);
        reviewed.reviewed_at = Some(Utc::now());
        if decision == ReviewDecision::Reject {
            reviewed.rejection_reason = reason.map(str::to_string);
        }

        let reviewed = save(&listing, reviewed, deps).await?;
        info!(
            listing_id = %listing_id,
            reviewer_id = %principal.account_id,
            status = %reviewed.status,
            "Listing reviewed"
        );
        Ok(reviewed)
    })
    .await
}

/// Withdraw a listing from sale. Owner or admin.
pub async fn delist_listing(
    principal: &Principal,
    listing_id: ListingId,
    deps: &ServerDeps,
) -> MarketResult<DomainListing> {
    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let listing = load(listing_id, deps).await?;

        principal
            .actor()
            .can(Action::DelistListing)
            .on(listing.owner_id)
            .check()?;

        let delisted = listing.transition(ListingStatus::Delisted)?;
        let delisted = save(&listing, delisted, deps).await?;

        info!(listing_id = %listing_id, by = %principal.account_id, "Listing delisted");
        Ok(delisted)
    })
    .await
}
