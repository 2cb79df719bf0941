//! Submit actions - sellers putting domains up for sale

use tracing::{debug, info, warn};

use crate::common::{Action, ListingId, MarketError, MarketResult, Principal};
use crate::domains::listings::models::{DomainListing, ListingDraft, ListingStatus};
use crate::kernel::retry_on_conflict;
use crate::kernel::store::{Commit, Guard, Write};
use crate::kernel::ServerDeps;

/// Best-effort authority lookup; never fails the caller
async fn lookup_authority(domain: &str, deps: &ServerDeps) -> Option<f64> {
    match deps.authority.score(domain).await {
        Ok(score) => {
            debug!(domain, ?score, "Authority score lookup");
            score
        }
        Err(e) => {
            warn!(domain, error = %e, "Authority score lookup failed, listing without score");
            None
        }
    }
}

async fn create(
    principal: &Principal,
    draft: ListingDraft,
    status: ListingStatus,
    deps: &ServerDeps,
) -> MarketResult<DomainListing> {
    let draft = draft.normalized()?;
    if deps.store.account(principal.account_id).await?.is_none() {
        return Err(MarketError::not_found(format!(
            "account {}",
            principal.account_id
        )));
    }
    let score = lookup_authority(&draft.name, deps).await;

    let mut listing = DomainListing::new(principal.account_id, draft, status);
    listing.metadata.authority_score = score;

    deps.store
        .commit(Commit::new().write(Write::PutListing(listing.clone())))
        .await?;

    info!(
        listing_id = %listing.id,
        owner_id = %listing.owner_id,
        domain = %listing.metadata.name,
        status = %listing.status,
        asking_price = listing.asking_price,
        "Listing created"
    );
    Ok(listing)
}

/// Submit a new listing straight into the review queue
pub async fn submit_listing(
    principal: &Principal,
    draft: ListingDraft,
    deps: &ServerDeps,
) -> MarketResult<DomainListing> {
    principal.actor().can(Action::SubmitListing).check()?;
    create(principal, draft, ListingStatus::PendingReview, deps).await
}

/// Save a listing without sending it to review yet
pub async fn save_draft(
    principal: &Principal,
    draft: ListingDraft,
    deps: &ServerDeps,
) -> MarketResult<DomainListing> {
    principal.actor().can(Action::SubmitListing).check()?;
    create(principal, draft, ListingStatus::Draft, deps).await
}

/// Move one of the caller's drafts into the review queue
pub async fn submit_draft(
    principal: &Principal,
    listing_id: ListingId,
    deps: &ServerDeps,
) -> MarketResult<DomainListing> {
    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let listing = deps
            .store
            .listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("listing {}", listing_id)))?;

        principal
            .actor()
            .can(Action::SubmitDraft)
            .on(listing.owner_id)
            .check()?;

        let submitted = listing.transition(ListingStatus::PendingReview)?;
        deps.store
            .commit(
                Commit::new()
                    .guard(Guard::listing(&listing))
                    .write(Write::PutListing(submitted.clone())),
            )
            .await?;

        info!(listing_id = %listing_id, "Draft submitted for review");
        Ok(submitted)
    })
    .await
}
