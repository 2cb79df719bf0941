use crate::common::{AccountId, ListingId, MarketError, MarketResult};
use crate::domains::listings::models::{DomainListing, ListingStatus};
use crate::kernel::ServerDeps;

pub async fn get_listing(listing_id: ListingId, deps: &ServerDeps) -> MarketResult<DomainListing> {
    deps.store
        .listing(listing_id)
        .await?
        .ok_or_else(|| MarketError::not_found(format!("listing {}", listing_id)))
}

/// Review queue (`pending_review`) or public catalogue (`approved`), oldest first
pub async fn list_by_status(
    status: ListingStatus,
    deps: &ServerDeps,
) -> MarketResult<Vec<DomainListing>> {
    Ok(deps.store.listings_by_status(status).await?)
}

pub async fn list_by_owner(
    owner: AccountId,
    deps: &ServerDeps,
) -> MarketResult<Vec<DomainListing>> {
    Ok(deps.store.listings_by_owner(owner).await?)
}
