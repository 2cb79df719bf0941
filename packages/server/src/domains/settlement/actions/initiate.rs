use tracing::info;

use crate::common::{Action, ListingId, MarketError, MarketResult, Principal};
use crate::domains::listings::models::ListingStatus;
use crate::domains::settlement::models::PurchaseIntent;
use crate::kernel::retry_on_conflict;
use crate::kernel::store::{Commit, Guard, Write};
use crate::kernel::ServerDeps;

/// Open a purchase intent on an approved listing.
///
/// The price is snapshotted from the listing; later price changes do not
/// affect this intent. The intent stays open for the configured TTL.
pub async fn initiate_purchase(
    principal: &Principal,
    listing_id: ListingId,
    deps: &ServerDeps,
) -> MarketResult<PurchaseIntent> {
    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let listing = deps
            .store
            .listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("listing {}", listing_id)))?;

        principal
            .actor()
            .can(Action::PurchaseListing)
            .on(listing.owner_id)
            .check()?;

        if listing.status != ListingStatus::Approved {
            return Err(MarketError::invalid_state(format!(
                "listing {} is {}, only approved listings can be purchased",
                listing_id, listing.status
            )));
        }

        if deps.store.account(principal.account_id).await?.is_none() {
            return Err(MarketError::not_found(format!(
                "account {}",
                principal.account_id
            )));
        }

        let intent = PurchaseIntent::new(
            listing.id,
            principal.account_id,
            listing.owner_id,
            listing.asking_price,
            deps.settings.intent_ttl,
        );

        deps.store
            .commit(
                Commit::new()
                    .guard(Guard::listing(&listing))
                    .write(Write::PutIntent(intent.clone())),
            )
            .await?;

        info!(
            intent_id = %intent.id,
            listing_id = %listing_id,
            buyer_id = %intent.buyer_id,
            price = intent.price,
            expires_at = %intent.expires_at,
            "Purchase intent opened"
        );
        Ok(intent)
    })
    .await
}
