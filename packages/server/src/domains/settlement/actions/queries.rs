use crate::common::{AccountId, Action, IntentId, MarketError, MarketResult, Principal};
use crate::domains::settlement::models::PurchaseIntent;
use crate::kernel::ServerDeps;

/// Fetch an intent as its buyer or an admin
pub async fn get_intent(
    principal: &Principal,
    intent_id: IntentId,
    deps: &ServerDeps,
) -> MarketResult<PurchaseIntent> {
    let intent = deps
        .store
        .intent(intent_id)
        .await?
        .ok_or_else(|| MarketError::not_found(format!("purchase intent {}", intent_id)))?;

    principal
        .actor()
        .can(Action::ViewPurchase)
        .on(intent.buyer_id)
        .check()?;

    Ok(intent)
}

pub async fn list_for_buyer(
    principal: &Principal,
    buyer: AccountId,
    deps: &ServerDeps,
) -> MarketResult<Vec<PurchaseIntent>> {
    principal.actor().can(Action::ViewPurchase).on(buyer).check()?;
    Ok(deps.store.intents_by_buyer(buyer).await?)
}
