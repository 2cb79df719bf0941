//! Completion actions - settling an open intent

use chrono::Utc;
use tracing::{info, warn};

use super::settle::{check_settleable, close_blocked, settle};
use crate::common::{Action, IntentId, MarketError, MarketResult, Principal};
use crate::domains::settlement::models::{IntentStatus, PaymentMethod, PurchaseIntent};
use crate::kernel::retry_on_conflict;
use crate::kernel::store::{Commit, CommitError, Guard, Write};
use crate::kernel::ServerDeps;

async fn load(intent_id: IntentId, deps: &ServerDeps) -> MarketResult<PurchaseIntent> {
    deps.store
        .intent(intent_id)
        .await?
        .ok_or_else(|| MarketError::not_found(format!("purchase intent {}", intent_id)))
}

/// Buyer-facing completion: pick the payment method for an intent
pub async fn complete_purchase(
    principal: &Principal,
    intent_id: IntentId,
    method: PaymentMethod,
    deps: &ServerDeps,
) -> MarketResult<PurchaseIntent> {
    let intent = load(intent_id, deps).await?;
    principal
        .actor()
        .can(Action::CompletePurchase)
        .on(intent.buyer_id)
        .check()?;

    match method {
        PaymentMethod::Wallet => complete_with_wallet_funds(intent_id, deps).await,
        PaymentMethod::External => complete_with_external_payment(intent_id, deps).await,
    }
}

/// Settle an intent from the buyer's wallet in one atomic commit.
///
/// Insufficient funds fail the intent and leave listing and balances as they
/// were. A lost race re-reads and tries again; once the listing is gone the
/// caller gets `InvalidState`.
pub async fn complete_with_wallet_funds(
    intent_id: IntentId,
    deps: &ServerDeps,
) -> MarketResult<PurchaseIntent> {
    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let intent = load(intent_id, deps).await?;
        let listing = deps.store.listing(intent.listing_id).await?;

        if let Err(blocker) = check_settleable(&intent, listing.as_ref(), Utc::now()) {
            close_blocked(&intent, &blocker, deps).await?;
            return Err(blocker.into_error(&intent));
        }
        let Some(listing) = listing else {
            return Err(MarketError::not_found(format!("listing {}", intent.listing_id)));
        };

        let settlement = settle(&intent, &listing, &deps.settings)?;
        match deps.store.commit(settlement.commit).await {
            Ok(()) => {
                info!(
                    intent_id = %intent_id,
                    listing_id = %listing.id,
                    buyer_id = %intent.buyer_id,
                    seller_id = %intent.seller_id,
                    price = intent.price,
                    "Purchase settled from wallet"
                );
                Ok(settlement.completed)
            }
            Err(CommitError::InsufficientFunds {
                account_id,
                balance,
                requested,
            }) => {
                let failed = intent.fail("insufficient wallet funds")?;
                deps.store
                    .commit(
                        Commit::new()
                            .guard(Guard::intent(&intent))
                            .write(Write::PutIntent(failed)),
                    )
                    .await?;

                warn!(
                    intent_id = %intent_id,
                    account_id = %account_id,
                    balance,
                    requested,
                    "Purchase failed on insufficient funds"
                );
                Err(MarketError::InsufficientFunds {
                    account_id,
                    balance,
                    requested,
                })
            }
            Err(e) => Err(e.into()),
        }
    })
    .await
}

/// Park an intent until the payment provider calls back
pub async fn complete_with_external_payment(
    intent_id: IntentId,
    deps: &ServerDeps,
) -> MarketResult<PurchaseIntent> {
    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let intent = load(intent_id, deps).await?;
        let listing = deps.store.listing(intent.listing_id).await?;

        if let Err(blocker) = check_settleable(&intent, listing.as_ref(), Utc::now()) {
            close_blocked(&intent, &blocker, deps).await?;
            return Err(blocker.into_error(&intent));
        }
        if intent.status != IntentStatus::Pending {
            return Err(MarketError::invalid_state(format!(
                "purchase intent {} is already {}",
                intent_id, intent.status
            )));
        }

        let awaiting = intent.transition(IntentStatus::AwaitingPayment)?;
        deps.store
            .commit(
                Commit::new()
                    .guard(Guard::intent(&intent))
                    .write(Write::PutIntent(awaiting.clone())),
            )
            .await?;

        info!(intent_id = %intent_id, expires_at = %awaiting.expires_at, "Awaiting external payment");
        Ok(awaiting)
    })
    .await
}
