//! Payment callback intake
//!
//! Every accepted callback credits the wallet exactly once. The dedup record
//! is written in the same commit as the credit, so a replay either finds the
//! record or loses the `PaymentUnseen` guard and nothing is applied twice.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::common::{MarketError, MarketResult};
use crate::domains::ledger::models::{EntryKind, LedgerEntry};
use crate::domains::payments::models::{
    PaymentAck, PaymentCallback, PaymentOutcome, ProcessedPayment, ReconciliationItem,
};
use crate::domains::settlement::actions::settle::{check_settleable, close_for, settle, Blocker};
use crate::domains::settlement::models::PurchaseIntent;
use crate::kernel::retry_on_conflict;
use crate::kernel::store::{Commit, CommitError, Guard, Write};
use crate::kernel::ServerDeps;

fn validate(callback: &PaymentCallback) -> MarketResult<()> {
    if callback.external_tx_id.trim().is_empty() {
        return Err(MarketError::validation("external transaction id is required"));
    }
    if callback.amount <= 0 {
        return Err(MarketError::validation(format!(
            "payment amount must be positive, got {}",
            callback.amount
        )));
    }
    Ok(())
}

/// Apply a payment provider callback and return its acknowledgement.
///
/// Replays of an already processed transaction id return the stored ack and
/// change nothing. When the callback names a purchase intent that can still
/// settle, the credit and the settlement commit together. Otherwise the
/// credit stays in the wallet and a reconciliation item is opened.
pub async fn receive_payment(
    callback: PaymentCallback,
    deps: &ServerDeps,
) -> MarketResult<PaymentAck> {
    validate(&callback)?;

    if let Some(processed) = deps.store.processed_payment(&callback.external_tx_id).await? {
        debug!(external_tx_id = %callback.external_tx_id, "Duplicate payment callback, replaying ack");
        return Ok(processed.ack);
    }

    let callback = &callback;
    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        match callback.intent_id {
            None => top_up(callback, deps).await,
            Some(intent_id) => match deps.store.intent(intent_id).await? {
                None => flag(callback, None, None, "purchase intent not found", deps).await,
                Some(intent) => apply_to_intent(callback, intent, deps).await,
            },
        }
    })
    .await
}

fn credit_entry(callback: &PaymentCallback) -> LedgerEntry {
    LedgerEntry::credit(
        callback.account_id,
        callback.amount,
        EntryKind::Topup,
        &callback.external_tx_id,
    )
}

fn ack(callback: &PaymentCallback, entry: &LedgerEntry, outcome: PaymentOutcome) -> PaymentAck {
    PaymentAck {
        external_tx_id: callback.external_tx_id.clone(),
        account_id: callback.account_id,
        credited: callback.amount,
        entry_id: entry.id,
        outcome,
    }
}

/// Commit, treating a lost dedup guard as a replay of the stored ack
async fn commit_once(
    commit: Commit,
    callback: &PaymentCallback,
    fresh: PaymentAck,
    deps: &ServerDeps,
) -> Result<PaymentAck, CommitError> {
    match deps.store.commit(commit).await {
        Ok(()) => Ok(fresh),
        Err(CommitError::GuardFailed(Guard::PaymentUnseen { external_tx_id })) => {
            debug!(external_tx_id = %external_tx_id, "Payment callback raced a replay");
            match deps.store.processed_payment(&callback.external_tx_id).await? {
                Some(processed) => Ok(processed.ack),
                None => Err(CommitError::Contended(format!(
                    "dedup record for {} vanished",
                    external_tx_id
                ))),
            }
        }
        Err(e) => Err(e),
    }
}

async fn top_up(callback: &PaymentCallback, deps: &ServerDeps) -> MarketResult<PaymentAck> {
    let entry = credit_entry(callback);
    let fresh = ack(callback, &entry, PaymentOutcome::TopUp);

    let commit = Commit::new()
        .guard(Guard::payment_unseen(&callback.external_tx_id))
        .write(Write::AppendEntry(entry))
        .write(Write::RecordPayment(ProcessedPayment::new(fresh.clone())));

    let ack = commit_once(commit, callback, fresh, deps).await?;
    info!(
        external_tx_id = %callback.external_tx_id,
        account_id = %callback.account_id,
        amount = callback.amount,
        "Wallet topped up from payment callback"
    );
    Ok(ack)
}

async fn apply_to_intent(
    callback: &PaymentCallback,
    intent: PurchaseIntent,
    deps: &ServerDeps,
) -> MarketResult<PaymentAck> {
    if intent.buyer_id != callback.account_id {
        let reason = "payment account does not match intent buyer";
        return flag(callback, Some(&intent), None, reason, deps).await;
    }

    let listing = deps.store.listing(intent.listing_id).await?;
    if let Err(blocker) = check_settleable(&intent, listing.as_ref(), Utc::now()) {
        let closed = match blocker {
            Blocker::Closed(_) => None,
            _ => Some(close_for(&intent, &blocker)?),
        };
        return flag(callback, Some(&intent), closed, &blocker.reason(), deps).await;
    }
    let Some(listing) = listing else {
        return Err(MarketError::not_found(format!("listing {}", intent.listing_id)));
    };

    let mut paying = intent.clone();
    paying.external_payment_ref = Some(callback.external_tx_id.clone());
    let settlement = settle(&paying, &listing, &deps.settings)?;

    let entry = credit_entry(callback);
    let fresh = ack(
        callback,
        &entry,
        PaymentOutcome::PurchaseCompleted { intent_id: intent.id },
    );

    // Credit first so the buyer debit sees the incoming funds
    let mut commit = settlement
        .commit
        .guard(Guard::payment_unseen(&callback.external_tx_id));
    commit.writes.insert(0, Write::AppendEntry(entry));
    let commit = commit.write(Write::RecordPayment(ProcessedPayment::new(fresh.clone())));

    match commit_once(commit, callback, fresh, deps).await {
        Ok(ack) => {
            info!(
                external_tx_id = %callback.external_tx_id,
                intent_id = %intent.id,
                listing_id = %listing.id,
                price = intent.price,
                "Purchase settled from payment callback"
            );
            Ok(ack)
        }
        Err(CommitError::InsufficientFunds {
            balance, requested, ..
        }) => {
            let reason = format!(
                "balance {} short of price {} after crediting {}",
                balance, requested, callback.amount
            );
            let failed = intent.fail(reason.as_str())?;
            flag(callback, Some(&intent), Some(failed), &reason, deps).await
        }
        // A settlement leg points at a wallet that was never opened
        Err(CommitError::UnknownAccount(account_id)) if account_id != callback.account_id => {
            let reason = format!("settlement account {} does not exist", account_id);
            let failed = intent.fail(reason.as_str())?;
            flag(callback, Some(&intent), Some(failed), &reason, deps).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Keep the credit as a top-up and queue the payment for an operator.
///
/// `closed` is the intent revision to persist alongside, guarded on the
/// version of `intent` that was read.
async fn flag(
    callback: &PaymentCallback,
    intent: Option<&PurchaseIntent>,
    closed: Option<PurchaseIntent>,
    reason: &str,
    deps: &ServerDeps,
) -> MarketResult<PaymentAck> {
    let intent_id = intent.map(|intent| intent.id);
    let entry = credit_entry(callback);
    let entry_id = entry.id;
    let item = ReconciliationItem::open(
        &callback.external_tx_id,
        callback.account_id,
        callback.amount,
        intent_id,
        reason,
    );
    let fresh = ack(
        callback,
        &entry,
        PaymentOutcome::Flagged {
            intent_id,
            item_id: item.id,
            reason: reason.to_string(),
        },
    );

    let mut commit = Commit::new().guard(Guard::payment_unseen(&callback.external_tx_id));
    if let (Some(read), Some(closed)) = (intent, closed) {
        commit = commit
            .guard(Guard::intent(read))
            .write(Write::PutIntent(closed));
    }
    let commit = commit
        .write(Write::AppendEntry(entry))
        .write(Write::PutReconciliation(item.clone()))
        .write(Write::RecordPayment(ProcessedPayment::new(fresh.clone())));

    let ack = commit_once(commit, callback, fresh, deps).await?;
    if ack.entry_id == entry_id {
        warn!(
            external_tx_id = %callback.external_tx_id,
            account_id = %callback.account_id,
            amount = callback.amount,
            intent_id = ?intent_id,
            item_id = %item.id,
            reason,
            "Payment kept as top-up, reconciliation item opened"
        );
    }
    Ok(ack)
}
