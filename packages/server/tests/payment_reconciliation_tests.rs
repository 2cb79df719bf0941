//! Integration tests for payment callbacks, deduplication and the
//! reconciliation queue.

mod common;

use chrono::{Duration, Utc};
use futures::future::join_all;
use market_core::common::{AccountId, IntentId, MarketError};
use market_core::domains::listings::{DomainListing, ListingDraft};
use market_core::kernel::store::{Commit, Write};
use market_core::kernel::BaseStore;
use market_core::domains::listings::ListingStatus;
use market_core::domains::payments::{
    PaymentCallback, PaymentOutcome, ReconciliationStatus, Resolution,
};
use market_core::domains::settlement::{IntentStatus, PaymentMethod};
use test_context::test_context;

use crate::common::{approved_listing, balance, open_buyer, open_seller, TestHarness};

fn callback(tx: &str, account_id: AccountId, amount: i64) -> PaymentCallback {
    PaymentCallback {
        external_tx_id: tx.to_string(),
        account_id,
        amount,
        intent_id: None,
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn duplicate_callback_credits_once(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();

    let first = ctx
        .market
        .receive_payment_callback(callback("tx-1", buyer.account_id, 400))
        .await
        .unwrap();
    let replay = ctx
        .market
        .receive_payment_callback(callback("tx-1", buyer.account_id, 400))
        .await
        .unwrap();

    assert_eq!(first.outcome, PaymentOutcome::TopUp);
    assert_eq!(first, replay);
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 400);
    assert_eq!(
        ctx.market
            .ledger_entries(&buyer, buyer.account_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_replays_credit_once(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();

    let deliveries = (0..6).map(|_| {
        let market = ctx.market.clone();
        let account_id = buyer.account_id;
        tokio::spawn(async move {
            market
                .receive_payment_callback(callback("tx-storm", account_id, 250))
                .await
        })
    });
    let acks: Vec<_> = join_all(deliveries)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(acks.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 250);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn malformed_callbacks_are_rejected(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();

    let empty_tx = ctx
        .market
        .receive_payment_callback(callback("  ", buyer.account_id, 100))
        .await;
    assert!(matches!(empty_tx, Err(MarketError::Validation(_))));

    let negative = ctx
        .market
        .receive_payment_callback(callback("tx-neg", buyer.account_id, -5))
        .await;
    assert!(matches!(negative, Err(MarketError::Validation(_))));

    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn callback_for_awaiting_intent_settles_purchase(ctx: &TestHarness) {
    let seller = open_seller(&ctx.market).await.unwrap();
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let listing = approved_listing(&ctx.market, &ctx.admin, &seller, "paid.com", 600)
        .await
        .unwrap();
    let intent = ctx.market.initiate_purchase(&buyer, listing.id).await.unwrap();
    ctx.market
        .complete_purchase(&buyer, intent.id, PaymentMethod::External)
        .await
        .unwrap();

    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(intent.id),
            ..callback("tx-card-1", buyer.account_id, 600)
        })
        .await
        .unwrap();
    assert_eq!(
        ack.outcome,
        PaymentOutcome::PurchaseCompleted { intent_id: intent.id }
    );

    let completed = ctx.market.get_purchase(&buyer, intent.id).await.unwrap();
    assert_eq!(completed.status, IntentStatus::Completed);
    assert_eq!(completed.external_payment_ref.as_deref(), Some("tx-card-1"));

    let sold = ctx.market.get_listing(listing.id).await.unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.owner_id, buyer.account_id);
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 0);
    assert_eq!(balance(&ctx.market, seller.account_id).await.unwrap(), 600);
    assert!(ctx
        .market
        .open_reconciliation_items(&ctx.admin)
        .await
        .unwrap()
        .is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn late_callback_after_expiry_becomes_top_up_and_is_flagged(ctx: &TestHarness) {
    let seller = open_seller(&ctx.market).await.unwrap();
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let listing = approved_listing(&ctx.market, &ctx.admin, &seller, "late.net", 500)
        .await
        .unwrap();
    let intent = ctx.market.initiate_purchase(&buyer, listing.id).await.unwrap();
    ctx.market
        .complete_purchase(&buyer, intent.id, PaymentMethod::External)
        .await
        .unwrap();

    let swept = ctx
        .market
        .sweep_expired(Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(swept, 1);

    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(intent.id),
            ..callback("tx-1", buyer.account_id, 500)
        })
        .await
        .unwrap();

    let item_id = match &ack.outcome {
        PaymentOutcome::Flagged {
            intent_id, item_id, ..
        } => {
            assert_eq!(*intent_id, Some(intent.id));
            *item_id
        }
        other => panic!("expected flagged outcome, got {:?}", other),
    };

    // Funds stay in the wallet; listing untouched
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 500);
    let listing = ctx.market.get_listing(listing.id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Approved);
    assert_eq!(listing.owner_id, seller.account_id);

    let items = ctx.market.open_reconciliation_items(&ctx.admin).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, item_id);
    assert_eq!(items[0].external_tx_id, "tx-1");
    assert_eq!(items[0].amount, 500);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn callback_for_unknown_intent_is_flagged(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();

    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(IntentId::new()),
            ..callback("tx-ghost", buyer.account_id, 75)
        })
        .await
        .unwrap();

    assert!(matches!(
        ack.outcome,
        PaymentOutcome::Flagged { intent_id: None, .. }
    ));
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 75);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn callback_from_wrong_account_keeps_intent_open(ctx: &TestHarness) {
    let seller = open_seller(&ctx.market).await.unwrap();
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let stranger = open_buyer(&ctx.market, 0).await.unwrap();
    let listing = approved_listing(&ctx.market, &ctx.admin, &seller, "mixup.org", 300)
        .await
        .unwrap();
    let intent = ctx.market.initiate_purchase(&buyer, listing.id).await.unwrap();

    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(intent.id),
            ..callback("tx-mixup", stranger.account_id, 300)
        })
        .await
        .unwrap();

    assert!(matches!(ack.outcome, PaymentOutcome::Flagged { .. }));
    assert_eq!(balance(&ctx.market, stranger.account_id).await.unwrap(), 300);

    let still_open = ctx.market.get_purchase(&buyer, intent.id).await.unwrap();
    assert_eq!(still_open.status, IntentStatus::Pending);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn underpaid_callback_fails_intent_and_keeps_credit(ctx: &TestHarness) {
    let seller = open_seller(&ctx.market).await.unwrap();
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let listing = approved_listing(&ctx.market, &ctx.admin, &seller, "short.io", 1_000)
        .await
        .unwrap();
    let intent = ctx.market.initiate_purchase(&buyer, listing.id).await.unwrap();

    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(intent.id),
            ..callback("tx-short", buyer.account_id, 400)
        })
        .await
        .unwrap();

    assert!(matches!(ack.outcome, PaymentOutcome::Flagged { .. }));
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 400);

    let failed = ctx.market.get_purchase(&buyer, intent.id).await.unwrap();
    assert_eq!(failed.status, IntentStatus::Failed);
    assert_eq!(
        ctx.market.get_listing(listing.id).await.unwrap().status,
        ListingStatus::Approved
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn refund_resolution_debits_the_flagged_amount(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(IntentId::new()),
            ..callback("tx-refund", buyer.account_id, 120)
        })
        .await
        .unwrap();
    let PaymentOutcome::Flagged { item_id, .. } = ack.outcome else {
        panic!("expected flagged outcome");
    };

    let forbidden = ctx
        .market
        .resolve_reconciliation(&buyer, item_id, Resolution::Refund)
        .await;
    assert!(matches!(forbidden, Err(MarketError::Forbidden(_))));

    let resolved = ctx
        .market
        .resolve_reconciliation(&ctx.admin, item_id, Resolution::Refund)
        .await
        .unwrap();
    assert_eq!(resolved.status, ReconciliationStatus::Refunded);
    assert_eq!(resolved.resolved_by, Some(ctx.admin.account_id));
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 0);
    assert!(ctx.market.verify_balance(buyer.account_id).await.unwrap());

    // Resolved items leave the queue and cannot be resolved twice
    assert!(ctx
        .market
        .open_reconciliation_items(&ctx.admin)
        .await
        .unwrap()
        .is_empty());
    let again = ctx
        .market
        .resolve_reconciliation(&ctx.admin, item_id, Resolution::Acknowledge)
        .await;
    assert!(matches!(again, Err(MarketError::InvalidState(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn acknowledge_resolution_keeps_funds(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(IntentId::new()),
            ..callback("tx-keep", buyer.account_id, 90)
        })
        .await
        .unwrap();
    let PaymentOutcome::Flagged { item_id, .. } = ack.outcome else {
        panic!("expected flagged outcome");
    };

    let resolved = ctx
        .market
        .resolve_reconciliation(&ctx.admin, item_id, Resolution::Acknowledge)
        .await
        .unwrap();
    assert_eq!(resolved.status, ReconciliationStatus::Acknowledged);
    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 90);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn pruned_dedup_records_fall_outside_retention(ctx: &TestHarness) {
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    ctx.market
        .receive_payment_callback(callback("tx-old", buyer.account_id, 10))
        .await
        .unwrap();

    // Inside the retention window nothing is pruned
    assert_eq!(ctx.market.prune_processed(Utc::now()).await.unwrap(), 0);

    let far_future = Utc::now() + Duration::days(365);
    assert_eq!(ctx.market.prune_processed(far_future).await.unwrap(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn callback_after_admin_revocation_is_kept_and_flagged(ctx: &TestHarness) {
    let seller = open_seller(&ctx.market).await.unwrap();
    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let listing = approved_listing(&ctx.market, &ctx.admin, &seller, "pulled.io", 500)
        .await
        .unwrap();
    let intent = ctx.market.initiate_purchase(&buyer, listing.id).await.unwrap();
    ctx.market
        .complete_purchase(&buyer, intent.id, PaymentMethod::External)
        .await
        .unwrap();

    ctx.market.delist_listing(&ctx.admin, listing.id).await.unwrap();

    let ack = ctx
        .market
        .receive_payment_callback(PaymentCallback {
            intent_id: Some(intent.id),
            ..callback("tx-pulled", buyer.account_id, 500)
        })
        .await
        .unwrap();
    assert!(matches!(
        ack.outcome,
        PaymentOutcome::Flagged { intent_id: Some(id), .. } if id == intent.id
    ));

    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 500);
    assert_eq!(balance(&ctx.market, seller.account_id).await.unwrap(), 0);
    let failed = ctx.market.get_purchase(&buyer, intent.id).await.unwrap();
    assert_eq!(failed.status, IntentStatus::Failed);
    assert_eq!(
        ctx.market.get_listing(listing.id).await.unwrap().status,
        ListingStatus::Delisted
    );

    let items = ctx.market.open_reconciliation_items(&ctx.admin).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_tx_id, "tx-pulled");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn callback_for_listing_with_missing_seller_wallet_is_flagged(ctx: &TestHarness) {
    // A listing whose owner never opened a wallet, written straight to the store
    let ghost_seller = AccountId::new();
    let listing = DomainListing::new(
        ghost_seller,
        ListingDraft {
            name: "ghost.com".to_string(),
            description: "Orphaned listing".to_string(),
            asking_price: 500,
        },
        ListingStatus::Approved,
    );
    ctx.store
        .commit(Commit::new().write(Write::PutListing(listing.clone())))
        .await
        .unwrap();

    let buyer = open_buyer(&ctx.market, 0).await.unwrap();
    let intent = ctx.market.initiate_purchase(&buyer, listing.id).await.unwrap();
    ctx.market
        .complete_purchase(&buyer, intent.id, PaymentMethod::External)
        .await
        .unwrap();

    let paid = PaymentCallback {
        intent_id: Some(intent.id),
        ..callback("tx-ghost", buyer.account_id, 500)
    };
    let ack = ctx.market.receive_payment_callback(paid.clone()).await.unwrap();
    assert!(matches!(ack.outcome, PaymentOutcome::Flagged { .. }));

    // The provider retrying gets the same answer
    let replay = ctx.market.receive_payment_callback(paid).await.unwrap();
    assert_eq!(ack, replay);

    assert_eq!(balance(&ctx.market, buyer.account_id).await.unwrap(), 500);
    let failed = ctx.market.get_purchase(&buyer, intent.id).await.unwrap();
    assert_eq!(failed.status, IntentStatus::Failed);
    let unsold = ctx.market.get_listing(listing.id).await.unwrap();
    assert_eq!(unsold.status, ListingStatus::Approved);
    assert_eq!(unsold.owner_id, ghost_seller);
    assert_eq!(
        ctx.market
            .open_reconciliation_items(&ctx.admin)
            .await
            .unwrap()
            .len(),
        1
    );
}

