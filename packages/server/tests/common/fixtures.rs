//! Test fixtures for creating marketplace state.
//!
//! These go through the `Market` facade so every fixture obeys the same
//! rules as production callers.

#![allow(dead_code)]

use anyhow::Result;
use market_core::common::{AccountId, Principal, Role};
use market_core::domains::listings::{DomainListing, ListingDraft, ReviewDecision};
use market_core::Market;

pub fn draft(name: &str, asking_price: i64) -> ListingDraft {
    ListingDraft {
        name: name.to_string(),
        description: format!("{} is for sale", name),
        asking_price,
    }
}

/// Open a wallet and fund it with `balance`
pub async fn open_wallet(market: &Market, role: Role, balance: i64) -> Result<Principal> {
    let principal = Principal::new(AccountId::new(), role);
    market.open_account(principal.account_id, role).await?;
    if balance > 0 {
        market
            .top_up(principal.account_id, balance, "fixture-funding")
            .await?;
    }
    Ok(principal)
}

pub async fn open_seller(market: &Market) -> Result<Principal> {
    open_wallet(market, Role::Seller, 0).await
}

pub async fn open_buyer(market: &Market, balance: i64) -> Result<Principal> {
    open_wallet(market, Role::Buyer, balance).await
}

/// Submit a listing and have `admin` approve it
pub async fn approved_listing(
    market: &Market,
    admin: &Principal,
    seller: &Principal,
    name: &str,
    asking_price: i64,
) -> Result<DomainListing> {
    let listing = market
        .submit_listing(seller, draft(name, asking_price))
        .await?;
    let listing = market
        .review_listing(admin, listing.id, ReviewDecision::Approve, None)
        .await?;
    Ok(listing)
}

pub async fn balance(market: &Market, account_id: AccountId) -> Result<i64> {
    let admin = Principal::new(AccountId::new(), Role::Admin);
    Ok(market.get_balance(&admin, account_id).await?)
}
