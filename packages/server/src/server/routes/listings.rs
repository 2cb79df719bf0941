use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::common::{Action, ChallengeId, ListingId, MarketError};
use crate::domains::listings::{DomainListing, ListingDraft, ListingStatus, ReviewDecision};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthPrincipal;

#[derive(Debug, Deserialize)]
pub struct CaptchaAnswer {
    pub challenge_id: ChallengeId,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitListingRequest {
    pub name: String,
    pub description: String,
    pub asking_price: i64,
    pub captcha: CaptchaAnswer,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub status: Option<ListingStatus>,
}

/// POST /listings - seller submits a domain for review (CAPTCHA required)
pub async fn submit_listing_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<SubmitListingRequest>,
) -> ApiResult<(StatusCode, Json<DomainListing>)> {
    let passed = state
        .market
        .deps()
        .captcha
        .verify(request.captcha.challenge_id, &request.captcha.answer)
        .await;
    if !passed {
        return Err(MarketError::validation("CAPTCHA verification failed").into());
    }

    let draft = ListingDraft {
        name: request.name,
        description: request.description,
        asking_price: request.asking_price,
    };
    let listing = state.market.submit_listing(&principal, draft).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// GET /listings - public catalogue; other statuses are admin only
pub async fn list_listings_handler(
    Extension(state): Extension<AppState>,
    principal: Option<AuthPrincipal>,
    Query(query): Query<ListingQuery>,
) -> ApiResult<Json<Vec<DomainListing>>> {
    let status = query.status.unwrap_or(ListingStatus::Approved);
    if status != ListingStatus::Approved {
        // Anything beyond the catalogue is the review queue
        let Some(AuthPrincipal(principal)) = principal else {
            return Err(MarketError::Unauthenticated.into());
        };
        principal.actor().can(Action::ReviewListing).check()?;
    }
    Ok(Json(state.market.listings_by_status(status).await?))
}

/// GET /listings/:id
pub async fn get_listing_handler(
    Extension(state): Extension<AppState>,
    Path(listing_id): Path<ListingId>,
) -> ApiResult<Json<DomainListing>> {
    Ok(Json(state.market.get_listing(listing_id).await?))
}

/// POST /listings/:id/review - admin approves or rejects
pub async fn review_listing_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(listing_id): Path<ListingId>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<DomainListing>> {
    let listing = state
        .market
        .review_listing(&principal, listing_id, request.decision, request.reason)
        .await?;
    Ok(Json(listing))
}

/// POST /listings/:id/delist - owner or admin withdraws a listing
pub async fn delist_listing_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(listing_id): Path<ListingId>,
) -> ApiResult<Json<DomainListing>> {
    Ok(Json(state.market.delist_listing(&principal, listing_id).await?))
}
