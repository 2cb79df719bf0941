use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::common::{IntentId, ListingId};
use crate::domains::settlement::{PaymentMethod, PurchaseIntent};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthPrincipal;

#[derive(Debug, Deserialize)]
pub struct InitiatePurchaseRequest {
    pub listing_id: ListingId,
}

#[derive(Debug, Deserialize)]
pub struct CompletePurchaseRequest {
    pub method: PaymentMethod,
}

/// POST /purchases - open a purchase intent on an approved listing
pub async fn initiate_purchase_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<InitiatePurchaseRequest>,
) -> ApiResult<(StatusCode, Json<PurchaseIntent>)> {
    let intent = state
        .market
        .initiate_purchase(&principal, request.listing_id)
        .await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

/// POST /purchases/:id/complete - settle from wallet or wait for the provider
pub async fn complete_purchase_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(intent_id): Path<IntentId>,
    Json(request): Json<CompletePurchaseRequest>,
) -> ApiResult<Json<PurchaseIntent>> {
    let intent = state
        .market
        .complete_purchase(&principal, intent_id, request.method)
        .await?;
    Ok(Json(intent))
}

/// GET /purchases/:id
pub async fn get_purchase_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(intent_id): Path<IntentId>,
) -> ApiResult<Json<PurchaseIntent>> {
    Ok(Json(state.market.get_purchase(&principal, intent_id).await?))
}
