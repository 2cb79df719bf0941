use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;

use crate::common::ReconciliationId;
use crate::domains::payments::{ReconciliationItem, Resolution};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthPrincipal;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolution: Resolution,
}

/// GET /admin/reconciliation - open items, oldest first
pub async fn open_items_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<Json<Vec<ReconciliationItem>>> {
    Ok(Json(state.market.open_reconciliation_items(&principal).await?))
}

/// POST /admin/reconciliation/:id/resolve
pub async fn resolve_item_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(item_id): Path<ReconciliationId>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<ReconciliationItem>> {
    let item = state
        .market
        .resolve_reconciliation(&principal, item_id, request.resolution)
        .await?;
    Ok(Json(item))
}
