use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::common::AccountId;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthPrincipal;

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub account_id: AccountId,
    pub balance: i64,
}

/// GET /wallet - the caller's balance
pub async fn wallet_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<Json<WalletResponse>> {
    let balance = state
        .market
        .get_balance(&principal, principal.account_id)
        .await?;
    Ok(Json(WalletResponse {
        account_id: principal.account_id,
        balance,
    }))
}

/// POST /wallet - open the caller's wallet under their token's role
pub async fn open_wallet_handler(
    Extension(state): Extension<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> ApiResult<(StatusCode, Json<WalletResponse>)> {
    let account = state
        .market
        .open_account(principal.account_id, principal.role)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(WalletResponse {
            account_id: account.id,
            balance: account.balance,
        }),
    ))
}
