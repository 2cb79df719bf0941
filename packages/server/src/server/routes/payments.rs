use axum::{extract::Extension, http::HeaderMap, Json};

use crate::common::MarketError;
use crate::domains::payments::{PaymentAck, PaymentCallback};
use crate::server::app::AppState;
use crate::server::error::ApiResult;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Length-independent comparison so the secret can't be probed byte by byte
fn secrets_match(expected: &str, presented: &str) -> bool {
    let expected = expected.as_bytes();
    let presented = presented.as_bytes();
    let mut diff = expected.len() ^ presented.len();
    for (i, byte) in expected.iter().enumerate() {
        diff |= (byte ^ presented.get(i).copied().unwrap_or(0)) as usize;
    }
    diff == 0
}

/// POST /payments/callback - payment provider webhook
///
/// Duplicates are acknowledged with the original response.
pub async fn payment_callback_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(callback): Json<PaymentCallback>,
) -> ApiResult<Json<PaymentAck>> {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !secrets_match(&state.webhook_secret, presented) {
        tracing::warn!("Payment callback rejected: bad webhook secret");
        return Err(MarketError::Unauthenticated.into());
    }

    Ok(Json(state.market.receive_payment_callback(callback).await?))
}
