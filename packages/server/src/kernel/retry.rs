use std::future::Future;

use tracing::debug;

use crate::common::{MarketError, MarketResult};

/// Run `attempt` until it stops losing commit races, at most `limit` times.
///
/// Each attempt must re-read whatever state it guards on. Only
/// `MarketError::Conflict` is retried; the final conflict is returned as is.
pub async fn retry_on_conflict<T, F, Fut>(limit: u32, mut attempt: F) -> MarketResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MarketResult<T>>,
{
    let limit = limit.max(1);
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt().await {
            Err(MarketError::Conflict(reason)) if tries < limit => {
                debug!(attempt = tries, reason = %reason, "Commit lost a race, retrying");
            }
            outcome => return outcome,
        }
    }
}
