use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::common::MarketResult;
use crate::domains::settlement::models::IntentStatus;
use crate::kernel::store::{Commit, CommitError, Guard, Write};
use crate::kernel::ServerDeps;

/// Expire every open intent whose deadline is at or before `now`.
///
/// Each expiry is its own guarded commit. An intent that moved in the
/// meantime is skipped, so running the sweep twice is harmless. Returns how
/// many intents this run expired.
pub async fn sweep_expired(now: DateTime<Utc>, deps: &ServerDeps) -> MarketResult<usize> {
    let due = deps.store.open_intents_expiring_by(now).await?;
    let mut expired = 0;

    for intent in due {
        let next = intent.transition(IntentStatus::Expired)?;
        let commit = Commit::new()
            .guard(Guard::intent(&intent))
            .write(Write::PutIntent(next));

        match deps.store.commit(commit).await {
            Ok(()) => {
                debug!(intent_id = %intent.id, expires_at = %intent.expires_at, "Intent expired");
                expired += 1;
            }
            Err(CommitError::GuardFailed(_)) | Err(CommitError::Contended(_)) => {
                debug!(intent_id = %intent.id, "Intent changed during sweep, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if expired > 0 {
        info!(expired, "Expired stale purchase intents");
    }
    Ok(expired)
}
