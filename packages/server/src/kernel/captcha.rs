//! Ephemeral CAPTCHA challenge store.
//!
//! Challenge *generation* (the image or puzzle) happens elsewhere; this store
//! only remembers the expected answer for a bounded time. Entries are evicted
//! when read after expiry and by the periodic sweep, so the map stays bounded
//! by the issue rate times the TTL.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::common::ChallengeId;
use crate::kernel::BaseCaptchaOracle;

struct Challenge {
    answer: String,
    expires_at: DateTime<Utc>,
}

pub struct ChallengeStore {
    ttl: Duration,
    challenges: Mutex<HashMap<ChallengeId, Challenge>>,
}

impl ChallengeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            challenges: Mutex::new(HashMap::new()),
        }
    }

    /// Remember the expected answer for a freshly generated challenge
    pub async fn issue(&self, answer: impl Into<String>) -> ChallengeId {
        let id = ChallengeId::new();
        let challenge = Challenge {
            answer: answer.into(),
            expires_at: Utc::now() + self.ttl,
        };
        self.challenges.lock().await.insert(id, challenge);
        id
    }

    /// Drop every challenge expired at `now`; returns how many went
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut challenges = self.challenges.lock().await;
        let before = challenges.len();
        challenges.retain(|_, challenge| challenge.expires_at > now);
        before - challenges.len()
    }

    pub async fn len(&self) -> usize {
        self.challenges.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BaseCaptchaOracle for ChallengeStore {
    async fn verify(&self, challenge_id: ChallengeId, answer: &str) -> bool {
        // Single use: the challenge is gone whatever the outcome
        let Some(challenge) = self.challenges.lock().await.remove(&challenge_id) else {
            return false;
        };

        if challenge.expires_at <= Utc::now() {
            tracing::debug!(challenge_id = %challenge_id, "CAPTCHA challenge expired");
            return false;
        }

        challenge.answer.trim().eq_ignore_ascii_case(answer.trim())
    }
}
