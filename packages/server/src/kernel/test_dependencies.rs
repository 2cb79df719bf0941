// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{BaseAuthorityScore, BaseCaptchaOracle, MarketSettings, MemoryStore, ServerDeps};
use crate::common::ChallengeId;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Mock Authority Score
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum ScoreBehavior {
    Score(Option<f64>),
    Fail,
}

pub struct MockAuthorityScore {
    behavior: ScoreBehavior,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAuthorityScore {
    /// Answers every lookup with `score`
    pub fn with_score(score: f64) -> Self {
        Self {
            behavior: ScoreBehavior::Score(Some(score)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider has no data for any domain
    pub fn unavailable() -> Self {
        Self {
            behavior: ScoreBehavior::Score(None),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every lookup errors out
    pub fn failing() -> Self {
        Self {
            behavior: ScoreBehavior::Fail,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Domains that were looked up, in call order
    pub fn calls(&self) -> Vec<String> {
        locked(&self.calls).clone()
    }
}

#[async_trait]
impl BaseAuthorityScore for MockAuthorityScore {
    async fn score(&self, domain: &str) -> Result<Option<f64>> {
        locked(&self.calls).push(domain.to_string());
        match self.behavior {
            ScoreBehavior::Score(score) => Ok(score),
            ScoreBehavior::Fail => Err(anyhow::anyhow!("authority provider timed out")),
        }
    }
}

// =============================================================================
// Mock CAPTCHA Oracle
// =============================================================================

/// Passes exactly the answers it was built with
pub struct MockCaptcha {
    accepted: String,
    verified: Arc<Mutex<Vec<ChallengeId>>>,
}

impl MockCaptcha {
    pub fn accepting(answer: &str) -> Self {
        Self {
            accepted: answer.to_string(),
            verified: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn verified(&self) -> Vec<ChallengeId> {
        locked(&self.verified).clone()
    }
}

#[async_trait]
impl BaseCaptchaOracle for MockCaptcha {
    async fn verify(&self, challenge_id: ChallengeId, answer: &str) -> bool {
        locked(&self.verified).push(challenge_id);
        answer == self.accepted
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Builder for a `ServerDeps` wired to in-memory and mock services
pub struct TestDependencies {
    pub store: Arc<MemoryStore>,
    pub authority: Arc<MockAuthorityScore>,
    pub captcha: Arc<MockCaptcha>,
    pub settings: MarketSettings,
}

impl TestDependencies {
    pub const CAPTCHA_ANSWER: &'static str = "pass";

    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            authority: Arc::new(MockAuthorityScore::with_score(35.0)),
            captcha: Arc::new(MockCaptcha::accepting(Self::CAPTCHA_ANSWER)),
            settings: MarketSettings::default(),
        }
    }

    pub fn mock_authority(mut self, authority: MockAuthorityScore) -> Self {
        self.authority = Arc::new(authority);
        self
    }

    pub fn settings(mut self, settings: MarketSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn into_server_deps(self) -> ServerDeps {
        ServerDeps::new(self.store, self.authority, self.captcha, self.settings)
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
