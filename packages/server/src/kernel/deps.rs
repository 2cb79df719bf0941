//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container used by every
//! domain action. All external services sit behind trait objects so tests can
//! swap in the in-memory store and mocks.

use chrono::Duration;
use std::sync::Arc;

use crate::common::AccountId;
use crate::kernel::{BaseAuthorityScore, BaseCaptchaOracle, BaseStore};

/// 100% of the sale price
pub const MAX_FEE_BPS: u32 = 10_000;

/// Market-wide tunables
#[derive(Debug, Clone)]
pub struct MarketSettings {
    /// How long a purchase intent stays open
    pub intent_ttl: Duration,
    /// Platform fee in basis points of the sale price
    pub fee_bps: u32,
    /// Wallet that receives platform fees; required when `fee_bps > 0`
    pub fee_account: Option<AccountId>,
    /// Attempts per operation before a lost commit race surfaces as a conflict
    pub commit_retry_limit: u32,
    /// How long processed-payment records are kept for deduplication
    pub dedup_retention: Duration,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            intent_ttl: Duration::seconds(900),
            fee_bps: 0,
            fee_account: None,
            commit_retry_limit: 3,
            dedup_retention: Duration::days(90),
        }
    }
}

impl MarketSettings {
    /// Fee owed on a sale at `price`, rounded down and never above the price
    pub fn fee_for(&self, price: i64) -> i64 {
        if self.fee_bps == 0 || self.fee_account.is_none() {
            return 0;
        }
        let bps = self.fee_bps.min(MAX_FEE_BPS);
        ((price as i128 * bps as i128) / MAX_FEE_BPS as i128) as i64
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies shared by all domain actions
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseStore>,
    pub authority: Arc<dyn BaseAuthorityScore>,
    pub captcha: Arc<dyn BaseCaptchaOracle>,
    pub settings: MarketSettings,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn BaseStore>,
        authority: Arc<dyn BaseAuthorityScore>,
        captcha: Arc<dyn BaseCaptchaOracle>,
        settings: MarketSettings,
    ) -> Self {
        Self {
            store,
            authority,
            captcha,
            settings,
        }
    }
}
