use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AccountId, IntentId, MarketError, MarketResult, ReconciliationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Open,
    /// Operator accepted the funds as a wallet top-up
    Acknowledged,
    /// Operator returned the funds to the provider
    Refunded,
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationStatus::Open => write!(f, "open"),
            ReconciliationStatus::Acknowledged => write!(f, "acknowledged"),
            ReconciliationStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "open" => Ok(ReconciliationStatus::Open),
            "acknowledged" => Ok(ReconciliationStatus::Acknowledged),
            "refunded" => Ok(ReconciliationStatus::Refunded),
            _ => Err(anyhow::anyhow!("Invalid reconciliation status: {}", s)),
        }
    }
}

/// Operator decision on a flagged payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Acknowledge,
    Refund,
}

/// A credit that arrived without a live purchase to apply it to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub id: ReconciliationId,
    pub external_tx_id: String,
    pub account_id: AccountId,
    pub amount: i64,
    pub intent_id: Option<IntentId>,
    pub reason: String,
    pub status: ReconciliationStatus,
    pub resolved_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ReconciliationItem {
    pub fn open(
        external_tx_id: &str,
        account_id: AccountId,
        amount: i64,
        intent_id: Option<IntentId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: ReconciliationId::new(),
            external_tx_id: external_tx_id.to_string(),
            account_id,
            amount,
            intent_id,
            reason: reason.into(),
            status: ReconciliationStatus::Open,
            resolved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn resolve(&self, resolution: Resolution, resolved_by: AccountId) -> MarketResult<Self> {
        if self.status != ReconciliationStatus::Open {
            return Err(MarketError::invalid_state(format!(
                "reconciliation item {} is already {}",
                self.id, self.status
            )));
        }

        let mut resolved = self.clone();
        resolved.status = match resolution {
            Resolution::Acknowledge => ReconciliationStatus::Acknowledged,
            Resolution::Refund => ReconciliationStatus::Refunded,
        };
        resolved.resolved_by = Some(resolved_by);
        resolved.resolved_at = Some(Utc::now());
        Ok(resolved)
    }
}
