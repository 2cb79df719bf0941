use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{AccountId, EntryId};

/// Why money moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Wallet funded from outside the platform
    Topup,
    /// Buyer side of a settlement
    PurchaseDebit,
    /// Seller side of a settlement
    SaleCredit,
    /// Funds returned to the external payment provider
    Refund,
    /// Platform share of a settlement, credited to the fee account
    PlatformFee,
}

impl EntryKind {
    /// Whether entries of this kind add to the balance
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            EntryKind::Topup | EntryKind::SaleCredit | EntryKind::PlatformFee
        )
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Topup => write!(f, "topup"),
            EntryKind::PurchaseDebit => write!(f, "purchase_debit"),
            EntryKind::SaleCredit => write!(f, "sale_credit"),
            EntryKind::Refund => write!(f, "refund"),
            EntryKind::PlatformFee => write!(f, "platform_fee"),
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "topup" => Ok(EntryKind::Topup),
            "purchase_debit" => Ok(EntryKind::PurchaseDebit),
            "sale_credit" => Ok(EntryKind::SaleCredit),
            "refund" => Ok(EntryKind::Refund),
            "platform_fee" => Ok(EntryKind::PlatformFee),
            _ => Err(anyhow::anyhow!("Invalid ledger entry kind: {}", s)),
        }
    }
}

/// LedgerEntry - an immutable, signed monetary movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    /// Positive for credits, negative for debits
    pub amount: i64,
    pub kind: EntryKind,
    /// Purchase intent id, external transaction id or reconciliation item id
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn credit(account_id: AccountId, amount: i64, kind: EntryKind, reference: &str) -> Self {
        Self::new(account_id, amount, kind, reference)
    }

    pub fn debit(account_id: AccountId, amount: i64, kind: EntryKind, reference: &str) -> Self {
        Self::new(account_id, -amount, kind, reference)
    }

    fn new(account_id: AccountId, amount: i64, kind: EntryKind, reference: &str) -> Self {
        Self {
            id: EntryId::new(),
            account_id,
            amount,
            kind,
            reference: reference.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Recompute a balance from its entries
pub fn fold_balance<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i64 {
    entries.into_iter().map(|entry| entry.amount).sum()
}
