//! Entry actions - single-account credits and debits

use tracing::info;

use crate::common::{AccountId, MarketError, MarketResult};
use crate::domains::ledger::models::{EntryKind, LedgerEntry};
use crate::kernel::store::{Commit, Write};
use crate::kernel::ServerDeps;

fn positive(amount: i64) -> MarketResult<()> {
    if amount <= 0 {
        return Err(MarketError::validation(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Append a credit to an account's ledger
pub async fn credit(
    account_id: AccountId,
    amount: i64,
    kind: EntryKind,
    reference: &str,
    deps: &ServerDeps,
) -> MarketResult<LedgerEntry> {
    positive(amount)?;

    let entry = LedgerEntry::credit(account_id, amount, kind, reference);
    deps.store
        .commit(Commit::new().write(Write::AppendEntry(entry.clone())))
        .await?;

    info!(account_id = %account_id, amount, kind = %kind, reference, "Ledger credit");
    Ok(entry)
}

/// Append a debit. The balance check and the append are one store step, so
/// two concurrent debits can never both pass against the same balance.
pub async fn debit(
    account_id: AccountId,
    amount: i64,
    kind: EntryKind,
    reference: &str,
    deps: &ServerDeps,
) -> MarketResult<LedgerEntry> {
    positive(amount)?;

    let entry = LedgerEntry::debit(account_id, amount, kind, reference);
    deps.store
        .commit(Commit::new().write(Write::AppendEntry(entry.clone())))
        .await?;

    info!(account_id = %account_id, amount, kind = %kind, reference, "Ledger debit");
    Ok(entry)
}

/// Wallet top-up outside the payment callback path
pub async fn top_up(
    account_id: AccountId,
    amount: i64,
    reference: &str,
    deps: &ServerDeps,
) -> MarketResult<LedgerEntry> {
    credit(account_id, amount, EntryKind::Topup, reference, deps).await
}
