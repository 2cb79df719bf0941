//! Account actions - opening wallets and reading balances

use tracing::{info, warn};

use crate::common::{AccountId, MarketError, MarketResult, Role};
use crate::domains::ledger::models::{fold_balance, Account, LedgerEntry};
use crate::kernel::store::{Commit, CommitError, Guard, Write};
use crate::kernel::ServerDeps;

/// Open an empty wallet for a principal.
///
/// Opening an id that already exists is a `Conflict`.
pub async fn open_account(id: AccountId, role: Role, deps: &ServerDeps) -> MarketResult<Account> {
    let account = Account::open(id, role);

    let commit = Commit::new()
        .guard(Guard::AccountAbsent { id })
        .write(Write::OpenAccount(account.clone()));

    match deps.store.commit(commit).await {
        Ok(()) => {
            info!(account_id = %id, role = %role, "Account opened");
            Ok(account)
        }
        Err(CommitError::GuardFailed(_)) => Err(MarketError::Conflict(format!(
            "account {} already exists",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_account(id: AccountId, deps: &ServerDeps) -> MarketResult<Account> {
    deps.store
        .account(id)
        .await?
        .ok_or_else(|| MarketError::not_found(format!("account {}", id)))
}

pub async fn balance_of(id: AccountId, deps: &ServerDeps) -> MarketResult<i64> {
    Ok(get_account(id, deps).await?.balance)
}

/// Ledger history for an account, oldest first
pub async fn entries_for(id: AccountId, deps: &ServerDeps) -> MarketResult<Vec<LedgerEntry>> {
    // Distinguish "no entries yet" from "no such account"
    get_account(id, deps).await?;
    Ok(deps.store.entries_for(id).await?)
}

/// Recompute the balance from the ledger and compare with the stored value.
///
/// Returns `true` when they agree. Drift is logged, never repaired here.
pub async fn verify_balance(id: AccountId, deps: &ServerDeps) -> MarketResult<bool> {
    let account = get_account(id, deps).await?;
    let entries = deps.store.entries_for(id).await?;
    let folded = fold_balance(&entries);

    if folded != account.balance {
        warn!(
            account_id = %id,
            stored = account.balance,
            folded,
            "Balance drift detected"
        );
        return Ok(false);
    }
    Ok(true)
}
