//! Reconciliation queue actions - operator review of flagged payments

use chrono::{DateTime, Utc};
use tracing::info;

use crate::common::{Action, MarketError, MarketResult, Principal, ReconciliationId};
use crate::domains::ledger::models::{EntryKind, LedgerEntry};
use crate::domains::payments::models::{ReconciliationItem, Resolution};
use crate::kernel::retry_on_conflict;
use crate::kernel::store::{Commit, Guard, Write};
use crate::kernel::ServerDeps;

/// Unresolved items, oldest first. Admin only.
pub async fn open_items(
    principal: &Principal,
    deps: &ServerDeps,
) -> MarketResult<Vec<ReconciliationItem>> {
    principal.actor().can(Action::ManageReconciliation).check()?;
    Ok(deps.store.open_reconciliation_items().await?)
}

/// Close an item. `Refund` sends the flagged amount back out of the wallet.
///
/// A refund the wallet can no longer cover fails with `InsufficientFunds` and
/// leaves the item open.
pub async fn resolve_item(
    principal: &Principal,
    item_id: ReconciliationId,
    resolution: Resolution,
    deps: &ServerDeps,
) -> MarketResult<ReconciliationItem> {
    principal.actor().can(Action::ManageReconciliation).check()?;

    retry_on_conflict(deps.settings.commit_retry_limit, move || async move {
        let item = deps
            .store
            .reconciliation_item(item_id)
            .await?
            .ok_or_else(|| MarketError::not_found(format!("reconciliation item {}", item_id)))?;

        let resolved = item.resolve(resolution, principal.account_id)?;

        let mut commit = Commit::new()
            .guard(Guard::ReconciliationOpen { id: item_id })
            .write(Write::PutReconciliation(resolved.clone()));
        if resolution == Resolution::Refund {
            commit = commit.write(Write::AppendEntry(LedgerEntry::debit(
                item.account_id,
                item.amount,
                EntryKind::Refund,
                &item.external_tx_id,
            )));
        }
        deps.store.commit(commit).await?;

        info!(
            item_id = %item_id,
            external_tx_id = %item.external_tx_id,
            resolved_by = %principal.account_id,
            status = %resolved.status,
            "Reconciliation item resolved"
        );
        Ok(resolved)
    })
    .await
}

/// Drop dedup records older than the retention window.
///
/// A callback replayed after its record is pruned is treated as new; the
/// window must outlast the provider's retry horizon.
pub async fn prune_processed(now: DateTime<Utc>, deps: &ServerDeps) -> MarketResult<u64> {
    let cutoff = now - deps.settings.dedup_retention;
    let pruned = deps.store.prune_processed_before(cutoff).await?;
    if pruned > 0 {
        info!(pruned, cutoff = %cutoff, "Pruned processed payment records");
    }
    Ok(pruned)
}
