//! Postgres adapter for the persistence contract.
//!
//! A commit runs in one transaction. Guarded rows are locked with
//! `SELECT ... FOR UPDATE` in a fixed order (listings, intents, reconciliation
//! items, each by id) and balance changes are applied account by account in id
//! order, so two settling purchases never wait on each other in a cycle.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Commit, CommitError, Guard, Write};
use crate::common::{AccountId, EntryId, IntentId, ListingId, ReconciliationId};
use crate::domains::ledger::models::{Account, LedgerEntry};
use crate::domains::listings::models::{DomainListing, ListingMetadata, ListingStatus};
use crate::domains::payments::models::{PaymentAck, ProcessedPayment, ReconciliationItem};
use crate::domains::settlement::models::PurchaseIntent;
use crate::kernel::BaseStore;

// =============================================================================
// Row types - text columns parsed into domain enums
// =============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    role: String,
    balance: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = anyhow::Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Account {
            id: row.id,
            role: row.role.parse()?,
            balance: row.balance,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: EntryId,
    account_id: AccountId,
    amount: i64,
    kind: String,
    reference: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = anyhow::Error;

    fn try_from(row: EntryRow) -> Result<Self> {
        Ok(LedgerEntry {
            id: row.id,
            account_id: row.account_id,
            amount: row.amount,
            kind: row.kind.parse()?,
            reference: row.reference,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: ListingId,
    owner_id: AccountId,
    asking_price: i64,
    status: String,
    name: String,
    description: String,
    authority_score: Option<f64>,
    reviewed_by: Option<AccountId>,
    reviewed_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for DomainListing {
    type Error = anyhow::Error;

    fn try_from(row: ListingRow) -> Result<Self> {
        Ok(DomainListing {
            id: row.id,
            owner_id: row.owner_id,
            asking_price: row.asking_price,
            status: row.status.parse()?,
            metadata: ListingMetadata {
                name: row.name,
                description: row.description,
                authority_score: row.authority_score,
            },
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IntentRow {
    id: IntentId,
    listing_id: ListingId,
    buyer_id: AccountId,
    seller_id: AccountId,
    price: i64,
    status: String,
    external_payment_ref: Option<String>,
    failure_reason: Option<String>,
    expires_at: DateTime<Utc>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IntentRow> for PurchaseIntent {
    type Error = anyhow::Error;

    fn try_from(row: IntentRow) -> Result<Self> {
        Ok(PurchaseIntent {
            id: row.id,
            listing_id: row.listing_id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            price: row.price,
            status: row.status.parse()?,
            external_payment_ref: row.external_payment_ref,
            failure_reason: row.failure_reason,
            expires_at: row.expires_at,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    external_tx_id: String,
    ack: Json<PaymentAck>,
    received_at: DateTime<Utc>,
}

impl From<PaymentRow> for ProcessedPayment {
    fn from(row: PaymentRow) -> Self {
        ProcessedPayment {
            external_tx_id: row.external_tx_id,
            ack: row.ack.0,
            received_at: row.received_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReconciliationRow {
    id: ReconciliationId,
    external_tx_id: String,
    account_id: AccountId,
    amount: i64,
    intent_id: Option<IntentId>,
    reason: String,
    status: String,
    resolved_by: Option<AccountId>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReconciliationRow> for ReconciliationItem {
    type Error = anyhow::Error;

    fn try_from(row: ReconciliationRow) -> Result<Self> {
        Ok(ReconciliationItem {
            id: row.id,
            external_tx_id: row.external_tx_id,
            account_id: row.account_id,
            amount: row.amount,
            intent_id: row.intent_id,
            reason: row.reason,
            status: row.status.parse()?,
            resolved_by: row.resolved_by,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

// =============================================================================
// Commit helpers
// =============================================================================

/// Deadlocks and serialization failures are retryable; everything else is not
fn classify(error: sqlx::Error) -> CommitError {
    if let sqlx::Error::Database(db) = &error {
        if matches!(db.code().as_deref(), Some("40P01") | Some("40001")) {
            return CommitError::Contended(db.message().to_string());
        }
    }
    CommitError::Storage(anyhow::Error::new(error).context("commit failed"))
}

/// Lock order: listings, intents, reconciliation items, then the rest
fn lock_rank(guard: &Guard) -> (u8, Uuid) {
    match guard {
        Guard::ListingVersion { id, .. } => (0, id.into_uuid()),
        Guard::IntentVersion { id, .. } => (1, id.into_uuid()),
        Guard::ReconciliationOpen { id } => (2, id.into_uuid()),
        Guard::AccountAbsent { id } => (3, id.into_uuid()),
        Guard::PaymentUnseen { .. } => (4, Uuid::nil()),
    }
}

async fn check_guard(tx: &mut Transaction<'_, Postgres>, guard: &Guard) -> Result<bool, sqlx::Error> {
    let holds = match guard {
        Guard::ListingVersion { id, version } => {
            sqlx::query_scalar::<_, i64>("SELECT version FROM listings WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                == Some(*version)
        }
        Guard::IntentVersion { id, version } => {
            sqlx::query_scalar::<_, i64>(
                "SELECT version FROM purchase_intents WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
                == Some(*version)
        }
        Guard::ReconciliationOpen { id } => {
            sqlx::query_scalar::<_, String>(
                "SELECT status FROM reconciliation_items WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .as_deref()
                == Some("open")
        }
        Guard::PaymentUnseen { external_tx_id } => sqlx::query_scalar::<_, i64>(
            "SELECT 1::BIGINT FROM processed_payments WHERE external_tx_id = $1",
        )
        .bind(external_tx_id)
        .fetch_optional(&mut **tx)
        .await?
        .is_none(),
        Guard::AccountAbsent { id } => {
            sqlx::query_scalar::<_, i64>("SELECT 1::BIGINT FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                .is_none()
        }
    };
    Ok(holds)
}

async fn append_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &LedgerEntry,
) -> Result<(), CommitError> {
    let applied = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE accounts SET balance = balance + $2
        WHERE id = $1 AND balance + $2 >= 0
        RETURNING balance
        "#,
    )
    .bind(entry.account_id)
    .bind(entry.amount)
    .fetch_optional(&mut **tx)
    .await
    .map_err(classify)?;

    if applied.is_none() {
        let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM accounts WHERE id = $1")
            .bind(entry.account_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(classify)?;

        return Err(match balance {
            Some(balance) => CommitError::InsufficientFunds {
                account_id: entry.account_id,
                balance,
                requested: -entry.amount,
            },
            None => CommitError::UnknownAccount(entry.account_id),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (id, account_id, amount, kind, reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.id)
    .bind(entry.account_id)
    .bind(entry.amount)
    .bind(entry.kind.to_string())
    .bind(&entry.reference)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(classify)?;

    Ok(())
}

async fn apply_write(tx: &mut Transaction<'_, Postgres>, write: &Write) -> Result<(), CommitError> {
    match write {
        Write::OpenAccount(account) => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO accounts (id, role, balance, created_at)
                VALUES ($1, $2, 0, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(account.id)
            .bind(account.role.to_string())
            .bind(account.created_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;

            if inserted.rows_affected() == 0 {
                return Err(CommitError::GuardFailed(Guard::AccountAbsent { id: account.id }));
            }
        }
        Write::PutListing(listing) => {
            sqlx::query(
                r#"
                INSERT INTO listings (
                    id, owner_id, asking_price, status, name, description, authority_score,
                    reviewed_by, reviewed_at, rejection_reason, version, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (id) DO UPDATE SET
                    owner_id = EXCLUDED.owner_id,
                    asking_price = EXCLUDED.asking_price,
                    status = EXCLUDED.status,
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    authority_score = EXCLUDED.authority_score,
                    reviewed_by = EXCLUDED.reviewed_by,
                    reviewed_at = EXCLUDED.reviewed_at,
                    rejection_reason = EXCLUDED.rejection_reason,
                    version = EXCLUDED.version,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(listing.id)
            .bind(listing.owner_id)
            .bind(listing.asking_price)
            .bind(listing.status.to_string())
            .bind(&listing.metadata.name)
            .bind(&listing.metadata.description)
            .bind(listing.metadata.authority_score)
            .bind(listing.reviewed_by)
            .bind(listing.reviewed_at)
            .bind(&listing.rejection_reason)
            .bind(listing.version)
            .bind(listing.created_at)
            .bind(listing.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        }
        Write::PutIntent(intent) => {
            sqlx::query(
                r#"
                INSERT INTO purchase_intents (
                    id, listing_id, buyer_id, seller_id, price, status, external_payment_ref,
                    failure_reason, expires_at, version, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    external_payment_ref = EXCLUDED.external_payment_ref,
                    failure_reason = EXCLUDED.failure_reason,
                    version = EXCLUDED.version,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(intent.id)
            .bind(intent.listing_id)
            .bind(intent.buyer_id)
            .bind(intent.seller_id)
            .bind(intent.price)
            .bind(intent.status.to_string())
            .bind(&intent.external_payment_ref)
            .bind(&intent.failure_reason)
            .bind(intent.expires_at)
            .bind(intent.version)
            .bind(intent.created_at)
            .bind(intent.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        }
        Write::AppendEntry(entry) => append_entry(tx, entry).await?,
        Write::RecordPayment(payment) => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO processed_payments (external_tx_id, ack, received_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (external_tx_id) DO NOTHING
                "#,
            )
            .bind(&payment.external_tx_id)
            .bind(Json(&payment.ack))
            .bind(payment.received_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;

            if inserted.rows_affected() == 0 {
                return Err(CommitError::GuardFailed(Guard::payment_unseen(
                    &payment.external_tx_id,
                )));
            }
        }
        Write::PutReconciliation(item) => {
            sqlx::query(
                r#"
                INSERT INTO reconciliation_items (
                    id, external_tx_id, account_id, amount, intent_id, reason, status,
                    resolved_by, created_at, resolved_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    resolved_by = EXCLUDED.resolved_by,
                    resolved_at = EXCLUDED.resolved_at
                "#,
            )
            .bind(item.id)
            .bind(&item.external_tx_id)
            .bind(item.account_id)
            .bind(item.amount)
            .bind(item.intent_id)
            .bind(&item.reason)
            .bind(item.status.to_string())
            .bind(item.resolved_by)
            .bind(item.created_at)
            .bind(item.resolved_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        }
    }
    Ok(())
}

/// Accounts first, then ledger appends grouped by account (stable within an
/// account), then everything else in the order given
fn write_order(writes: Vec<Write>) -> Vec<Write> {
    let (mut opens, rest): (Vec<_>, Vec<_>) = writes
        .into_iter()
        .partition(|write| matches!(write, Write::OpenAccount(_)));
    let (mut entries, others): (Vec<_>, Vec<_>) = rest
        .into_iter()
        .partition(|write| matches!(write, Write::AppendEntry(_)));

    entries.sort_by_key(|write| match write {
        Write::AppendEntry(entry) => entry.account_id.into_uuid(),
        _ => Uuid::nil(),
    });

    opens.append(&mut entries);
    opens.extend(others);
    opens
}

// =============================================================================
// Store
// =============================================================================

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseStore for PostgresStore {
    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn entries_for(&self, id: AccountId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT * FROM ledger_entries WHERE account_id = $1 ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn listing(&self, id: ListingId) -> Result<Option<DomainListing>> {
        sqlx::query_as::<_, ListingRow>("SELECT * FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(DomainListing::try_from)
            .transpose()
    }

    async fn listings_by_status(&self, status: ListingStatus) -> Result<Vec<DomainListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            "SELECT * FROM listings WHERE status = $1 ORDER BY created_at",
        )
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn listings_by_owner(&self, owner: AccountId) -> Result<Vec<DomainListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            "SELECT * FROM listings WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn intent(&self, id: IntentId) -> Result<Option<PurchaseIntent>> {
        sqlx::query_as::<_, IntentRow>("SELECT * FROM purchase_intents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PurchaseIntent::try_from)
            .transpose()
    }

    async fn intents_by_buyer(&self, buyer: AccountId) -> Result<Vec<PurchaseIntent>> {
        let rows = sqlx::query_as::<_, IntentRow>(
            "SELECT * FROM purchase_intents WHERE buyer_id = $1 ORDER BY created_at",
        )
        .bind(buyer)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn open_intents_expiring_by(&self, cutoff: DateTime<Utc>) -> Result<Vec<PurchaseIntent>> {
        let rows = sqlx::query_as::<_, IntentRow>(
            r#"
            SELECT * FROM purchase_intents
            WHERE status IN ('pending', 'awaiting_payment') AND expires_at <= $1
            ORDER BY expires_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn processed_payment(&self, external_tx_id: &str) -> Result<Option<ProcessedPayment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM processed_payments WHERE external_tx_id = $1",
        )
        .bind(external_tx_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ProcessedPayment::from))
    }

    async fn prune_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM processed_payments WHERE received_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn reconciliation_item(&self, id: ReconciliationId) -> Result<Option<ReconciliationItem>> {
        sqlx::query_as::<_, ReconciliationRow>("SELECT * FROM reconciliation_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ReconciliationItem::try_from)
            .transpose()
    }

    async fn open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>> {
        let rows = sqlx::query_as::<_, ReconciliationRow>(
            "SELECT * FROM reconciliation_items WHERE status = 'open' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn commit(&self, commit: Commit) -> Result<(), CommitError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let mut guards = commit.guards;
        guards.sort_by_key(lock_rank);
        for guard in &guards {
            if !check_guard(&mut tx, guard).await.map_err(classify)? {
                return Err(CommitError::GuardFailed(guard.clone()));
            }
        }

        for write in write_order(commit.writes) {
            apply_write(&mut tx, &write).await?;
        }

        tx.commit().await.map_err(classify)?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}
