use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domain::{
    ActorId, Booking, BookingId, BookingParty, BookingStatus, Cents, CustomerTotals, ModelTotals,
    Owner, PaymentStatus, TransactionId, TransactionRecord, TxKind, TxStatus, Wallet, WalletId,
    WalletStatus, WalletTotals,
};

use super::MIGRATION_001_INITIAL;

/// Additive changes to a wallet's materialized columns, applied in the same
/// unit of work as the ledger write they mirror. Columns not touched stay
/// at zero delta, so one update statement covers both owner kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletDeltas {
    pub balance: Cents,
    pub spend: Cents,
    pub refunded: Cents,
    pub withdraw: Cents,
    pub pending: Cents,
}

/// Outcome of a guarded debit unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied,
    /// The in-transaction availability re-check failed; nothing was written.
    Insufficient { available: Cents },
}

/// Outcome of approving a pending ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    Applied,
    /// The record was no longer `pending`; nothing was written.
    StaleStatus,
    /// The wallet could not cover the approval; nothing was written.
    Insufficient { available: Cents },
}

/// Repository for the ledger, wallets and bookings.
///
/// Every method that both appends a ledger record and mutates wallet
/// columns runs as a single SQLite transaction: either both effects become
/// visible or neither does. The pool is capped at one connection, so units
/// of work are serialized at the database and a partially-applied write can
/// never be observed.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Wallet operations
    // ========================

    /// Insert a new wallet row. Fails if the owner already has one.
    pub async fn save_wallet(&self, wallet: &Wallet) -> Result<()> {
        let (balance, spend, refunded, withdraw, pending) = totals_columns(&wallet.totals);
        sqlx::query(
            r#"
            INSERT INTO wallets (id, owner_kind, owner_id, status, total_balance, total_spend, total_refunded, total_withdraw, total_pending, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id.to_string())
        .bind(wallet.owner.kind())
        .bind(wallet.owner.id().to_string())
        .bind(wallet.status.as_str())
        .bind(balance)
        .bind(spend)
        .bind(refunded)
        .bind(withdraw)
        .bind(pending)
        .bind(wallet.created_at.to_rfc3339())
        .bind(wallet.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save wallet")?;
        Ok(())
    }

    /// Get the wallet for an owner.
    pub async fn get_wallet(&self, owner: Owner) -> Result<Option<Wallet>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_kind, owner_id, status, total_balance, total_spend, total_refunded, total_withdraw, total_pending, created_at, updated_at
            FROM wallets
            WHERE owner_kind = ? AND owner_id = ?
            "#,
        )
        .bind(owner.kind())
        .bind(owner.id().to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet")?;

        match row {
            Some(row) => Ok(Some(row_to_wallet(&row)?)),
            None => Ok(None),
        }
    }

    /// List all wallets, customers first, then by owner id.
    pub async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_kind, owner_id, status, total_balance, total_spend, total_refunded, total_withdraw, total_pending, created_at, updated_at
            FROM wallets
            ORDER BY owner_kind, owner_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallets")?;

        rows.iter().map(row_to_wallet).collect()
    }

    /// Change a wallet's status. Returns false if the owner has no wallet.
    pub async fn set_wallet_status(&self, owner: Owner, status: WalletStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE wallets SET status = ?, updated_at = ? WHERE owner_kind = ? AND owner_id = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(owner.kind())
        .bind(owner.id().to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update wallet status")?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a wallet's materialized columns with recomputed totals.
    /// Used by reconciliation repair; the ledger itself is untouched.
    pub async fn replace_wallet_totals(
        &self,
        wallet_id: WalletId,
        totals: &WalletTotals,
    ) -> Result<()> {
        let (balance, spend, refunded, withdraw, pending) = totals_columns(totals);
        sqlx::query(
            r#"
            UPDATE wallets
            SET total_balance = ?, total_spend = ?, total_refunded = ?, total_withdraw = ?, total_pending = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(balance)
        .bind(spend)
        .bind(refunded)
        .bind(withdraw)
        .bind(pending)
        .bind(Utc::now().to_rfc3339())
        .bind(wallet_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to replace wallet totals")?;
        Ok(())
    }

    // ========================
    // Ledger operations
    // ========================

    /// Append a standalone ledger record (no wallet effect), e.g. a pending
    /// recharge or withdrawal request. Assigns the next sequence number.
    pub async fn append_transaction(&self, record: &mut TransactionRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_transaction(&mut tx, record).await?;
        tx.commit().await.context("Failed to commit append")?;
        Ok(())
    }

    /// Append a ledger record and apply its wallet deltas in one unit of
    /// work. Used for credits that take effect immediately (adjustments,
    /// referrals, call refunds).
    pub async fn append_with_wallet(
        &self,
        record: &mut TransactionRecord,
        wallet_id: WalletId,
        deltas: WalletDeltas,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_transaction(&mut tx, record).await?;
        bump_wallet(&mut tx, wallet_id, deltas).await?;
        tx.commit().await.context("Failed to commit credit")?;
        Ok(())
    }

    /// Conditional status transition, the optimistic concurrency guard:
    /// succeeds only if the record is still in `from`.
    pub async fn transition_transaction(
        &self,
        id: TransactionId,
        from: TxStatus,
        to: TxStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to transition transaction")?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a ledger record by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query(&select_transactions("WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List the whole ledger in sequence order.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(&select_transactions(""))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// List one owner's ledger slice in sequence order.
    pub async fn list_transactions_for_owner(
        &self,
        owner: Owner,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(&select_transactions("WHERE owner_kind = ? AND owner_id = ?"))
            .bind(owner.kind())
            .bind(owner.id().to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions for owner")?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// List pending records, optionally narrowed to one kind. The admin
    /// approval queue.
    pub async fn list_pending(&self, kind: Option<TxKind>) -> Result<Vec<TransactionRecord>> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(&select_transactions("WHERE status = 'pending' AND kind = ?"))
                    .bind(kind.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query(&select_transactions("WHERE status = 'pending'"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list pending transactions")?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// Sum of an owner's pending withdrawal requests, as a magnitude.
    pub async fn sum_pending_withdrawals(&self, owner: Owner) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(ABS(amount)), 0) as total
            FROM transactions
            WHERE owner_kind = ? AND owner_id = ? AND kind = 'withdrawal' AND status = 'pending'
            "#,
        )
        .bind(owner.kind())
        .bind(owner.id().to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum pending withdrawals")?;
        Ok(row.get("total"))
    }

    // ========================
    // Booking operations
    // ========================

    /// Get a booking by ID.
    pub async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, model_id, price, commission_rate, status, payment_status, hold_tx, customer_checked_in_at, model_checked_in_at, created_at, updated_at
            FROM bookings
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch booking")?;

        match row {
            Some(row) => Ok(Some(row_to_booking(&row)?)),
            None => Ok(None),
        }
    }

    /// Conditional booking status change (confirm, dispute). The guard on
    /// the current status makes racing updates fail cleanly.
    pub async fn update_booking_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to update booking status")?;
        Ok(result.rows_affected() > 0)
    }

    /// Set a party's check-in timestamp, once. Returns false if already set
    /// or the booking does not exist.
    pub async fn set_check_in(
        &self,
        id: BookingId,
        party: BookingParty,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = match party {
            BookingParty::Customer => {
                "UPDATE bookings SET customer_checked_in_at = ?, updated_at = ? WHERE id = ? AND customer_checked_in_at IS NULL"
            }
            BookingParty::Model => {
                "UPDATE bookings SET model_checked_in_at = ?, updated_at = ? WHERE id = ? AND model_checked_in_at IS NULL"
            }
        };
        let result = sqlx::query(query)
            .bind(at.to_rfc3339())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to set check-in")?;
        Ok(result.rows_affected() > 0)
    }

    // ========================
    // Settlement units of work
    // ========================

    /// Capture a booking: insert the hold record and the booking row and
    /// bump the customer's spend, re-checking availability inside the
    /// transaction immediately before committing.
    pub async fn create_booking_with_hold(
        &self,
        booking: &Booking,
        hold: &mut TransactionRecord,
    ) -> Result<DebitOutcome> {
        let mut tx = self.pool.begin().await?;

        let wallet = wallet_in_tx(&mut tx, Owner::Customer(booking.customer_id))
            .await?
            .context("customer wallet disappeared mid-debit")?;
        let available = wallet.available();
        if available < booking.price {
            tx.rollback().await.context("Failed to roll back debit")?;
            return Ok(DebitOutcome::Insufficient { available });
        }

        insert_transaction(&mut tx, hold).await?;
        insert_booking(&mut tx, booking).await?;
        bump_wallet(
            &mut tx,
            wallet.id,
            WalletDeltas {
                spend: booking.price,
                ..Default::default()
            },
        )
        .await?;

        tx.commit().await.context("Failed to commit booking hold")?;
        Ok(DebitOutcome::Applied)
    }

    /// Finalize a completed booking: release the hold, credit the model's
    /// earning and mark the booking settled, all or nothing. `earning` is
    /// absent only when the payee's share is zero. Returns false without
    /// writing anything if another settlement won the race on either guard.
    pub async fn settle_completion(
        &self,
        booking: &Booking,
        earning: Option<&mut TransactionRecord>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if !release_hold(&mut tx, booking.hold_tx).await? {
            tx.rollback().await.context("Failed to roll back settle")?;
            return Ok(false);
        }
        if !settle_booking_row(
            &mut tx,
            booking.id,
            BookingStatus::Completed,
            PaymentStatus::Released,
        )
        .await?
        {
            tx.rollback().await.context("Failed to roll back settle")?;
            return Ok(false);
        }

        if let Some(earning) = earning {
            let wallet = wallet_in_tx(&mut tx, Owner::Model(booking.model_id))
                .await?
                .context("model wallet missing at settlement")?;
            insert_transaction(&mut tx, earning).await?;
            let deltas = match earning.status {
                TxStatus::Approved => WalletDeltas {
                    balance: earning.amount,
                    ..Default::default()
                },
                _ => WalletDeltas {
                    pending: earning.amount,
                    ..Default::default()
                },
            };
            bump_wallet(&mut tx, wallet.id, deltas).await?;
        }

        tx.commit().await.context("Failed to commit completion")?;
        Ok(true)
    }

    /// Reverse a held booking: release the hold, credit the refund back to
    /// the customer and mark the booking refunded, all or nothing.
    pub async fn settle_refund(
        &self,
        booking: &Booking,
        refund: &mut TransactionRecord,
        final_status: BookingStatus,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if !release_hold(&mut tx, booking.hold_tx).await? {
            tx.rollback().await.context("Failed to roll back refund")?;
            return Ok(false);
        }
        if !settle_booking_row(&mut tx, booking.id, final_status, PaymentStatus::Refunded).await? {
            tx.rollback().await.context("Failed to roll back refund")?;
            return Ok(false);
        }

        let wallet = wallet_in_tx(&mut tx, Owner::Customer(booking.customer_id))
            .await?
            .context("customer wallet missing at refund")?;
        insert_transaction(&mut tx, refund).await?;
        bump_wallet(
            &mut tx,
            wallet.id,
            WalletDeltas {
                refunded: refund.amount,
                ..Default::default()
            },
        )
        .await?;

        tx.commit().await.context("Failed to commit refund")?;
        Ok(true)
    }

    /// Record a subscription payment: debit the customer's spend and credit
    /// the payee's pending earning in one unit of work, with the
    /// availability re-check inside the transaction.
    pub async fn record_subscription(
        &self,
        payment: &mut TransactionRecord,
        earning: Option<&mut TransactionRecord>,
    ) -> Result<DebitOutcome> {
        let price = payment.amount.abs();
        let mut tx = self.pool.begin().await?;

        let customer = wallet_in_tx(&mut tx, payment.owner)
            .await?
            .context("customer wallet disappeared mid-debit")?;
        let available = customer.available();
        if available < price {
            tx.rollback().await.context("Failed to roll back debit")?;
            return Ok(DebitOutcome::Insufficient { available });
        }

        insert_transaction(&mut tx, payment).await?;
        bump_wallet(
            &mut tx,
            customer.id,
            WalletDeltas {
                spend: price,
                ..Default::default()
            },
        )
        .await?;

        if let Some(earning) = earning {
            let payee = wallet_in_tx(&mut tx, earning.owner)
                .await?
                .context("model wallet missing at subscription")?;
            insert_transaction(&mut tx, earning).await?;
            bump_wallet(
                &mut tx,
                payee.id,
                WalletDeltas {
                    pending: earning.amount,
                    ..Default::default()
                },
            )
            .await?;
        }

        tx.commit().await.context("Failed to commit subscription")?;
        Ok(DebitOutcome::Applied)
    }

    /// Approve a pending record with the optimistic guard, applying the
    /// given wallet deltas in the same unit of work. When
    /// `require_available` is set (withdrawal approval), availability is
    /// re-checked inside the transaction first.
    pub async fn approve_pending(
        &self,
        id: TransactionId,
        actor: ActorId,
        wallet_id: WalletId,
        deltas: WalletDeltas,
        require_available: Option<Cents>,
    ) -> Result<PendingOutcome> {
        let mut tx = self.pool.begin().await?;

        if let Some(required) = require_available {
            let wallet = wallet_by_id_in_tx(&mut tx, wallet_id)
                .await?
                .context("wallet missing at approval")?;
            let available = wallet.available();
            if available < required {
                tx.rollback().await.context("Failed to roll back approval")?;
                return Ok(PendingOutcome::Insufficient { available });
            }
        }

        let result = sqlx::query(
            "UPDATE transactions SET status = 'approved', approved_by = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(actor.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to approve transaction")?;
        if result.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back approval")?;
            return Ok(PendingOutcome::StaleStatus);
        }

        bump_wallet(&mut tx, wallet_id, deltas).await?;
        tx.commit().await.context("Failed to commit approval")?;
        Ok(PendingOutcome::Applied)
    }

    /// Reject a pending record with the optimistic guard, applying the
    /// given wallet deltas (e.g. backing a pending earning out of
    /// `total_pending`) in the same unit of work.
    pub async fn reject_pending(
        &self,
        id: TransactionId,
        actor: ActorId,
        reason: Option<&str>,
        wallet_id: WalletId,
        deltas: WalletDeltas,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE transactions SET status = 'rejected', rejected_by = ?, reason = COALESCE(?, reason), updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(actor.to_string())
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to reject transaction")?;
        if result.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back rejection")?;
            return Ok(false);
        }

        bump_wallet(&mut tx, wallet_id, deltas).await?;
        tx.commit().await.context("Failed to commit rejection")?;
        Ok(true)
    }
}

// ========================
// Shared helpers
// ========================

fn select_transactions(where_clause: &str) -> String {
    format!(
        "SELECT id, sequence, owner_kind, owner_id, kind, amount, status, booking_id, reason, approved_by, rejected_by, created_at, updated_at FROM transactions {} ORDER BY sequence",
        where_clause
    )
}

/// Insert a ledger record, assigning the next sequence number. Rejects
/// zero amounts before anything is written.
async fn insert_transaction(
    tx: &mut Transaction<'_, Sqlite>,
    record: &mut TransactionRecord,
) -> Result<()> {
    if record.amount == 0 {
        bail!("ledger amounts must be non-zero");
    }
    record.sequence = next_sequence(tx).await?;

    sqlx::query(
        r#"
        INSERT INTO transactions (id, sequence, owner_kind, owner_id, kind, amount, status, booking_id, reason, approved_by, rejected_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.sequence)
    .bind(record.owner.kind())
    .bind(record.owner.id().to_string())
    .bind(record.kind.as_str())
    .bind(record.amount)
    .bind(record.status.as_str())
    .bind(record.booking_id.map(|id| id.to_string()))
    .bind(&record.reason)
    .bind(record.approved_by.map(|id| id.to_string()))
    .bind(record.rejected_by.map(|id| id.to_string()))
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(&mut **tx)
    .await
    .context("Failed to insert transaction")?;
    Ok(())
}

/// Get the next sequence number and increment the counter.
async fn next_sequence(tx: &mut Transaction<'_, Sqlite>) -> Result<i64> {
    let row = sqlx::query(
        r#"
        UPDATE sequence_counter
        SET value = value + 1
        WHERE name = 'transaction_sequence'
        RETURNING value
        "#,
    )
    .fetch_one(&mut **tx)
    .await
    .context("Failed to get next sequence number")?;
    Ok(row.get("value"))
}

async fn insert_booking(tx: &mut Transaction<'_, Sqlite>, booking: &Booking) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bookings (id, customer_id, model_id, price, commission_rate, status, payment_status, hold_tx, customer_checked_in_at, model_checked_in_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(booking.id.to_string())
    .bind(booking.customer_id.to_string())
    .bind(booking.model_id.to_string())
    .bind(booking.price)
    .bind(booking.commission_rate)
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(booking.hold_tx.to_string())
    .bind(booking.customer_checked_in_at.map(|dt| dt.to_rfc3339()))
    .bind(booking.model_checked_in_at.map(|dt| dt.to_rfc3339()))
    .bind(booking.created_at.to_rfc3339())
    .bind(booking.updated_at.to_rfc3339())
    .execute(&mut **tx)
    .await
    .context("Failed to insert booking")?;
    Ok(())
}

/// Guarded `held -> released` transition of a hold record, inside the
/// caller's transaction.
async fn release_hold(tx: &mut Transaction<'_, Sqlite>, hold_tx: TransactionId) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE transactions SET status = 'released', updated_at = ? WHERE id = ? AND status = 'held'",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(hold_tx.to_string())
    .execute(&mut **tx)
    .await
    .context("Failed to release hold")?;
    Ok(result.rows_affected() > 0)
}

/// Guarded terminal update of a booking row: only one settlement can move
/// `payment_status` off `held`.
async fn settle_booking_row(
    tx: &mut Transaction<'_, Sqlite>,
    id: BookingId,
    status: BookingStatus,
    payment_status: PaymentStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE bookings SET status = ?, payment_status = ?, updated_at = ? WHERE id = ? AND payment_status = 'held'",
    )
    .bind(status.as_str())
    .bind(payment_status.as_str())
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(&mut **tx)
    .await
    .context("Failed to settle booking row")?;
    Ok(result.rows_affected() > 0)
}

async fn bump_wallet(
    tx: &mut Transaction<'_, Sqlite>,
    wallet_id: WalletId,
    deltas: WalletDeltas,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE wallets
        SET total_balance = total_balance + ?,
            total_spend = total_spend + ?,
            total_refunded = total_refunded + ?,
            total_withdraw = total_withdraw + ?,
            total_pending = total_pending + ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(deltas.balance)
    .bind(deltas.spend)
    .bind(deltas.refunded)
    .bind(deltas.withdraw)
    .bind(deltas.pending)
    .bind(Utc::now().to_rfc3339())
    .bind(wallet_id.to_string())
    .execute(&mut **tx)
    .await
    .context("Failed to update wallet totals")?;
    Ok(())
}

async fn wallet_in_tx(tx: &mut Transaction<'_, Sqlite>, owner: Owner) -> Result<Option<Wallet>> {
    let row = sqlx::query(
        r#"
        SELECT id, owner_kind, owner_id, status, total_balance, total_spend, total_refunded, total_withdraw, total_pending, created_at, updated_at
        FROM wallets
        WHERE owner_kind = ? AND owner_id = ?
        "#,
    )
    .bind(owner.kind())
    .bind(owner.id().to_string())
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to fetch wallet")?;

    match row {
        Some(row) => Ok(Some(row_to_wallet(&row)?)),
        None => Ok(None),
    }
}

async fn wallet_by_id_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: WalletId,
) -> Result<Option<Wallet>> {
    let row = sqlx::query(
        r#"
        SELECT id, owner_kind, owner_id, status, total_balance, total_spend, total_refunded, total_withdraw, total_pending, created_at, updated_at
        FROM wallets
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to fetch wallet")?;

    match row {
        Some(row) => Ok(Some(row_to_wallet(&row)?)),
        None => Ok(None),
    }
}

fn totals_columns(totals: &WalletTotals) -> (Cents, Cents, Cents, Cents, Cents) {
    match totals {
        WalletTotals::Customer(t) => (t.total_balance, t.total_spend, t.total_refunded, 0, 0),
        WalletTotals::Model(t) => (t.total_balance, 0, 0, t.total_withdraw, t.total_pending),
    }
}

fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
    let owner = owner_from_row(row)?;
    let status_str: String = row.get("status");

    let totals = match owner {
        Owner::Customer(_) => WalletTotals::Customer(CustomerTotals {
            total_balance: row.get("total_balance"),
            total_spend: row.get("total_spend"),
            total_refunded: row.get("total_refunded"),
        }),
        Owner::Model(_) => WalletTotals::Model(ModelTotals {
            total_balance: row.get("total_balance"),
            total_withdraw: row.get("total_withdraw"),
            total_pending: row.get("total_pending"),
        }),
    };

    Ok(Wallet {
        id: parse_uuid(row.get("id"))?,
        owner,
        status: WalletStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid wallet status: {}", status_str))?,
        totals,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<TransactionRecord> {
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");
    let booking_id: Option<String> = row.get("booking_id");
    let approved_by: Option<String> = row.get("approved_by");
    let rejected_by: Option<String> = row.get("rejected_by");

    Ok(TransactionRecord {
        id: parse_uuid(row.get("id"))?,
        sequence: row.get("sequence"),
        owner: owner_from_row(row)?,
        kind: TxKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Unknown transaction kind: {}", kind_str))?,
        amount: row.get("amount"),
        status: TxStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
        booking_id: booking_id.map(parse_uuid).transpose()?,
        reason: row.get("reason"),
        approved_by: approved_by.map(parse_uuid).transpose()?,
        rejected_by: rejected_by.map(parse_uuid).transpose()?,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn row_to_booking(row: &SqliteRow) -> Result<Booking> {
    let status_str: String = row.get("status");
    let payment_str: String = row.get("payment_status");
    let customer_checked_in: Option<String> = row.get("customer_checked_in_at");
    let model_checked_in: Option<String> = row.get("model_checked_in_at");

    Ok(Booking {
        id: parse_uuid(row.get("id"))?,
        customer_id: parse_uuid(row.get("customer_id"))?,
        model_id: parse_uuid(row.get("model_id"))?,
        price: row.get("price"),
        commission_rate: row.get("commission_rate"),
        status: BookingStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid booking status: {}", status_str))?,
        payment_status: PaymentStatus::from_str(&payment_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid payment status: {}", payment_str))?,
        hold_tx: parse_uuid(row.get("hold_tx"))?,
        customer_checked_in_at: customer_checked_in.map(parse_timestamp).transpose()?,
        model_checked_in_at: model_checked_in.map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn owner_from_row(row: &SqliteRow) -> Result<Owner> {
    let kind: String = row.get("owner_kind");
    let id = parse_uuid(row.get("owner_id"))?;
    Owner::from_kind(&kind, id).ok_or_else(|| anyhow::anyhow!("Invalid owner kind: {}", kind))
}

fn parse_uuid(s: String) -> Result<Uuid> {
    Uuid::parse_str(&s).with_context(|| format!("Invalid uuid: {}", s))
}

fn parse_timestamp(s: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}
