use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    ActorId, Booking, BookingId, BookingParty, BookingStatus, Cents, CommissionSplit, CustomerId,
    ModelId, Owner, TransactionId, TransactionRecord, TxKind, TxStatus, Wallet, WalletStatus,
    balance, commission,
};
use crate::storage::{DebitOutcome, PendingOutcome, Repository, WalletDeltas};

use super::reconciliation::{ReconciliationReport, WalletDrift};
use super::{AppError, DomainEvent, LogNotifier, Notifier};

/// Per-owner serialization of check-then-act debits. Two concurrent debits
/// against the same owner cannot both pass the sufficiency check; debits
/// against different owners do not contend.
#[derive(Default)]
struct OwnerLocks {
    inner: tokio::sync::Mutex<HashMap<Owner, Arc<tokio::sync::Mutex<()>>>>,
}

impl OwnerLocks {
    async fn acquire(&self, owner: Owner) -> tokio::sync::OwnedMutexGuard<()> {
        let handle = {
            let mut map = self.inner.lock().await;
            map.entry(owner).or_default().clone()
        };
        handle.lock_owned().await
    }
}

/// The settlement engine: drives bookings through the
/// hold → release/refund lifecycle and is, together with the admin
/// operations below, the only writer of wallets and the ledger.
pub struct SettlementService {
    repo: Repository,
    locks: OwnerLocks,
    notifier: Box<dyn Notifier>,
}

/// Result of capturing a booking.
pub struct BookingResult {
    pub booking: Booking,
    pub hold: TransactionRecord,
}

/// Result of completing a booking. `earning` is absent only at a 100%
/// commission rate, where the payee's share is zero.
pub struct CompletionResult {
    pub booking: Booking,
    pub split: CommissionSplit,
    pub earning: Option<TransactionRecord>,
}

/// Result of refunding a booking (cancel, reject or dispute resolution).
pub struct RefundResult {
    pub booking: Booking,
    pub refund: TransactionRecord,
}

/// Result of a subscription payment.
pub struct SubscriptionResult {
    pub payment: TransactionRecord,
    pub earning: Option<TransactionRecord>,
    pub split: CommissionSplit,
}

/// A wallet together with its freshly derived available amount.
pub struct BalanceEntry {
    pub wallet: Wallet,
    pub available: Cents,
}

/// Which referral stream produced a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralSource {
    Booking,
    Subscription,
}

/// How a disputed booking is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeOutcome {
    Complete,
    Refund,
}

pub enum DisputeResolution {
    Completed(CompletionResult),
    Refunded(RefundResult),
}

impl SettlementService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: OwnerLocks::default(),
            notifier: Box::new(LogNotifier),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Replace the post-commit event consumer.
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn emit(&self, event: DomainEvent) {
        self.notifier.notify(&event);
    }

    // ========================
    // Wallet operations
    // ========================

    /// Create the wallet for an owner. Each owner has exactly one.
    pub async fn create_wallet(&self, owner: Owner) -> Result<Wallet, AppError> {
        if self.repo.get_wallet(owner).await?.is_some() {
            return Err(AppError::WalletAlreadyExists(owner));
        }
        let wallet = Wallet::new(owner);
        self.repo.save_wallet(&wallet).await?;
        info!(owner = %owner, "wallet created");
        Ok(wallet)
    }

    pub async fn get_wallet(&self, owner: Owner) -> Result<Wallet, AppError> {
        self.repo
            .get_wallet(owner)
            .await?
            .ok_or(AppError::WalletNotFound(owner))
    }

    /// The owner's spendable amount, always derived fresh from the wallet
    /// row's sub-totals; never read from a stored column.
    pub async fn get_available(&self, owner: Owner) -> Result<Cents, AppError> {
        Ok(self.get_wallet(owner).await?.available())
    }

    pub async fn get_balance(&self, owner: Owner) -> Result<BalanceEntry, AppError> {
        let wallet = self.get_wallet(owner).await?;
        let available = wallet.available();
        Ok(BalanceEntry { wallet, available })
    }

    pub async fn list_balances(&self) -> Result<Vec<BalanceEntry>, AppError> {
        let wallets = self.repo.list_wallets().await?;
        Ok(wallets
            .into_iter()
            .map(|wallet| {
                let available = wallet.available();
                BalanceEntry { wallet, available }
            })
            .collect())
    }

    pub async fn set_wallet_status(
        &self,
        owner: Owner,
        status: WalletStatus,
    ) -> Result<(), AppError> {
        if !self.repo.set_wallet_status(owner, status).await? {
            return Err(AppError::WalletNotFound(owner));
        }
        info!(owner = %owner, status = %status, "wallet status changed");
        Ok(())
    }

    // ========================
    // Recharge and withdrawal
    // ========================

    /// Record a customer top-up. The record stays `pending` until an admin
    /// approves it; only then does it count toward the balance.
    pub async fn recharge(
        &self,
        customer: CustomerId,
        amount: Cents,
    ) -> Result<TransactionRecord, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "recharge amount must be positive".into(),
            ));
        }
        let owner = Owner::Customer(customer);
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }

        let mut record = TransactionRecord::new(owner, TxKind::Recharge, amount, TxStatus::Pending);
        self.repo.append_transaction(&mut record).await?;
        info!(customer = %customer, amount, "recharge requested");
        self.emit(DomainEvent::RechargeRequested {
            customer,
            transaction: record.id,
            amount,
        });
        Ok(record)
    }

    /// Record a model's withdrawal request. Availability is checked net of
    /// requests still awaiting approval, under the owner lock, so a burst
    /// of requests cannot jointly overdraw the wallet once approved.
    pub async fn request_withdrawal(
        &self,
        model: ModelId,
        amount: Cents,
    ) -> Result<TransactionRecord, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "withdrawal amount must be positive".into(),
            ));
        }
        let owner = Owner::Model(model);
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }

        let _guard = self.locks.acquire(owner).await;
        let pending = self.repo.sum_pending_withdrawals(owner).await?;
        let available = self.get_available(owner).await? - pending;
        if available < amount {
            return Err(AppError::InsufficientFunds {
                owner,
                available,
                required: amount,
            });
        }

        let mut record =
            TransactionRecord::new(owner, TxKind::Withdrawal, -amount, TxStatus::Pending);
        self.repo.append_transaction(&mut record).await?;
        info!(model = %model, amount, "withdrawal requested");
        self.emit(DomainEvent::WithdrawalRequested {
            model,
            transaction: record.id,
            amount,
        });
        Ok(record)
    }

    // ========================
    // Booking lifecycle
    // ========================

    /// Book a model's service for a customer, capturing the full price as a
    /// hold against the customer's available balance.
    pub async fn create_booking(
        &self,
        customer: CustomerId,
        model: ModelId,
        price: Cents,
        commission_rate: i64,
    ) -> Result<BookingResult, AppError> {
        if price <= 0 {
            return Err(AppError::InvalidAmount("price must be positive".into()));
        }
        // Reject out-of-range rates up front, before any money moves.
        commission::split(price, commission_rate)?;

        let owner = Owner::Customer(customer);
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }
        let model_wallet = self.get_wallet(Owner::Model(model)).await?;
        if !model_wallet.is_active() {
            return Err(AppError::WalletSuspended(Owner::Model(model)));
        }

        let _guard = self.locks.acquire(owner).await;
        let available = self.get_available(owner).await?;
        if available < price {
            return Err(AppError::InsufficientFunds {
                owner,
                available,
                required: price,
            });
        }

        let mut hold = TransactionRecord::new(owner, TxKind::BookingHold, -price, TxStatus::Held);
        let booking = Booking::new(customer, model, price, commission_rate, hold.id);
        hold.booking_id = Some(booking.id);

        match self.repo.create_booking_with_hold(&booking, &mut hold).await? {
            DebitOutcome::Applied => {}
            DebitOutcome::Insufficient { available } => {
                return Err(AppError::InsufficientFunds {
                    owner,
                    available,
                    required: price,
                });
            }
        }

        info!(booking = %booking.id, customer = %customer, model = %model, price, "booking held");
        self.emit(DomainEvent::BookingHeld {
            booking: booking.id,
            customer,
            model,
            price,
        });
        Ok(BookingResult { booking, hold })
    }

    pub async fn confirm_booking(&self, id: BookingId) -> Result<Booking, AppError> {
        let booking = self.must_get_booking(id).await?;
        if !booking.can_confirm() {
            return Err(AppError::InvalidTransition {
                booking: id,
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }
        if !self
            .repo
            .update_booking_status(id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "booking {id} changed state during confirm"
            )));
        }
        info!(booking = %id, "booking confirmed");
        self.emit(DomainEvent::BookingConfirmed { booking: id });
        self.must_get_booking(id).await
    }

    /// Settle a booking in the model's favor: release the hold, split the
    /// price and credit the net payee amount as a pending earning. The hold
    /// release and the earning credit commit as one unit; a second call
    /// fails with `AlreadySettled` and appends nothing.
    pub async fn complete_booking(&self, id: BookingId) -> Result<CompletionResult, AppError> {
        let booking = self.must_get_booking(id).await?;
        if booking.is_settled() {
            return Err(AppError::AlreadySettled(id));
        }
        if !booking.can_complete() {
            return Err(AppError::InvalidTransition {
                booking: id,
                from: booking.status,
                to: BookingStatus::Completed,
            });
        }

        let split = commission::split(booking.price, booking.commission_rate)?;
        let mut earning = (split.net_payee > 0).then(|| {
            TransactionRecord::new(
                Owner::Model(booking.model_id),
                TxKind::BookingEarning,
                split.net_payee,
                TxStatus::Pending,
            )
            .with_booking(id)
        });

        if !self
            .repo
            .settle_completion(&booking, earning.as_mut())
            .await?
        {
            return Err(AppError::AlreadySettled(id));
        }

        info!(
            booking = %id,
            net_payee = split.net_payee,
            commission = split.commission,
            "booking completed"
        );
        self.emit(DomainEvent::BookingCompleted {
            booking: id,
            model: booking.model_id,
            net_payee: split.net_payee,
            commission: split.commission,
        });

        let booking = self.must_get_booking(id).await?;
        Ok(CompletionResult {
            booking,
            split,
            earning,
        })
    }

    pub async fn cancel_booking(&self, id: BookingId) -> Result<RefundResult, AppError> {
        self.refund_booking(id, BookingStatus::Cancelled, None).await
    }

    pub async fn reject_booking(
        &self,
        id: BookingId,
        reason: Option<String>,
    ) -> Result<RefundResult, AppError> {
        self.refund_booking(id, BookingStatus::Rejected, reason).await
    }

    /// The single refund path: cancellation, rejection and dispute
    /// resolution all reverse a hold through here. Admin rejection of a
    /// held booking must call this too, never edit the records directly.
    async fn refund_booking(
        &self,
        id: BookingId,
        final_status: BookingStatus,
        reason: Option<String>,
    ) -> Result<RefundResult, AppError> {
        let booking = self.must_get_booking(id).await?;
        if booking.is_settled() {
            return Err(AppError::AlreadySettled(id));
        }
        if !booking.can_refund() {
            return Err(AppError::InvalidTransition {
                booking: id,
                from: booking.status,
                to: final_status,
            });
        }

        let mut refund = TransactionRecord::new(
            Owner::Customer(booking.customer_id),
            TxKind::BookingRefund,
            booking.price,
            TxStatus::Approved,
        )
        .with_booking(id);
        if let Some(reason) = reason {
            refund = refund.with_reason(reason);
        }

        if !self
            .repo
            .settle_refund(&booking, &mut refund, final_status)
            .await?
        {
            return Err(AppError::AlreadySettled(id));
        }

        info!(booking = %id, price = booking.price, status = %final_status, "booking refunded");
        self.emit(DomainEvent::BookingRefunded {
            booking: id,
            customer: booking.customer_id,
            price: booking.price,
            final_status,
        });

        let booking = self.must_get_booking(id).await?;
        Ok(RefundResult { booking, refund })
    }

    /// Flag a booking as disputed. The payment status is untouched: the
    /// money stays where it is until the dispute is resolved.
    pub async fn dispute_booking(&self, id: BookingId) -> Result<Booking, AppError> {
        let booking = self.must_get_booking(id).await?;
        if !booking.can_dispute() {
            return Err(AppError::InvalidTransition {
                booking: id,
                from: booking.status,
                to: BookingStatus::Disputed,
            });
        }
        if !self
            .repo
            .update_booking_status(id, booking.status, BookingStatus::Disputed)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "booking {id} changed state during dispute"
            )));
        }
        info!(booking = %id, "booking disputed");
        self.emit(DomainEvent::BookingDisputed { booking: id });
        self.must_get_booking(id).await
    }

    /// Resolve a dispute by re-entering the completion or refund path; the
    /// guards there still apply, so money that already moved stays put.
    pub async fn resolve_dispute(
        &self,
        id: BookingId,
        outcome: DisputeOutcome,
    ) -> Result<DisputeResolution, AppError> {
        let booking = self.must_get_booking(id).await?;
        if booking.status != BookingStatus::Disputed {
            return Err(AppError::Conflict(format!("booking {id} is not disputed")));
        }
        match outcome {
            DisputeOutcome::Complete => {
                Ok(DisputeResolution::Completed(self.complete_booking(id).await?))
            }
            DisputeOutcome::Refund => Ok(DisputeResolution::Refunded(
                self.refund_booking(id, BookingStatus::Cancelled, Some("dispute resolved".into()))
                    .await?,
            )),
        }
    }

    /// Record a party's check-in. Set-once; a second attempt is a conflict.
    pub async fn check_in(&self, id: BookingId, party: BookingParty) -> Result<Booking, AppError> {
        self.must_get_booking(id).await?;
        if !self.repo.set_check_in(id, party, Utc::now()).await? {
            return Err(AppError::Conflict(format!(
                "booking {id} already has that check-in"
            )));
        }
        self.must_get_booking(id).await
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<Booking, AppError> {
        self.must_get_booking(id).await
    }

    // ========================
    // Subscriptions, referrals, call refunds
    // ========================

    /// Record a subscription payment: the customer's spend and the payee's
    /// pending earning commit as one unit.
    pub async fn record_subscription(
        &self,
        customer: CustomerId,
        model: ModelId,
        price: Cents,
        commission_rate: i64,
    ) -> Result<SubscriptionResult, AppError> {
        if price <= 0 {
            return Err(AppError::InvalidAmount("price must be positive".into()));
        }
        let split = commission::split(price, commission_rate)?;

        let owner = Owner::Customer(customer);
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }
        let model_wallet = self.get_wallet(Owner::Model(model)).await?;
        if !model_wallet.is_active() {
            return Err(AppError::WalletSuspended(Owner::Model(model)));
        }

        let _guard = self.locks.acquire(owner).await;
        let available = self.get_available(owner).await?;
        if available < price {
            return Err(AppError::InsufficientFunds {
                owner,
                available,
                required: price,
            });
        }

        let mut payment =
            TransactionRecord::new(owner, TxKind::Subscription, -price, TxStatus::Approved)
                .with_reason("subscription");
        let mut earning = (split.net_payee > 0).then(|| {
            TransactionRecord::new(
                Owner::Model(model),
                TxKind::BookingEarning,
                split.net_payee,
                TxStatus::Pending,
            )
            .with_reason("subscription earning")
        });

        match self
            .repo
            .record_subscription(&mut payment, earning.as_mut())
            .await?
        {
            DebitOutcome::Applied => {}
            DebitOutcome::Insufficient { available } => {
                return Err(AppError::InsufficientFunds {
                    owner,
                    available,
                    required: price,
                });
            }
        }

        info!(customer = %customer, model = %model, price, "subscription recorded");
        self.emit(DomainEvent::SubscriptionPaid {
            customer,
            model,
            price,
        });
        Ok(SubscriptionResult {
            payment,
            earning,
            split,
        })
    }

    /// Credit a referral bonus to the referring model, effective
    /// immediately.
    pub async fn credit_referral(
        &self,
        model: ModelId,
        amount: Cents,
        source: ReferralSource,
        booking: Option<BookingId>,
    ) -> Result<TransactionRecord, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "referral amount must be positive".into(),
            ));
        }
        let owner = Owner::Model(model);
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }

        let kind = match source {
            ReferralSource::Booking => TxKind::BookingReferral,
            ReferralSource::Subscription => TxKind::SubscriptionReferral,
        };
        let mut record = TransactionRecord::new(owner, kind, amount, TxStatus::Approved);
        if let Some(booking) = booking {
            record = record.with_booking(booking);
        }
        self.repo
            .append_with_wallet(
                &mut record,
                wallet.id,
                WalletDeltas {
                    balance: amount,
                    ..Default::default()
                },
            )
            .await?;

        info!(model = %model, amount, kind = %kind, "referral credited");
        self.emit(DomainEvent::ReferralCredited {
            model,
            kind,
            amount,
        });
        Ok(record)
    }

    /// Credit a call refund back to the customer, effective immediately.
    pub async fn record_call_refund(
        &self,
        customer: CustomerId,
        amount: Cents,
        unused: bool,
    ) -> Result<TransactionRecord, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "refund amount must be positive".into(),
            ));
        }
        let owner = Owner::Customer(customer);
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }

        let kind = if unused {
            TxKind::CallRefundUnused
        } else {
            TxKind::CallRefund
        };
        let mut record = TransactionRecord::new(owner, kind, amount, TxStatus::Approved);
        self.repo
            .append_with_wallet(
                &mut record,
                wallet.id,
                WalletDeltas {
                    refunded: amount,
                    ..Default::default()
                },
            )
            .await?;

        info!(customer = %customer, amount, unused, "call refunded");
        self.emit(DomainEvent::CallRefunded {
            customer,
            amount,
            unused,
        });
        Ok(record)
    }

    // ========================
    // Admin operations
    // ========================

    /// Approve a pending record. The wallet effect depends on the kind:
    /// recharges credit the balance, withdrawals bump `total_withdraw`
    /// (after an availability re-check), pending earnings move from
    /// `total_pending` into the balance.
    pub async fn approve_transaction(
        &self,
        id: TransactionId,
        actor: ActorId,
    ) -> Result<TransactionRecord, AppError> {
        let record = self.must_get_transaction(id).await?;
        if record.status != TxStatus::Pending {
            return Err(AppError::Conflict(format!(
                "transaction {id} is {}, not pending",
                record.status
            )));
        }
        let wallet = self.get_wallet(record.owner).await?;

        let (deltas, require_available) = match record.kind {
            TxKind::Recharge => (
                WalletDeltas {
                    balance: record.amount,
                    ..Default::default()
                },
                None,
            ),
            TxKind::Withdrawal => {
                let amount = record.amount.abs();
                (
                    WalletDeltas {
                        withdraw: amount,
                        ..Default::default()
                    },
                    Some(amount),
                )
            }
            TxKind::BookingEarning => (
                WalletDeltas {
                    pending: -record.amount,
                    balance: record.amount,
                    ..Default::default()
                },
                None,
            ),
            kind => {
                return Err(AppError::Conflict(format!(
                    "{kind} records are not approvable"
                )));
            }
        };

        // Approving a withdrawal is a debit; serialize it with the owner's
        // other debits.
        let _guard = match record.kind {
            TxKind::Withdrawal => Some(self.locks.acquire(record.owner).await),
            _ => None,
        };

        match self
            .repo
            .approve_pending(id, actor, wallet.id, deltas, require_available)
            .await?
        {
            PendingOutcome::Applied => {}
            PendingOutcome::StaleStatus => {
                return Err(AppError::Conflict(format!(
                    "transaction {id} is no longer pending"
                )));
            }
            PendingOutcome::Insufficient { available } => {
                return Err(AppError::InsufficientFunds {
                    owner: record.owner,
                    available,
                    required: record.amount.abs(),
                });
            }
        }

        info!(transaction = %id, kind = %record.kind, actor = %actor, "transaction approved");
        self.emit(DomainEvent::TransactionApproved {
            transaction: id,
            owner: record.owner,
            kind: record.kind,
            amount: record.amount,
        });
        self.must_get_transaction(id).await
    }

    /// Reject a pending record. Money that was held for a booking is not
    /// handled here: rejecting a booking goes through the refund path.
    pub async fn reject_transaction(
        &self,
        id: TransactionId,
        actor: ActorId,
        reason: Option<String>,
    ) -> Result<TransactionRecord, AppError> {
        let record = self.must_get_transaction(id).await?;
        if record.status != TxStatus::Pending {
            return Err(AppError::Conflict(format!(
                "transaction {id} is {}, not pending",
                record.status
            )));
        }
        let wallet = self.get_wallet(record.owner).await?;

        // A rejected pending earning leaves total_pending; everything else
        // never reached the wallet.
        let deltas = match record.kind {
            TxKind::BookingEarning => WalletDeltas {
                pending: -record.amount,
                ..Default::default()
            },
            _ => WalletDeltas::default(),
        };

        if !self
            .repo
            .reject_pending(id, actor, reason.as_deref(), wallet.id, deltas)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "transaction {id} is no longer pending"
            )));
        }

        info!(transaction = %id, kind = %record.kind, actor = %actor, "transaction rejected");
        self.emit(DomainEvent::TransactionRejected {
            transaction: id,
            owner: record.owner,
            kind: record.kind,
        });
        self.must_get_transaction(id).await
    }

    /// Administrative balance correction. Bypasses the sufficiency check
    /// but still lands in the ledger, so a from-scratch recompute can
    /// explain the wallet afterwards.
    pub async fn adjust_wallet(
        &self,
        owner: Owner,
        delta: Cents,
        actor: ActorId,
        reason: String,
    ) -> Result<TransactionRecord, AppError> {
        if delta == 0 {
            return Err(AppError::InvalidAmount(
                "adjustment delta must be non-zero".into(),
            ));
        }
        let wallet = self.get_wallet(owner).await?;
        if !wallet.is_active() {
            return Err(AppError::WalletSuspended(owner));
        }

        let mut record = TransactionRecord::new(owner, TxKind::Adjustment, delta, TxStatus::Approved)
            .with_reason(reason)
            .with_approved_by(actor);
        self.repo
            .append_with_wallet(
                &mut record,
                wallet.id,
                WalletDeltas {
                    balance: delta,
                    ..Default::default()
                },
            )
            .await?;

        let after = self.get_wallet(owner).await?;
        if after.available() < 0 {
            warn!(owner = %owner, available = after.available(), "adjustment left available balance negative");
        }
        info!(owner = %owner, delta, actor = %actor, "wallet adjusted");
        self.emit(DomainEvent::WalletAdjusted { owner, delta });
        Ok(record)
    }

    /// Pending records awaiting an admin decision.
    pub async fn list_pending(
        &self,
        kind: Option<TxKind>,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        Ok(self.repo.list_pending(kind).await?)
    }

    // ========================
    // Queries and reconciliation
    // ========================

    pub async fn list_transactions(
        &self,
        owner: Option<Owner>,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        match owner {
            Some(owner) => Ok(self.repo.list_transactions_for_owner(owner).await?),
            None => Ok(self.repo.list_transactions().await?),
        }
    }

    /// Recompute every wallet's totals from its ledger slice and compare
    /// with the materialized row. With `repair`, drifted rows are rewritten
    /// to the computed truth; the ledger itself is never touched.
    pub async fn reconcile(&self, repair: bool) -> Result<ReconciliationReport, AppError> {
        let wallets = self.repo.list_wallets().await?;
        let checked = wallets.len();
        let mut drifted = Vec::new();

        for wallet in wallets {
            let records = self.repo.list_transactions_for_owner(wallet.owner).await?;
            let computed = balance::compute_totals(wallet.owner, &records);
            if computed != wallet.totals {
                warn!(
                    owner = %wallet.owner,
                    stored = ?wallet.totals,
                    computed = ?computed,
                    "wallet totals drifted from ledger"
                );
                if repair {
                    self.repo.replace_wallet_totals(wallet.id, &computed).await?;
                }
                drifted.push(WalletDrift {
                    wallet_id: wallet.id,
                    owner: wallet.owner,
                    stored: wallet.totals,
                    computed,
                });
            }
        }

        Ok(ReconciliationReport {
            checked,
            repaired: repair,
            drifted,
        })
    }

    // ========================
    // Internal helpers
    // ========================

    async fn must_get_booking(&self, id: BookingId) -> Result<Booking, AppError> {
        self.repo
            .get_booking(id)
            .await?
            .ok_or(AppError::BookingNotFound(id))
    }

    async fn must_get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or(AppError::TransactionNotFound(id))
    }
}
