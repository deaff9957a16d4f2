//! Pure aggregation of ledger records into wallet totals.
//!
//! These folds are the canonical reducer for wallet state: the repository
//! applies the same deltas incrementally on each write, and reconciliation
//! recomputes from scratch through here to detect drift. They are
//! order-independent and idempotent: folding the same record set twice
//! yields identical totals.

use super::{CustomerTotals, ModelTotals, Owner, TransactionRecord, TxKind, TxStatus, WalletTotals};

/// Aggregate a customer's ledger slice into materialized totals.
///
/// Holds count toward spend in both `held` and `released` states, so a
/// refunded hold still counts; the refund credit is added back separately.
pub fn customer_totals(records: &[TransactionRecord]) -> CustomerTotals {
    records
        .iter()
        .fold(CustomerTotals::default(), |mut acc, record| {
            match (record.kind, record.status) {
                (TxKind::Recharge | TxKind::Adjustment, TxStatus::Approved) => {
                    acc.total_balance += record.amount;
                }
                (TxKind::BookingHold, TxStatus::Held | TxStatus::Released) => {
                    acc.total_spend += record.amount.abs();
                }
                (TxKind::Subscription, TxStatus::Approved) => {
                    acc.total_spend += record.amount.abs();
                }
                (
                    TxKind::BookingRefund | TxKind::CallRefund | TxKind::CallRefundUnused,
                    TxStatus::Approved,
                ) => {
                    acc.total_refunded += record.amount;
                }
                _ => {}
            }
            acc
        })
}

/// Aggregate a model's ledger slice into materialized totals.
pub fn model_totals(records: &[TransactionRecord]) -> ModelTotals {
    records
        .iter()
        .fold(ModelTotals::default(), |mut acc, record| {
            match (record.kind, record.status) {
                (
                    TxKind::BookingEarning
                    | TxKind::BookingReferral
                    | TxKind::SubscriptionReferral
                    | TxKind::Adjustment,
                    TxStatus::Approved,
                ) => {
                    acc.total_balance += record.amount;
                }
                (TxKind::BookingEarning, TxStatus::Pending) => {
                    acc.total_pending += record.amount;
                }
                (TxKind::Withdrawal, TxStatus::Approved) => {
                    acc.total_withdraw += record.amount.abs();
                }
                _ => {}
            }
            acc
        })
}

/// Aggregate the slice under the owner's role.
pub fn compute_totals(owner: Owner, records: &[TransactionRecord]) -> WalletTotals {
    match owner {
        Owner::Customer(_) => WalletTotals::Customer(customer_totals(records)),
        Owner::Model(_) => WalletTotals::Model(model_totals(records)),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn record(owner: Owner, kind: TxKind, amount: i64, status: TxStatus) -> TransactionRecord {
        TransactionRecord::new(owner, kind, amount, status)
    }

    #[test]
    fn empty_slice_is_zero() {
        assert_eq!(customer_totals(&[]), CustomerTotals::default());
        assert_eq!(model_totals(&[]), ModelTotals::default());
    }

    #[test]
    fn customer_hold_then_complete() {
        let owner = Owner::Customer(Uuid::new_v4());
        let records = vec![
            record(owner, TxKind::Recharge, 100_000, TxStatus::Approved),
            record(owner, TxKind::BookingHold, -30_000, TxStatus::Released),
        ];

        let totals = customer_totals(&records);
        assert_eq!(totals.total_balance, 100_000);
        assert_eq!(totals.total_spend, 30_000);
        assert_eq!(totals.total_refunded, 0);
        assert_eq!(totals.available(), 70_000);
    }

    #[test]
    fn customer_refund_is_additive() {
        // A refunded hold still counts toward spend; the refund credit
        // brings available back to where it started.
        let owner = Owner::Customer(Uuid::new_v4());
        let records = vec![
            record(owner, TxKind::Recharge, 100_000, TxStatus::Approved),
            record(owner, TxKind::BookingHold, -30_000, TxStatus::Released),
            record(owner, TxKind::BookingRefund, 30_000, TxStatus::Approved),
        ];

        let totals = customer_totals(&records);
        assert_eq!(totals.total_spend, 30_000);
        assert_eq!(totals.total_refunded, 30_000);
        assert_eq!(totals.available(), 100_000);
    }

    #[test]
    fn pending_recharge_does_not_count() {
        let owner = Owner::Customer(Uuid::new_v4());
        let records = vec![
            record(owner, TxKind::Recharge, 50_000, TxStatus::Pending),
            record(owner, TxKind::Recharge, 20_000, TxStatus::Rejected),
        ];
        assert_eq!(customer_totals(&records).total_balance, 0);
    }

    #[test]
    fn call_refunds_count_as_refunded() {
        let owner = Owner::Customer(Uuid::new_v4());
        let records = vec![
            record(owner, TxKind::CallRefund, 5_000, TxStatus::Approved),
            record(owner, TxKind::CallRefundUnused, 1_500, TxStatus::Approved),
        ];
        assert_eq!(customer_totals(&records).total_refunded, 6_500);
    }

    #[test]
    fn model_earnings_and_withdrawals() {
        let owner = Owner::Model(Uuid::new_v4());
        let records = vec![
            record(owner, TxKind::BookingEarning, 24_000, TxStatus::Approved),
            record(owner, TxKind::BookingEarning, 8_000, TxStatus::Pending),
            record(owner, TxKind::BookingReferral, 1_000, TxStatus::Approved),
            record(owner, TxKind::Withdrawal, -10_000, TxStatus::Approved),
            record(owner, TxKind::Withdrawal, -5_000, TxStatus::Pending),
        ];

        let totals = model_totals(&records);
        assert_eq!(totals.total_balance, 25_000);
        assert_eq!(totals.total_pending, 8_000);
        assert_eq!(totals.total_withdraw, 10_000);
        assert_eq!(totals.available(), 15_000);
    }

    #[test]
    fn adjustment_counts_into_balance_for_both_kinds() {
        let customer = Owner::Customer(Uuid::new_v4());
        let model = Owner::Model(Uuid::new_v4());

        let c = customer_totals(&[record(customer, TxKind::Adjustment, -2_000, TxStatus::Approved)]);
        assert_eq!(c.total_balance, -2_000);

        let m = model_totals(&[record(model, TxKind::Adjustment, 3_000, TxStatus::Approved)]);
        assert_eq!(m.total_balance, 3_000);
    }

    #[test]
    fn fold_is_idempotent_and_order_independent() {
        let owner = Owner::Customer(Uuid::new_v4());
        let mut records = vec![
            record(owner, TxKind::Recharge, 100_000, TxStatus::Approved),
            record(owner, TxKind::BookingHold, -30_000, TxStatus::Held),
            record(owner, TxKind::BookingHold, -20_000, TxStatus::Released),
            record(owner, TxKind::BookingRefund, 20_000, TxStatus::Approved),
            record(owner, TxKind::Subscription, -5_000, TxStatus::Approved),
        ];

        let first = customer_totals(&records);
        let second = customer_totals(&records);
        assert_eq!(first, second);

        records.reverse();
        assert_eq!(customer_totals(&records), first);
    }

    #[test]
    fn compute_totals_dispatches_on_owner_kind() {
        let customer = Owner::Customer(Uuid::new_v4());
        let model = Owner::Model(Uuid::new_v4());
        assert!(matches!(
            compute_totals(customer, &[]),
            WalletTotals::Customer(_)
        ));
        assert!(matches!(compute_totals(model, &[]), WalletTotals::Model(_)));
    }
}
