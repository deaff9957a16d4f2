use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActorId, Cents, Owner};

pub type TransactionId = Uuid;
pub type BookingId = Uuid;

/// What kind of monetary event a ledger record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Customer tops up their balance (pending until an admin approves).
    Recharge,
    /// Funds reserved against a customer's balance for a booking.
    BookingHold,
    /// Net payee amount credited to a model when a booking completes.
    BookingEarning,
    /// Hold returned to the customer on cancellation/rejection/dispute refund.
    BookingRefund,
    /// Referral bonus on a booking, credited to the referring model.
    BookingReferral,
    /// Customer pays for a subscription.
    Subscription,
    /// Referral bonus on a subscription, credited to the referring model.
    SubscriptionReferral,
    /// Model withdraws earnings off the platform.
    Withdrawal,
    /// Refund of a paid call, credited to the customer.
    CallRefund,
    /// Refund of unused call minutes, credited to the customer.
    CallRefundUnused,
    /// Manual administrative balance correction, always ledger-recorded.
    Adjustment,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Recharge => "recharge",
            TxKind::BookingHold => "booking_hold",
            TxKind::BookingEarning => "booking_earning",
            TxKind::BookingRefund => "booking_refund",
            TxKind::BookingReferral => "booking_referral",
            TxKind::Subscription => "subscription",
            TxKind::SubscriptionReferral => "subscription_referral",
            TxKind::Withdrawal => "withdrawal",
            TxKind::CallRefund => "call_refund",
            TxKind::CallRefundUnused => "call_refund_unused",
            TxKind::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recharge" => Some(TxKind::Recharge),
            "booking_hold" => Some(TxKind::BookingHold),
            "booking_earning" => Some(TxKind::BookingEarning),
            "booking_refund" => Some(TxKind::BookingRefund),
            "booking_referral" => Some(TxKind::BookingReferral),
            "subscription" => Some(TxKind::Subscription),
            "subscription_referral" => Some(TxKind::SubscriptionReferral),
            "withdrawal" => Some(TxKind::Withdrawal),
            "call_refund" => Some(TxKind::CallRefund),
            "call_refund_unused" => Some(TxKind::CallRefundUnused),
            "adjustment" => Some(TxKind::Adjustment),
            _ => None,
        }
    }

    pub fn is_referral(&self) -> bool {
        matches!(self, TxKind::BookingReferral | TxKind::SubscriptionReferral)
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a ledger record. The only field of a record that is
/// ever updated in place, and only through guarded transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Held,
    Released,
    Approved,
    Rejected,
    Cancelled,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Held => "held",
            TxStatus::Released => "released",
            TxStatus::Approved => "approved",
            TxStatus::Rejected => "rejected",
            TxStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TxStatus::Pending),
            "held" => Some(TxStatus::Held),
            "released" => Some(TxStatus::Released),
            "approved" => Some(TxStatus::Approved),
            "rejected" => Some(TxStatus::Rejected),
            "cancelled" => Some(TxStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One monetary event. Records are append-only: amount, kind and owner are
/// immutable once written; only `status` (plus the actor/reason audit fields
/// set alongside a status transition) ever changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Monotonically increasing sequence number assigned by the repository.
    pub sequence: i64,
    pub owner: Owner,
    pub kind: TxKind,
    /// Signed amount in the smallest currency unit; negative debits the owner.
    pub amount: Cents,
    pub status: TxStatus,
    /// Booking this record belongs to, for holds, earnings and refunds.
    pub booking_id: Option<BookingId>,
    pub reason: Option<String>,
    pub approved_by: Option<ActorId>,
    pub rejected_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(owner: Owner, kind: TxKind, amount: Cents, status: TxStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // assigned by the repository
            owner,
            kind,
            amount,
            status,
            booking_id: None,
            reason: None,
            approved_by: None,
            rejected_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_booking(mut self, booking_id: BookingId) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_approved_by(mut self, actor: ActorId) -> Self {
        self.approved_by = Some(actor);
        self
    }

    /// True if the record debits its owner.
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_string_roundtrip() {
        for kind in [
            TxKind::Recharge,
            TxKind::BookingHold,
            TxKind::BookingEarning,
            TxKind::BookingRefund,
            TxKind::BookingReferral,
            TxKind::Subscription,
            TxKind::SubscriptionReferral,
            TxKind::Withdrawal,
            TxKind::CallRefund,
            TxKind::CallRefundUnused,
            TxKind::Adjustment,
        ] {
            assert_eq!(TxKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TxKind::from_str("chargeback"), None);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            TxStatus::Pending,
            TxStatus::Held,
            TxStatus::Released,
            TxStatus::Approved,
            TxStatus::Rejected,
            TxStatus::Cancelled,
        ] {
            assert_eq!(TxStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TxStatus::from_str("settled"), None);
    }

    #[test]
    fn builder_sets_optional_fields() {
        let owner = Owner::Customer(Uuid::new_v4());
        let booking = Uuid::new_v4();
        let record = TransactionRecord::new(owner, TxKind::BookingHold, -30000, TxStatus::Held)
            .with_booking(booking)
            .with_reason("booked: video call");

        assert_eq!(record.booking_id, Some(booking));
        assert_eq!(record.reason.as_deref(), Some("booked: video call"));
        assert!(record.is_debit());
    }

    #[test]
    fn referral_kinds() {
        assert!(TxKind::BookingReferral.is_referral());
        assert!(TxKind::SubscriptionReferral.is_referral());
        assert!(!TxKind::BookingEarning.is_referral());
    }
}
