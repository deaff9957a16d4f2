use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BookingId, Cents, CustomerId, ModelId, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Rejected,
    Disputed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Disputed => "disputed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "rejected" => Some(BookingStatus::Rejected),
            "disputed" => Some(BookingStatus::Disputed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the booking's money currently sits. `Released` is terminal and
/// reachable exactly once, via completion; `Refunded` is terminal via the
/// refund path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Held,
    Released,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Held => "held",
            PaymentStatus::Released => "released",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "held" => Some(PaymentStatus::Held),
            "released" => Some(PaymentStatus::Released),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of a booking is acting, for check-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingParty {
    Customer,
    Model,
}

/// A paid interaction between a customer and a model. Created together with
/// its hold: a booking never exists without its price captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub customer_id: CustomerId,
    pub model_id: ModelId,
    /// Service price, captured in full as the hold.
    pub price: Cents,
    /// Whole-percent platform commission applied on completion.
    pub commission_rate: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// The `booking_hold` ledger record backing this booking.
    pub hold_tx: TransactionId,
    /// Set-once check-in timestamps; independent of the financial lifecycle.
    pub customer_checked_in_at: Option<DateTime<Utc>>,
    pub model_checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        customer_id: CustomerId,
        model_id: ModelId,
        price: Cents,
        commission_rate: i64,
        hold_tx: TransactionId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            model_id,
            price,
            commission_rate,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Held,
            hold_tx,
            customer_checked_in_at: None,
            model_checked_in_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    /// Completion is allowed from `confirmed` or `disputed`, and only while
    /// the hold is still in place.
    pub fn can_complete(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Confirmed | BookingStatus::Disputed
        ) && self.payment_status == PaymentStatus::Held
    }

    /// The refund path serves cancellation, rejection and dispute
    /// resolution; all of them require the hold to still be in place.
    pub fn can_refund(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Disputed
        ) && self.payment_status == PaymentStatus::Held
    }

    /// Disputes can be raised against confirmed or already-completed
    /// bookings; the payment status is untouched by the flag itself.
    pub fn can_dispute(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Confirmed | BookingStatus::Completed
        )
    }

    pub fn is_settled(&self) -> bool {
        self.payment_status != PaymentStatus::Held
    }
}
