use serde::Serialize;
use tracing::info;

use crate::domain::{
    BookingId, BookingStatus, Cents, CustomerId, ModelId, Owner, TransactionId, TxKind,
};

/// Outcome of a committed settlement operation, handed to the notification
/// layer after the transaction is durable. Delivery is fire-and-forget:
/// nothing here can affect ledger correctness.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingHeld {
        booking: BookingId,
        customer: CustomerId,
        model: ModelId,
        price: Cents,
    },
    BookingConfirmed {
        booking: BookingId,
    },
    BookingCompleted {
        booking: BookingId,
        model: ModelId,
        net_payee: Cents,
        commission: Cents,
    },
    BookingRefunded {
        booking: BookingId,
        customer: CustomerId,
        price: Cents,
        final_status: BookingStatus,
    },
    BookingDisputed {
        booking: BookingId,
    },
    RechargeRequested {
        customer: CustomerId,
        transaction: TransactionId,
        amount: Cents,
    },
    TransactionApproved {
        transaction: TransactionId,
        owner: Owner,
        kind: TxKind,
        amount: Cents,
    },
    TransactionRejected {
        transaction: TransactionId,
        owner: Owner,
        kind: TxKind,
    },
    WithdrawalRequested {
        model: ModelId,
        transaction: TransactionId,
        amount: Cents,
    },
    SubscriptionPaid {
        customer: CustomerId,
        model: ModelId,
        price: Cents,
    },
    ReferralCredited {
        model: ModelId,
        kind: TxKind,
        amount: Cents,
    },
    CallRefunded {
        customer: CustomerId,
        amount: Cents,
        unused: bool,
    },
    WalletAdjusted {
        owner: Owner,
        delta: Cents,
    },
}

/// Consumer of post-commit events. Implementations fan events out to SMS,
/// email or push; the default just logs them.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &DomainEvent);
}

/// Notifier that writes each event to the log and nothing else.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &DomainEvent) {
        info!(event = ?event, "domain event");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;

    struct Recording(Mutex<Vec<String>>);

    impl Notifier for Recording {
        fn notify(&self, event: &DomainEvent) {
            self.0.lock().unwrap().push(format!("{event:?}"));
        }
    }

    #[test]
    fn notifier_receives_events() {
        let recorder = Recording(Mutex::new(Vec::new()));
        recorder.notify(&DomainEvent::BookingConfirmed {
            booking: Uuid::new_v4(),
        });
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DomainEvent::CallRefunded {
            customer: Uuid::nil(),
            amount: 5_000,
            unused: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"call_refunded\""));
    }
}
