use thiserror::Error;

use crate::domain::{
    BookingId, BookingStatus, Cents, CommissionError, Owner, TransactionId,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no wallet for {0}")]
    WalletNotFound(Owner),

    #[error("wallet already exists for {0}")]
    WalletAlreadyExists(Owner),

    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("insufficient funds for {owner}: available {available}, required {required}")]
    InsufficientFunds {
        owner: Owner,
        available: Cents,
        required: Cents,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{0}")]
    InvalidCommission(#[from] CommissionError),

    #[error("booking {0} is already settled")]
    AlreadySettled(BookingId),

    #[error("booking {booking} cannot move from {from} to {to}")]
    InvalidTransition {
        booking: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Optimistic-guard mismatch: the record or booking changed underneath
    /// the caller. Retryable once the caller re-reads current state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("wallet for {0} is not active")]
    WalletSuspended(Owner),

    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn messages_carry_the_numbers() {
        let owner = Owner::Customer(Uuid::nil());
        let err = AppError::InsufficientFunds {
            owner,
            available: 70_000,
            required: 80_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("80000"));
        assert!(msg.contains("customer"));
    }

    #[test]
    fn commission_error_converts() {
        let err: AppError = CommissionError::RateOutOfRange(120).into();
        assert!(matches!(err, AppError::InvalidCommission(_)));
    }
}
