pub mod error;
pub mod events;
pub mod reconciliation;
pub mod service;

pub use error::AppError;
pub use events::{DomainEvent, LogNotifier, Notifier};
pub use reconciliation::{ReconciliationReport, WalletDrift};
pub use service::*;
