use serde::Serialize;

use crate::domain::{Owner, WalletId, WalletTotals};

/// One wallet whose materialized columns disagree with a from-scratch
/// recompute of its ledger slice.
#[derive(Debug, Clone, Serialize)]
pub struct WalletDrift {
    pub wallet_id: WalletId,
    pub owner: Owner,
    pub stored: WalletTotals,
    pub computed: WalletTotals,
}

/// Result of auditing every wallet against the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub checked: usize,
    /// Whether drifted wallets were rewritten to the computed totals.
    pub repaired: bool,
    pub drifted: Vec<WalletDrift>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drifted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::domain::CustomerTotals;

    use super::*;

    #[test]
    fn empty_report_is_consistent() {
        let report = ReconciliationReport {
            checked: 3,
            repaired: false,
            drifted: Vec::new(),
        };
        assert!(report.is_consistent());
    }

    #[test]
    fn drift_makes_report_inconsistent() {
        let report = ReconciliationReport {
            checked: 1,
            repaired: false,
            drifted: vec![WalletDrift {
                wallet_id: Uuid::new_v4(),
                owner: Owner::Customer(Uuid::new_v4()),
                stored: WalletTotals::Customer(CustomerTotals {
                    total_balance: 100,
                    total_spend: 0,
                    total_refunded: 0,
                }),
                computed: WalletTotals::Customer(CustomerTotals::default()),
            }],
        };
        assert!(!report.is_consistent());
    }
}
