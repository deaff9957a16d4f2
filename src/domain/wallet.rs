use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Owner};

pub type WalletId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Suspended,
}

impl WalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Suspended => "suspended",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WalletStatus::Active),
            "suspended" => Some(WalletStatus::Suspended),
            _ => None,
        }
    }
}

impl std::fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Materialized totals for a customer wallet.
/// `total_spend` counts every hold ever placed (including later-refunded
/// ones); refunds are added back separately via `total_refunded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerTotals {
    pub total_balance: Cents,
    pub total_spend: Cents,
    pub total_refunded: Cents,
}

impl CustomerTotals {
    pub fn available(&self) -> Cents {
        self.total_balance - self.total_spend + self.total_refunded
    }
}

/// Materialized totals for a model wallet. `total_pending` is earnings
/// awaiting approval; it is not spendable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTotals {
    pub total_balance: Cents,
    pub total_withdraw: Cents,
    pub total_pending: Cents,
}

impl ModelTotals {
    pub fn available(&self) -> Cents {
        self.total_balance - self.total_withdraw
    }
}

/// Role-specific wallet totals, tagged to match the owner kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTotals {
    Customer(CustomerTotals),
    Model(ModelTotals),
}

impl WalletTotals {
    /// Zeroed totals of the variant matching the owner.
    pub fn zero_for(owner: Owner) -> Self {
        match owner {
            Owner::Customer(_) => WalletTotals::Customer(CustomerTotals::default()),
            Owner::Model(_) => WalletTotals::Model(ModelTotals::default()),
        }
    }

    /// The derived, spendable amount. Never stored.
    pub fn available(&self) -> Cents {
        match self {
            WalletTotals::Customer(t) => t.available(),
            WalletTotals::Model(t) => t.available(),
        }
    }

    pub fn total_balance(&self) -> Cents {
        match self {
            WalletTotals::Customer(t) => t.total_balance,
            WalletTotals::Model(t) => t.total_balance,
        }
    }
}

/// Materialized balance record, one per owner. The ledger is the source of
/// truth; these columns are a cache maintained alongside every ledger write
/// and reconciled against a from-scratch recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub owner: Owner,
    pub status: WalletStatus,
    pub totals: WalletTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner: Owner) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            status: WalletStatus::Active,
            totals: WalletTotals::zero_for(owner),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn available(&self) -> Cents {
        self.totals.available()
    }

    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }
}
