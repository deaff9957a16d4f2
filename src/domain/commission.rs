use super::Cents;

/// Result of splitting a price between the platform and the payee.
/// Conservation holds exactly: `commission + net_payee == price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSplit {
    pub commission: Cents,
    pub net_payee: Cents,
}

/// Split a price by a whole-percent commission rate, flooring the
/// commission; the rounding remainder goes to the payee.
///
/// The pricing catalog upstream should never produce out-of-range rates,
/// but they are rejected here rather than silently misbehaving.
pub fn split(price: Cents, rate_percent: i64) -> Result<CommissionSplit, CommissionError> {
    if price < 0 {
        return Err(CommissionError::NegativePrice(price));
    }
    if !(0..=100).contains(&rate_percent) {
        return Err(CommissionError::RateOutOfRange(rate_percent));
    }

    // Both operands are non-negative, so integer division floors.
    let commission = price * rate_percent / 100;
    Ok(CommissionSplit {
        commission,
        net_payee: price - commission,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommissionError {
    RateOutOfRange(i64),
    NegativePrice(Cents),
}

impl std::fmt::Display for CommissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommissionError::RateOutOfRange(rate) => {
                write!(f, "commission rate {} is outside 0..=100", rate)
            }
            CommissionError::NegativePrice(price) => {
                write!(f, "price must not be negative, got {}", price)
            }
        }
    }
}

impl std::error::Error for CommissionError {}
