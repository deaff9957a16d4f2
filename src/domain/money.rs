use std::fmt;

/// All monetary amounts are integers in the smallest currency unit.
/// Ledger amounts are signed: negative values debit the owning wallet,
/// positive values credit it.
pub type Cents = i64;

/// Format an amount as a decimal string: 30000 -> "300.00", -150 -> "-1.50"
pub fn format_amount(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string into an amount.
/// Accepts "300", "300.5" and "300.00"; extra decimal digits are rejected.
pub fn parse_amount(input: &str) -> Result<Cents, AmountParseError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if digits.is_empty() {
        return Err(AmountParseError::Empty);
    }

    let (units_str, frac_str) = match digits.split_once('.') {
        Some((u, f)) => (u, f),
        None => (digits, ""),
    };

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| AmountParseError::InvalidDigits)?
    };

    let frac: i64 = match frac_str.len() {
        0 => 0,
        1 => {
            frac_str
                .parse::<i64>()
                .map_err(|_| AmountParseError::InvalidDigits)?
                * 10
        }
        2 => frac_str
            .parse()
            .map_err(|_| AmountParseError::InvalidDigits)?,
        _ => return Err(AmountParseError::TooManyDecimals),
    };

    let amount = units * 100 + frac;
    Ok(if negative { -amount } else { amount })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    Empty,
    InvalidDigits,
    TooManyDecimals,
}

impl fmt::Display for AmountParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountParseError::Empty => write!(f, "empty amount"),
            AmountParseError::InvalidDigits => write!(f, "invalid amount format"),
            AmountParseError::TooManyDecimals => write!(f, "more than two decimal places"),
        }
    }
}

impl std::error::Error for AmountParseError {}
