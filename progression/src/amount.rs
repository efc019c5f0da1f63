//! Fixed-point token amounts.
//!
//! Rewards are denominated in the chain's native token with 18 fractional
//! digits. Amounts are kept as an integer count of the smallest unit (wei) so
//! that streak bonuses accumulated over many check-ins never drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by an [`Amount`].
pub const DECIMALS: usize = 18;

/// Smallest units per whole token.
pub const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid amount: {0}")]
    InvalidDigit(String),

    #[error("Amount has more than {DECIMALS} fractional digits: {0}")]
    TooPrecise(String),

    #[error("Amount out of range: {0}")]
    Overflow(String),
}

/// Unsigned token amount with wei precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// Whole tokens, e.g. `Amount::from_tokens(5)` is `5`.
    pub const fn from_tokens(tokens: u64) -> Self {
        Self(tokens as u128 * WEI_PER_TOKEN)
    }

    pub const fn wei(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn checked_mul(self, factor: u64) -> Option<Amount> {
        self.0.checked_mul(factor as u128).map(Amount)
    }

    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (int_digits, frac_digits) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_digits.is_empty() && frac_digits.is_empty())
            || !all_digits(int_digits)
            || !all_digits(frac_digits)
        {
            return Err(AmountError::InvalidDigit(s.to_string()));
        }
        if frac_digits.len() > DECIMALS {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole: u128 = if int_digits.is_empty() {
            0
        } else {
            int_digits
                .parse()
                .map_err(|_| AmountError::Overflow(s.to_string()))?
        };

        // Right-pad the fraction to exactly DECIMALS digits.
        let mut frac: u128 = 0;
        for (i, b) in frac_digits.bytes().enumerate() {
            frac += (b - b'0') as u128 * 10u128.pow((DECIMALS - 1 - i) as u32);
        }

        whole
            .checked_mul(WEI_PER_TOKEN)
            .and_then(|w| w.checked_add(frac))
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_TOKEN;
        let frac = self.0 % WEI_PER_TOKEN;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", frac, width = DECIMALS);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_amounts() {
        let a: Amount = "0.013".parse().unwrap();
        assert_eq!(a.wei(), 13_000_000_000_000_000);
        assert_eq!(a.to_string(), "0.013");

        let b: Amount = ".5".parse().unwrap();
        assert_eq!(b, Amount::from_wei(WEI_PER_TOKEN / 2));
    }

    #[test]
    fn whole_amounts_display_without_fraction() {
        assert_eq!(Amount::from_tokens(10).to_string(), "10");
        assert_eq!("10".parse::<Amount>().unwrap(), Amount::from_tokens(10));
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn smallest_unit_survives_display() {
        let one_wei = Amount::from_wei(1);
        assert_eq!(one_wei.to_string(), "0.000000000000000001");
        assert_eq!(one_wei.to_string().parse::<Amount>().unwrap(), one_wei);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!("".parse::<Amount>(), Err(AmountError::Empty));
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::InvalidDigit(_))));
        assert!(matches!("1.2.3".parse::<Amount>(), Err(AmountError::InvalidDigit(_))));
        assert!(matches!(".".parse::<Amount>(), Err(AmountError::InvalidDigit(_))));
        assert!(matches!(
            "0.0000000000000000001".parse::<Amount>(),
            Err(AmountError::TooPrecise(_))
        ));
        assert!(matches!(
            "999999999999999999999999999".parse::<Amount>(),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn repeated_small_additions_do_not_drift() {
        let step: Amount = "0.001".parse().unwrap();
        let total: Amount = std::iter::repeat(step).take(1000).sum();
        assert_eq!(total, Amount::from_tokens(1));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let a: Amount = "0.05".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0.05\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
        assert!(serde_json::from_str::<Amount>("\"abc\"").is_err());
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount::from_tokens(1);
        let b: Amount = "0.25".parse().unwrap();
        assert_eq!(a.checked_sub(b).unwrap().to_string(), "0.75");
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), Amount::ZERO);
        assert_eq!(b.checked_mul(4), Some(a));
    }
}
