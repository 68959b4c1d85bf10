//! Fixed-point amounts (7 decimal places) and rational prices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Amount in stroops: one unit is 10^7 stroops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub const DECIMALS: u32 = 7;
    pub const ONE: i64 = 10_000_000;
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(i64::MAX);

    pub const fn from_stroops(stroops: i64) -> Self {
        Self(stroops)
    }

    pub const fn stroops(&self) -> i64 {
        self.0
    }

    /// Parses a non-negative decimal string such as `"100"` or `"0.5"`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidAmount {
            value: value.to_string(),
            reason,
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty"));
        }
        let (whole, frac) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (trimmed, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if frac.len() > Self::DECIMALS as usize {
            return Err(invalid("more than 7 decimal places"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("out of range"))?
        };
        let mut frac_stroops: i64 = 0;
        for (idx, digit) in frac.bytes().enumerate() {
            frac_stroops += i64::from(digit - b'0') * 10i64.pow(Self::DECIMALS - 1 - idx as u32);
        }
        whole
            .checked_mul(Self::ONE)
            .and_then(|v| v.checked_add(frac_stroops))
            .map(Self)
            .ok_or_else(|| invalid("out of range"))
    }

    /// Like [`Amount::parse`], but zero is rejected.
    pub fn parse_positive(value: &str) -> Result<Self, ValidationError> {
        let amount = Self::parse(value)?;
        if amount.0 == 0 {
            return Err(ValidationError::InvalidAmount {
                value: value.to_string(),
                reason: "must be greater than zero",
            });
        }
        Ok(amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::ONE;
        let frac = (self.0 % Self::ONE).abs();
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:07}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

/// Rational price `n / d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub n: i32,
    pub d: i32,
}

impl Price {
    pub const ONE: Price = Price { n: 1, d: 1 };

    pub const fn new(n: i32, d: i32) -> Self {
        Self { n, d }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.n, self.d)
    }
}
