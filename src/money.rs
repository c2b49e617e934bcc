//! Ringgit arithmetic helpers and the TEXT-column codec.
//!
//! All monetary values are `BigDecimal`. Amounts round to 2 decimal
//! places, statutory rates keep 4. Rounding is half-away-from-zero,
//! which is what the statutory schedules prescribe.

use std::str::FromStr;

use anyhow::{Context, Result};
use bigdecimal::{BigDecimal, RoundingMode};

pub fn zero() -> BigDecimal {
    BigDecimal::from(0).with_scale(2)
}

/// Exact construction from integer sen, e.g. `from_sen(1475)` is 14.75.
pub fn from_sen(sen: i64) -> BigDecimal {
    (BigDecimal::from(sen) / BigDecimal::from(100)).with_scale(2)
}

/// Round to 2 decimal places, ties away from zero.
pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Round to the whole ringgit, ties away from zero.
pub fn round_ringgit(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(0, RoundingMode::HalfUp).with_scale(2)
}

/// Round up to the next multiple of RM100; exact multiples stay put.
pub fn ceil_to_hundred(value: &BigDecimal) -> BigDecimal {
    let hundreds = (value / BigDecimal::from(100)).with_scale_round(0, RoundingMode::Ceiling);
    (hundreds * BigDecimal::from(100)).with_scale(2)
}

pub fn is_negative(value: &BigDecimal) -> bool {
    value < &zero()
}

/// Canonical form for decimal(12,2) TEXT columns.
pub fn amount_to_db(value: &BigDecimal) -> String {
    round2(value).to_string()
}

/// Canonical form for decimal(5,4) rate columns.
pub fn rate_to_db(value: &BigDecimal) -> String {
    value.with_scale_round(4, RoundingMode::HalfUp).to_string()
}

pub fn decimal_from_db(raw: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(raw).with_context(|| format!("invalid decimal in store: {raw:?}"))
}

pub fn opt_decimal_from_db(raw: Option<String>) -> Result<Option<BigDecimal>> {
    raw.as_deref().map(decimal_from_db).transpose()
}
