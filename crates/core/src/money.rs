//! Money and quantity helpers.
//!
//! Amounts are carried as exact decimals throughout; rounding to two places
//! happens only when a value is rendered for display.

use core::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places shown for prices, line totals and order totals.
pub const DISPLAY_SCALE: u32 = 2;

/// Round an amount for presentation (half away from zero).
pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount with exactly two decimals, e.g. `12.5` as `"12.50"`.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = round_for_display(amount);
    rounded.rescale(DISPLAY_SCALE);
    rounded.to_string()
}

/// Convert a UI number into a decimal; `None` for NaN or infinite input.
pub fn amount_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
}

/// Parse an amount typed into a form field.
///
/// Accepts either `.` or `,` as decimal separator. Blank or malformed input
/// yields `None`, which callers treat as "absent".
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(&trimmed.replace(',', ".")).ok()
}

/// Unit price default: absent or negative prices become zero.
pub fn price_or_zero(price: Option<Decimal>) -> Decimal {
    match price {
        Some(p) if p >= Decimal::ZERO => p,
        _ => Decimal::ZERO,
    }
}

/// Quantity default: absent, zero or negative quantities become one.
pub fn quantity_or_one(qty: Option<Decimal>) -> Decimal {
    match qty {
        Some(q) if q > Decimal::ZERO => q,
        _ => Decimal::ONE,
    }
}
