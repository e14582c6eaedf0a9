//! Conversion-ratio math
//!
//! A conversion ratio is the number of locked-denomination units backing one
//! bonded-representation unit. Settlement multiplies a released bonded amount
//! by the ratio snapshot and rounds half up; locking divides by the ratio and
//! rounds down so a fresh lock can never be over-represented.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{MultiStakingError, Result};

/// Locked-denomination units per bonded-representation unit
pub type ConversionRatio = Decimal;

/// Reject ratios that cannot back a bonded token
pub fn validate_ratio(ratio: ConversionRatio) -> Result<()> {
    if ratio <= Decimal::ZERO {
        return Err(MultiStakingError::InvalidConversionRatio {
            ratio: ratio.to_string(),
        });
    }
    Ok(())
}

fn to_decimal(amount: u128) -> Result<Decimal> {
    Decimal::from_u128(amount).ok_or(MultiStakingError::AmountOverflow)
}

fn to_amount(value: Decimal) -> Result<u128> {
    value.to_u128().ok_or(MultiStakingError::AmountOverflow)
}

/// Round a non-negative decimal to the nearest integer, ties going up.
pub fn round_half_up(value: Decimal) -> Result<u128> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MultiStakingError::AmountOverflow);
    }
    to_amount(value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

/// `round_half_up(amount × ratio)`: bonded units back to locked units
pub fn bonded_to_locked(amount: u128, ratio: ConversionRatio) -> Result<u128> {
    let product = to_decimal(amount)?
        .checked_mul(ratio)
        .ok_or(MultiStakingError::AmountOverflow)?;
    round_half_up(product)
}

/// `floor(amount / ratio)`: locked units to bonded units
pub fn locked_to_bonded(amount: u128, ratio: ConversionRatio) -> Result<u128> {
    validate_ratio(ratio)?;
    let quotient = to_decimal(amount)?
        .checked_div(ratio)
        .ok_or(MultiStakingError::AmountOverflow)?;
    to_amount(quotient.floor())
}
