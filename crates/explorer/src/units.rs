use alloy::primitives::{U256, utils::format_units};
use bigdecimal::{BigDecimal, RoundingMode};
use contractscope_core::AppError;
use std::str::FromStr;

/// Decimals of the native asset (wei per ether).
pub const ETHER_DECIMALS: u8 = 18;

/// Fractional digits kept on every scaled amount.
pub const DISPLAY_SCALE: i64 = 6;

/// Scale an integer base-unit amount into human units with six fractional digits.
///
/// Tokens declaring zero decimals keep their raw integer rendering.
pub fn scale_units(raw: &str, decimals: u8) -> Result<String, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Decode("empty base-unit amount".into()));
    }
    let amount = U256::from_str_radix(raw, 10)
        .map_err(|e| AppError::Decode(format!("invalid base-unit amount {raw:?}: {e}")))?;

    if decimals == 0 {
        return Ok(amount.to_string());
    }

    let formatted =
        format_units(amount, decimals).map_err(|e| AppError::Decode(e.to_string()))?;
    let value = BigDecimal::from_str(&formatted)
        .map_err(|e| AppError::Decode(format!("invalid decimal {formatted:?}: {e}")))?;

    Ok(value
        .with_scale_round(DISPLAY_SCALE, RoundingMode::HalfUp)
        .to_plain_string())
}
