//! Human-readable token amounts for progress messages.

use alloy_primitives::utils::format_units;
use alloy_primitives::U256;

/// Render `amount` base units as a decimal string with `decimals` places,
/// trailing zeros trimmed (`15000000`, 6 -> `"15"`; `1500000`, 6 -> `"1.5"`).
///
/// Falls back to the raw integer when `decimals` is out of range for the
/// unit conversion.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals) {
        Ok(formatted) if formatted.contains('.') => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(formatted) => formatted,
        Err(_) => amount.to_string(),
    }
}
