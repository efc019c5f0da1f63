//! Account address validation.

use crate::error::{GatewayError, GatewayResult};

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Validate a `0x`-prefixed 20-byte hex address and return it lowercased.
pub fn normalize_address(input: &str) -> GatewayResult<String> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| GatewayError::InvalidAddress(format!("missing 0x prefix: {}", input)))?;

    if digits.len() != ADDRESS_LEN * 2 {
        return Err(GatewayError::InvalidAddress(format!(
            "expected {} hex characters, got {}: {}",
            ADDRESS_LEN * 2,
            digits.len(),
            input
        )));
    }
    hex::decode(digits).map_err(|e| GatewayError::InvalidAddress(format!("{}: {}", input, e)))?;

    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}
