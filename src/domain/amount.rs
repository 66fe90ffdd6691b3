// SPDX-License-Identifier: MIT

//! Decimal-string <-> base-unit conversion. Lives at the CLI/port boundary
//! only; everything inside the core compares raw base-unit quantities.

use crate::domain::error::AppError;
use alloy::primitives::U256;

/// Parse a human decimal amount ("1.5") into base units of a
/// `decimals`-precision asset.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("Empty amount".to_string()));
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AppError::Config(format!("Invalid amount: {value}")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AppError::Config(format!("Invalid amount: {value}")));
    }
    if frac_part.len() > decimals as usize {
        return Err(AppError::Config(format!(
            "Amount {value} has more than {decimals} decimal places"
        )));
    }

    let scale = U256::from(10u64).pow(U256::from(decimals as u64));
    let int_units = if int_part.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(int_part, 10)
            .map_err(|e| AppError::Config(format!("Invalid amount {value}: {e}")))?
    };
    let frac_units = if frac_part.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{frac_part:0<width$}", width = decimals as usize);
        U256::from_str_radix(&padded, 10)
            .map_err(|e| AppError::Config(format!("Invalid amount {value}: {e}")))?
    };

    int_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(|| AppError::Config(format!("Amount {value} overflows")))
}

/// Render base units as a human decimal string, trailing zeros trimmed.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let scale = U256::from(10u64).pow(U256::from(decimals as u64));
    let int_part = amount / scale;
    let frac_part = amount % scale;
    if frac_part.is_zero() {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0>width$}", width = decimals as usize);
    format!("{int_part}.{}", frac.trim_end_matches('0'))
}

/// Serialize U256 amounts as decimal strings so workflow results stay
/// readable in JSON output.
pub mod serde_u256 {
    use alloy::primitives::U256;
    use serde::ser::SerializeMap;
    use serde::{Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn serialize_map<S: Serializer>(
        value: &HashMap<String, U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&String, &U256)> = value.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, amount) in entries {
            map.serialize_entry(key, &amount.to_string())?;
        }
        map.end()
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<U256>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(|v| v.to_string()).serialize(serializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_units("100", 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(parse_units("1.5", 18).unwrap(), U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(parse_units("0.000001", 6).unwrap(), U256::from(1u64));
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500_000u64));
    }

    #[test]
    fn rejects_garbage_and_excess_precision() {
        assert!(parse_units("", 6).is_err());
        assert!(parse_units("1,5", 6).is_err());
        assert!(parse_units("-3", 6).is_err());
        assert!(parse_units("0.1234567", 6).is_err());
    }

    #[test]
    fn formats_round_trip() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(100_000_000u64), 6), "100");
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
    }
}
