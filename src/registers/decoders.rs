//! Decoders turn a raw register hex string into a typed value.
//!
//! Every decoder takes the hex string and an optional bit index, and returns
//! `Ok(None)` for malformed input. The only hard failure is
//! [`decode_bit_boolean`] called without a bit index, which is a registry bug
//! rather than a device condition.

use crate::prelude::*;

use super::utils::parse_reg;

pub const SUMMER_BIT: u8 = 3;
pub const WINTER_BIT: u8 = 5;

pub fn decode_bit_boolean(hex_val: &str, bit_index: Option<u8>) -> Result<Option<bool>, CodecError> {
    let bit_index = bit_index.ok_or(CodecError::MissingBitIndex)?;
    Ok(parse_reg(hex_val).map(|v| get_bit(v, bit_index)))
}

/// Maps a single bit onto one of two values.
pub fn decode_map(
    true_value: SettingValue,
    false_value: SettingValue,
    hex_val: &str,
    bit_index: Option<u8>,
) -> Option<SettingValue> {
    match decode_bit_boolean(hex_val, bit_index) {
        Ok(Some(true)) => Some(true_value),
        Ok(Some(false)) => Some(false_value),
        Ok(None) => None,
        Err(e) => {
            error!("decode_map: {}", e);
            None
        }
    }
}

/// Heater mode lives in bits 3 (summer) and 5 (winter). Summer wins if both
/// are set; neither set means off.
pub fn decode_heater_mode(hex_val: &str) -> Option<HeaterMode> {
    let flags = parse_reg(hex_val)?;
    Some(if get_bit(flags, SUMMER_BIT) {
        HeaterMode::Summer
    } else if get_bit(flags, WINTER_BIT) {
        HeaterMode::Winter
    } else {
        HeaterMode::Off
    })
}

/// Temperature in tenths of a degree.
pub fn decode_scaled_temp(hex_val: &str) -> Option<f64> {
    parse_reg(hex_val).map(|v| v as f64 / 10.0)
}

/// Pressure in hundredths of a bar.
pub fn decode_scaled_pressure(hex_val: &str) -> Option<f64> {
    parse_reg(hex_val).map(|v| v as f64 / 100.0)
}
