//! Encoders turn a typed value back into a register hex string.
//!
//! Encoders that own only part of a register (single bits, the heater mode
//! pair) need the register's current hex so the other bits survive the write.
//! Scaled values own the whole register and ignore it. Failures are logged and
//! reported as `None`.

use crate::prelude::*;

use super::decoders::{SUMMER_BIT, WINTER_BIT};
use super::utils::parse_reg;

fn current_register(current_hex: Option<&str>, encoder: &str) -> Option<i16> {
    let Some(current_hex) = current_hex else {
        warn!("{}: current_hex is required for read-modify-write", encoder);
        return None;
    };
    let current = parse_reg(current_hex);
    if current.is_none() {
        error!("{}: invalid register hex string: {:?}", encoder, current_hex);
    }
    current
}

pub fn encode_bit_boolean(value: bool, bit_index: Option<u8>, current_hex: Option<&str>) -> Option<String> {
    let Some(bit_index) = bit_index else {
        error!("encode_bit_boolean: bit_index is required");
        return None;
    };
    let current = current_register(current_hex, "encode_bit_boolean")?;
    Some(int_to_reg(set_bit(current, bit_index, value) as i64))
}

/// Accepts either of the two mapped values or a plain boolean.
pub fn encode_map(
    true_value: SettingValue,
    false_value: SettingValue,
    value: &SettingValue,
    bit_index: Option<u8>,
    current_hex: Option<&str>,
) -> Option<String> {
    let state = if *value == true_value {
        true
    } else if *value == false_value {
        false
    } else if let SettingValue::Bool(b) = value {
        *b
    } else {
        error!("encode_map: unsupported value {:?}", value);
        return None;
    };
    encode_bit_boolean(state, bit_index, current_hex)
}

pub fn encode_heater_mode(value: HeaterMode, current_hex: Option<&str>) -> Option<String> {
    let current = current_register(current_hex, "encode_heater_mode")?;
    let (summer, winter) = match value {
        HeaterMode::Summer => (true, false),
        HeaterMode::Winter => (false, true),
        HeaterMode::Off => (false, false),
    };
    let new = set_bit(set_bit(current, SUMMER_BIT, summer), WINTER_BIT, winter);
    let new_hex = int_to_reg(new as i64);

    debug!(
        "Encoding heater mode to {}: {:?} ({}) -> {} ({})",
        value.as_str(),
        current_hex,
        current,
        new_hex,
        new
    );

    Some(new_hex)
}

fn encode_scaled(value: f64, scale: f64, encoder: &str) -> Option<String> {
    if !value.is_finite() {
        error!("{}: cannot encode non-finite value {}", encoder, value);
        return None;
    }
    let scaled = (value * scale).trunc();
    if scaled < i16::MIN as f64 || scaled > i16::MAX as f64 {
        error!("{}: value {} out of register range", encoder, value);
        return None;
    }
    Some(int_to_reg(scaled as i64))
}

pub fn encode_scaled_temp(value: f64) -> Option<String> {
    encode_scaled(value, 10.0, "encode_scaled_temp")
}

pub fn encode_scaled_pressure(value: f64) -> Option<String> {
    encode_scaled(value, 100.0, "encode_scaled_pressure")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::decoders::{decode_heater_mode, decode_map};

    #[test]
    fn bit_boolean() {
        assert_eq!(encode_bit_boolean(true, Some(9), Some("0000")).as_deref(), Some("0002"));
        assert_eq!(encode_bit_boolean(false, Some(9), Some("0002")).as_deref(), Some("0000"));
        assert_eq!(encode_bit_boolean(true, Some(0), Some("d700")).as_deref(), Some("d700"));
        assert_eq!(encode_bit_boolean(false, Some(0), Some("d700")).as_deref(), Some("d600"));
    }

    #[test]
    fn bit_boolean_needs_index_and_current() {
        assert_eq!(encode_bit_boolean(true, None, Some("0000")), None);
        assert_eq!(encode_bit_boolean(true, Some(1), None), None);
        assert_eq!(encode_bit_boolean(true, Some(1), Some("xyz0")), None);
        assert_eq!(encode_bit_boolean(true, Some(1), Some("000")), None);
    }

    #[test]
    fn map_accepts_mapped_values_and_bools() {
        let on = SettingValue::WaterHeater(WaterHeaterEnabled::Enabled);
        let off = SettingValue::WaterHeater(WaterHeaterEnabled::Disabled);
        assert_eq!(encode_map(on, off, &on, Some(4), Some("0000")).as_deref(), Some("1000"));
        assert_eq!(encode_map(on, off, &off, Some(4), Some("1000")).as_deref(), Some("0000"));
        assert_eq!(
            encode_map(on, off, &SettingValue::Bool(true), Some(4), Some("0000")).as_deref(),
            Some("1000")
        );
        assert_eq!(encode_map(on, off, &SettingValue::Float(1.0), Some(4), Some("0000")), None);
        assert_eq!(
            encode_map(on, off, &SettingValue::HeaterMode(HeaterMode::Off), Some(4), Some("0000")),
            None
        );
    }

    #[test]
    fn map_round_trip() {
        let pairs = [
            (
                SettingValue::ManualMode(ManualMode::Enabled),
                SettingValue::ManualMode(ManualMode::Disabled),
            ),
            (
                SettingValue::ValvePosition(ValvePosition::Dhw),
                SettingValue::ValvePosition(ValvePosition::Co),
            ),
            (
                SettingValue::PumpStatus(PumpStatus::Running),
                SettingValue::PumpStatus(PumpStatus::Idle),
            ),
        ];
        for (t, f) in pairs {
            for bit in 0..16u8 {
                for base in ["0000", "ffff", "d700", "5a5a"] {
                    for v in [t, f] {
                        let hex = encode_map(t, f, &v, Some(bit), Some(base)).unwrap();
                        assert_eq!(decode_map(t, f, &hex, Some(bit)), Some(v));
                    }
                }
            }
        }
    }

    #[test]
    fn heater_mode_preserves_other_bits() {
        assert_eq!(encode_heater_mode(HeaterMode::Summer, Some("0000")).as_deref(), Some("0800"));
        assert_eq!(encode_heater_mode(HeaterMode::Winter, Some("0000")).as_deref(), Some("2000"));
        assert_eq!(encode_heater_mode(HeaterMode::Off, Some("2800")).as_deref(), Some("0000"));

        let mode_bits = (1u16 << SUMMER_BIT) | (1u16 << WINTER_BIT);
        for base in ["0000", "ffff", "d700", "0002", "a55a"] {
            let base_int = reg_to_int(base) as u16;
            for mode in [HeaterMode::Summer, HeaterMode::Winter, HeaterMode::Off] {
                let hex = encode_heater_mode(mode, Some(base)).unwrap();
                assert_eq!(decode_heater_mode(&hex), Some(mode));
                assert_eq!(reg_to_int(&hex) as u16 & !mode_bits, base_int & !mode_bits);
            }
        }
    }

    #[test]
    fn heater_mode_needs_current() {
        assert_eq!(encode_heater_mode(HeaterMode::Summer, None), None);
        assert_eq!(encode_heater_mode(HeaterMode::Summer, Some("08")), None);
    }

    #[test]
    fn scaled() {
        let hex = encode_scaled_temp(22.5).unwrap();
        assert_eq!(hex, "e100");
        assert_eq!(reg_to_int(&hex), 225);
        assert_eq!(encode_scaled_temp(-5.0).as_deref(), Some("ceff"));
        assert_eq!(encode_scaled_pressure(5.0).as_deref(), Some("f401"));
        // truncation, not rounding
        assert_eq!(reg_to_int(&encode_scaled_temp(22.57).unwrap()), 225);
        assert_eq!(encode_scaled_temp(f64::NAN), None);
        assert_eq!(encode_scaled_temp(5000.0), None);
    }
}
