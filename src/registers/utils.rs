use crate::prelude::*;

use super::EMPTY_REGISTER;

/// Parses a register hex string, returning `None` unless it is exactly four hex
/// digits. The wire format is low byte first: `"d700"` is 0x00d7.
pub fn parse_reg(hex_val: &str) -> Option<i16> {
    if hex_val.len() != 4 || !hex_val.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let raw = u16::from_str_radix(hex_val, 16).ok()?;
    Some(raw.swap_bytes() as i16)
}

/// Converts a signed 16-bit value into the heater's little-endian hex string,
/// e.g. 215 -> `"d700"`. Values outside the i16 range encode as `"0000"`.
pub fn int_to_reg(value: i64) -> String {
    match i16::try_from(value) {
        Ok(v) => {
            let [hi, lo] = (v as u16).to_be_bytes();
            format!("{:02x}{:02x}", lo, hi)
        }
        Err(_) => {
            error!("Error encoding int value '{}': outside signed 16-bit range", value);
            EMPTY_REGISTER.to_string()
        }
    }
}

/// Inverse of [`int_to_reg`]. Malformed input decodes as 0.
pub fn reg_to_int(hex_val: &str) -> i16 {
    parse_reg(hex_val).unwrap_or_else(|| {
        error!("Error decoding hex value '{}'", hex_val);
        0
    })
}

pub fn get_bit(value: i16, bit_index: u8) -> bool {
    if bit_index > 15 {
        return false;
    }
    (value as u16) & (1 << bit_index) != 0
}

pub fn set_bit(value: i16, bit_index: u8, state: bool) -> i16 {
    if bit_index > 15 {
        return value;
    }
    let mask = 1u16 << bit_index;
    let raw = value as u16;
    (if state { raw | mask } else { raw & !mask }) as i16
}

/// Extracts the 8-bit index from an address such as `"0b51"`.
pub fn reg_address_to_int(address: &str) -> Result<u8, Error> {
    let index = address
        .get(2..)
        .filter(|s| s.len() == 2 && s.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
    u8::from_str_radix(index, 16).map_err(|_| Error::InvalidAddress(address.to_string()))
}

/// The prefix part of an address, e.g. `"0b"` for `"0b51"`.
pub fn reg_address_prefix(address: &str) -> Result<&str, Error> {
    reg_address_to_int(address)?;
    Ok(&address[..2])
}

pub fn int_to_reg_address(prefix: &str, index: u32) -> Result<String, Error> {
    if index > 255 {
        return Err(Error::AddressOutOfRange(index));
    }
    Ok(format!("{}{:02x}", prefix, index))
}
