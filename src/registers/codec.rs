use crate::prelude::*;

use enum_dispatch::enum_dispatch;

use super::{decoders, encoders};

/// A decode/encode strategy bound to a setting at registry load time.
#[enum_dispatch]
pub trait RegisterCodec {
    fn decode(&self, hex_val: &str, bit_index: Option<u8>) -> Result<Option<SettingValue>, CodecError>;

    fn encode(
        &self,
        value: &SettingValue,
        bit_index: Option<u8>,
        current_hex: Option<&str>,
    ) -> Option<String>;

    /// Whether a setting using this codec must carry a bit index.
    fn requires_bit_index(&self) -> bool {
        false
    }
}

#[enum_dispatch(RegisterCodec)]
#[derive(Clone, Debug, PartialEq)]
pub enum Codec {
    BitBoolean(BitBoolean),
    BitMap(BitMap),
    HeaterModeFlags(HeaterModeFlags),
    ScaledTemp(ScaledTemp),
    ScaledPressure(ScaledPressure),
}

pub const DECODER_NAMES: &[&str] = &["heater_mode", "bit_boolean", "scaled_temp", "scaled_pressure"];
pub const ENCODER_NAMES: &[&str] = DECODER_NAMES;

impl Codec {
    /// Builds a bit-to-two-values codec. The two values are captured here and
    /// the result is a pure function of `(hex, bit_index)` afterwards.
    pub fn map(true_value: SettingValue, false_value: SettingValue) -> Self {
        Self::BitMap(BitMap {
            true_value,
            false_value,
        })
    }

    pub fn decoder_named(name: &str) -> Option<Self> {
        Self::named(name)
    }

    pub fn encoder_named(name: &str) -> Option<Self> {
        Self::named(name)
    }

    fn named(name: &str) -> Option<Self> {
        Some(match name {
            "heater_mode" => HeaterModeFlags.into(),
            "bit_boolean" => BitBoolean.into(),
            "scaled_temp" => ScaledTemp.into(),
            "scaled_pressure" => ScaledPressure.into(),
            _ => return None,
        })
    }
}

// BitBoolean {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitBoolean;

impl RegisterCodec for BitBoolean {
    fn decode(&self, hex_val: &str, bit_index: Option<u8>) -> Result<Option<SettingValue>, CodecError> {
        Ok(decoders::decode_bit_boolean(hex_val, bit_index)?.map(SettingValue::Bool))
    }

    fn encode(
        &self,
        value: &SettingValue,
        bit_index: Option<u8>,
        current_hex: Option<&str>,
    ) -> Option<String> {
        let Some(state) = value.as_bool() else {
            error!("encode_bit_boolean: unsupported value {:?}", value);
            return None;
        };
        encoders::encode_bit_boolean(state, bit_index, current_hex)
    }

    fn requires_bit_index(&self) -> bool {
        true
    }
} // }}}

// BitMap {{{
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BitMap {
    pub true_value: SettingValue,
    pub false_value: SettingValue,
}

impl RegisterCodec for BitMap {
    fn decode(&self, hex_val: &str, bit_index: Option<u8>) -> Result<Option<SettingValue>, CodecError> {
        Ok(decoders::decode_map(
            self.true_value,
            self.false_value,
            hex_val,
            bit_index,
        ))
    }

    fn encode(
        &self,
        value: &SettingValue,
        bit_index: Option<u8>,
        current_hex: Option<&str>,
    ) -> Option<String> {
        encoders::encode_map(self.true_value, self.false_value, value, bit_index, current_hex)
    }

    fn requires_bit_index(&self) -> bool {
        true
    }
} // }}}

// HeaterModeFlags {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaterModeFlags;

impl RegisterCodec for HeaterModeFlags {
    fn decode(&self, hex_val: &str, _bit_index: Option<u8>) -> Result<Option<SettingValue>, CodecError> {
        Ok(decoders::decode_heater_mode(hex_val).map(SettingValue::HeaterMode))
    }

    fn encode(
        &self,
        value: &SettingValue,
        _bit_index: Option<u8>,
        current_hex: Option<&str>,
    ) -> Option<String> {
        let SettingValue::HeaterMode(mode) = value else {
            error!("encode_heater_mode: unsupported value {:?}", value);
            return None;
        };
        encoders::encode_heater_mode(*mode, current_hex)
    }
} // }}}

// ScaledTemp {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaledTemp;

impl RegisterCodec for ScaledTemp {
    fn decode(&self, hex_val: &str, _bit_index: Option<u8>) -> Result<Option<SettingValue>, CodecError> {
        Ok(decoders::decode_scaled_temp(hex_val).map(SettingValue::Float))
    }

    fn encode(
        &self,
        value: &SettingValue,
        _bit_index: Option<u8>,
        _current_hex: Option<&str>,
    ) -> Option<String> {
        let Some(v) = value.as_f64() else {
            error!("encode_scaled_temp: unsupported value {:?}", value);
            return None;
        };
        encoders::encode_scaled_temp(v)
    }
} // }}}

// ScaledPressure {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaledPressure;

impl RegisterCodec for ScaledPressure {
    fn decode(&self, hex_val: &str, _bit_index: Option<u8>) -> Result<Option<SettingValue>, CodecError> {
        Ok(decoders::decode_scaled_pressure(hex_val).map(SettingValue::Float))
    }

    fn encode(
        &self,
        value: &SettingValue,
        _bit_index: Option<u8>,
        _current_hex: Option<&str>,
    ) -> Option<String> {
        let Some(v) = value.as_f64() else {
            error!("encode_scaled_pressure: unsupported value {:?}", value);
            return None;
        };
        encoders::encode_scaled_pressure(v)
    }
} // }}}
