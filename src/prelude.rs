pub use log::{debug, error, info, trace, warn};

pub use std::collections::{BTreeMap, HashMap};
pub use std::str::FromStr;
pub use std::sync::Arc;

pub use crate::backend::{self, Backend, RegisterBackend};
pub use crate::config::{self, Config};
pub use crate::controller::HeaterController;
pub use crate::error::{CodecError, ConfigError, Error};
pub use crate::registers::{
    self,
    codec::{Codec, RegisterCodec},
    utils::{get_bit, int_to_reg, int_to_reg_address, reg_address_to_int, reg_to_int, set_bit},
    value::{HeaterMode, ManualMode, PumpStatus, SettingValue, ValvePosition, WaterHeaterEnabled},
};
pub use crate::registry::{Registry, SettingDefinition};
