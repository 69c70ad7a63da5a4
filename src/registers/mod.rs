//! Raw register handling: the device's byte-swapped hex format, the typed values
//! settings decode to, and the codecs that translate between the two.

pub mod codec;
pub mod decoders;
pub mod encoders;
pub mod utils;
pub mod value;

/// Address namespace used by the heater for its settings block.
pub const REGISTER_PREFIX: &str = "0b";

/// Number of registers in one address namespace (8-bit index).
pub const REGISTER_COUNT: u16 = 256;

/// Value used wherever a register is missing from fetched data.
pub const EMPTY_REGISTER: &str = "0000";
