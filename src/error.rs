use std::fmt;

/// Caller or deployment mistakes. Transient device conditions never surface here;
/// those are reported as absent values or a `false` result instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("setting {0:?} not found in registry")]
    UnknownSetting(String),
    #[error("setting {0:?} is read-only")]
    ReadOnly(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("register index {0} outside 8-bit address space (0-255)")]
    AddressOutOfRange(u32),
    #[error("invalid register address {0:?}")]
    InvalidAddress(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("bit index is required for boolean value decoding")]
    MissingBitIndex,
}

/// Raised when a registry document cannot be compiled. Names the setting when
/// the problem is local to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub setting: Option<String>,
    pub reason: String,
}

impl ConfigError {
    pub fn document(reason: impl Into<String>) -> Self {
        Self {
            setting: None,
            reason: reason.into(),
        }
    }

    pub fn setting(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            setting: Some(setting.into()),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.setting {
            Some(setting) => write!(f, "registry config: setting {:?}: {}", setting, self.reason),
            None => write!(f, "registry config: {}", self.reason),
        }
    }
}

impl std::error::Error for ConfigError {}
