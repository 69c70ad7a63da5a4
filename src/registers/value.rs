use std::fmt;

use serde::Serialize;

// HeaterMode {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum HeaterMode {
    /// Only domestic water is heated.
    #[serde(rename = "Summer")]
    Summer,
    /// Water and radiators are heated.
    #[serde(rename = "Winter")]
    Winter,
    #[serde(rename = "Off")]
    Off,
}

impl HeaterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summer => "Summer",
            Self::Winter => "Winter",
            Self::Off => "Off",
        }
    }
} // }}}

// ManualMode {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ManualMode {
    #[serde(rename = "Manual mode")]
    Enabled,
    #[serde(rename = "Auto mode")]
    Disabled,
}

impl ManualMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "Manual mode",
            Self::Disabled => "Auto mode",
        }
    }
} // }}}

// WaterHeaterEnabled {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum WaterHeaterEnabled {
    #[serde(rename = "Water heater enabled")]
    Enabled,
    #[serde(rename = "Water heater disabled")]
    Disabled,
}

impl WaterHeaterEnabled {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "Water heater enabled",
            Self::Disabled => "Water heater disabled",
        }
    }
} // }}}

// ValvePosition {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ValvePosition {
    /// Domestic hot water.
    #[serde(rename = "DHW")]
    Dhw,
    /// Central heating.
    #[serde(rename = "CO")]
    Co,
}

impl ValvePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dhw => "DHW",
            Self::Co => "CO",
        }
    }
} // }}}

// PumpStatus {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PumpStatus {
    #[serde(rename = "Running")]
    Running,
    #[serde(rename = "Idle")]
    Idle,
}

impl PumpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Idle => "Idle",
        }
    }
} // }}}

/// A decoded setting value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Float(f64),
    HeaterMode(HeaterMode),
    ManualMode(ManualMode),
    WaterHeater(WaterHeaterEnabled),
    ValvePosition(ValvePosition),
    PumpStatus(PumpStatus),
}

/// Enumeration names a registry document may refer to in `Enum.MEMBER` paths.
pub const KNOWN_ENUMS: &[&str] = &[
    "HeaterMode",
    "ManualMode",
    "WaterHeaterEnabled",
    "ValvePosition",
    "PumpStatus",
];

/// Every enumerated value, used for display-name lookup.
const ALL_MEMBERS: &[SettingValue] = &[
    SettingValue::HeaterMode(HeaterMode::Summer),
    SettingValue::HeaterMode(HeaterMode::Winter),
    SettingValue::HeaterMode(HeaterMode::Off),
    SettingValue::ManualMode(ManualMode::Enabled),
    SettingValue::ManualMode(ManualMode::Disabled),
    SettingValue::WaterHeater(WaterHeaterEnabled::Enabled),
    SettingValue::WaterHeater(WaterHeaterEnabled::Disabled),
    SettingValue::ValvePosition(ValvePosition::Dhw),
    SettingValue::ValvePosition(ValvePosition::Co),
    SettingValue::PumpStatus(PumpStatus::Running),
    SettingValue::PumpStatus(PumpStatus::Idle),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumPathError {
    Malformed(String),
    UnknownEnum(String),
    UnknownMember { enumeration: String, member: String },
}

impl fmt::Display for EnumPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(path) => {
                write!(f, "invalid enum path {:?}, expected 'EnumName.MEMBER'", path)
            }
            Self::UnknownEnum(name) => {
                write!(f, "unknown enum {:?}, known: {}", name, KNOWN_ENUMS.join(", "))
            }
            Self::UnknownMember {
                enumeration,
                member,
            } => write!(f, "unknown member {:?} in enum {}", member, enumeration),
        }
    }
}

impl SettingValue {
    /// Resolves a symbolic `EnumName.MEMBER` path such as `ManualMode.ENABLED`.
    pub fn from_enum_path(path: &str) -> Result<Self, EnumPathError> {
        let (enumeration, member) = path
            .split_once('.')
            .filter(|(e, m)| !e.is_empty() && !m.is_empty())
            .ok_or_else(|| EnumPathError::Malformed(path.to_string()))?;

        let value = match (enumeration, member) {
            ("HeaterMode", "SUMMER") => Self::HeaterMode(HeaterMode::Summer),
            ("HeaterMode", "WINTER") => Self::HeaterMode(HeaterMode::Winter),
            ("HeaterMode", "OFF") => Self::HeaterMode(HeaterMode::Off),
            ("ManualMode", "ENABLED") => Self::ManualMode(ManualMode::Enabled),
            ("ManualMode", "DISABLED") => Self::ManualMode(ManualMode::Disabled),
            ("WaterHeaterEnabled", "ENABLED") => Self::WaterHeater(WaterHeaterEnabled::Enabled),
            ("WaterHeaterEnabled", "DISABLED") => Self::WaterHeater(WaterHeaterEnabled::Disabled),
            ("ValvePosition", "DHW") => Self::ValvePosition(ValvePosition::Dhw),
            ("ValvePosition", "CO") => Self::ValvePosition(ValvePosition::Co),
            ("PumpStatus", "RUNNING") => Self::PumpStatus(PumpStatus::Running),
            ("PumpStatus", "IDLE") => Self::PumpStatus(PumpStatus::Idle),
            (e, m) if KNOWN_ENUMS.contains(&e) => {
                return Err(EnumPathError::UnknownMember {
                    enumeration: e.to_string(),
                    member: m.to_string(),
                })
            }
            (e, _) => return Err(EnumPathError::UnknownEnum(e.to_string())),
        };

        Ok(value)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Float(v) => write!(f, "{}", v),
            Self::HeaterMode(m) => f.write_str(m.as_str()),
            Self::ManualMode(m) => f.write_str(m.as_str()),
            Self::WaterHeater(m) => f.write_str(m.as_str()),
            Self::ValvePosition(m) => f.write_str(m.as_str()),
            Self::PumpStatus(m) => f.write_str(m.as_str()),
        }
    }
}

/// Parses command-line input: booleans, numbers, `Enum.MEMBER` paths or an
/// enumerated value's display name (case-insensitive).
impl std::str::FromStr for SettingValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "true" | "yes" => return Ok(Self::Bool(true)),
            "false" | "no" => return Ok(Self::Bool(false)),
            _ => {}
        }
        if let Ok(v) = s.parse::<f64>() {
            return Ok(Self::Float(v));
        }
        if s.contains('.') {
            return Self::from_enum_path(s).map_err(|e| e.to_string());
        }
        ALL_MEMBERS
            .iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("cannot interpret {:?} as a setting value", s))
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SettingValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl FromSettingValue for $ty {
                fn from_setting_value(value: SettingValue) -> Option<Self> {
                    match value {
                        SettingValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

/// Conversion used by the typed accessor layer.
pub trait FromSettingValue: Sized {
    fn from_setting_value(value: SettingValue) -> Option<Self>;
}

impl_from_value! {
    bool => Bool,
    f64 => Float,
    HeaterMode => HeaterMode,
    ManualMode => ManualMode,
    WaterHeaterEnabled => WaterHeater,
    ValvePosition => ValvePosition,
    PumpStatus => PumpStatus,
}
