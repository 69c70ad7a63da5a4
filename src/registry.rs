//! The setting registry: which register (and bit) backs each named setting and
//! how to decode/encode it.
//!
//! A registry is built once, either in code or by compiling a YAML document,
//! and is read-only afterwards. Controllers share it through an `Arc`.

use crate::prelude::*;

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Registry documents compiled into the binary.
const BUILTIN_CONFIGS: &[(&str, &str)] = &[(
    "kospel_cmi_standard",
    include_str!("../configs/kospel_cmi_standard.yaml"),
)];

pub const STANDARD_CONFIG: &str = "kospel_cmi_standard";

// SettingDefinition {{{
#[derive(Clone, Debug, PartialEq)]
pub struct SettingDefinition {
    pub name: String,
    pub register: String,
    pub decoder: Codec,
    pub encoder: Option<Codec>,
    pub bit_index: Option<u8>,
}

impl SettingDefinition {
    pub fn new(name: impl Into<String>, register: impl Into<String>, decoder: Codec) -> Self {
        Self {
            name: name.into(),
            register: register.into(),
            decoder,
            encoder: None,
            bit_index: None,
        }
    }

    pub fn with_encoder(mut self, encoder: Codec) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_bit_index(mut self, bit_index: u8) -> Self {
        self.bit_index = Some(bit_index);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.encoder.is_none()
    }

    pub fn decode(&self, hex_val: &str) -> Result<Option<SettingValue>, CodecError> {
        self.decoder.decode(hex_val, self.bit_index)
    }

    /// Encodes `value` on top of `current_hex`. `Ok(None)` is an encoding
    /// failure; `Err` means the setting cannot be written at all.
    pub fn encode(&self, value: &SettingValue, current_hex: Option<&str>) -> Result<Option<String>, Error> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| Error::ReadOnly(self.name.clone()))?;
        Ok(encoder.encode(value, self.bit_index, current_hex))
    }
} // }}}

// Registry {{{
#[derive(Clone, Debug, Default)]
pub struct Registry {
    settings: BTreeMap<String, SettingDefinition>,
}

impl Registry {
    pub fn new(definitions: impl IntoIterator<Item = SettingDefinition>) -> Self {
        Self {
            settings: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// The compiled-in standard register map.
    pub fn standard() -> Result<Self, ConfigError> {
        Self::load(STANDARD_CONFIG, None)
    }

    pub fn get(&self, name: &str) -> Option<&SettingDefinition> {
        self.settings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.settings.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingDefinition> {
        self.settings.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.settings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Every setting backed by `register`, staged or not.
    pub fn settings_for_register<'a>(&'a self, register: &'a str) -> impl Iterator<Item = &'a SettingDefinition> {
        self.settings.values().filter(move |d| d.register == register)
    }

    /// The distinct register addresses referenced by this registry.
    pub fn registers(&self) -> BTreeSet<&str> {
        self.settings.values().map(|d| d.register.as_str()).collect()
    }

    /// Names from `expected` this registry does not define.
    pub fn missing<'a>(&self, expected: &[&'a str]) -> Vec<&'a str> {
        expected
            .iter()
            .copied()
            .filter(|name| !self.contains(name))
            .collect()
    }

    /// Loads a registry document by name, from `config_dir` when given or from
    /// the built-in documents otherwise.
    pub fn load(name: &str, config_dir: Option<&Path>) -> Result<Self, ConfigError> {
        match config_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.yaml", name));
                if !path.exists() {
                    error!("Config file not found: {}", path.display());
                    return Err(ConfigError::document(format!(
                        "config {:?} not found at {}",
                        name,
                        path.display()
                    )));
                }
                Self::from_file(&path)
            }
            None => {
                let (_, content) = BUILTIN_CONFIGS
                    .iter()
                    .find(|(n, _)| *n == name)
                    .ok_or_else(|| {
                        ConfigError::document(format!("config {:?} not found in built-in configs", name))
                    })?;
                Self::from_yaml_str(content)
            }
        }
    }

    /// A built-in document by name, or a document on disk when given something
    /// that looks like a path.
    pub fn open(name_or_path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(name_or_path);
        let is_path = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
            || path.components().count() > 1;
        if is_path {
            Self::from_file(path)
        } else {
            Self::load(name_or_path, None)
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Reading registry from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|err| {
            ConfigError::document(format!("could not read {}: {}", path.display(), err))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Compiles a whole document. Either every entry compiles or nothing is
    /// returned.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Err(ConfigError::document("config is empty"));
        }
        let raw: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| {
            error!("Invalid YAML in registry config: {}", e);
            ConfigError::document(format!("invalid YAML: {}", e))
        })?;

        let mapping = match raw {
            serde_yaml::Value::Null => return Err(ConfigError::document("config is empty")),
            serde_yaml::Value::Mapping(m) => m,
            other => {
                return Err(ConfigError::document(format!(
                    "root must be a mapping, got {}",
                    yaml_kind(&other)
                )))
            }
        };
        if mapping.is_empty() {
            return Err(ConfigError::document("config is empty"));
        }

        let mut settings = BTreeMap::new();
        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => {
                    return Err(ConfigError::document(format!(
                        "setting names must be strings, got {}",
                        yaml_kind(&other)
                    )))
                }
            };
            let definition = compile_setting(&name, value)?;
            settings.insert(name, definition);
        }

        debug!("Compiled registry with {} settings", settings.len());
        Ok(Self { settings })
    }
} // }}}

// Document compilation {{{
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingSpec {
    register: String,
    decode: Option<CodecSpec>,
    encode: Option<CodecSpec>,
    bit_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodecSpec {
    Named(String),
    Map(MapSpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapSpec {
    #[serde(rename = "type")]
    kind: String,
    true_value: String,
    false_value: String,
}

#[derive(Clone, Copy)]
enum Kind {
    Decoder,
    Encoder,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Decoder => "decoder",
            Kind::Encoder => "encoder",
        }
    }

    fn known(&self) -> &'static [&'static str] {
        match self {
            Kind::Decoder => registers::codec::DECODER_NAMES,
            Kind::Encoder => registers::codec::ENCODER_NAMES,
        }
    }
}

fn compile_setting(name: &str, value: serde_yaml::Value) -> Result<SettingDefinition, ConfigError> {
    if !value.is_mapping() {
        return Err(ConfigError::setting(
            name,
            format!("must be a mapping, got {}", yaml_kind(&value)),
        ));
    }
    let spec: SettingSpec =
        serde_yaml::from_value(value).map_err(|e| ConfigError::setting(name, e.to_string()))?;

    reg_address_to_int(&spec.register).map_err(|e| ConfigError::setting(name, e.to_string()))?;

    let bit_index = spec
        .bit_index
        .map(|b| {
            u8::try_from(b)
                .ok()
                .filter(|b| *b <= 15)
                .ok_or_else(|| ConfigError::setting(name, format!("bit_index {} outside 0-15", b)))
        })
        .transpose()?;

    let decode = spec
        .decode
        .ok_or_else(|| ConfigError::setting(name, "decode is required"))?;
    let decoder = resolve_codec(name, &decode, Kind::Decoder, bit_index)?;
    let encoder = spec
        .encode
        .map(|e| resolve_codec(name, &e, Kind::Encoder, bit_index))
        .transpose()?;

    Ok(SettingDefinition {
        name: name.to_string(),
        register: spec.register,
        decoder,
        encoder,
        bit_index,
    })
}

fn resolve_codec(
    name: &str,
    spec: &CodecSpec,
    kind: Kind,
    bit_index: Option<u8>,
) -> Result<Codec, ConfigError> {
    let codec = match spec {
        CodecSpec::Named(codec_name) => {
            let codec = match kind {
                Kind::Decoder => Codec::decoder_named(codec_name),
                Kind::Encoder => Codec::encoder_named(codec_name),
            };
            codec.ok_or_else(|| {
                ConfigError::setting(
                    name,
                    format!(
                        "unknown {} {:?}, known: {}",
                        kind.as_str(),
                        codec_name,
                        kind.known().join(", ")
                    ),
                )
            })?
        }
        CodecSpec::Map(map) => {
            if map.kind != "map" {
                return Err(ConfigError::setting(
                    name,
                    format!("unknown {} type {:?}", kind.as_str(), map.kind),
                ));
            }
            let resolve = |path: &str| {
                SettingValue::from_enum_path(path).map_err(|e| ConfigError::setting(name, e.to_string()))
            };
            Codec::map(resolve(&map.true_value)?, resolve(&map.false_value)?)
        }
    };

    if codec.requires_bit_index() && bit_index.is_none() {
        return Err(ConfigError::setting(
            name,
            format!("bit_index is required for this {}", kind.as_str()),
        ));
    }

    Ok(codec)
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
} // }}}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_err(content: &str) -> ConfigError {
        Registry::from_yaml_str(content).unwrap_err()
    }

    #[test]
    fn standard_registry_settings() {
        let registry = Registry::standard().unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(registry.len(), 15);
        for expected in [
            "heater_mode",
            "is_manual_mode_enabled",
            "is_water_heater_enabled",
            "is_pump_co_running",
            "is_pump_circulation_running",
            "valve_position",
            "manual_temperature",
            "room_temperature_economy",
            "room_temperature_comfort",
            "room_temperature_comfort_plus",
            "room_temperature_comfort_minus",
            "cwu_temperature_economy",
            "cwu_temperature_comfort",
            "pressure",
            "room_temperature",
        ] {
            assert!(names.contains(&expected), "{}", expected);
        }
    }

    #[test]
    fn standard_registry_decodes() {
        let registry = Registry::standard().unwrap();
        let get = |n: &str| registry.get(n).unwrap();

        assert_eq!(
            get("heater_mode").decode("0800"),
            Ok(Some(SettingValue::HeaterMode(HeaterMode::Summer)))
        );
        assert_eq!(
            get("is_manual_mode_enabled").decode("0002"),
            Ok(Some(SettingValue::ManualMode(ManualMode::Enabled)))
        );
        assert_eq!(
            get("is_manual_mode_enabled").decode("0000"),
            Ok(Some(SettingValue::ManualMode(ManualMode::Disabled)))
        );
        assert_eq!(get("manual_temperature").decode("e100"), Ok(Some(SettingValue::Float(22.5))));
        assert_eq!(get("pressure").decode("6400"), Ok(Some(SettingValue::Float(1.0))));
    }

    #[test]
    fn read_only_settings() {
        let registry = Registry::standard().unwrap();
        for name in ["pressure", "room_temperature", "is_pump_co_running", "valve_position"] {
            assert!(registry.get(name).unwrap().is_read_only(), "{}", name);
        }
        assert!(!registry.get("heater_mode").unwrap().is_read_only());

        let err = registry
            .get("pressure")
            .unwrap()
            .encode(&SettingValue::Float(1.0), None)
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly(ref n) if n == "pressure"));
    }

    #[test]
    fn map_setting_round_trip() {
        let registry = Registry::standard().unwrap();
        let manual = registry.get("is_manual_mode_enabled").unwrap();
        let enabled = SettingValue::ManualMode(ManualMode::Enabled);
        let encoded = manual.encode(&enabled, Some("0000")).unwrap().unwrap();
        assert_eq!(manual.decode(&encoded), Ok(Some(enabled)));
    }

    #[test]
    fn settings_for_register() {
        let registry = Registry::standard().unwrap();
        let mut names: Vec<&str> = registry
            .settings_for_register("0b55")
            .map(|d| d.name.as_str())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["heater_mode", "is_manual_mode_enabled", "is_water_heater_enabled"]
        );
        assert!(registry.registers().contains("0b8a"));
    }

    #[test]
    fn built_in_definitions() {
        let registry = Registry::new([
            SettingDefinition::new("flag", "0b10", Codec::decoder_named("bit_boolean").unwrap())
                .with_bit_index(2)
                .with_encoder(Codec::encoder_named("bit_boolean").unwrap()),
            SettingDefinition::new("temp", "0b11", Codec::decoder_named("scaled_temp").unwrap()),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("flag").unwrap().decode("0400"), Ok(Some(SettingValue::Bool(true))));
        assert!(registry.get("temp").unwrap().is_read_only());
        assert_eq!(registry.missing(&["flag", "other"]), vec!["other"]);
    }

    #[test]
    fn invalid_documents() {
        assert!(compile_err("not: valid: yaml: [").reason.contains("invalid YAML"));
        assert!(compile_err("").reason.contains("empty"));
        assert!(compile_err("{}").reason.contains("empty"));
        assert!(compile_err("- a\n- b\n").reason.contains("mapping"));
        assert!(compile_err("42").reason.contains("mapping"));
    }

    #[test]
    fn invalid_settings_name_the_setting() {
        let err = compile_err("heater_mode:\n  register: \"0b55\"\n  encode: heater_mode\n");
        assert_eq!(err.setting.as_deref(), Some("heater_mode"));
        assert!(err.reason.contains("decode"));

        let err = compile_err("x:\n  register: \"0b55\"\n  decode: nope\n");
        assert_eq!(err.setting.as_deref(), Some("x"));
        assert!(err.reason.contains("unknown decoder"));

        let err = compile_err("x:\n  register: \"0b55\"\n  decode: scaled_temp\n  encode: nope\n");
        assert!(err.reason.contains("unknown encoder"));

        let err = compile_err("x: 5\n");
        assert!(err.reason.contains("mapping"));

        let err = compile_err("x:\n  register: \"0b55\"\n  decode: scaled_temp\n  colour: blue\n");
        assert_eq!(err.setting.as_deref(), Some("x"));

        let err = compile_err("x:\n  register: \"0b555\"\n  decode: scaled_temp\n");
        assert!(err.reason.contains("invalid register address"));

        let err = compile_err("x:\n  register: \"0b55\"\n  bit_index: 16\n  decode: bit_boolean\n");
        assert!(err.reason.contains("outside 0-15"));
    }

    #[test]
    fn map_requires_bit_index() {
        let doc = "manual:\n  register: \"0b55\"\n  decode:\n    type: map\n    true_value: ManualMode.ENABLED\n    false_value: ManualMode.DISABLED\n";
        let err = compile_err(doc);
        assert_eq!(err.setting.as_deref(), Some("manual"));
        assert!(err.reason.contains("bit_index is required"));

        let err = compile_err("flag:\n  register: \"0b55\"\n  decode: bit_boolean\n");
        assert!(err.reason.contains("bit_index is required"));
    }

    #[test]
    fn map_enum_paths_must_resolve() {
        let doc = "manual:\n  register: \"0b55\"\n  bit_index: 9\n  decode:\n    type: map\n    true_value: ManualMode.ON\n    false_value: ManualMode.DISABLED\n";
        let err = compile_err(doc);
        assert!(err.reason.contains("unknown member"));

        let doc = "manual:\n  register: \"0b55\"\n  bit_index: 9\n  decode:\n    type: lookup\n    true_value: ManualMode.ENABLED\n    false_value: ManualMode.DISABLED\n";
        let err = compile_err(doc);
        assert!(err.reason.contains("unknown decoder type"));
    }

    #[test]
    fn one_bad_entry_fails_the_whole_document() {
        let doc = "good:\n  register: \"0b10\"\n  decode: scaled_temp\nbad:\n  register: \"0b11\"\n  decode: nope\n";
        assert!(Registry::from_yaml_str(doc).is_err());
    }

    #[test]
    fn unknown_builtin_name() {
        let err = Registry::load("nonexistent_config", None).unwrap_err();
        assert!(err.reason.contains("not found"));
    }
}
