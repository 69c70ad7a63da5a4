//! High-level access to heater settings.
//!
//! [`HeaterController`] keeps three pieces of session state: the last decoded
//! value of every registry setting, the writes staged since the last refresh,
//! and the raw hex of every register the registry refers to. Methods that touch
//! that state take `&mut self`, so one controller can never run `refresh`,
//! `set_setting` and `save` concurrently. Sharing a controller between tasks
//! means putting it behind a lock of the caller's choosing.

use crate::prelude::*;

use crate::registers::value::FromSettingValue;
use std::fmt::Write as _;

pub struct HeaterController<B: RegisterBackend> {
    backend: B,
    registry: Arc<Registry>,
    settings: BTreeMap<String, Option<SettingValue>>,
    // staging order is preserved; a register's encoders run in this order
    pending_writes: Vec<(String, SettingValue)>,
    register_cache: BTreeMap<String, String>,
}

impl<B: RegisterBackend> HeaterController<B> {
    pub fn new(backend: B, registry: Arc<Registry>) -> Self {
        Self {
            backend,
            registry,
            settings: BTreeMap::new(),
            pending_writes: Vec::new(),
            register_cache: BTreeMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Loads every setting with one batched read of the whole register block.
    /// Discards staged writes. An empty read leaves the current state as is.
    pub async fn refresh(&mut self) {
        info!("Refreshing heater settings");
        let start = format!("{}00", registers::REGISTER_PREFIX);
        let all_registers = self
            .backend
            .read_registers(&start, registers::REGISTER_COUNT)
            .await;

        if all_registers.is_empty() {
            warn!("No registers read from heater");
            return;
        }

        self.ingest_registers(&all_registers);
        info!("Heater settings refreshed");
    }

    /// Decodes settings from register data fetched elsewhere, e.g. by a scan.
    pub fn ingest_registers(&mut self, fetched: &HashMap<String, String>) {
        debug!("Decoding settings from {} registers", fetched.len());

        self.settings.clear();
        self.register_cache.clear();

        let registry = Arc::clone(&self.registry);
        for def in registry.iter() {
            let hex_val = match fetched.get(&def.register) {
                Some(hex) if !hex.is_empty() => hex.clone(),
                _ => {
                    warn!(
                        "Register {} not found in registers, assigning {}",
                        def.register,
                        registers::EMPTY_REGISTER
                    );
                    registers::EMPTY_REGISTER.to_string()
                }
            };

            let value = decode_setting(def, &hex_val);
            trace!("{} ({}): {} -> {:?}", def.name, def.register, hex_val, value);

            self.register_cache.insert(def.register.clone(), hex_val);
            self.settings.insert(def.name.clone(), value);
        }

        self.pending_writes.clear();
        debug!("Decoded {} settings", self.settings.len());
    }

    /// The last known value of `name`, `None` if it was never loaded or could
    /// not be decoded.
    pub fn get_setting(&self, name: &str) -> Result<Option<SettingValue>, Error> {
        if !self.registry.contains(name) {
            return Err(Error::UnknownSetting(name.to_string()));
        }
        Ok(self.settings.get(name).copied().flatten())
    }

    /// Stages a write. The value shows up in [`get_setting`](Self::get_setting)
    /// straight away and is sent to the device by [`save`](Self::save).
    pub fn set_setting(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<(), Error> {
        let def = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownSetting(name.to_string()))?;
        if def.is_read_only() {
            return Err(Error::ReadOnly(name.to_string()));
        }

        let value = value.into();
        self.settings.insert(name.to_string(), Some(value));
        match self.pending_writes.iter_mut().find(|(n, _)| n == name) {
            Some((_, staged)) => *staged = value,
            None => self.pending_writes.push((name.to_string(), value)),
        }
        debug!("Set {} = {} (pending write)", name, value);
        Ok(())
    }

    /// Writes every staged setting, one read-modify-write per register.
    ///
    /// Returns `false` if any register could not be read, encoded or written.
    /// Staged writes are only cleared when everything succeeded. A register
    /// whose encode chain fails part way is not written at all.
    pub async fn save(&mut self) -> bool {
        if self.pending_writes.is_empty() {
            debug!("No pending writes");
            return true;
        }

        info!("Saving {} setting(s)", self.pending_writes.len());
        let registry = Arc::clone(&self.registry);
        let mut success = true;

        let mut groups: Vec<(String, Vec<(&SettingDefinition, SettingValue)>)> = Vec::new();
        for (name, value) in &self.pending_writes {
            let Some(def) = registry.get(name) else {
                error!("Staged setting {} is not in the registry", name);
                success = false;
                continue;
            };
            match groups.iter_mut().find(|(register, _)| *register == def.register) {
                Some((_, entries)) => entries.push((def, *value)),
                None => groups.push((def.register.clone(), vec![(def, *value)])),
            }
        }

        for (register, entries) in groups {
            let original_hex = match self.register_cache.get(&register) {
                Some(hex) => hex.clone(),
                None => {
                    debug!("Reading register {} for write", register);
                    match self.backend.read_register(&register).await {
                        Some(hex) => {
                            self.register_cache.insert(register.clone(), hex.clone());
                            hex
                        }
                        None => {
                            error!("Failed to read register {} for write", register);
                            success = false;
                            continue;
                        }
                    }
                }
            };

            let Some(new_hex) = encode_chain(&original_hex, &entries) else {
                error!("Not writing register {}: encoding failed", register);
                success = false;
                continue;
            };

            if new_hex.eq_ignore_ascii_case(&original_hex) {
                debug!("Register {} unchanged, skipping write", register);
                continue;
            }

            if self.backend.write_register(&register, &new_hex).await {
                info!("Wrote register {}: {} -> {}", register, original_hex, new_hex);
                self.register_cache.insert(register.clone(), new_hex.clone());
                for def in registry.settings_for_register(&register) {
                    let value = decode_setting(def, &new_hex);
                    debug!("Updated {} = {:?} after write", def.name, value);
                    self.settings.insert(def.name.clone(), value);
                }
            } else {
                error!("Failed to write register {}", register);
                success = false;
            }
        }

        if success {
            self.pending_writes.clear();
            info!("All settings saved");
        } else {
            error!("Some settings failed to save");
        }
        success
    }

    pub fn get_all_settings(&self) -> BTreeMap<String, Option<SettingValue>> {
        self.settings.clone()
    }

    pub fn pending_writes(&self) -> &[(String, SettingValue)] {
        &self.pending_writes
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending_writes.is_empty()
    }

    pub fn register_cache(&self) -> &BTreeMap<String, String> {
        &self.register_cache
    }

    pub async fn release(&self) {
        self.backend.release().await
    }

    /// Human readable listing of every registry setting, sorted by name.
    pub fn format_settings(&self) -> String {
        let mut out = String::from("--- Heater Settings ---\n");

        for def in self.registry.iter() {
            let value = self.settings.get(&def.name).copied().flatten();
            let read_only = if def.is_read_only() { " (read-only)" } else { "" };
            let _ = writeln!(
                out,
                "{}: {}{}",
                def.name,
                format_value(&def.name, value),
                read_only
            );
        }

        if self.pending_writes.is_empty() {
            out.push_str("\nUnsaved Changes: No\n");
        } else {
            let _ = writeln!(
                out,
                "\nUnsaved Changes: Yes ({} setting(s))",
                self.pending_writes.len()
            );
        }
        out
    }

    fn typed<T: FromSettingValue>(&self, name: &str) -> Option<T> {
        self.settings
            .get(name)
            .copied()
            .flatten()
            .and_then(T::from_setting_value)
    }
}

fn decode_setting(def: &SettingDefinition, hex_val: &str) -> Option<SettingValue> {
    match def.decode(hex_val) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to decode {} from register {}: {}", def.name, def.register, e);
            None
        }
    }
}

/// Runs each encoder on the previous one's output. `None` if any step fails.
fn encode_chain(original_hex: &str, entries: &[(&SettingDefinition, SettingValue)]) -> Option<String> {
    let mut current = original_hex.to_string();
    for (def, value) in entries {
        match def.encode(value, Some(&current)) {
            Ok(Some(hex)) => {
                debug!("Encoded {}: {} -> {}", def.name, current, hex);
                current = hex;
            }
            Ok(None) => {
                error!("Failed to encode {} = {}", def.name, value);
                return None;
            }
            Err(e) => {
                error!("Error encoding {}: {}", def.name, e);
                return None;
            }
        }
    }
    Some(current)
}

pub fn format_value(name: &str, value: Option<SettingValue>) -> String {
    match value {
        None => "Unknown/Not loaded".to_string(),
        Some(SettingValue::Bool(true)) => "Enabled".to_string(),
        Some(SettingValue::Bool(false)) => "Disabled".to_string(),
        Some(SettingValue::Float(v)) if name.contains("temperature") => format!("{:.1}°C", v),
        Some(SettingValue::Float(v)) => format!("{:.2}", v),
        Some(other) => other.to_string(),
    }
}

// typed accessors {{{
macro_rules! typed_settings {
    ($( $name:ident : $ty:ty $(, $setter:ident)? );* $(;)?) => {
        /// Settings with a typed accessor on [`HeaterController`]. Check a
        /// loaded registry against this with [`Registry::missing`].
        pub const TYPED_SETTINGS: &[&str] = &[$(stringify!($name)),*];

        impl<B: RegisterBackend> HeaterController<B> {
            $(
                pub fn $name(&self) -> Option<$ty> {
                    self.typed(stringify!($name))
                }

                $(
                    pub fn $setter(&mut self, value: $ty) -> Result<(), Error> {
                        self.set_setting(stringify!($name), value)
                    }
                )?
            )*
        }
    };
}

typed_settings! {
    heater_mode: HeaterMode, set_heater_mode;
    is_manual_mode_enabled: ManualMode, set_manual_mode_enabled;
    is_water_heater_enabled: WaterHeaterEnabled, set_water_heater_enabled;
    is_pump_co_running: PumpStatus;
    is_pump_circulation_running: PumpStatus;
    valve_position: ValvePosition;
    manual_temperature: f64, set_manual_temperature;
    room_temperature_economy: f64, set_room_temperature_economy;
    room_temperature_comfort: f64, set_room_temperature_comfort;
    room_temperature_comfort_plus: f64, set_room_temperature_comfort_plus;
    room_temperature_comfort_minus: f64, set_room_temperature_comfort_minus;
    cwu_temperature_economy: f64, set_cwu_temperature_economy;
    cwu_temperature_comfort: f64, set_cwu_temperature_comfort;
    pressure: f64;
    room_temperature: f64;
}
// }}}
