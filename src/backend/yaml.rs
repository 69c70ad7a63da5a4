use crate::prelude::*;

use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Offline register store backed by a YAML file of `address: hex` pairs.
///
/// The file is re-read on every access so edits made while a tool is running
/// are picked up, and rewritten in full (sorted by address) on every write.
/// Registers missing from the file read as `"0000"`.
pub struct YamlBackend {
    state_file: PathBuf,
    // serialises read-modify-write of the file between tasks sharing one backend
    lock: Mutex<()>,
}

impl YamlBackend {
    pub fn new(state_file: impl AsRef<Path>) -> Self {
        Self {
            state_file: state_file.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    async fn load(&self) -> BTreeMap<String, String> {
        match self.try_load().await {
            Ok(registers) => registers,
            Err(e) => {
                warn!("Could not load register state from {}: {:#}", self.state_file.display(), e);
                BTreeMap::new()
            }
        }
    }

    async fn try_load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let content = tokio::fs::read_to_string(&self.state_file).await?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: Option<BTreeMap<String, serde_yaml::Value>> = serde_yaml::from_str(&content)?;
        let mut registers = BTreeMap::new();
        for (register, value) in raw.unwrap_or_default() {
            let hex = match value {
                serde_yaml::Value::String(s) => s,
                // an unquoted all-digit value such as 120 comes back as a number
                serde_yaml::Value::Number(n) => format!("{:0>4}", n.to_string()),
                other => anyhow::bail!("register {}: unexpected value {:?}", register, other),
            };
            registers.insert(register, hex);
        }
        Ok(registers)
    }

    async fn save(&self, registers: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.state_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_yaml::to_string(registers)?;
        tokio::fs::write(&self.state_file, content)
            .await
            .with_context(|| format!("writing {}", self.state_file.display()))?;
        Ok(())
    }
}

#[async_trait]
impl RegisterBackend for YamlBackend {
    async fn read_register(&self, register: &str) -> Option<String> {
        let _guard = self.lock.lock().await;
        let value = self
            .load()
            .await
            .remove(register)
            .unwrap_or_else(|| registers::EMPTY_REGISTER.to_string());
        debug!("[yaml] READ register {}: {} ({})", register, value, reg_to_int(&value));
        Some(value)
    }

    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String> {
        let (prefix, start) = match (
            registers::utils::reg_address_prefix(start_register),
            reg_address_to_int(start_register),
        ) {
            (Ok(prefix), Ok(start)) => (prefix, start as u32),
            (Err(e), _) | (_, Err(e)) => {
                error!("Cannot read registers from {}: {}", start_register, e);
                return HashMap::new();
            }
        };

        let _guard = self.lock.lock().await;
        let state = self.load().await;

        let mut result = HashMap::with_capacity(count as usize);
        for index in start..start + count as u32 {
            let register = match int_to_reg_address(prefix, index) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Stopping range read at {}: {}", index, e);
                    break;
                }
            };
            let value = state
                .get(&register)
                .cloned()
                .unwrap_or_else(|| registers::EMPTY_REGISTER.to_string());
            result.insert(register, value);
        }

        debug!(
            "[yaml] READ {} registers starting at {}",
            result.len(),
            start_register
        );
        result
    }

    async fn write_register(&self, register: &str, hex_value: &str) -> bool {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await;

        let old = state
            .insert(register.to_string(), hex_value.to_string())
            .unwrap_or_else(|| registers::EMPTY_REGISTER.to_string());

        match self.save(&state).await {
            Ok(()) => {
                debug!(
                    "[yaml] WRITE register {}: {} -> {} ({} -> {})",
                    register,
                    old,
                    hex_value,
                    reg_to_int(&old),
                    reg_to_int(hex_value)
                );
                true
            }
            Err(e) => {
                error!("Could not save register state to {}: {:#}", self.state_file.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty_registers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = YamlBackend::new(dir.path().join("state.yaml"));

        assert_eq!(backend.read_register("0b55").await.as_deref(), Some("0000"));
        let regs = backend.read_registers("0b00", 4).await;
        assert_eq!(regs.len(), 4);
        assert!(regs.values().all(|v| v == "0000"));
    }

    #[tokio::test]
    async fn unquoted_digits_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");
        std::fs::write(&path, "\"0b55\": 120\n\"0b56\": \"d700\"\n").unwrap();
        let backend = YamlBackend::new(&path);

        assert_eq!(backend.read_register("0b55").await.as_deref(), Some("0120"));
        assert_eq!(backend.read_register("0b56").await.as_deref(), Some("d700"));
    }
}
