//! Register transports. The controller and the scanner tools only ever see the
//! [`RegisterBackend`] trait; [`Backend`] picks an implementation at runtime.
//!
//! Transport failures never escape as errors: reads come back empty and
//! writes return `false`, with the cause logged.

use crate::prelude::*;

use async_trait::async_trait;

pub mod http;
pub mod yaml;

pub use http::HttpBackend;
pub use yaml::YamlBackend;

#[async_trait]
pub trait RegisterBackend: Send + Sync {
    /// Reads one register, `None` if the read failed.
    async fn read_register(&self, register: &str) -> Option<String>;

    /// Reads `count` registers starting at `start_register`. An empty map
    /// means nothing could be read.
    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String>;

    async fn write_register(&self, register: &str, hex_value: &str) -> bool;

    /// Releases any live connection. Safe to call more than once.
    async fn release(&self) {}
}

#[async_trait]
impl<'a, B: RegisterBackend + ?Sized> RegisterBackend for &'a B {
    async fn read_register(&self, register: &str) -> Option<String> {
        (**self).read_register(register).await
    }

    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String> {
        (**self).read_registers(start_register, count).await
    }

    async fn write_register(&self, register: &str, hex_value: &str) -> bool {
        (**self).write_register(register, hex_value).await
    }

    async fn release(&self) {
        (**self).release().await
    }
}

#[async_trait]
impl<B: RegisterBackend + ?Sized> RegisterBackend for Box<B> {
    async fn read_register(&self, register: &str) -> Option<String> {
        (**self).read_register(register).await
    }

    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String> {
        (**self).read_registers(start_register, count).await
    }

    async fn write_register(&self, register: &str, hex_value: &str) -> bool {
        (**self).write_register(register, hex_value).await
    }

    async fn release(&self) {
        (**self).release().await
    }
}

// Backend {{{
pub enum Backend {
    Http(HttpBackend),
    Yaml(YamlBackend),
}

impl Backend {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backend = config.backend();
        match (backend.url(), backend.yaml()) {
            (Some(url), None) => {
                info!("Using HTTP backend at {}", url);
                Ok(Self::Http(HttpBackend::new(url, config.timeout())?))
            }
            (None, Some(path)) => {
                info!("Using YAML backend at {}", path.display());
                Ok(Self::Yaml(YamlBackend::new(path)))
            }
            (Some(_), Some(_)) => anyhow::bail!("use either backend.url or backend.yaml, not both"),
            (None, None) => anyhow::bail!("specify backend.url (HTTP) or backend.yaml (offline state file)"),
        }
    }
}

#[async_trait]
impl RegisterBackend for Backend {
    async fn read_register(&self, register: &str) -> Option<String> {
        match self {
            Self::Http(b) => b.read_register(register).await,
            Self::Yaml(b) => b.read_register(register).await,
        }
    }

    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String> {
        match self {
            Self::Http(b) => b.read_registers(start_register, count).await,
            Self::Yaml(b) => b.read_registers(start_register, count).await,
        }
    }

    async fn write_register(&self, register: &str, hex_value: &str) -> bool {
        match self {
            Self::Http(b) => b.write_register(register, hex_value).await,
            Self::Yaml(b) => b.write_register(register, hex_value).await,
        }
    }

    async fn release(&self) {
        match self {
            Self::Http(b) => b.release().await,
            Self::Yaml(b) => b.release().await,
        }
    }
} // }}}

/// Sets or clears one bit with a read-modify-write against any backend.
/// Returns `true` without writing if the bit already has the requested state.
pub async fn write_flag_bit<B: RegisterBackend + ?Sized>(
    backend: &B,
    register: &str,
    bit_index: u8,
    state: bool,
) -> bool {
    let Some(hex_val) = backend.read_register(register).await else {
        error!("Flag bit write failed: could not read {}", register);
        return false;
    };

    let current = reg_to_int(&hex_val);
    let new = set_bit(current, bit_index, state);
    let new_hex = int_to_reg(new as i64);

    debug!(
        "Flag bit write: register {}, bit {}: {} -> {} ({} -> {})",
        register,
        bit_index,
        get_bit(current, bit_index) as u8,
        state as u8,
        hex_val,
        new_hex
    );

    if current == new {
        debug!("Flag bit {} in register {} already in desired state", bit_index, register);
        return true;
    }

    backend.write_register(register, &new_hex).await
}
