use crate::prelude::*;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RegsResponse {
    #[serde(default)]
    regs: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    status: Option<serde_json::Value>,
}

/// Talks to the heater's HTTP API, e.g. `http://192.168.1.1/api/dev/65`.
///
/// * `GET {base}/{register}/{count}` returns `{"regs": {"0b55": "d700", ...}}`
/// * `POST {base}/{register}` with a JSON string body returns `{"status": "0"}`
pub struct HttpBackend {
    api_base_url: String,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpBackend {
    pub fn new(api_base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(api_base_url, client))
    }

    pub fn with_client(api_base_url: &str, client: reqwest::Client) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            client: Mutex::new(Some(client)),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn client(&self) -> anyhow::Result<reqwest::Client> {
        self.client
            .lock()
            .map_err(|_| anyhow!("http client lock poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("backend has been released"))
    }

    async fn get_regs(&self, start_register: &str, count: u16) -> anyhow::Result<HashMap<String, String>> {
        let url = format!("{}/{}/{}", self.api_base_url, start_register, count);
        debug!("Reading {} registers starting from {} from {}", count, start_register, url);

        let response = self.client()?.get(&url).send().await?.error_for_status()?;
        let body: RegsResponse = response.json().await?;
        Ok(body.regs)
    }

    async fn post_register(&self, register: &str, hex_value: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.api_base_url, register);
        debug!(
            "Writing register {}: {} ({}) to {}",
            register,
            hex_value,
            reg_to_int(hex_value),
            url
        );

        let response = self
            .client()?
            .post(&url)
            .json(&hex_value)
            .send()
            .await?
            .error_for_status()?;
        let body: WriteResponse = response.json().await?;

        // the device reports status as a string, accept a bare number too
        match body.status {
            Some(serde_json::Value::String(s)) if s == "0" => Ok(()),
            Some(serde_json::Value::Number(n)) if n.as_i64() == Some(0) => Ok(()),
            other => bail!("non-zero status: {:?}", other),
        }
    }
}

#[async_trait]
impl RegisterBackend for HttpBackend {
    async fn read_register(&self, register: &str) -> Option<String> {
        match self.get_regs(register, 1).await {
            Ok(regs) => {
                let value = regs.get(register).cloned();
                match &value {
                    Some(v) => debug!("Register {}: {} ({})", register, v, reg_to_int(v)),
                    None => warn!("Register {} not found in response", register),
                }
                value
            }
            Err(e) => {
                error!("Error reading register {}: {:#}", register, e);
                None
            }
        }
    }

    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String> {
        match self.get_regs(start_register, count).await {
            Ok(regs) => {
                debug!("Read {} registers from {}", regs.len(), start_register);
                regs
            }
            Err(e) => {
                error!("Error reading registers from {}: {:#}", start_register, e);
                HashMap::new()
            }
        }
    }

    async fn write_register(&self, register: &str, hex_value: &str) -> bool {
        match self.post_register(register, hex_value).await {
            Ok(()) => {
                debug!("Successfully wrote register {}", register);
                true
            }
            Err(e) => {
                error!("Error writing register {}: {:#}", register, e);
                false
            }
        }
    }

    async fn release(&self) {
        if let Ok(mut client) = self.client.lock() {
            if client.take().is_some() {
                debug!("Released HTTP client for {}", self.api_base_url);
            }
        }
    }
}
