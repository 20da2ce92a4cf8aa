/// Configuration structures that can be tested independently
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkCredentials {
    pub ssid: String,
    pub password: String,
}

impl NetworkCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// Keep the secret out of log lines
impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("ssid", &self.ssid)
            .field("password", &if self.is_open() { "<empty>" } else { "<set>" })
            .finish()
    }
}

/// Options handed through to the HTTPS client that performs the transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_ms: u32,
    pub keep_alive: bool,
    pub rx_buffer_size: usize,
    pub tx_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            keep_alive: true,
            rx_buffer_size: 2048,
            tx_buffer_size: 1024,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateSource {
    pub url: String,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl UpdateSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport: TransportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BootPolicy {
    pub connect_timeout_ms: u32,
    pub grace_delay_ms: u32,
    pub transfer_stack_size: usize,
}

impl Default for BootPolicy {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            grace_delay_ms: 3_000,
            transfer_stack_size: 16 * 1024,
        }
    }
}

impl BootPolicy {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms as u64)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootConfig {
    pub network: NetworkCredentials,
    pub update: UpdateSource,
    #[serde(default)]
    pub policy: BootPolicy,
}

impl BootConfig {
    pub fn new(network: NetworkCredentials, update: UpdateSource) -> Self {
        Self {
            network,
            update,
            policy: BootPolicy::default(),
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: BootConfig = serde_json::from_slice(data)?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a provisioned blob, taking credentials and URL from `defaults`
    /// where the blob leaves them empty.
    pub fn from_provisioned(data: &[u8], defaults: &BootConfig) -> Result<Self> {
        let mut config = Self::from_json(data)?;
        if config.network.ssid.is_empty() {
            config.network = defaults.network.clone();
        }
        if config.update.url.is_empty() {
            config.update.url = defaults.update.url.clone();
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.ssid.is_empty() {
            bail!("WiFi SSID cannot be empty");
        }
        // 802.11 limits
        if self.network.ssid.len() > 32 {
            bail!("WiFi SSID longer than 32 bytes");
        }
        if self.network.password.len() > 64 {
            bail!("WiFi password longer than 64 bytes");
        }
        if !self.update.url.starts_with("https://") {
            bail!("Firmware URL must use https: {}", self.update.url);
        }
        let transport = &self.update.transport;
        if transport.timeout_ms == 0 {
            bail!("Transfer timeout must be non-zero");
        }
        if transport.rx_buffer_size == 0 || transport.tx_buffer_size == 0 {
            bail!("Transfer buffer sizes must be non-zero");
        }
        if self.policy.connect_timeout_ms == 0 {
            bail!("Connect timeout must be non-zero");
        }
        if self.policy.transfer_stack_size == 0 {
            bail!("Transfer stack size must be non-zero");
        }
        Ok(())
    }
}
