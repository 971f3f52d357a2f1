//! Bridge and viewer configuration loaded from YAML
//!
//! Every field is optional; missing fields take the defaults below.
//!
//! ```yaml
//! service_name: PhysMemRW
//! base_address: "0xFF00D400"
//! page_size: 256
//! refresh_interval_ms: 1000
//! auto_refresh: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::page::parse_address;
use crate::transport::SERVICE_NAME;
use crate::{BridgeError, Result};

/// Address shown when nothing else is configured
pub const DEFAULT_BASE_ADDRESS: u64 = 0xFF00_D400;
/// Bytes per page (16 rows of 16)
pub const DEFAULT_PAGE_SIZE: usize = 256;
/// Largest page the viewer will capture
pub const MAX_PAGE_SIZE: usize = 4096;
/// Default auto-refresh period
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;
/// Auto-refresh period bounds
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Clamp a refresh period into the supported range
pub fn clamp_refresh_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL)
}

/// Configuration for the bridge and its page viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Driver service class name
    pub service_name: String,
    /// First physical address of the viewed page
    #[serde(serialize_with = "serialize_address", deserialize_with = "deserialize_address")]
    pub base_address: u64,
    /// Bytes per captured page
    pub page_size: usize,
    /// Auto-refresh period, clamped to 100..=5000 ms when used
    pub refresh_interval_ms: u64,
    /// Start the viewer with auto-refresh enabled
    pub auto_refresh: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            base_address: DEFAULT_BASE_ADDRESS,
            page_size: DEFAULT_PAGE_SIZE,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            auto_refresh: false,
        }
    }
}

impl BridgeConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::file_error(path.to_path_buf(), e))?;
        let config = Self::parse(&text, path)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        // An empty document means "all defaults"
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(text)
            .map_err(|source| BridgeError::Config { path: PathBuf::from(path), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(BridgeError::ConfigValue {
                details: "service_name must not be empty".to_string(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(BridgeError::ConfigValue {
                details: format!("page_size {} outside 1..={}", self.page_size, MAX_PAGE_SIZE),
            });
        }
        if self.base_address.checked_add(self.page_size as u64 - 1).is_none() {
            return Err(BridgeError::ConfigValue {
                details: format!("page at {:#x} overflows the address space", self.base_address),
            });
        }
        Ok(())
    }

    /// Effective refresh period
    pub fn refresh_interval(&self) -> Duration {
        clamp_refresh_interval(Duration::from_millis(self.refresh_interval_ms))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Number(u64),
    Text(String),
}

fn deserialize_address<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match AddressRepr::deserialize(deserializer)? {
        AddressRepr::Number(n) => Ok(n),
        AddressRepr::Text(s) => parse_address(&s).map_err(serde::de::Error::custom),
    }
}

fn serialize_address<S>(address: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{address:X}"))
}
