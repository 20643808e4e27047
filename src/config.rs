//! Service configuration
//!
//! All tunable parameters for the relay service, loaded from a JSON file at
//! startup.  Every field has a default, so a partial file (or none at all)
//! is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::app::state::Contact;
use crate::app::store::{MAX_NAME_LEN, RelayRecord};
use crate::pins::{
    MAX_RELAY_ID, PinDescriptor, PinoutError, PinoutTable, UNSTABLE_PINS, standard_header,
};

/// What to do with the relays when the service starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    /// Drive every relay off and record it.
    #[default]
    AllOff,
    /// Re-apply each relay's persisted state.
    Restore,
}

/// One relay → pin assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub id: u8,
    pub name: String,
    /// Physical header pin.
    pub pin: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 50051,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub filename: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::from("relaybox-db.json"),
        }
    }
}

/// Core service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    // --- Relays ---
    /// Relay → pin assignments, at most four.
    pub relays: Vec<RelayConfig>,
    /// Contact wiring shared by every relay
    pub contact: Contact,
    pub startup: StartupPolicy,

    // --- Timing ---
    /// Bound on the wait for a pin to confirm a write (milliseconds)
    pub confirm_timeout_ms: u32,

    // --- Interfaces ---
    pub rpc: RpcConfig,
    pub db: DbConfig,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,

    /// Replacement header table for boards that differ from the standard
    /// 40-pin layout.
    pub header: Option<Vec<PinDescriptor>>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            relays: vec![
                relay(1, "GPIO4", 7),
                relay(2, "GPIO17", 11),
                relay(3, "GPIO27", 13),
                relay(4, "GPIO22", 15),
            ],
            contact: Contact::NormallyClosed,
            startup: StartupPolicy::AllOff,

            confirm_timeout_ms: 2000, // 2 s

            rpc: RpcConfig::default(),
            db: DbConfig::default(),
            log_level: "info".into(),

            header: None,
        }
    }
}

fn relay(id: u8, name: &str, pin: u8) -> RelayConfig {
    RelayConfig {
        id,
        name: name.into(),
        pin,
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    File,
    /// The file was absent; every field is a default.
    Defaults,
}

/// Errors loading or validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Io(String),
    /// The file is not valid JSON for [`ServiceConfig`].
    Parse(String),
    ValidationFailed(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "cannot read config: {}", msg),
            Self::Parse(msg) => write!(f, "malformed config: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<PinoutError> for ConfigError {
    fn from(e: PinoutError) -> Self {
        Self::ValidationFailed(e.to_string())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationFailed(msg.into())
}

impl ServiceConfig {
    /// Load and validate `path`.  A missing file yields the defaults; the
    /// origin tells the caller which happened, since logging is usually not
    /// up yet.
    pub fn load(path: &Path) -> Result<(Self, ConfigOrigin), ConfigError> {
        let (cfg, origin) = match std::fs::read_to_string(path) {
            Ok(text) => {
                let cfg: Self =
                    serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
                (cfg, ConfigOrigin::File)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), ConfigOrigin::Defaults)
            }
            Err(e) => return Err(ConfigError::Io(format!("{}: {}", path.display(), e))),
        };
        cfg.validate()?;
        Ok((cfg, origin))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relays.is_empty() || self.relays.len() > usize::from(MAX_RELAY_ID) {
            return Err(invalid(format!("relays must list 1–{} entries", MAX_RELAY_ID)));
        }
        if let Some(d) = self.header.iter().flatten().find(|d| d.relay.is_some()) {
            return Err(invalid(format!(
                "header pin {} presets a relay; assign relays in `relays` only",
                d.pin
            )));
        }
        let header = self.header.clone().unwrap_or_else(standard_header);
        for (i, r) in self.relays.iter().enumerate() {
            if !(1..=MAX_RELAY_ID).contains(&r.id) {
                return Err(invalid(format!("relay id {} must be 1–{}", r.id, MAX_RELAY_ID)));
            }
            if self.relays[..i].iter().any(|o| o.id == r.id) {
                return Err(invalid(format!("relay id {} listed twice", r.id)));
            }
            if self.relays[..i].iter().any(|o| o.pin == r.pin) {
                return Err(invalid(format!("pin {} assigned to more than one relay", r.pin)));
            }
            let name = r.name.trim();
            if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
                return Err(invalid(format!(
                    "relay {} name must be 1–{} characters",
                    r.id, MAX_NAME_LEN
                )));
            }
            if UNSTABLE_PINS.contains(&r.pin) {
                return Err(invalid(format!(
                    "relay {}: pin {} is not safe to drive",
                    r.id, r.pin
                )));
            }
            match header.iter().find(|d| d.pin == r.pin) {
                None => return Err(invalid(format!("relay {}: pin {} is not on the header", r.id, r.pin))),
                Some(d) if !d.is_gpio || d.bcm.is_none() => {
                    return Err(invalid(format!(
                        "relay {}: pin {} ({}) is not a GPIO",
                        r.id, r.pin, d.name
                    )));
                }
                Some(_) => {}
            }
        }
        if !(50..=10_000).contains(&self.confirm_timeout_ms) {
            return Err(invalid("confirm_timeout_ms must be 50–10000"));
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(invalid(format!("unknown log_level {:?}", self.log_level)));
        }
        self.pinout()?;
        Ok(())
    }

    /// Header table with this configuration's relays wired on.
    pub fn pinout(&self) -> Result<PinoutTable, ConfigError> {
        let header = self.header.clone().unwrap_or_else(standard_header);
        Ok(PinoutTable::with_relays(
            header,
            self.relays.iter().map(|r| (r.id, r.pin)),
        )?)
    }

    /// First-run records, all off.
    pub fn seed_records(&self) -> Vec<RelayRecord> {
        self.relays
            .iter()
            .map(|r| RelayRecord::new(r.id, r.name.trim(), r.pin))
            .collect()
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.confirm_timeout_ms))
    }

    /// Configured log level; `info` if unparseable.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc.host, self.rpc.port)
    }
}
