//! Configuration system for thatch.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $THATCH_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/thatch/config.toml
//!   3. ~/.config/thatch/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::wire::{
    DEFAULT_DISCOVERY_PORT, DEFAULT_PEER_PORT, DEFAULT_SOCKET_PATH, DEFAULT_SUBNET_MASK,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThatchConfig {
    pub identity: IdentityConfig,
    pub control: ControlConfig,
    pub network: NetworkConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Display name. Empty = $USER plus a discriminator.
    pub name: String,
    /// Path to the Ed25519 secret. Auto-generated on first run.
    pub keypair_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Unix socket the terminal client connects to.
    pub socket_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port the peer plane listens on.
    pub peer_port: u16,
    /// Port dialled on every subnet host during a sweep.
    pub discovery_port: u16,
    /// Prefix length of the subnet to sweep.
    pub subnet_mask: u8,
    /// IPv4 address of the local interface. Empty = probe the default route.
    pub interface_addr: String,
    pub dial_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub scan_on_startup: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub verification: VerificationMode,
}

/// How peer-plane signatures are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Trust on first use: every signature is accepted. Insecure.
    #[default]
    None,
    /// Signatures must verify against the asserted identity token.
    Ed25519,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ed25519 => "ed25519",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "insecure" => Some(Self::None),
            "ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            keypair_path: config_dir().join("keypair"),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_port: DEFAULT_PEER_PORT,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            subnet_mask: DEFAULT_SUBNET_MASK,
            interface_addr: String::new(),
            dial_timeout_ms: 1_500,
            request_timeout_ms: 5_000,
            scan_on_startup: true,
        }
    }
}

impl NetworkConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("thatch")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ThatchConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            ThatchConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("THATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ThatchConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.subnet_mask > 32 {
            return Err(ConfigError::Invalid {
                key: "network.subnet_mask",
                reason: format!("{} exceeds 32", self.network.subnet_mask),
            });
        }
        if self.network.peer_port == 0 {
            return Err(ConfigError::Invalid {
                key: "network.peer_port",
                reason: "must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Apply THATCH_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("THATCH_IDENTITY__NAME") {
            self.identity.name = v;
        }
        if let Some(v) = lookup("THATCH_CONTROL__SOCKET_PATH") {
            self.control.socket_path = PathBuf::from(v);
        }
        if let Some(p) = lookup("THATCH_NETWORK__PEER_PORT").and_then(|v| v.parse().ok()) {
            self.network.peer_port = p;
        }
        if let Some(p) = lookup("THATCH_NETWORK__DISCOVERY_PORT").and_then(|v| v.parse().ok()) {
            self.network.discovery_port = p;
        }
        if let Some(m) = lookup("THATCH_NETWORK__SUBNET_MASK").and_then(|v| v.parse().ok()) {
            self.network.subnet_mask = m;
        }
        if let Some(v) = lookup("THATCH_NETWORK__INTERFACE_ADDR") {
            self.network.interface_addr = v;
        }
        if let Some(mode) =
            lookup("THATCH_AUTH__VERIFICATION").and_then(|v| VerificationMode::parse(&v))
        {
            self.auth.verification = mode;
        }
    }
}
