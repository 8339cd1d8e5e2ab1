//! `tuic-server` runtime configuration.
//!
//! This is the authoritative record of a deployment. It is written once per
//! install, read back by `check`, and every client artifact is derived from it.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cert::CertificateBundle;
use crate::credential::Credential;
use crate::error::{Error, Result};

/// QUIC congestion control algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionControl {
    Cubic,
    NewReno,
    #[default]
    Bbr,
}

impl fmt::Display for CongestionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cubic => write!(f, "cubic"),
            Self::NewReno => write!(f, "new_reno"),
            Self::Bbr => write!(f, "bbr"),
        }
    }
}

impl FromStr for CongestionControl {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cubic" => Ok(Self::Cubic),
            "new_reno" => Ok(Self::NewReno),
            "bbr" => Ok(Self::Bbr),
            other => Err(format!(
                "unknown congestion control: {other} (expected 'cubic', 'new_reno' or 'bbr')"
            )),
        }
    }
}

/// Relay process log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

pub const DEFAULT_ALPN: [&str; 2] = ["h3", "spdy/3.1"];
pub const DEFAULT_SEND_WINDOW: u64 = 16_777_216;
pub const DEFAULT_RECEIVE_WINDOW: u64 = 8_388_608;
pub const DEFAULT_MAX_EXTERNAL_PACKET_SIZE: u32 = 1500;

/// Server runtime configuration, serialized verbatim as `server_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRuntimeConfig {
    /// Listen socket address, `[::]:<port>`.
    pub server: String,
    /// User id -> password.
    pub users: BTreeMap<String, String>,
    pub certificate: String,
    pub private_key: String,
    #[serde(default)]
    pub congestion_control: CongestionControl,
    #[serde(default = "default_alpn")]
    pub alpn: Vec<String>,
    #[serde(default = "default_true")]
    pub udp_relay_ipv6: bool,
    #[serde(default = "default_true")]
    pub zero_rtt_handshake: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_stack: Option<bool>,
    #[serde(default = "default_timeout")]
    pub auth_timeout: String,
    #[serde(default = "default_timeout")]
    pub task_negotiation_timeout: String,
    #[serde(default = "default_max_idle_time")]
    pub max_idle_time: String,
    #[serde(default = "default_max_external_packet_size")]
    pub max_external_packet_size: u32,
    #[serde(default = "default_send_window")]
    pub send_window: u64,
    #[serde(default = "default_receive_window")]
    pub receive_window: u64,
    #[serde(default = "default_gc_interval")]
    pub gc_interval: String,
    #[serde(default = "default_gc_lifetime")]
    pub gc_lifetime: String,
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_alpn() -> Vec<String> {
    DEFAULT_ALPN.iter().map(ToString::to_string).collect()
}

const fn default_true() -> bool {
    true
}

fn default_timeout() -> String {
    "3s".into()
}

fn default_max_idle_time() -> String {
    "10s".into()
}

const fn default_max_external_packet_size() -> u32 {
    DEFAULT_MAX_EXTERNAL_PACKET_SIZE
}

const fn default_send_window() -> u64 {
    DEFAULT_SEND_WINDOW
}

const fn default_receive_window() -> u64 {
    DEFAULT_RECEIVE_WINDOW
}

fn default_gc_interval() -> String {
    "3s".into()
}

fn default_gc_lifetime() -> String {
    "15s".into()
}

impl ServerRuntimeConfig {
    /// Build a config listening on `[::]:<port>` with every tunable defaulted.
    pub fn new(credential: &Credential, port: u16, bundle: &CertificateBundle) -> Self {
        let mut users = BTreeMap::new();
        users.insert(credential.username.clone(), credential.password.clone());
        Self {
            server: format!("[::]:{port}"),
            users,
            certificate: bundle.fullchain.display().to_string(),
            private_key: bundle.private_key.display().to_string(),
            congestion_control: CongestionControl::default(),
            alpn: default_alpn(),
            udp_relay_ipv6: true,
            zero_rtt_handshake: true,
            dual_stack: None,
            auth_timeout: default_timeout(),
            task_negotiation_timeout: default_timeout(),
            max_idle_time: default_max_idle_time(),
            max_external_packet_size: DEFAULT_MAX_EXTERNAL_PACKET_SIZE,
            send_window: DEFAULT_SEND_WINDOW,
            receive_window: DEFAULT_RECEIVE_WINDOW,
            gc_interval: default_gc_interval(),
            gc_lifetime: default_gc_lifetime(),
            log_level: LogLevel::default(),
        }
    }

    /// Port part of the listen address.
    pub fn port(&self) -> Result<u16> {
        self.server
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .ok_or_else(|| Error::InvalidAddress(self.server.clone()))
    }

    /// The first (and, for generated configs, only) user.
    pub fn credential(&self) -> Option<Credential> {
        self.users.iter().next().map(|(username, password)| Credential {
            username: username.clone(),
            password: password.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the config, replacing any previous one wholesale.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        tracing::info!("saved server config: {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingArtifact(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
