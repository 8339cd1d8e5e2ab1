//! NekoRay custom core profile (`tuic-client` v1.0.0 config schema).

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relay::ClientRelayModel;
use crate::server::{CongestionControl, LogLevel};

/// Local SOCKS endpoint; NekoRay substitutes `%socks_port%` at launch.
pub const LOCAL_SERVER: &str = "127.0.0.1:%socks_port%";
pub const LOCAL_MAX_PACKET_SIZE: u32 = 1500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NekoRayConfig {
    pub relay: Relay,
    pub local: Local,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub server: String,
    pub uuid: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
    pub udp_relay_mode: String,
    pub congestion_control: CongestionControl,
    pub alpn: Vec<String>,
    pub zero_rtt_handshake: bool,
    pub send_window: u64,
    pub receive_window: u64,
    pub gc_interval: String,
    pub gc_lifetime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Local {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_stack: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_packet_size: Option<u32>,
}

impl NekoRayConfig {
    pub fn from_relay(relay: &ClientRelayModel) -> Self {
        Self {
            relay: Relay {
                server: relay.server_addr(),
                uuid: relay.uuid.clone(),
                password: relay.password.clone(),
                ip: relay.ip,
                udp_relay_mode: relay.udp_relay_mode.clone(),
                congestion_control: relay.congestion_control,
                alpn: relay.alpn.clone(),
                zero_rtt_handshake: relay.zero_rtt_handshake,
                send_window: relay.send_window,
                receive_window: relay.receive_window,
                gc_interval: relay.gc_interval.clone(),
                gc_lifetime: relay.gc_lifetime.clone(),
            },
            local: Local {
                server: LOCAL_SERVER.to_string(),
                username: None,
                password: None,
                dual_stack: None,
                max_packet_size: Some(LOCAL_MAX_PACKET_SIZE),
            },
            log_level: LogLevel::Warn,
        }
    }
}

pub fn render(relay: &ClientRelayModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(&NekoRayConfig::from_relay(relay))?)
}

/// Parse a persisted profile, e.g. to redisplay it.
pub fn parse(contents: &str) -> Result<NekoRayConfig> {
    Ok(serde_json::from_str(contents)?)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::cert::CertificateBundle;
    use crate::credential::Credential;
    use crate::server::ServerRuntimeConfig;

    fn relay(ip: Option<IpAddr>) -> ClientRelayModel {
        let bundle = CertificateBundle::new(Path::new("/etc/letsencrypt"), "relay.example.com");
        let server = ServerRuntimeConfig::new(&Credential::generate(), 50123, &bundle);
        ClientRelayModel::from_server(&server, "relay.example.com", ip).expect("relay")
    }

    #[test]
    fn local_endpoint_is_placeholder() {
        let doc: serde_json::Value =
            serde_json::from_str(&render(&relay(None)).expect("render")).expect("json");
        assert_eq!(doc["local"]["server"], "127.0.0.1:%socks_port%");
        assert_eq!(doc["local"]["max_packet_size"], 1500);
        assert_eq!(doc["log_level"], "warn");
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let doc: serde_json::Value =
            serde_json::from_str(&render(&relay(None)).expect("render")).expect("json");
        assert!(doc["relay"].get("ip").is_none());
        assert!(doc["relay"].get("certificates").is_none());
        assert!(doc["local"].get("username").is_none());
        assert!(doc["local"].get("dual_stack").is_none());
    }

    #[test]
    fn ip_override_is_included_when_set() {
        let contents = render(&relay(Some("203.0.113.7".parse().expect("ip")))).expect("render");
        let config = parse(&contents).expect("parse");
        assert_eq!(config.relay.ip, Some("203.0.113.7".parse().expect("ip")));
        assert_eq!(config.relay.server, "relay.example.com:50123");
        assert_eq!(config.relay.udp_relay_mode, "quic");
    }
}
