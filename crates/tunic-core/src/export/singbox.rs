//! sing-box `tuic` outbound.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relay::ClientRelayModel;
use crate::server::CongestionControl;

pub const OUTBOUND_TAG: &str = "tuic-out";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingBoxOutbound {
    #[serde(rename = "type")]
    pub kind: String,
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub uuid: String,
    pub password: String,
    pub congestion_control: CongestionControl,
    pub udp_relay_mode: String,
    pub zero_rtt_handshake: bool,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tls {
    pub enabled: bool,
    pub disable_sni: bool,
    pub server_name: String,
    pub insecure: bool,
    pub alpn: Vec<String>,
}

impl SingBoxOutbound {
    pub fn from_relay(relay: &ClientRelayModel) -> Self {
        let server = relay
            .ip
            .map_or_else(|| relay.domain.clone(), |ip| ip.to_string());
        Self {
            kind: "tuic".into(),
            tag: OUTBOUND_TAG.into(),
            server,
            server_port: relay.port,
            uuid: relay.uuid.clone(),
            password: relay.password.clone(),
            congestion_control: relay.congestion_control,
            udp_relay_mode: relay.udp_relay_mode.clone(),
            zero_rtt_handshake: relay.zero_rtt_handshake,
            tls: Tls {
                enabled: true,
                disable_sni: false,
                server_name: relay.domain.clone(),
                insecure: false,
                alpn: relay.alpn.clone(),
            },
        }
    }
}

pub fn render(relay: &ClientRelayModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SingBoxOutbound::from_relay(relay))?)
}

pub fn parse(contents: &str) -> Result<SingBoxOutbound> {
    Ok(serde_json::from_str(contents)?)
}
