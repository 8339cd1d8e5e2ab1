//! Client-side view of the relay.
//!
//! [`ClientRelayModel`] holds exactly what a client has to agree on with the
//! server. Every shared field is copied from a [`ServerRuntimeConfig`]; none of
//! them has a client-side default.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::server::{CongestionControl, ServerRuntimeConfig};

/// UDP relay mode advertised to clients.
pub const UDP_RELAY_MODE: &str = "quic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRelayModel {
    /// Domain the certificate was issued for. Also the TLS server name.
    pub domain: String,
    pub port: u16,
    /// Optional IP overriding DNS resolution of `domain`.
    pub ip: Option<IpAddr>,
    pub uuid: String,
    pub password: String,
    pub udp_relay_mode: String,
    pub congestion_control: CongestionControl,
    pub alpn: Vec<String>,
    pub zero_rtt_handshake: bool,
    pub send_window: u64,
    pub receive_window: u64,
    pub gc_interval: String,
    pub gc_lifetime: String,
}

impl ClientRelayModel {
    /// Derive the client view from the server config it must match.
    ///
    /// The port is taken from the server's listen address, so a client can
    /// never point at a port the relay is not bound to.
    pub fn from_server(
        server: &ServerRuntimeConfig,
        domain: &str,
        ip: Option<IpAddr>,
    ) -> Result<Self> {
        let credential = server
            .credential()
            .ok_or_else(|| Error::Config("server config has no users".into()))?;
        Ok(Self {
            domain: domain.to_string(),
            port: server.port()?,
            ip,
            uuid: credential.username,
            password: credential.password,
            udp_relay_mode: UDP_RELAY_MODE.to_string(),
            congestion_control: server.congestion_control,
            alpn: server.alpn.clone(),
            zero_rtt_handshake: server.zero_rtt_handshake,
            send_window: server.send_window,
            receive_window: server.receive_window,
            gc_interval: server.gc_interval.clone(),
            gc_lifetime: server.gc_lifetime.clone(),
        })
    }

    /// `domain:port`, the address clients dial.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.domain, self.port)
    }
}

/// Split `host:port`, tolerating bracketed IPv6 hosts.
pub fn split_host_port(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidAddress(addr.to_string()))?;
    let port = port
        .parse()
        .map_err(|_| Error::InvalidAddress(addr.to_string()))?;
    Ok((host.trim_matches(['[', ']']).to_string(), port))
}
