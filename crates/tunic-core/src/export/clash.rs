//! Clash.Meta profile.
//!
//! The profile is a static DNS/rules policy with one `tuic` proxy and a
//! single-member `PROXY` selector merged in at the value level.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::relay::ClientRelayModel;

/// Proxy name referenced by the selector group.
pub const PROXY_NAME: &str = "tunic";
/// Group name the base rules route to.
pub const GROUP_NAME: &str = "PROXY";
pub const MAX_UDP_RELAY_PACKET_SIZE: u32 = 1464;

/// Policy shared by every generated profile.
pub const BASE_POLICY: &str = r#"dns:
  enable: true
  prefer-h3: true
  enhanced-mode: fake-ip
  nameserver:
    - "https://dns.google/dns-query#PROXY"
    - "https://security.cloudflare-dns.com/dns-query#PROXY"
    - "quic://dns.adguard-dns.com"
  proxy-server-nameserver:
    - "https://223.5.5.5/dns-query"
  nameserver-policy:
    "geosite:cn":
      - "https://223.5.5.5/dns-query#h3=true"
rules:
  - GEOSITE,category-scholar-!cn,PROXY
  - GEOSITE,category-ads-all,REJECT
  - GEOSITE,youtube,PROXY
  - GEOSITE,google,PROXY
  - GEOSITE,cn,DIRECT
  - GEOSITE,private,DIRECT
  - GEOSITE,steam@cn,DIRECT
  - GEOSITE,category-games@cn,DIRECT
  - GEOSITE,geolocation-!cn,PROXY
  - GEOIP,private,DIRECT,no-resolve
  - GEOIP,telegram,PROXY
  - GEOIP,CN,DIRECT
  - DST-PORT,80/8080/443/8443,PROXY
  - MATCH,DIRECT
"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Proxy<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    server: &'a str,
    port: u16,
    uuid: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    udp_relay_mode: &'a str,
    congestion_controller: String,
    alpn: &'a [String],
    reduce_rtt: bool,
    max_udp_relay_packet_size: u32,
}

#[derive(Debug, Serialize)]
struct ProxyGroup<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    proxies: [&'a str; 1],
}

/// Build the full profile document.
pub fn document(relay: &ClientRelayModel) -> Result<Value> {
    let proxy = Proxy {
        name: PROXY_NAME,
        kind: "tuic",
        server: &relay.domain,
        port: relay.port,
        uuid: &relay.uuid,
        password: &relay.password,
        ip: relay.ip.map(|ip| ip.to_string()),
        udp_relay_mode: &relay.udp_relay_mode,
        congestion_controller: relay.congestion_control.to_string(),
        alpn: &relay.alpn,
        reduce_rtt: relay.zero_rtt_handshake,
        max_udp_relay_packet_size: MAX_UDP_RELAY_PACKET_SIZE,
    };
    let group = ProxyGroup {
        name: GROUP_NAME,
        kind: "select",
        proxies: [PROXY_NAME],
    };

    let mut doc: Mapping = serde_yaml::from_str(BASE_POLICY)?;
    if doc.contains_key("proxies") || doc.contains_key("proxy-groups") {
        return Err(Error::Config(
            "base policy must not define proxies or proxy-groups".into(),
        ));
    }
    doc.insert(
        "proxies".into(),
        Value::Sequence(vec![serde_yaml::to_value(proxy)?]),
    );
    doc.insert(
        "proxy-groups".into(),
        Value::Sequence(vec![serde_yaml::to_value(group)?]),
    );
    Ok(Value::Mapping(doc))
}

pub fn render(relay: &ClientRelayModel) -> Result<String> {
    Ok(serde_yaml::to_string(&document(relay)?)?)
}
