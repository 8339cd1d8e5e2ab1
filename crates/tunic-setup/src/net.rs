//! DNS, public-IP discovery and release downloads.

use std::net::{IpAddr, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::error::SetupError;

/// Endpoint answering with the caller's public IP as plain text.
pub const PUBLIC_IP_URL: &str = "http://ifconfig.me/ip";

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Seam over everything that leaves the host.
pub trait Network {
    /// Resolve `domain` to its addresses.
    fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>>;
    /// The host's public IP as seen from outside.
    fn public_ip(&self) -> Result<IpAddr>;
    /// Fetch `url` into memory.
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`Network`] using the system resolver and a blocking `reqwest` client.
pub struct HttpNetwork {
    ip_client: reqwest::blocking::Client,
    download_client: reqwest::blocking::Client,
}

impl HttpNetwork {
    pub fn new() -> Result<Self> {
        // reqwest is built with rustls-no-provider; `Err` only means a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let ip_client = reqwest::blocking::Client::builder()
            .timeout(PUBLIC_IP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        let download_client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            ip_client,
            download_client,
        })
    }
}

impl Network for HttpNetwork {
    fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
        let addrs = (domain, 0)
            .to_socket_addrs()
            .with_context(|| format!("domain is unreachable or misspelled: {domain}"))?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }

    fn public_ip(&self) -> Result<IpAddr> {
        let body = self
            .ip_client
            .get(PUBLIC_IP_URL)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .with_context(|| format!("failed to query public IP from {PUBLIC_IP_URL}"))?;
        body.trim()
            .parse()
            .with_context(|| format!("unexpected public IP response: {body}"))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {url}");
        let bytes = self
            .download_client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::bytes)
            .with_context(|| format!("failed to download {url}"))?;
        if bytes.is_empty() {
            bail!("empty response from {url}");
        }
        Ok(bytes.to_vec())
    }
}

/// A domain proven to point at this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEndpoint {
    pub domain: String,
    pub resolved_ip: IpAddr,
    pub public_ip: IpAddr,
}

/// Check that `domain` resolves to the host's own public IP.
///
/// Nothing is written and no certificate is requested before this passes.
pub fn validate_domain(net: &dyn Network, domain: &str) -> Result<HostEndpoint> {
    let domain = domain.trim().trim_end_matches('.');
    if domain.is_empty() || domain.contains(char::is_whitespace) || !domain.contains('.') {
        return Err(SetupError::Validation(format!("invalid domain: {domain:?}")).into());
    }

    let resolved = net
        .resolve(domain)
        .map_err(|e| SetupError::Validation(format!("{e:#}")))?;
    if resolved.is_empty() {
        return Err(SetupError::Validation(format!("{domain} has no DNS records")).into());
    }

    let public_ip = net.public_ip()?;
    let Some(resolved_ip) = resolved.iter().copied().find(|ip| *ip == public_ip) else {
        let resolved = resolved
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(SetupError::DnsMismatch {
            domain: domain.to_string(),
            resolved,
            public_ip,
        }
        .into());
    };

    tracing::info!("{domain} resolves to this host ({resolved_ip})");
    Ok(HostEndpoint {
        domain: domain.to_string(),
        resolved_ip,
        public_ip,
    })
}
