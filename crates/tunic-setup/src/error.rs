//! Failure taxonomy for setup workflows.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors with a defined place in the workflow failure policy.
///
/// Workflows return `anyhow::Result`; callers that need the category
/// downcast to this type.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Bad CLI input detected before any side effect.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(
        "host public IP {public_ip} does not match {domain} (resolves to {resolved}). \
         Point an A/AAAA record for {domain} at this host first."
    )]
    DnsMismatch {
        domain: String,
        resolved: String,
        public_ip: IpAddr,
    },

    #[error("port {0} is reserved; choose a port in [49152, 65535]")]
    PortRange(u16),

    #[error("UDP port {0} is already in use")]
    PortInUse(u16),

    #[error("no free UDP port in [{start}, {end})")]
    PortExhausted { start: u16, end: u16 },

    #[error(
        "certificate authority rate limit hit for {0}: at most 5 certificates per domain \
         every 168 hours. Wait, or create a new A record for this host and use that domain."
    )]
    RateLimited(String),

    #[error("certificate issuance for {domain} failed: {stderr}")]
    CertificateIssuance { domain: String, stderr: String },

    #[error("{} still busy after {attempts} download attempts", .path.display())]
    DownloadConflict { path: PathBuf, attempts: u32 },

    #[error("relay service did not become active (status: {0})")]
    ServiceStart(String),

    #[error("client config not found: {}", .0.display())]
    MissingArtifact(PathBuf),
}
