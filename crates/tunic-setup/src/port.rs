//! Listening port selection.
//!
//! A probe binds the port and releases it immediately. Nothing reserves the
//! port between the probe and the relay's own bind, so a concurrent process
//! can still take it in that window.

use std::net::{Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use std::ops::Range;

use rand::seq::SliceRandom;

use crate::error::SetupError;

/// Ports at or below this are reserved for well-known and registered services.
pub const RESERVED_MAX: u16 = 49151;

/// Candidate pool for automatic allocation.
pub const EPHEMERAL_RANGE: Range<u16> = 49152..59151;

/// Instantaneous bindability check.
pub trait PortProbe {
    fn udp_free(&self, port: u16) -> bool;
    fn tcp_free(&self, port: u16) -> bool;
}

/// Probe that binds on `0.0.0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketProbe;

impl PortProbe for SocketProbe {
    fn udp_free(&self, port: u16) -> bool {
        UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).is_ok()
    }

    fn tcp_free(&self, port: u16) -> bool {
        TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).is_ok()
    }
}

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRequest {
    Auto,
    Fixed(u16),
}

/// Validate an explicit `-p` value. `None` means auto-allocate.
pub fn validate_requested(
    probe: &dyn PortProbe,
    port: Option<u16>,
) -> Result<PortRequest, SetupError> {
    let Some(port) = port else {
        return Ok(PortRequest::Auto);
    };
    if port <= RESERVED_MAX {
        return Err(SetupError::PortRange(port));
    }
    if !probe.udp_free(port) {
        return Err(SetupError::PortInUse(port));
    }
    tracing::info!("requested UDP port {port} is available");
    Ok(PortRequest::Fixed(port))
}

/// Pick a random free UDP port from [`EPHEMERAL_RANGE`].
pub fn allocate_free(probe: &dyn PortProbe) -> Result<u16, SetupError> {
    let mut candidates: Vec<u16> = EPHEMERAL_RANGE.collect();
    candidates.shuffle(&mut rand::rng());
    candidates
        .into_iter()
        .find(|&port| probe.udp_free(port))
        .inspect(|port| tracing::info!("allocated UDP port {port}"))
        .ok_or(SetupError::PortExhausted {
            start: EPHEMERAL_RANGE.start,
            end: EPHEMERAL_RANGE.end,
        })
}

/// Turn a validated request into the port used for the rest of the run.
pub fn resolve(probe: &dyn PortProbe, request: PortRequest) -> Result<u16, SetupError> {
    match request {
        PortRequest::Fixed(port) => Ok(port),
        PortRequest::Auto => allocate_free(probe),
    }
}
