//! Tunic Core Library
//!
//! The canonical description of a deployed TUIC relay and everything derived
//! from it:
//! - Server runtime configuration consumed by `tuic-server`
//! - Credential and certificate bundle records
//! - The client relay view and its three client-format exporters
//! - Common error types and tracing setup

pub mod cert;
pub mod credential;
pub mod error;
pub mod export;
pub mod relay;
pub mod server;
pub mod tracing_init;

pub use cert::CertificateBundle;
pub use credential::Credential;
pub use error::{Error, Result};
pub use export::{Artifact, Ecosystem};
pub use relay::ClientRelayModel;
pub use server::{CongestionControl, LogLevel, ServerRuntimeConfig};
