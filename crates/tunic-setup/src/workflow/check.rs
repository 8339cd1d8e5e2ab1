use std::path::PathBuf;

use tunic_core::ServerRuntimeConfig;

use crate::artifacts::{self, ViewMode, Views};
use crate::config::Layout;
use crate::error::SetupError;

#[derive(Debug)]
pub struct CheckReport {
    pub server: Option<ServerRuntimeConfig>,
    /// Client configs that were expected but not found.
    pub missing: Vec<PathBuf>,
}

/// Reprint persisted client configs. Absent files are reported, not fatal.
pub fn check(layout: &Layout, views: Views, mode: ViewMode) -> CheckReport {
    let server = match ServerRuntimeConfig::load(&layout.server_config) {
        Ok(server) => Some(server),
        Err(tunic_core::Error::MissingArtifact(path)) => {
            tracing::error!("{}", SetupError::MissingArtifact(path));
            None
        }
        Err(e) => {
            tracing::error!("failed to load server config: {e}");
            None
        }
    };
    let missing = artifacts::show(layout, views, mode);
    CheckReport { server, missing }
}
