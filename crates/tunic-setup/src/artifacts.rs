//! Persisted client configs and their console views.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tunic_core::export::{self, nekoray, singbox};
use tunic_core::relay::split_host_port;
use tunic_core::{ClientRelayModel, Ecosystem};

use crate::config::Layout;
use crate::error::SetupError;

/// Which views to print. No flag set means all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Views {
    pub nekoray: bool,
    pub clash: bool,
    pub singbox: bool,
}

impl Views {
    pub fn selected(self) -> Vec<Ecosystem> {
        if !(self.nekoray || self.clash || self.singbox) {
            return Ecosystem::ALL.to_vec();
        }
        Ecosystem::ALL
            .into_iter()
            .filter(|eco| match eco {
                Ecosystem::NekoRay => self.nekoray,
                Ecosystem::ClashMeta => self.clash,
                Ecosystem::SingBox => self.singbox,
            })
            .collect()
    }
}

/// Right after an install the Clash.Meta view only names the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Install,
    Check,
}

/// Regenerate every artifact from `relay` and write them to the workstation.
pub fn write_all(layout: &Layout, relay: &ClientRelayModel) -> Result<Vec<PathBuf>> {
    tracing::info!("generating client configs");
    export::export_all(relay)?
        .into_iter()
        .map(|artifact| {
            let path = layout.artifact_path(artifact.ecosystem());
            artifact
                .write_to(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(SetupError::MissingArtifact(path.to_path_buf()).into());
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Console text for one ecosystem's artifact.
pub fn render_view(layout: &Layout, ecosystem: Ecosystem, mode: ViewMode) -> Result<String> {
    let path = layout.artifact_path(ecosystem);
    let contents = read(&path)?;
    let view = match ecosystem {
        Ecosystem::NekoRay => {
            let config = nekoray::parse(&contents)?;
            let (host, port) = split_host_port(&config.relay.server)?;
            let pretty = serde_json::to_string_pretty(&config)?;
            format!(
                "--> NekoRay custom core\n\
                 # name: (custom)\n\
                 # address: {host}\n\
                 # port: {port}\n\
                 # command: -c %config%\n\
                 # core: tuic\n\n\
                 {pretty}\n"
            )
        }
        Ecosystem::ClashMeta => {
            let header = format!("--> Clash.Meta profile\n{}\n", path.display());
            match mode {
                ViewMode::Install => header,
                ViewMode::Check => format!("{header}\n{contents}"),
            }
        }
        Ecosystem::SingBox => {
            let outbound = singbox::parse(&contents)?;
            let pretty = serde_json::to_string_pretty(&outbound)?;
            format!("--> sing-box tuic outbound\n{pretty}\n")
        }
    };
    Ok(view)
}

/// Print the selected views. Returns the artifacts that were missing.
///
/// A missing or unreadable artifact is logged and skipped; the others are
/// still printed.
pub fn show(layout: &Layout, views: Views, mode: ViewMode) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    for ecosystem in views.selected() {
        match render_view(layout, ecosystem, mode) {
            Ok(view) => {
                #[allow(clippy::print_stdout)]
                {
                    println!("\n{view}");
                }
            }
            Err(e) => {
                tracing::error!("{e:#}");
                if let Some(SetupError::MissingArtifact(path)) = e.downcast_ref::<SetupError>() {
                    missing.push(path.clone());
                }
            }
        }
    }
    missing
}
