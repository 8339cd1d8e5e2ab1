//! Client configuration exporters.
//!
//! Each exporter is a pure function from a [`ClientRelayModel`] to a
//! serialized document. Artifacts are always regenerated wholesale; nothing
//! here reads a previous artifact back in order to patch it.

pub mod clash;
pub mod nekoray;
pub mod singbox;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::relay::ClientRelayModel;

/// Client ecosystems an artifact can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    /// NekoRay custom `tuic-client` core (JSON).
    NekoRay,
    /// Clash.Meta profile (YAML).
    ClashMeta,
    /// sing-box `tuic` outbound (JSON).
    SingBox,
}

impl Ecosystem {
    pub const ALL: [Self; 3] = [Self::NekoRay, Self::ClashMeta, Self::SingBox];

    /// File name of the artifact inside the workstation.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::NekoRay => "nekoray_config.json",
            Self::ClashMeta => "meta_config.yaml",
            Self::SingBox => "singbox_config.json",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NekoRay => write!(f, "NekoRay"),
            Self::ClashMeta => write!(f, "Clash.Meta"),
            Self::SingBox => write!(f, "sing-box"),
        }
    }
}

/// One serialized client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    ecosystem: Ecosystem,
    contents: String,
}

impl Artifact {
    pub const fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Replace the file at `path` with this artifact.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.contents)?;
        tracing::info!("saved {} client config: {}", self.ecosystem, path.display());
        Ok(())
    }
}

/// Render the artifact for a single ecosystem.
pub fn export(ecosystem: Ecosystem, relay: &ClientRelayModel) -> Result<Artifact> {
    let contents = match ecosystem {
        Ecosystem::NekoRay => nekoray::render(relay)?,
        Ecosystem::ClashMeta => clash::render(relay)?,
        Ecosystem::SingBox => singbox::render(relay)?,
    };
    Ok(Artifact {
        ecosystem,
        contents,
    })
}

/// Render all three artifacts from the same model.
pub fn export_all(relay: &ClientRelayModel) -> Result<Vec<Artifact>> {
    Ecosystem::ALL
        .into_iter()
        .map(|ecosystem| export(ecosystem, relay))
        .collect()
}
