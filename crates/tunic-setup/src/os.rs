use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

pub const OS_RELEASE: &str = "/etc/os-release";

/// Parse `os-release` content into key-value pairs.
fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.trim_matches('"').to_string()))
        .collect()
}

fn is_apt_based(release: &HashMap<String, String>) -> bool {
    ["ID", "ID_LIKE"].iter().any(|key| {
        release.get(*key).is_some_and(|v| {
            v.split_whitespace()
                .any(|id| id == "debian" || id == "ubuntu")
        })
    })
}

/// Ensure the host installs packages with apt. Bails otherwise.
pub fn ensure_apt_based(os_release: &Path) -> Result<()> {
    let content = fs::read_to_string(os_release)
        .with_context(|| format!("failed to read {}", os_release.display()))?;
    let release = parse_os_release(&content);
    let id = release.get("ID").map_or("unknown", String::as_str);
    if !is_apt_based(&release) {
        bail!("only Debian and Ubuntu hosts are supported (detected OS: {id})");
    }
    let version = release.get("VERSION_ID").map_or("unknown", String::as_str);
    tracing::info!("detected {id} ({version})");
    Ok(())
}
