use anyhow::Result;

use super::Host;
use crate::certbot::CertificateManager;
use crate::config::Layout;
use crate::{alias, net};

/// Undo an install. Every step tolerates targets that were never created.
pub fn remove(host: &Host<'_>, layout: &Layout, domain: &str) -> Result<()> {
    let endpoint = net::validate_domain(host.net, domain)?;
    tracing::info!("removing relay bound to {}", endpoint.domain);

    if let Err(e) = alias::remove_alias(layout) {
        tracing::warn!("failed to remove shell alias: {e:#}");
    }
    CertificateManager::new(host.runner, host.probe, &layout.letsencrypt)
        .remove(&endpoint.domain)?;
    host.supervisor(layout).teardown(&layout.workstation)?;

    tracing::info!("relay removed");
    Ok(())
}
