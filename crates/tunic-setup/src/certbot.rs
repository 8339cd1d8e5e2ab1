//! Let's Encrypt certificate lifecycle through `certbot`.
//!
//! Issuance uses the standalone HTTP-01 challenge, which needs port 80 for
//! itself. Whatever held the port is stopped first and revived afterwards
//! through a [`Port80Lease`].

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tunic_core::CertificateBundle;

use crate::cmd::Runner;
use crate::error::SetupError;
use crate::port::PortProbe;

static RATE_LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)168 hours|too many certificates").expect("static regex is valid")
});

/// Whether certbot's diagnostics report the per-domain issuance limit.
pub fn is_rate_limited(stderr: &str) -> bool {
    RATE_LIMIT_RE.is_match(stderr)
}

/// How [`CertificateManager::ensure`] satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertState {
    /// A bundle was already on disk; certbot was not invoked.
    Reused,
    /// Issued now and the renewal timer is enabled.
    Installed,
}

/// Obligation to restart whatever was stopped to free port 80.
///
/// [`Port80Lease::release`] honors it; dropping an unreleased lease does the
/// same, so the revival also happens when issuance bails out early.
struct Port80Lease<'a> {
    runner: &'a dyn Runner,
    revive: bool,
}

impl Port80Lease<'_> {
    fn revive_once(&mut self) {
        if std::mem::take(&mut self.revive) {
            self.runner
                .run_best_effort("restarting nginx", "systemctl", &["restart", "nginx"]);
        }
    }

    fn release(mut self) {
        self.revive_once();
    }
}

impl Drop for Port80Lease<'_> {
    fn drop(&mut self) {
        self.revive_once();
    }
}

pub struct CertificateManager<'a> {
    runner: &'a dyn Runner,
    probe: &'a dyn PortProbe,
    root: &'a Path,
}

impl<'a> CertificateManager<'a> {
    pub const fn new(runner: &'a dyn Runner, probe: &'a dyn PortProbe, root: &'a Path) -> Self {
        Self {
            runner,
            probe,
            root,
        }
    }

    pub fn bundle(&self, domain: &str) -> CertificateBundle {
        CertificateBundle::new(self.root, domain)
    }

    /// Make sure a bundle exists for `domain`, issuing one if needed.
    pub fn ensure(&self, domain: &str) -> Result<(CertificateBundle, CertState)> {
        let bundle = self.bundle(domain);
        if bundle.exists() {
            tracing::info!(
                "certificate already present: {}",
                bundle.live_dir().display()
            );
            return Ok((bundle, CertState::Reused));
        }

        let lease = self.pre_hook(domain)?;

        tracing::info!("requesting certificate for {domain}");
        let issued = self.runner.output(
            "certbot",
            &[
                "certonly",
                "--standalone",
                "--register-unsafely-without-email",
                "--agree-tos",
                "--keep",
                "--non-interactive",
                "-d",
                domain,
            ],
        );

        lease.release();
        let output = issued?;

        if !output.success {
            if is_rate_limited(&output.stderr) {
                return Err(SetupError::RateLimited(domain.to_string()).into());
            }
            return Err(SetupError::CertificateIssuance {
                domain: domain.to_string(),
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        if !bundle.exists() {
            return Err(SetupError::CertificateIssuance {
                domain: domain.to_string(),
                stderr: format!("no bundle under {}", bundle.live_dir().display()),
            }
            .into());
        }

        self.runner
            .run("reloading systemd daemon", "systemctl", &["daemon-reload"])?;
        self.runner.run(
            "enabling certificate renewal",
            "systemctl",
            &["enable", "--now", "certbot.timer"],
        )?;
        Ok((bundle, CertState::Installed))
    }

    fn pre_hook(&self, domain: &str) -> Result<Port80Lease<'a>> {
        self.purge_suffixed(domain)?;

        if !self.runner.exists("certbot") {
            self.runner
                .run("updating package index", "apt-get", &["update"])?;
            self.runner
                .run("installing certbot", "apt-get", &["install", "-y", "certbot"])?;
        }

        let mut lease = Port80Lease {
            runner: self.runner,
            revive: false,
        };
        if !self.probe.tcp_free(80) {
            tracing::info!("port 80 is busy, freeing it for the HTTP-01 challenge");
            lease.revive = true;
            self.runner
                .run_best_effort("stopping nginx", "systemctl", &["stop", "nginx"]);
            self.runner
                .run_best_effort("stopping nginx", "nginx", &["-s", "stop"]);

            let holders = self.runner.stdout("lsof", &["-t", "-i:80"]).unwrap_or_else(|e| {
                tracing::warn!("could not list port 80 holders: {e:#}");
                String::new()
            });
            let pids: Vec<&str> = holders.split_whitespace().collect();
            if !pids.is_empty() {
                self.runner
                    .run_best_effort("killing port 80 holders", "kill", &pids);
            }
        }
        Ok(lease)
    }

    /// Drop `live/<domain>-NNNN` leftovers of earlier failed requests.
    ///
    /// Only runs while `live/<domain>` itself is absent.
    fn purge_suffixed(&self, domain: &str) -> Result<()> {
        let live = self.root.join("live");
        if !live.is_dir() || live.join(domain).exists() {
            return Ok(());
        }
        let prefix = format!("{domain}-");
        for entry in fs::read_dir(&live)
            .with_context(|| format!("failed to list {}", live.display()))?
        {
            let path = entry?.path();
            let stale = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix));
            if stale && path.is_dir() {
                tracing::info!("removing stale certificate dir: {}", path.display());
                fs::remove_dir_all(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }

    /// Delete the bundle through certbot, then purge what it left behind.
    pub fn remove(&self, domain: &str) -> Result<()> {
        if self.runner.exists("certbot") {
            self.runner.run_best_effort(
                &format!("deleting certificate for {domain}"),
                "certbot",
                &["delete", "--cert-name", domain, "--non-interactive"],
            );
        }

        for dir in [
            self.root.join("live").join(domain),
            self.root.join("archive").join(domain),
        ] {
            if dir.exists() {
                fs::remove_dir_all(&dir)
                    .with_context(|| format!("failed to remove {}", dir.display()))?;
            }
        }
        let renewal = self.root.join("renewal").join(format!("{domain}.conf"));
        if renewal.exists() {
            fs::remove_file(&renewal)
                .with_context(|| format!("failed to remove {}", renewal.display()))?;
        }
        Ok(())
    }
}
