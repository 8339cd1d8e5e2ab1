//! systemd supervision of the relay unit.

use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::errno::Errno;

use crate::cmd::Runner;
use crate::config::Layout;
use crate::error::SetupError;
use crate::net::Network;

/// Fixed attempt count with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Rewriting an executable that a running relay still holds open.
    pub const DOWNLOAD: Self = Self {
        attempts: 3,
        backoff: Duration::from_millis(500),
    };

    /// Waiting for the unit to leave `activating`.
    pub const STATUS_POLL: Self = Self {
        attempts: 5,
        backoff: Duration::from_secs(1),
    };

    /// Same attempt count, no sleeping.
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            backoff: Duration::ZERO,
        }
    }

    /// Delay after the given 1-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Outcome of `systemctl is-active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Active,
    Inactive(String),
    Indeterminate(String),
}

impl ServiceStatus {
    /// Classify `is-active` output. `activating` yields `None`.
    pub fn from_is_active(text: &str) -> Option<Self> {
        match text.trim() {
            "active" => Some(Self::Active),
            "activating" => None,
            state @ ("inactive" | "failed") => Some(Self::Inactive(state.into())),
            "" => Some(Self::Indeterminate("unknown".into())),
            other => Some(Self::Indeterminate(other.into())),
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive(s) | Self::Indeterminate(s) => write!(f, "{s}"),
        }
    }
}

/// Whether a write failed because a running process has the file mapped.
pub fn is_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(Errno::ETXTBSY as i32)
}

/// Run `op` until it stops failing with "text file busy".
///
/// `on_busy` runs before every retry. After `policy.attempts` busy failures
/// this gives up with [`SetupError::DownloadConflict`].
pub fn retry_on_busy<T>(
    policy: RetryPolicy,
    path: &Path,
    mut op: impl FnMut() -> io::Result<T>,
    mut on_busy: impl FnMut(),
) -> Result<T> {
    for attempt in 1..=policy.attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if is_busy(&e) => {
                tracing::warn!(
                    "{} is busy (attempt {attempt}/{})",
                    path.display(),
                    policy.attempts
                );
                if attempt < policy.attempts {
                    on_busy();
                    thread::sleep(policy.delay(attempt));
                }
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to write {}", path.display()));
            }
        }
    }
    Err(SetupError::DownloadConflict {
        path: path.to_path_buf(),
        attempts: policy.attempts,
    }
    .into())
}

/// Wraps `systemctl` for the relay unit.
pub struct ServiceSupervisor<'a> {
    runner: &'a dyn Runner,
    layout: &'a Layout,
    download_retry: RetryPolicy,
    status_poll: RetryPolicy,
}

impl<'a> ServiceSupervisor<'a> {
    pub const fn new(runner: &'a dyn Runner, layout: &'a Layout) -> Self {
        Self {
            runner,
            layout,
            download_retry: RetryPolicy::DOWNLOAD,
            status_poll: RetryPolicy::STATUS_POLL,
        }
    }

    #[must_use]
    pub const fn with_retry(mut self, download: RetryPolicy, status_poll: RetryPolicy) -> Self {
        self.download_retry = download;
        self.status_poll = status_poll;
        self
    }

    fn name(&self) -> &str {
        &self.layout.service_name
    }

    /// Write the unit file and reload systemd.
    pub fn register_unit(&self, template: &str) -> Result<()> {
        let path = &self.layout.unit_path;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        tracing::info!("writing systemd unit: {}", path.display());
        fs::write(path, template).context("failed to write systemd unit")?;

        self.runner
            .run("reloading systemd daemon", "systemctl", &["daemon-reload"])
    }

    /// Download the relay binary to `dest` and mark it executable.
    pub fn fetch_executable(&self, net: &dyn Network, url: &str, dest: &Path) -> Result<()> {
        tracing::info!("downloading tuic-server");
        let bytes = net.download(url)?;

        retry_on_busy(
            self.download_retry,
            dest,
            || fs::write(dest, &bytes),
            || {
                tracing::info!("relay is running, stopping it before replacing the binary");
                self.runner.run_best_effort(
                    &format!("stopping {}", self.name()),
                    "systemctl",
                    &["stop", self.name()],
                );
            },
        )?;
        tracing::info!("downloaded {}", dest.display());

        fs::set_permissions(dest, fs::Permissions::from_mode(0o755))
            .context("failed to set permissions on relay binary")?;
        Ok(())
    }

    /// Enable the unit and start it now.
    pub fn start(&self) -> Result<()> {
        self.runner.run(
            &format!("enabling and starting {}", self.name()),
            "systemctl",
            &["enable", "--now", self.name()],
        )
    }

    pub fn stop(&self) -> Result<()> {
        self.runner.run(
            &format!("stopping {}", self.name()),
            "systemctl",
            &["stop", self.name()],
        )
    }

    /// Reload unit files, then restart.
    pub fn restart(&self) -> Result<()> {
        self.runner
            .run("reloading systemd daemon", "systemctl", &["daemon-reload"])?;
        self.runner.run(
            &format!("restarting {}", self.name()),
            "systemctl",
            &["restart", self.name()],
        )
    }

    /// Single `is-active` read.
    pub fn status(&self) -> Result<ServiceStatus> {
        let text = self.runner.stdout("systemctl", &["is-active", self.name()])?;
        Ok(ServiceStatus::from_is_active(&text).unwrap_or(ServiceStatus::Indeterminate(text)))
    }

    /// Poll until the unit settles or the attempts run out.
    pub fn wait_until_settled(&self) -> Result<ServiceStatus> {
        let mut last = String::new();
        for attempt in 1..=self.status_poll.attempts {
            last = self.runner.stdout("systemctl", &["is-active", self.name()])?;
            if let Some(status) = ServiceStatus::from_is_active(&last) {
                return Ok(status);
            }
            tracing::debug!("{} is {last}, polling again", self.name());
            thread::sleep(self.status_poll.delay(attempt));
        }
        Ok(ServiceStatus::Indeterminate(last))
    }

    /// Disable and stop the unit, kill strays, delete the unit file and the
    /// workstation. Every step tolerates a missing target.
    pub fn teardown(&self, workstation: &Path) -> Result<()> {
        self.runner.run_best_effort(
            &format!("disabling {}", self.name()),
            "systemctl",
            &["disable", "--now", self.name()],
        );
        self.runner.run_best_effort(
            "killing stray relay processes",
            "pkill",
            &["-x", self.name()],
        );

        let unit = &self.layout.unit_path;
        if unit.exists() {
            tracing::info!("removing systemd unit: {}", unit.display());
            fs::remove_file(unit)
                .with_context(|| format!("failed to remove {}", unit.display()))?;
            self.runner
                .run_best_effort("reloading systemd daemon", "systemctl", &["daemon-reload"]);
        }

        if workstation.exists() {
            tracing::info!("removing workstation: {}", workstation.display());
            fs::remove_dir_all(workstation)
                .with_context(|| format!("failed to remove {}", workstation.display()))?;
        }
        Ok(())
    }
}
