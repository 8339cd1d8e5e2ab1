//! Install, remove and check flows, plus the unit control commands.
//!
//! Every flow takes the host seams through [`Host`] and every path through
//! [`Layout`](crate::config::Layout). Completed steps are never rolled back:
//! a failure mid-install leaves earlier steps in place, and re-running
//! install picks up from whatever already exists.

mod check;
mod control;
mod install;
mod remove;

pub use check::{CheckReport, check};
pub use control::{Control, control};
pub use install::{InstallOptions, InstallOutcome, install};
pub use remove::remove;

use crate::cmd::Runner;
use crate::config::Layout;
use crate::net::Network;
use crate::port::PortProbe;
use crate::service::{RetryPolicy, ServiceSupervisor};

/// Host seams shared by the workflows.
pub struct Host<'a> {
    pub runner: &'a dyn Runner,
    pub net: &'a dyn Network,
    pub probe: &'a dyn PortProbe,
    pub download_retry: RetryPolicy,
    pub status_poll: RetryPolicy,
}

impl<'a> Host<'a> {
    pub const fn new(
        runner: &'a dyn Runner,
        net: &'a dyn Network,
        probe: &'a dyn PortProbe,
    ) -> Self {
        Self {
            runner,
            net,
            probe,
            download_retry: RetryPolicy::DOWNLOAD,
            status_poll: RetryPolicy::STATUS_POLL,
        }
    }

    pub(crate) fn supervisor<'b>(&'b self, layout: &'b Layout) -> ServiceSupervisor<'b> {
        ServiceSupervisor::new(self.runner, layout)
            .with_retry(self.download_retry, self.status_poll)
    }
}
