//! Root gate for the commands that touch systemd, certbot and `/usr/local`.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use dialoguer::Confirm;
use nix::unistd::geteuid;

pub fn is_root() -> bool {
    geteuid().is_root()
}

/// `sudo <exe> <args..>`, re-running this invocation unchanged.
pub fn sudo_command(exe: &Path, args: impl IntoIterator<Item = OsString>) -> Command {
    let mut cmd = Command::new("sudo");
    cmd.arg(exe).args(args);
    cmd
}

/// Return when already root. Otherwise offer to re-run `tunic <action>` under
/// sudo and exit with its status.
///
/// In non-interactive mode there is no prompt and the call fails instead.
pub fn require_root(action: &str, non_interactive: bool) -> Result<()> {
    if is_root() {
        return Ok(());
    }
    if non_interactive {
        bail!("`tunic {action}` must run as root; re-run it with sudo");
    }

    let rerun = Confirm::new()
        .with_prompt(format!("`tunic {action}` needs root. Re-run it with sudo?"))
        .default(true)
        .interact()?;
    if !rerun {
        bail!("`tunic {action}` aborted without root");
    }

    let exe = std::env::current_exe().context("failed to locate the tunic binary")?;
    let mut cmd = sudo_command(&exe, std::env::args_os().skip(1));
    tracing::info!("re-running `tunic {action}` with sudo");
    let status = cmd.status().context("failed to run sudo")?;
    std::process::exit(status.code().unwrap_or(1));
}
