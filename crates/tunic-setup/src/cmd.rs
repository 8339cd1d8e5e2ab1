use std::process::Command;

use anyhow::{Context, Result, bail};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Seam over host process execution.
///
/// Everything that shells out (certbot, systemctl, apt-get, pkill) goes
/// through this trait so workflows can be exercised against a fake.
pub trait Runner {
    /// Execute a command and capture its output. Only spawn failures are
    /// errors; a non-zero exit is reported through [`CmdOutput::success`].
    fn output(&self, program: &str, args: &[&str]) -> Result<CmdOutput>;

    /// Execute a command with inherited stdio (for `journalctl -f`).
    fn stream(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Check whether a program exists on PATH.
    fn exists(&self, program: &str) -> bool;

    /// Execute a command with logging. Logs the full command line at debug
    /// level and a human-friendly description at info level.
    fn run(&self, description: &str, program: &str, args: &[&str]) -> Result<()> {
        let cmd_line = format!("{program} {}", args.join(" "));
        tracing::info!("{description}");
        tracing::debug!("exec: {cmd_line}");

        let output = self.output(program, args)?;
        if !output.success {
            tracing::error!("command failed: {cmd_line}\nstderr: {}", output.stderr);
            bail!("{description} failed: {}", output.stderr);
        }
        Ok(())
    }

    /// Like [`Runner::run`], but a failure only logs a warning.
    fn run_best_effort(&self, description: &str, program: &str, args: &[&str]) {
        if let Err(e) = self.run(description, program, args) {
            tracing::warn!("{e:#}");
        }
    }

    /// Execute a command and return its trimmed stdout.
    fn stdout(&self, program: &str, args: &[&str]) -> Result<String> {
        Ok(self.output(program, args)?.stdout.trim().to_string())
    }
}

/// [`Runner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn output(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        let cmd_line = format!("{program} {}", args.join(" "));
        tracing::debug!("exec (capture): {cmd_line}");

        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {cmd_line}"))?;

        Ok(CmdOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn stream(&self, program: &str, args: &[&str]) -> Result<()> {
        let cmd_line = format!("{program} {}", args.join(" "));
        tracing::debug!("exec (stream): {cmd_line}");

        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("failed to execute: {cmd_line}"))?;
        if !status.success() {
            bail!("{cmd_line} exited with {status}");
        }
        Ok(())
    }

    fn exists(&self, program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .output()
            .is_ok_and(|o| o.status.success())
    }
}
