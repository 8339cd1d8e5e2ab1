//! `tunic` shell alias kept in the operator's rc files.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Layout;

pub const ALIAS_NAME: &str = "tunic";

pub fn alias_line(command: &str) -> String {
    format!("alias {ALIAS_NAME}='{command}'")
}

/// Append the alias to the first rc file unless it is already there.
///
/// Returns whether a line was written.
pub fn set_alias(layout: &Layout) -> Result<bool> {
    let Some(rc) = layout.shell_rc_files.first() else {
        tracing::debug!("no home directory, skipping alias");
        return Ok(false);
    };
    let line = alias_line(&layout.alias_command);
    if rc.exists() {
        let text =
            fs::read_to_string(rc).with_context(|| format!("failed to read {}", rc.display()))?;
        if text.lines().any(|l| l.trim() == line) {
            return Ok(false);
        }
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(rc)
        .with_context(|| format!("failed to open {}", rc.display()))?;
    writeln!(file, "\n{line}").with_context(|| format!("failed to write {}", rc.display()))?;
    tracing::info!("alias added, open a new shell to use `{ALIAS_NAME}`");
    Ok(true)
}

fn strip_from(rc: &Path, line: &str) -> Result<()> {
    if !rc.exists() {
        return Ok(());
    }
    let text = fs::read_to_string(rc).with_context(|| format!("failed to read {}", rc.display()))?;
    if !text.lines().any(|l| l.trim() == line) {
        return Ok(());
    }
    let mut kept: String = text
        .lines()
        .filter(|l| l.trim() != line)
        .collect::<Vec<_>>()
        .join("\n");
    if text.ends_with('\n') {
        kept.push('\n');
    }
    fs::write(rc, kept).with_context(|| format!("failed to write {}", rc.display()))?;
    tracing::info!("removed alias from {}", rc.display());
    Ok(())
}

/// Remove the alias from every rc file. Missing files are skipped.
pub fn remove_alias(layout: &Layout) -> Result<()> {
    let line = alias_line(&layout.alias_command);
    for rc in &layout.shell_rc_files {
        strip_from(rc, &line)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::temp_layout;

    #[test]
    fn set_alias_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        fs::write(&layout.shell_rc_files[0], "export EDITOR=vim\n").expect("write");

        assert!(set_alias(&layout).expect("set"));
        assert!(!set_alias(&layout).expect("set again"));

        let text = fs::read_to_string(&layout.shell_rc_files[0]).expect("read");
        assert_eq!(text.matches("alias tunic=").count(), 1);
        assert!(text.starts_with("export EDITOR=vim\n"));
        assert!(text.contains("alias tunic='/usr/local/bin/tunic'"));
    }

    #[test]
    fn remove_alias_cleans_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let line = alias_line(&layout.alias_command);
        fs::write(&layout.shell_rc_files[0], format!("export A=1\n{line}\n")).expect("write");
        fs::write(&layout.shell_rc_files[1], format!("{line}\nalias ll='ls -l'\n")).expect("write");

        remove_alias(&layout).expect("remove");

        assert_eq!(
            fs::read_to_string(&layout.shell_rc_files[0]).expect("read"),
            "export A=1\n"
        );
        assert_eq!(
            fs::read_to_string(&layout.shell_rc_files[1]).expect("read"),
            "alias ll='ls -l'\n"
        );
    }

    #[test]
    fn remove_alias_without_files_is_a_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        remove_alias(&layout).expect("remove");
        assert!(!layout.shell_rc_files[0].exists());
    }
}
