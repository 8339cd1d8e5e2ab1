use std::path::PathBuf;

use tunic_core::Ecosystem;
use tunic_core::cert::LETSENCRYPT_ROOT;

/// Default workstation holding every persisted artifact of a deployment.
pub const DEFAULT_WORKSTATION: &str = "/home/tuic-server";

/// Path to the systemd service unit file.
pub const SERVICE_UNIT_PATH: &str = "/etc/systemd/system/tuic.service";

/// systemd unit name of the relay.
pub const SERVICE_NAME: &str = "tuic";

/// Prebuilt `tuic-server` release.
pub const DEFAULT_RELAY_URL: &str = concat!(
    "https://github.com/EAimTY/tuic/releases/download/",
    "tuic-server-1.0.0/tuic-server-1.0.0-x86_64-unknown-linux-gnu"
);

/// Every path and name a run touches.
///
/// Built once in `main` and passed by reference through the workflows.
#[derive(Debug, Clone)]
pub struct Layout {
    pub workstation: PathBuf,
    pub executable: PathBuf,
    pub server_config: PathBuf,
    pub unit_path: PathBuf,
    pub service_name: String,
    pub letsencrypt: PathBuf,
    pub relay_url: String,
    /// Shell rc files the `tunic` alias is kept in. The first one receives
    /// new aliases.
    pub shell_rc_files: Vec<PathBuf>,
    /// Command the alias expands to.
    pub alias_command: String,
}

impl Layout {
    /// Layout for a workstation at `workstation` with system defaults elsewhere.
    pub fn new(workstation: PathBuf) -> Self {
        let shell_rc_files = dirs::home_dir()
            .map(|home| vec![home.join(".bashrc"), home.join(".bash_aliases")])
            .unwrap_or_default();
        let alias_command = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "tunic".to_string());
        Self {
            executable: workstation.join("tuic"),
            server_config: workstation.join("server_config.json"),
            workstation,
            unit_path: PathBuf::from(SERVICE_UNIT_PATH),
            service_name: SERVICE_NAME.to_string(),
            letsencrypt: PathBuf::from(LETSENCRYPT_ROOT),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            shell_rc_files,
            alias_command,
        }
    }

    /// Where the artifact for `ecosystem` is persisted.
    pub fn artifact_path(&self, ecosystem: Ecosystem) -> PathBuf {
        self.workstation.join(ecosystem.file_name())
    }

    /// `ExecStart` value for the unit.
    pub fn exec_start(&self) -> String {
        format!(
            "{} -c {}",
            self.executable.display(),
            self.server_config.display()
        )
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_WORKSTATION))
    }
}
