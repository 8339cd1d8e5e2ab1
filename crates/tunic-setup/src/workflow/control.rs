use anyhow::Result;

use super::Host;
use crate::config::Layout;

/// Unit control subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Status,
    Log,
    Start,
    Stop,
    Restart,
}

impl Control {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Log => "log",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

pub fn control(host: &Host<'_>, layout: &Layout, cmd: Control) -> Result<()> {
    let supervisor = host.supervisor(layout);
    match cmd {
        Control::Status => {
            let status = supervisor.status()?;
            tracing::info!("relay status: {status}");
            let version = if layout.executable.exists() {
                host.runner
                    .stdout(&layout.executable.display().to_string(), &["-v"])?
            } else {
                "not installed".to_string()
            };
            tracing::info!("relay version: {version}");
            let timer = host
                .runner
                .stdout("systemctl", &["is-active", "certbot.timer"])?;
            tracing::info!("certificate renewal: {timer}");
            tracing::info!("server config: {}", layout.server_config.display());
            for eco in tunic_core::Ecosystem::ALL {
                tracing::info!("client config [{eco}]: {}", layout.artifact_path(eco).display());
            }
            tracing::info!("systemd unit: {}", layout.unit_path.display());
        }
        Control::Log => host.runner.stream(
            "journalctl",
            &["-u", &layout.service_name, "-f", "-o", "cat"],
        )?,
        Control::Start => supervisor.start()?,
        Control::Stop => supervisor.stop()?,
        Control::Restart => supervisor.restart()?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, FakeProbe, FakeRunner, temp_layout};

    fn run(cmd: Control, runner: &FakeRunner) {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();
        control(&Host::new(runner, &net, &probe), &layout, cmd).expect("control");
    }

    #[test]
    fn status_queries_unit_and_renewal_timer() {
        let runner = FakeRunner::new().with_stdout("systemctl is-active tuic", "active");
        run(Control::Status, &runner);
        assert_eq!(
            runner.calls(),
            vec!["systemctl is-active tuic", "systemctl is-active certbot.timer"]
        );
    }

    #[test]
    fn log_follows_journal() {
        let runner = FakeRunner::new();
        run(Control::Log, &runner);
        assert_eq!(runner.calls(), vec!["journalctl -u tuic -f -o cat"]);
    }

    #[test]
    fn start_and_stop_map_to_systemctl() {
        let runner = FakeRunner::new();
        run(Control::Start, &runner);
        run(Control::Stop, &runner);
        assert_eq!(
            runner.calls(),
            vec!["systemctl enable --now tuic", "systemctl stop tuic"]
        );
    }
}
