use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tunic_core::{ClientRelayModel, CongestionControl, Credential, ServerRuntimeConfig};

use super::Host;
use crate::certbot::CertificateManager;
use crate::config::Layout;
use crate::error::SetupError;
use crate::service::ServiceStatus;
use crate::{alias, artifacts, net, port, templates};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub domain: String,
    pub port: Option<u16>,
    pub congestion_control: Option<CongestionControl>,
}

#[derive(Debug)]
pub enum InstallOutcome {
    /// The relay is active and the client configs are written.
    Running {
        relay: ClientRelayModel,
        artifacts: Vec<PathBuf>,
    },
    /// The unit was started but never became active. No client configs
    /// were written.
    NotRunning(ServiceStatus),
}

/// Credential of an earlier install, so clients keep working after a reinstall.
fn reuse_or_generate(layout: &Layout) -> Credential {
    let previous = ServerRuntimeConfig::load(&layout.server_config)
        .ok()
        .and_then(|config| config.credential())
        .filter(Credential::is_well_formed);
    if let Some(credential) = previous {
        tracing::info!("reusing credential from {}", layout.server_config.display());
        return credential;
    }
    Credential::generate()
}

pub fn install(host: &Host<'_>, layout: &Layout, opts: &InstallOptions) -> Result<InstallOutcome> {
    let request = port::validate_requested(host.probe, opts.port)?;
    let endpoint = net::validate_domain(host.net, &opts.domain)?;
    let port = port::resolve(host.probe, request)?;

    let certs = CertificateManager::new(host.runner, host.probe, &layout.letsencrypt);
    let (bundle, _) = certs.ensure(&endpoint.domain)?;

    if let Err(e) = alias::set_alias(layout) {
        tracing::warn!("failed to set shell alias: {e:#}");
    }

    fs::create_dir_all(&layout.workstation)
        .with_context(|| format!("failed to create {}", layout.workstation.display()))?;
    let supervisor = host.supervisor(layout);
    supervisor.register_unit(&templates::relay_unit(layout))?;
    supervisor.fetch_executable(host.net, &layout.relay_url, &layout.executable)?;

    let credential = reuse_or_generate(layout);
    let mut server = ServerRuntimeConfig::new(&credential, port, &bundle);
    if let Some(cc) = opts.congestion_control {
        server.congestion_control = cc;
    }
    server
        .save(&layout.server_config)
        .context("failed to save server config")?;

    supervisor.start()?;
    let status = supervisor.wait_until_settled()?;
    if !status.is_active() {
        tracing::error!("{}", SetupError::ServiceStart(status.to_string()));
        return Ok(InstallOutcome::NotRunning(status));
    }
    tracing::info!("relay is active on UDP port {port}");

    let relay =
        ClientRelayModel::from_server(&server, &endpoint.domain, Some(endpoint.resolved_ip))?;
    let artifacts = artifacts::write_all(layout, &relay)?;
    Ok(InstallOutcome::Running { relay, artifacts })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)]
mod tests {
    use tunic_core::Ecosystem;
    use tunic_core::export::{nekoray, singbox};

    use super::*;
    use crate::port::EPHEMERAL_RANGE;
    use crate::service::RetryPolicy;
    use crate::testing::{FakeNetwork, FakeProbe, FakeRunner, temp_layout};

    const DOMAIN: &str = "relay.example.com";
    const ISSUE: &str = "certbot certonly --standalone --register-unsafely-without-email \
                         --agree-tos --keep --non-interactive -d relay.example.com";

    fn host<'a>(runner: &'a FakeRunner, net: &'a FakeNetwork, probe: &'a FakeProbe) -> Host<'a> {
        let mut host = Host::new(runner, net, probe);
        host.download_retry = RetryPolicy::immediate(3);
        host.status_poll = RetryPolicy::immediate(3);
        host
    }

    fn issuing_runner(layout: &Layout) -> FakeRunner {
        let live = layout.letsencrypt.join("live").join(DOMAIN);
        FakeRunner::new()
            .creates(ISSUE, &live.join("fullchain.pem"))
            .creates(ISSUE, &live.join("privkey.pem"))
            .with_stdout("systemctl is-active tuic", "active")
    }

    fn opts(port: Option<u16>) -> InstallOptions {
        InstallOptions {
            domain: DOMAIN.into(),
            port,
            congestion_control: None,
        }
    }

    fn running(outcome: InstallOutcome) -> (ClientRelayModel, Vec<PathBuf>) {
        match outcome {
            InstallOutcome::Running { relay, artifacts } => (relay, artifacts),
            InstallOutcome::NotRunning(status) => panic!("relay not running: {status}"),
        }
    }

    fn seed_bundle(layout: &Layout) {
        let live = layout.letsencrypt.join("live").join(DOMAIN);
        fs::create_dir_all(&live).expect("mkdir");
        fs::write(live.join("fullchain.pem"), "chain").expect("write");
        fs::write(live.join("privkey.pem"), "key").expect("write");
    }

    #[test]
    fn fresh_install_writes_consistent_configs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let runner = issuing_runner(&layout);
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();

        let (relay, written) =
            running(install(&host(&runner, &net, &probe), &layout, &opts(None)).expect("install"));

        let server = ServerRuntimeConfig::load(&layout.server_config).expect("server config");
        let port = server.port().expect("port");
        assert!(EPHEMERAL_RANGE.contains(&port));
        assert_eq!(server.server, format!("[::]:{port}"));
        let credential = server.credential().expect("credential");
        assert!(credential.is_well_formed());
        assert_eq!(relay.port, port);
        assert_eq!(relay.uuid, credential.username);

        assert_eq!(written.len(), 3);
        let neko = nekoray::parse(
            &fs::read_to_string(layout.artifact_path(Ecosystem::NekoRay)).expect("read"),
        )
        .expect("nekoray");
        let sing = singbox::parse(
            &fs::read_to_string(layout.artifact_path(Ecosystem::SingBox)).expect("read"),
        )
        .expect("singbox");
        let clash = fs::read_to_string(layout.artifact_path(Ecosystem::ClashMeta)).expect("read");
        assert_eq!(neko.relay.server, format!("{DOMAIN}:{port}"));
        assert_eq!(neko.relay.password, credential.password);
        assert_eq!(sing.server_port, port);
        assert_eq!(sing.password, credential.password);
        assert!(clash.contains(&credential.username));

        assert_eq!(runner.count("systemctl enable --now tuic"), 1);
        assert_eq!(runner.count("systemctl enable --now certbot.timer"), 1);
        assert!(layout.unit_path.exists());
        assert!(layout.executable.exists());
    }

    #[test]
    fn dns_mismatch_aborts_before_side_effects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let runner = issuing_runner(&layout);
        let net = FakeNetwork::new("203.0.113.7", "198.51.100.9");
        let probe = FakeProbe::free();

        let err = install(&host(&runner, &net, &probe), &layout, &opts(None))
            .expect_err("mismatch");

        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::DnsMismatch { .. })
        ));
        assert!(runner.calls().is_empty());
        assert_eq!(probe.probes.get(), 0);
        assert!(!layout.workstation.exists());
        assert!(!layout.shell_rc_files[0].exists());
    }

    #[test]
    fn reserved_port_is_rejected_before_network_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let runner = issuing_runner(&layout);
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();

        let err = install(&host(&runner, &net, &probe), &layout, &opts(Some(80)))
            .expect_err("reserved");

        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::PortRange(80))
        ));
        assert_eq!(net.calls.get(), 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn reinstall_skips_issuance_and_keeps_credential() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();

        let runner = issuing_runner(&layout);
        let outcome = install(&host(&runner, &net, &probe), &layout, &opts(Some(55000)));
        let (first, _) = running(outcome.expect("install"));

        let runner = FakeRunner::new().with_stdout("systemctl is-active tuic", "active");
        let outcome = install(&host(&runner, &net, &probe), &layout, &opts(Some(55000)));
        let (second, _) = running(outcome.expect("reinstall"));

        assert!(!runner.ran_program("certbot"));
        assert_eq!(first.uuid, second.uuid);
        assert_eq!(first.password, second.password);
        assert_eq!(second.port, 55000);
    }

    #[test]
    fn existing_bundle_skips_certbot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        seed_bundle(&layout);
        let runner = FakeRunner::new().with_stdout("systemctl is-active tuic", "active");
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();

        running(install(&host(&runner, &net, &probe), &layout, &opts(None)).expect("install"));

        assert_eq!(runner.count(ISSUE), 0);
        assert!(!runner.ran_program("certbot"));
    }

    #[test]
    fn inactive_service_writes_no_client_configs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        seed_bundle(&layout);
        let runner = FakeRunner::new().with_stdout("systemctl is-active tuic", "failed");
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();

        let outcome = install(&host(&runner, &net, &probe), &layout, &opts(None)).expect("install");

        assert!(matches!(
            outcome,
            InstallOutcome::NotRunning(ServiceStatus::Inactive(ref s)) if s == "failed"
        ));
        assert!(layout.server_config.exists());
        for eco in Ecosystem::ALL {
            assert!(!layout.artifact_path(eco).exists());
        }
    }

    #[test]
    fn rate_limit_stops_before_service_registration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        let runner = FakeRunner::new().fail(ISSUE, "too many certificates already issued");
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();

        let err = install(&host(&runner, &net, &probe), &layout, &opts(None))
            .expect_err("rate limited");

        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::RateLimited(_))
        ));
        assert!(!layout.unit_path.exists());
        assert!(!layout.server_config.exists());
    }

    #[test]
    fn congestion_control_override_reaches_clients() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = temp_layout(dir.path());
        seed_bundle(&layout);
        let runner = FakeRunner::new().with_stdout("systemctl is-active tuic", "active");
        let net = FakeNetwork::new("203.0.113.7", "203.0.113.7");
        let probe = FakeProbe::free();
        let opts = InstallOptions {
            congestion_control: Some(CongestionControl::Cubic),
            ..opts(None)
        };

        let outcome = install(&host(&runner, &net, &probe), &layout, &opts);
        let (relay, _) = running(outcome.expect("install"));

        let server = ServerRuntimeConfig::load(&layout.server_config).expect("server config");
        assert_eq!(server.congestion_control, CongestionControl::Cubic);
        assert_eq!(relay.congestion_control, CongestionControl::Cubic);
    }
}
