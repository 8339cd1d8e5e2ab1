use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use tunic_core::CongestionControl;
use tunic_core::tracing_init::init_tracing;
use tunic_setup::artifacts::{self, ViewMode, Views};
use tunic_setup::cmd::SystemRunner;
use tunic_setup::config::{DEFAULT_RELAY_URL, DEFAULT_WORKSTATION, Layout};
use tunic_setup::net::HttpNetwork;
use tunic_setup::port::SocketProbe;
use tunic_setup::workflow::{self, Control, Host, InstallOptions, InstallOutcome};
use tunic_setup::{escalate, os, prompt};

/// Turnkey TUIC relay installer.
#[derive(Debug, Parser)]
#[command(name = "tunic", version, about)]
struct Cli {
    /// Run without interactive prompts (use CLI flags only)
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Directory holding the relay binary and every generated config
    #[arg(long, global = true, env = "TUNIC_WORKSTATION", default_value = DEFAULT_WORKSTATION)]
    workstation: PathBuf,

    /// Emit JSON log lines
    #[arg(long, global = true, env = "TUNIC_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// Show the NekoRay config
    #[arg(long)]
    nekoray: bool,
    /// Show the Clash.Meta config
    #[arg(long)]
    clash: bool,
    /// Show the sing-box outbound
    #[arg(long)]
    singbox: bool,
}

impl From<&ViewArgs> for Views {
    fn from(args: &ViewArgs) -> Self {
        Self {
            nekoray: args.nekoray,
            clash: args.clash,
            singbox: args.singbox,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Issue a certificate, install the relay and print client configs
    Install {
        /// Domain resolving to this host (prompted if omitted)
        #[arg(short, long)]
        domain: Option<String>,
        /// UDP listen port above 49151 (random free port if omitted)
        #[arg(short, long)]
        port: Option<u16>,
        /// tuic-server release to download
        #[arg(long, default_value = DEFAULT_RELAY_URL)]
        relay_url: String,
        /// Congestion control algorithm (cubic, new_reno, bbr)
        #[arg(long)]
        congestion_control: Option<CongestionControl>,
        #[command(flatten)]
        views: ViewArgs,
    },
    /// Uninstall the relay and its certificate
    Remove {
        /// Domain the relay was installed for (prompted if omitted)
        #[arg(short, long)]
        domain: Option<String>,
    },
    /// Print the generated client configs
    Check {
        #[command(flatten)]
        views: ViewArgs,
    },
    /// Show relay and renewal service status
    Status,
    /// Follow the relay log
    Log,
    /// Start the relay
    Start,
    /// Stop the relay
    Stop,
    /// Restart the relay
    Restart,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("tunic_setup=info,tunic_core=info", cli.log_json);

    if !cfg!(target_os = "linux") {
        bail!("tunic only runs on Linux hosts with systemd");
    }

    let non_interactive = cli.non_interactive;
    let mut layout = Layout::new(cli.workstation);
    let runner = SystemRunner;
    let probe = SocketProbe;

    match cli.command {
        Commands::Install {
            domain,
            port,
            relay_url,
            congestion_control,
            views,
        } => {
            escalate::require_root("install", non_interactive)?;
            os::ensure_apt_based(Path::new(os::OS_RELEASE))?;
            layout.relay_url = relay_url;
            let net = HttpNetwork::new()?;
            let opts = InstallOptions {
                domain: prompt::prompt_domain(non_interactive, domain)?,
                port,
                congestion_control,
            };
            match workflow::install(&Host::new(&runner, &net, &probe), &layout, &opts)? {
                InstallOutcome::Running { .. } => {
                    artifacts::show(&layout, Views::from(&views), ViewMode::Install);
                }
                InstallOutcome::NotRunning(status) => {
                    tracing::error!("client configs were not generated (status: {status})");
                }
            }
        }
        Commands::Remove { domain } => {
            escalate::require_root("remove", non_interactive)?;
            let net = HttpNetwork::new()?;
            let domain = prompt::prompt_domain(non_interactive, domain)?;
            workflow::remove(&Host::new(&runner, &net, &probe), &layout, &domain)?;
        }
        Commands::Check { views } => {
            workflow::check(&layout, Views::from(&views), ViewMode::Check);
        }
        Commands::Status => control(non_interactive, &layout, Control::Status)?,
        Commands::Log => control(non_interactive, &layout, Control::Log)?,
        Commands::Start => control(non_interactive, &layout, Control::Start)?,
        Commands::Stop => control(non_interactive, &layout, Control::Stop)?,
        Commands::Restart => control(non_interactive, &layout, Control::Restart)?,
    }

    Ok(())
}

fn control(non_interactive: bool, layout: &Layout, cmd: Control) -> Result<()> {
    if cmd != Control::Status {
        escalate::require_root(cmd.name(), non_interactive)?;
    }
    let net = HttpNetwork::new()?;
    workflow::control(&Host::new(&SystemRunner, &net, &SocketProbe), layout, cmd)
}
