use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use zoneshard::console;
use zoneshard::placement::{SetupState, ZoneSetup};
use zoneshard::sample::SamplePopulator;
use zoneshard::{
    AdminChannel, ChannelConfig, ClusterAdmin, HttpAdminChannel, InMemoryCluster, OverflowPolicy,
    PlacementConfig, admin_router,
};

#[derive(Parser)]
#[command(name = "zoneshard")]
#[command(about = "Zone-based tenant data placement for sharded clusters")]
struct Cli {
    /// Placement configuration (JSON). Built-in demo zones when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Admin endpoint, e.g. http://127.0.0.1:8080. When omitted, each invocation
    /// starts a fresh, empty in-process cluster that is gone when it exits.
    #[arg(long, global = true)]
    endpoint: Option<String>,
    #[arg(long, global = true, default_value_t = 60)]
    timeout_secs: u64,
    /// Shards of the in-process cluster.
    #[arg(long, global = true, value_delimiter = ',', default_value = "shard00,shard01")]
    shards: Vec<String>,
    #[arg(long, global = true, value_enum, default_value_t = Overflow::PinLast)]
    overflow: Overflow,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Overflow {
    PinLast,
    RoundRobin,
}

impl From<Overflow> for OverflowPolicy {
    fn from(value: Overflow) -> Self {
        match value {
            Overflow::PinLast => OverflowPolicy::PinLast,
            Overflow::RoundRobin => OverflowPolicy::RoundRobin,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create zones, place databases, shard collections and install tenant ranges.
    Setup {
        /// Last state already reached; only later stages run.
        #[arg(long)]
        resume_from: Option<SetupState>,
    },
    /// Insert sample common and tenant data into every zone database.
    Populate,
    /// Show configured zones next to the cluster's zone tags.
    Status,
    /// Count documents per zone and check which shard holds them.
    Verify,
    /// Remove the configured zones (and their databases unless kept).
    Cleanup {
        #[arg(long)]
        keep_databases: bool,
    },
    Ping,
    /// List shards and databases.
    Info,
    /// Setup, populate, verify and status in one go.
    Demo,
    /// Serve an in-process cluster over the admin HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let ansi = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PlacementConfig::from_json_file(path)
            .with_context(|| format!("cannot load placement config {}", path.display()))?,
        None => PlacementConfig::default(),
    };

    let admin = admin_for(&cli)?;
    let setup = ZoneSetup::new(admin.clone(), config.clone())
        .context("invalid placement config")?
        .with_overflow(cli.overflow.into());
    let mut out = io::stdout();

    match cli.command {
        Command::Setup { resume_from } => {
            check_resume(cli.endpoint.as_deref(), resume_from)?;
            console::header(&mut out, "Zone sharding setup")?;
            run_setup(&setup, resume_from.unwrap_or(SetupState::NotConfigured)).await?;
        }
        Command::Populate => {
            console::header(&mut out, "Populating sample data")?;
            let summary = SamplePopulator::new(admin, config).populate().await?;
            console::print_population(&mut out, &summary)?;
        }
        Command::Status => {
            console::header(&mut out, "Zone status")?;
            console::print_status(&mut out, &setup.status().await?)?;
        }
        Command::Verify => {
            console::header(&mut out, "Data placement")?;
            let audits = setup.verify().await?;
            console::print_audits(&mut out, &audits)?;
            if !audits.iter().all(|a| a.is_clean()) {
                bail!("tenant documents found outside their zone");
            }
        }
        Command::Cleanup { keep_databases } => {
            console::header(&mut out, "Cleanup")?;
            let report = setup.cleanup(!keep_databases).await?;
            console::print_report(&mut out, &report)?;
        }
        Command::Ping => {
            setup.ping().await.context("cluster is not reachable")?;
            console::success(&mut out, "cluster is reachable")?;
        }
        Command::Info => {
            console::header(&mut out, "Cluster information")?;
            console::print_cluster_info(&mut out, &setup.cluster_info().await?)?;
        }
        Command::Demo => {
            console::header(&mut out, "Zone sharding setup")?;
            run_setup(&setup, SetupState::NotConfigured).await?;
            console::header(&mut out, "Populating sample data")?;
            let summary = SamplePopulator::new(admin, config).populate().await?;
            console::print_population(&mut out, &summary)?;
            console::header(&mut out, "Data placement")?;
            console::print_audits(&mut out, &setup.verify().await?)?;
            console::header(&mut out, "Zone status")?;
            console::print_status(&mut out, &setup.status().await?)?;
        }
        Command::Serve { bind } => serve(bind, &cli.shards).await?,
    }
    Ok(())
}

fn admin_for(cli: &Cli) -> Result<ClusterAdmin> {
    match &cli.endpoint {
        Some(endpoint) => {
            let channel_config = ChannelConfig::new(endpoint.as_str())
                .request_timeout(Duration::from_secs(cli.timeout_secs));
            let channel = HttpAdminChannel::new(&channel_config)
                .with_context(|| format!("cannot use endpoint {}", endpoint))?;
            Ok(ClusterAdmin::from_channel(channel))
        }
        None => {
            tracing::info!(shards = ?cli.shards, "no endpoint given; using an in-process cluster");
            Ok(ClusterAdmin::from_channel(InMemoryCluster::with_shards(
                cli.shards.iter().cloned(),
            )))
        }
    }
}

/// Resuming only makes sense against a cluster that outlives this process.
fn check_resume(endpoint: Option<&str>, resume_from: Option<SetupState>) -> Result<()> {
    match (endpoint, resume_from) {
        (None, Some(state)) if state != SetupState::NotConfigured => bail!(
            "--resume-from {} needs --endpoint; the in-process cluster starts empty",
            state
        ),
        _ => Ok(()),
    }
}

async fn run_setup(setup: &ZoneSetup, from: SetupState) -> Result<()> {
    let run = setup.run_from(from).await.context("zone setup aborted")?;
    let mut out = io::stdout();
    console::print_report(&mut out, &run.report)?;
    if run.report.has_failures() {
        bail!(
            "setup stopped short at '{}'; rerun with --resume-from {}",
            run.reached,
            run.reached
        );
    }
    Ok(())
}

async fn serve(bind: SocketAddr, shards: &[String]) -> Result<()> {
    let cluster: Arc<dyn AdminChannel> =
        Arc::new(InMemoryCluster::with_shards(shards.iter().cloned()));
    let app = admin_router(cluster);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot bind {}", bind))?;
    tracing::info!(%bind, ?shards, "serving in-process cluster");
    axum::serve(listener, app).await.context("admin server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_needs_a_remote_cluster() {
        assert!(check_resume(None, Some(SetupState::DatabasesPlaced)).is_err());
        assert!(check_resume(None, Some(SetupState::NotConfigured)).is_ok());
        assert!(check_resume(None, None).is_ok());
        let endpoint = Some("http://127.0.0.1:8080");
        assert!(check_resume(endpoint, Some(SetupState::DatabasesPlaced)).is_ok());
    }

    #[test]
    fn setup_parses_resume_state() {
        let cli = Cli::try_parse_from(["zoneshard", "setup", "--resume-from", "zones_created"])
            .unwrap();
        match cli.command {
            Command::Setup { resume_from } => {
                assert_eq!(resume_from, Some(SetupState::ZonesCreated))
            }
            _ => panic!("expected setup"),
        }
    }
}
