// # nbsyncd - Netbird → DNS sync daemon
//
// This is a THIN integration layer. All reconciliation logic lives in
// nbsync-core; the daemon only:
//
// 1. Parses flags / environment variables
// 2. Initializes logging and the runtime
// 3. Registers record stores and builds the peer source
// 4. Runs the sync engine until SIGINT/SIGTERM
// 5. Checks propagation of changed records through the configured resolver
//
// ## Configuration
//
// Every flag can also be set through the environment:
//
// - `--netbird-endpoint` / `NETBIRD_ENDPOINT`: management API URL
// - `--netbird-access-token` / `NETBIRD_ACCESS_TOKEN`: personal access token
// - `--cloudflare-api-token` / `CLOUDFLARE_API_TOKEN`: API token
// - `--cloudflare-domain` / `CLOUDFLARE_DOMAIN`: zone all peers live under
// - `--dns-resolver` / `DNS_RESOLVER`: resolver for propagation checks
// - `--sync-interval` / `SYNC_INTERVAL`: time between runs (e.g. `15m`)
// - `--store` / `NBSYNC_STORE`: `cloudflare` or `memory`
// - `--dry-run` / `NBSYNC_DRY_RUN`: read from Cloudflare, only log mutations
// - `--log-level` / `NBSYNC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export NETBIRD_ENDPOINT=https://api.netbird.io
// export NETBIRD_ACCESS_TOKEN=nbp_...
// export CLOUDFLARE_API_TOKEN=...
// export CLOUDFLARE_DOMAIN=nb.example.com
//
// nbsyncd --sync-interval 5m
// ```

mod propagation;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use nbsync_core::config::{EngineConfig, MIN_SYNC_INTERVAL, StoreConfig, SyncConfig, validate_domain_name};
use nbsync_core::{CancellationToken, StoreRegistry, SyncEngine, SyncEvent};
use nbsync_peers_netbird::NetbirdPeerSource;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long a stopping engine may take to reach its next call boundary
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NbsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NbsyncExitCode> for ExitCode {
    fn from(code: NbsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Record store backing the zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// Cloudflare API v4
    Cloudflare,
    /// In-process store; nothing is written anywhere
    Memory,
}

#[derive(Parser)]
#[command(version, about = "Keep a DNS zone in step with the peers of a Netbird network")]
struct Args {
    #[clap(long, env = "NETBIRD_ENDPOINT", help = "Netbird management API URL")]
    netbird_endpoint: String,

    #[clap(
        long,
        env = "NETBIRD_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Netbird personal access token"
    )]
    netbird_access_token: String,

    #[clap(
        long,
        env = "CLOUDFLARE_API_TOKEN",
        hide_env_values = true,
        help = "Cloudflare API token (required for the cloudflare store)"
    )]
    cloudflare_api_token: Option<String>,

    #[clap(long, env = "CLOUDFLARE_DOMAIN", help = "Zone every peer domain must belong to")]
    cloudflare_domain: String,

    #[clap(
        long,
        env = "DNS_RESOLVER",
        help = "Nameserver and port used to check propagation of changed records",
        default_value = "8.8.8.8:53"
    )]
    dns_resolver: SocketAddr,

    #[clap(
        long,
        env = "SYNC_INTERVAL",
        help = "Time between sync runs, e.g. 30s, 15m, 1h",
        default_value = "15m",
        value_parser = humantime::parse_duration
    )]
    sync_interval: Duration,

    #[clap(long, env = "NBSYNC_STORE", value_enum, default_value_t = StoreKind::Cloudflare)]
    store: StoreKind,

    #[clap(
        long,
        env = "NBSYNC_DRY_RUN",
        help = "Read from the record store but only log create/update/delete"
    )]
    dry_run: bool,

    #[clap(long, env = "NBSYNC_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    /// Validate the configuration
    ///
    /// Everything checked here fails with exit code 1 before any remote
    /// call is made.
    fn validate(&self) -> Result<()> {
        if !self.netbird_endpoint.starts_with("https://") && !self.netbird_endpoint.starts_with("http://") {
            anyhow::bail!(
                "NETBIRD_ENDPOINT must use HTTP or HTTPS scheme. Got: {}",
                self.netbird_endpoint
            );
        }

        if self.netbird_access_token.is_empty() {
            anyhow::bail!("NETBIRD_ACCESS_TOKEN is required");
        }

        if self.store == StoreKind::Cloudflare && self.cloudflare_api_token.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is required for the cloudflare store. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        validate_domain_name(&self.cloudflare_domain)
            .map_err(|e| anyhow::anyhow!("CLOUDFLARE_DOMAIN is invalid: {}", e))?;

        if self.sync_interval < MIN_SYNC_INTERVAL {
            anyhow::bail!(
                "SYNC_INTERVAL must be at least {}. Got: {}",
                humantime::format_duration(MIN_SYNC_INTERVAL),
                humantime::format_duration(self.sync_interval)
            );
        }

        self.level()?;

        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "NBSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn sync_config(&self) -> SyncConfig {
        let store = match self.store {
            StoreKind::Cloudflare => StoreConfig::Cloudflare {
                api_token: self.cloudflare_api_token.clone().unwrap_or_default(),
                dry_run: self.dry_run,
            },
            StoreKind::Memory => StoreConfig::Memory,
        };

        SyncConfig {
            zone_domain: self.cloudflare_domain.clone(),
            store,
            engine: EngineConfig::default().with_interval(self.sync_interval),
        }
    }
}

/// Build the engine from validated arguments
fn build_engine(args: &Args) -> Result<(SyncEngine, mpsc::Receiver<SyncEvent>)> {
    let registry = StoreRegistry::with_builtin();
    nbsync_provider_cloudflare::register(&registry);

    let config = args.sync_config();
    let store = registry.create_store(&config.store)?;
    let peer_source = NetbirdPeerSource::new(&args.netbird_endpoint, &args.netbird_access_token)?;

    info!(
        "Using {} store for zone {} (peers from {})",
        store.provider_name(),
        config.zone_domain,
        peer_source.endpoint()
    );

    Ok(SyncEngine::new(Box::new(peer_source), store, config)?)
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version also arrive here
            return if e.use_stderr() {
                NbsyncExitCode::ConfigError.into()
            } else {
                NbsyncExitCode::CleanShutdown.into()
            };
        }
    };

    if let Err(e) = args.validate() {
        eprintln!("Configuration validation error: {}", e);
        return NbsyncExitCode::ConfigError.into();
    }

    let log_level = args.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NbsyncExitCode::ConfigError.into();
    }

    info!("Starting nbsyncd daemon");

    let (engine, events) = match build_engine(&args) {
        Ok(built) => built,
        Err(e) => {
            error!("Startup error: {}", e);
            return NbsyncExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NbsyncExitCode::RuntimeError.into();
        }
    };

    // propagation checks against a store that was never written are noise
    let check_propagation = args.store == StoreKind::Cloudflare && !args.dry_run;

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(engine, events, args.dns_resolver, check_propagation).await {
            error!("Daemon error: {}", e);
            NbsyncExitCode::RuntimeError
        } else {
            NbsyncExitCode::CleanShutdown
        }
    });

    // an abandoned engine task must not hold the process open
    rt.shutdown_timeout(Duration::from_secs(1));

    result.into()
}

/// Run the engine until a shutdown signal, then stop it within the grace period
async fn run_daemon(
    engine: SyncEngine,
    events: mpsc::Receiver<SyncEvent>,
    resolver: SocketAddr,
    check_propagation: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();

    let mut engine_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(cancel).await }
    });

    let watcher = propagation::Watcher::new(resolver, check_propagation);
    let watcher_task = tokio::spawn(watcher.run(events, cancel.clone()));

    tokio::select! {
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
        }
        result = &mut engine_task => {
            cancel.cancel();
            result??;
            anyhow::bail!("Engine stopped without a shutdown signal");
        }
    }

    info!("Shutting down daemon");
    cancel.cancel();

    let stopped = tokio::time::timeout(SHUTDOWN_GRACE, &mut engine_task).await;
    let _ = watcher_task.await;

    match stopped {
        Ok(result) => {
            result??;
            info!("Daemon stopped");
            Ok(())
        }
        Err(_) => {
            engine_task.abort();
            Err(anyhow::anyhow!(
                "Engine did not stop within {:?}, abandoning in-flight run",
                SHUTDOWN_GRACE
            ))
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
