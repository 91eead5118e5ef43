// # cfddnsd - Cloudflare DDNS Daemon
//
// Thin integration layer: all update logic lives in cfddns-core.
//
// The cfddnsd daemon is responsible for:
// 1. Reading process settings from environment variables
// 2. Loading the record file
// 3. Wiring the IP source, DNS client and address store together
// 4. Running the scheduler until SIGINT or SIGTERM
//
// ## Configuration
//
// Managed records come from a JSON file (see `cfddns_core::config`).
// Everything else is set via environment variables, all optional:
//
// - `CFDDNS_CONFIG`: Path to the record file (default `config.json`)
// - `CFDDNS_STATE_DIR`: Directory for stored addresses (default `.`)
// - `CFDDNS_IP_SOURCE_URL`: IP-echo service (default `https://api.ipify.org/`)
// - `CFDDNS_API_BASE`: Cloudflare API base URL
// - `CFDDNS_UPDATE_INTERVAL_SECS`: Update loop period (default 10)
// - `CFDDNS_POLL_INTERVAL_SECS`: Resync loop period (default 300)
// - `CFDDNS_SHUTDOWN_TIMEOUT_SECS`: Worker stop deadline (default 30)
// - `CFDDNS_MODE`: `live` or `dry-run` (default `live`)
// - `CFDDNS_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Example
//
// ```bash
// export CFDDNS_CONFIG=/etc/cfddns/config.json
// export CFDDNS_STATE_DIR=/var/lib/cfddns
//
// cfddnsd
// ```

use anyhow::{Context, Result};
use cfddns_cloudflare::{CLOUDFLARE_API_BASE, CloudflareClient};
use cfddns_core::config::{
    default_poll_interval_secs, default_shutdown_timeout_secs, default_update_interval_secs,
    load_records,
};
use cfddns_core::{FileAddressStore, RecordConfig, Scheduler, SchedulerConfig, Updater};
use cfddns_ip_http::{DEFAULT_IP_SOURCE_URL, HttpIpSource};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CfddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected)
    RuntimeError = 2,
}

impl From<CfddnsExitCode> for ExitCode {
    fn from(code: CfddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process settings
#[derive(Debug)]
struct Config {
    records_path: PathBuf,
    state_dir: PathBuf,
    ip_source_url: String,
    api_base: String,
    update_interval_secs: u64,
    poll_interval_secs: u64,
    shutdown_timeout_secs: u64,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().with_context(|| {
                    format!("{} must be a whole number of seconds. Got: {:?}", key, raw)
                }),
                None => Ok(default),
            }
        };

        let mode = var("CFDDNS_MODE", "live").to_lowercase();
        let dry_run = match mode.as_str() {
            "live" => false,
            "dry-run" => true,
            _ => anyhow::bail!(
                "CFDDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                mode
            ),
        };

        Ok(Self {
            records_path: PathBuf::from(var("CFDDNS_CONFIG", "config.json")),
            state_dir: PathBuf::from(var("CFDDNS_STATE_DIR", ".")),
            ip_source_url: var("CFDDNS_IP_SOURCE_URL", DEFAULT_IP_SOURCE_URL),
            api_base: var("CFDDNS_API_BASE", CLOUDFLARE_API_BASE),
            update_interval_secs: secs(
                "CFDDNS_UPDATE_INTERVAL_SECS",
                default_update_interval_secs(),
            )?,
            poll_interval_secs: secs("CFDDNS_POLL_INTERVAL_SECS", default_poll_interval_secs())?,
            shutdown_timeout_secs: secs(
                "CFDDNS_SHUTDOWN_TIMEOUT_SECS",
                default_shutdown_timeout_secs(),
            )?,
            dry_run,
            log_level: var("CFDDNS_LOG_LEVEL", "info"),
        })
    }

    /// Validate the configuration
    ///
    /// Checks value formats and numeric ranges. The record file itself is
    /// validated when it is loaded.
    fn validate(&self) -> Result<()> {
        if self.records_path.as_os_str().is_empty() {
            anyhow::bail!("CFDDNS_CONFIG cannot be empty");
        }

        for (key, url) in [
            ("CFDDNS_IP_SOURCE_URL", &self.ip_source_url),
            ("CFDDNS_API_BASE", &self.api_base),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", key, url);
            }
        }

        if !(1..=3600).contains(&self.update_interval_secs) {
            anyhow::bail!(
                "CFDDNS_UPDATE_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                self.update_interval_secs
            );
        }

        if !(1..=86400).contains(&self.poll_interval_secs) {
            anyhow::bail!(
                "CFDDNS_POLL_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                self.poll_interval_secs
            );
        }

        if !(1..=300).contains(&self.shutdown_timeout_secs) {
            anyhow::bail!(
                "CFDDNS_SHUTDOWN_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.shutdown_timeout_secs
            );
        }

        self.log_level()?;
        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "CFDDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            update_interval: Duration::from_secs(self.update_interval_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CfddnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return CfddnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CfddnsExitCode::ConfigError.into();
    }

    info!("Starting cfddnsd daemon");

    // Record file is read once, before any network activity
    let records = match load_records(&config.records_path) {
        Ok(records) => records,
        Err(e) => {
            error!("{}", e);
            return CfddnsExitCode::ConfigError.into();
        }
    };
    info!("Configuration loaded: {} record(s)", records.len());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CfddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config, records).await {
            Ok(()) => CfddnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                exit_code_for(&e)
            }
        }
    });

    info!("Exiting cfddnsd");
    result.into()
}

/// Configuration problems found after startup still exit with code 1
fn exit_code_for(err: &anyhow::Error) -> CfddnsExitCode {
    match err.downcast_ref::<cfddns_core::Error>() {
        Some(cfddns_core::Error::Config(_)) => CfddnsExitCode::ConfigError,
        _ => CfddnsExitCode::RuntimeError,
    }
}

/// Run the daemon
async fn run_daemon(config: Config, records: Vec<RecordConfig>) -> Result<()> {
    if config.dry_run {
        warn!("Running in DRY-RUN mode - no DNS records will be changed");
    }

    let ip_source = HttpIpSource::new(config.ip_source_url.clone());
    let client = CloudflareClient::with_base_url(config.api_base.clone(), config.dry_run)?;
    let store = FileAddressStore::new(&config.state_dir).await?;

    info!("IP source: {}", ip_source.url());
    info!("State directory: {}", store.dir().display());
    for record in &records {
        info!("Managing record: {}", record.record_name);
    }

    let mut signals = ShutdownSignals::register()?;

    let updater = Updater::new(Arc::new(ip_source), Arc::new(client), Arc::new(store));
    let handle = Scheduler::start(Arc::new(updater), records, config.scheduler_config())?;

    info!("Daemon initialized successfully");

    let received = match signals.recv().await {
        Ok(received) => received,
        Err(e) => {
            handle.shutdown().await?;
            return Err(e);
        }
    };

    info!("Received shutdown signal: {}", received);
    info!("Shutting down daemon");

    // Later signals are absorbed by the still-installed handlers
    handle.shutdown().await?;
    info!("Stopped");

    Ok(())
}

/// Termination signal listeners
///
/// Registered before the workers start. Once tokio installs the handler for
/// a signal it stays installed for the rest of the process, even after this
/// value is dropped. A second SIGTERM or SIGINT arriving while the scheduler
/// shuts down is therefore swallowed rather than killing the process, and
/// the shutdown sequence runs exactly once.
struct ShutdownSignals {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn register() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

        Ok(Self { sigterm, sigint })
    }

    /// Fallback for non-Unix platforms: CTRL-C only
    #[cfg(not(unix))]
    fn register() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next signal and return its name
    #[cfg(unix)]
    async fn recv(&mut self) -> Result<&'static str> {
        let received = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };

        Ok(received)
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Result<&'static str> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
        Ok("SIGINT")
    }
}
