// # ddns-panel - DDNS Control Panel CLI
//
// This binary is a THIN front end over ddns-panel-core:
// - No retry, caching or validation logic here
// - Every record change goes through RecordStore
// - Every request goes through RequestGateway
//
// The CLI is responsible for:
// 1. Reading configuration from flags and environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the transport, gateway, store, wizard and monitor
// 4. Printing results and mapping failures to exit codes
//
// ## Configuration
//
// - `DDNS_PANEL_API_BASE`: API base URL (default `http://127.0.0.1:8080/api`)
// - `DDNS_PANEL_MAX_ATTEMPTS`: Attempts per request on transport failure
// - `DDNS_PANEL_RETRY_DELAY_MS`: Delay between attempts
// - `DDNS_PANEL_TIMEOUT_SECS`: Per-request timeout
// - `DDNS_PANEL_POLL_INTERVAL_SECS`: Health poll interval for `watch`
// - `DDNS_PANEL_SETTLE_DELAY_MS`: Settle delay after a link-up signal
// - `DDNS_PANEL_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DDNS_PANEL_API_BASE=http://192.168.1.10:8080/api
//
// ddns-panel list
// ddns-panel setup --token $CF_TOKEN --zone-id z1 --record-name home.example.com --record-id r1
// ddns-panel watch
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ddns_panel_core::config::{DEFAULT_API_BASE, GatewayConfig, MonitorConfig, PanelConfig};
use ddns_panel_core::{
    ConnectionMonitor, DnsRecordConfig, HostLinkSignal, IpType, RecordStore, RequestGateway,
    SetupWizard,
};
use ddns_panel_http::ReqwestTransport;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or startup error
/// - 2: Runtime error (remote unreachable, rejected, invalid input)
#[derive(Debug, Clone, Copy)]
enum PanelExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<PanelExitCode> for ExitCode {
    fn from(code: PanelExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "ddns-panel", version)]
#[command(about = "Control panel client for the DDNS service")]
struct Cli {
    /// API base URL
    #[arg(long, env = "DDNS_PANEL_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Attempts per request when the remote gives no reply
    #[arg(long, env = "DDNS_PANEL_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: usize,

    /// Delay between attempts, in milliseconds
    #[arg(long, env = "DDNS_PANEL_RETRY_DELAY_MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, env = "DDNS_PANEL_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Health poll interval for `watch`, in seconds
    #[arg(long, env = "DDNS_PANEL_POLL_INTERVAL_SECS", default_value_t = 30)]
    poll_interval_secs: u64,

    /// Settle delay after a link-up signal, in milliseconds
    #[arg(long, env = "DDNS_PANEL_SETTLE_DELAY_MS", default_value_t = 2000)]
    settle_delay_ms: u64,

    /// Log level
    #[arg(long, env = "DDNS_PANEL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the remote and print its status document
    Status,

    /// List configured records
    List,

    /// Print the address the remote currently detects
    Ip {
        /// Address family (v4 or v6)
        #[arg(default_value = "v4")]
        family: IpType,
    },

    /// Ask the remote to update every record now
    Update,

    /// Add a record
    Add {
        #[arg(long)]
        zone_id: String,
        #[arg(long)]
        record_name: String,
        /// Provider API token
        #[arg(long)]
        token: String,
        /// Provider-issued record id
        #[arg(long)]
        record_id: Option<String>,
        #[arg(long, default_value = "ipv4")]
        ip_type: IpType,
        /// Update interval in seconds (minimum 60)
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },

    /// Change fields of an existing record
    Edit {
        record_id: String,
        #[arg(long)]
        record_name: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        ip_type: Option<IpType>,
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Remove a record
    Remove { record_id: String },

    /// Run the first-run setup wizard
    Setup {
        #[arg(long)]
        token: String,
        #[arg(long)]
        zone_id: String,
        #[arg(long)]
        record_name: String,
        #[arg(long)]
        record_id: String,
        #[arg(long, default_value = "ipv4")]
        ip_type: IpType,
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },

    /// List the zones a token can access, or the records of one zone
    Zones {
        #[arg(long)]
        token: String,
        #[arg(long)]
        zone_id: Option<String>,
    },

    /// Monitor the connection and re-sync records after reconnects
    Watch,
}

impl Cli {
    fn panel_config(&self) -> PanelConfig {
        PanelConfig {
            api_base: self.api_base.clone(),
            gateway: GatewayConfig {
                max_attempts: self.max_attempts,
                retry_delay_ms: self.retry_delay_ms,
                request_timeout_secs: self.timeout_secs,
            },
            monitor: MonitorConfig {
                poll_interval_secs: self.poll_interval_secs,
                settle_delay_ms: self.settle_delay_ms,
                ..MonitorConfig::default()
            },
        }
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!(
            "DDNS_PANEL_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            other
        ),
    }
}

/// Components shared by every command
struct Panel {
    gateway: Arc<RequestGateway>,
    store: Arc<RecordStore>,
    config: PanelConfig,
}

impl Panel {
    fn connect(config: PanelConfig) -> Result<Self> {
        let transport = ReqwestTransport::from_config(&config)?;
        let gateway = Arc::new(RequestGateway::new(Arc::new(transport), &config.gateway)?);
        let store = Arc::new(RecordStore::new(gateway.clone()));
        Ok(Self {
            gateway,
            store,
            config,
        })
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                PanelExitCode::ConfigError
            } else {
                PanelExitCode::Success
            };
            let _ = e.print();
            return code.into();
        }
    };

    let log_level = match parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return PanelExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PanelExitCode::ConfigError.into();
    }

    let panel = match Panel::connect(cli.panel_config()) {
        Ok(panel) => panel,
        Err(e) => {
            error!("Configuration error: {}", e);
            return PanelExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PanelExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(cli.command, panel).await {
            error!("{:#}", e);
            PanelExitCode::RuntimeError
        } else {
            PanelExitCode::Success
        }
    });

    result.into()
}

async fn run(command: Command, panel: Panel) -> Result<()> {
    match command {
        Command::Status => status(&panel).await,
        Command::List => list(&panel).await,
        Command::Ip { family } => {
            let ip = panel.gateway.current_ip(family).await?;
            println!("{}", ip);
            Ok(())
        }
        Command::Update => update(&panel).await,
        Command::Add {
            zone_id,
            record_name,
            token,
            record_id,
            ip_type,
            interval,
        } => {
            let mut config = DnsRecordConfig::new(zone_id, token, record_name, ip_type, interval)?;
            if let Some(id) = record_id {
                config = config.with_record_id(id);
            }
            save_record(&panel, config).await
        }
        Command::Edit {
            record_id,
            record_name,
            token,
            ip_type,
            interval,
        } => {
            if record_name.is_none() && token.is_none() && ip_type.is_none() && interval.is_none() {
                anyhow::bail!("Nothing to change: pass at least one of --record-name, --token, --ip-type, --interval");
            }

            panel.store.load().await.context("Failed to load records")?;
            let mut config = panel
                .store
                .get(&record_id)
                .with_context(|| format!("No record with id {}", record_id))?;

            if let Some(name) = record_name {
                config.set_record_name(name)?;
            }
            if let Some(token) = token {
                config.set_api_token(token)?;
            }
            if let Some(ip_type) = ip_type {
                config.set_ip_type(ip_type);
            }
            if let Some(secs) = interval {
                config.set_update_interval(secs)?;
            }

            save_record(&panel, config).await
        }
        Command::Remove { record_id } => {
            panel.store.load().await.context("Failed to load records")?;
            panel.store.remove(&record_id).await?;
            println!("Removed {}", record_id);
            Ok(())
        }
        Command::Setup {
            token,
            zone_id,
            record_name,
            record_id,
            ip_type,
            interval,
        } => {
            panel.store.load().await.context("Failed to load records")?;
            if !SetupWizard::should_auto_show(&panel.store) {
                warn!(
                    "{} record(s) already configured, adding another through setup",
                    panel.store.len()
                );
            }

            let mut wizard = SetupWizard::new(panel.store.clone());
            wizard.submit_token(&token)?;
            wizard.submit_zone_record(&zone_id, &record_name, &record_id)?;
            let created = wizard.finish(ip_type, interval).await?;

            println!("Setup complete: {} ({})", created.record_name(), created.record_type());
            Ok(())
        }
        Command::Zones { token, zone_id } => zones(&panel, &token, zone_id.as_deref()).await,
        Command::Watch => watch(panel).await,
    }
}

async fn status(panel: &Panel) -> Result<()> {
    if !panel.gateway.probe_health().await {
        anyhow::bail!(
            "API at {} is {}",
            panel.config.api_base,
            panel.gateway.connection_status()
        );
    }
    println!("connection: {}", panel.gateway.connection_status());

    let status = panel.gateway.fetch_status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn list(panel: &Panel) -> Result<()> {
    let records = panel.store.load().await.context("Failed to load records")?;

    if SetupWizard::should_auto_show(&panel.store) {
        println!("No records configured. Run `ddns-panel setup` to create the first one.");
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }
    Ok(())
}

async fn update(panel: &Panel) -> Result<()> {
    let (outcome, records) = panel.store.trigger_and_reload().await?;

    println!(
        "{}",
        outcome
            .message
            .as_deref()
            .unwrap_or(if outcome.updated { "Updated" } else { "No change" })
    );
    for record in &records {
        print_record(record);
    }
    Ok(())
}

async fn save_record(panel: &Panel, config: DnsRecordConfig) -> Result<()> {
    // The save replaces the full set, so the set must be current first
    if !panel.store.has_loaded() {
        panel.store.load().await.context("Failed to load records")?;
    }

    panel.store.validate(&config).await?;
    let saved = panel.store.upsert(config).await?;

    println!("Saved");
    print_record(&saved);
    Ok(())
}

async fn zones(panel: &Panel, token: &str, zone_id: Option<&str>) -> Result<()> {
    match zone_id {
        None => {
            for zone in panel.gateway.validate_token(token).await? {
                println!("{}\t{}", zone.id, zone.name);
            }
        }
        Some(zone_id) => {
            for record in panel.gateway.list_zone_records(token, zone_id).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.id, record.record_type, record.name, record.content
                );
            }
        }
    }
    Ok(())
}

async fn watch(panel: Panel) -> Result<()> {
    if let Err(e) = panel.store.load().await {
        warn!("Initial load failed, will re-sync after reconnect: {}", e);
    }

    // No host link notifications in a terminal: polling only
    let link = Arc::new(HostLinkSignal::new());
    let monitor = ConnectionMonitor::new(panel.gateway.clone(), link, &panel.config.monitor)?
        .with_refresh_target(panel.store.clone());
    let mut events = monitor.subscribe();
    let handle = monitor.start();

    info!("Watching {}", panel.config.api_base);

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                info!("Received shutdown signal: {}", signal?);
                break;
            }

            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} monitor event(s)", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.stop().await;
    info!("Stopped watching");
    Ok(())
}

fn print_record(record: &DnsRecordConfig) {
    println!(
        "{}\t{}\t{}\t{}\t{}s\t{}\t{}",
        record.record_id().unwrap_or("(pending)"),
        record.record_name(),
        record.record_type(),
        record.current_ip_display(),
        record.update_interval_secs(),
        record.status(),
        record
            .last_update_time()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "never".to_string()),
    );
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
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
