// Framewise frame tracking server
// Loads configuration (file, then FRAMEWISE_* variables, then flags) and serves track.v1

use clap::Parser;
use framewise_core::{LogFormat, ServiceConfig, TrackerKind};
use framewise_server::{telemetry, TrackServer};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "framewise-server")]
#[command(about = "gRPC service that tracks a mask across a sequence of frames", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, env = "FRAMEWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// gRPC port
    #[arg(long, short)]
    port: Option<u16>,

    /// Workspace directory for the image cache and debug output
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Tracker implementation (mock, replay, process)
    #[arg(long)]
    tracker: Option<TrackerKind>,

    /// Executable for the process tracker
    #[arg(long)]
    tracker_command: Option<String>,

    /// Devices handed out round-robin, e.g. cuda:0,cuda:1
    #[arg(long, value_delimiter = ',')]
    devices: Vec<String>,

    /// Requests served concurrently
    #[arg(long)]
    request_workers: Option<usize>,

    /// Images fetched concurrently per request
    #[arg(long)]
    image_workers: Option<usize>,

    /// Write per-frame overlay images under <workspace>/debug
    #[arg(long)]
    debug_overlay: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = ServiceConfig::from_file(path)?;
                config.apply_env(|key| std::env::var(key).ok());
                config
            }
            None => ServiceConfig::from_env(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(workspace) = &self.workspace {
            config.workspace = workspace.clone();
        }
        if let Some(kind) = self.tracker {
            config.tracker.kind = kind;
        }
        if let Some(command) = &self.tracker_command {
            config.tracker.process_command = Some(command.clone());
        }
        if !self.devices.is_empty() {
            config.devices = self.devices.clone();
        }
        if let Some(workers) = self.request_workers {
            config.request_workers = workers;
        }
        if let Some(workers) = self.image_workers {
            config.image_workers = workers;
        }
        if self.debug_overlay {
            config.debug_overlay = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    telemetry::init_logging(&config.log_level, config.log_format)?;

    info!("Starting framewise-server {}", env!("CARGO_PKG_VERSION"));
    std::fs::create_dir_all(config.images_dir())?;

    let server = TrackServer::from_config(&config)?;
    let listener = TcpListener::bind(SocketAddr::new(cli.host, config.port)).await?;
    framewise_server::serve(server, listener, wait_for_shutdown()).await
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
