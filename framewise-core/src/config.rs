// Configuration for the tracking service

use crate::error::{Error, Result};
use crate::palette::DEFAULT_PALETTE_SEED;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 12348;

/// Requests carry image URIs and RLE masks for whole clips; 1 GiB allows
/// about a thousand 1 MB inline images.
pub const MIN_MESSAGE_SIZE: usize = 1024 * 1024 * 1024;

/// Which tracker implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    /// Replays the seed mask and reports the track lost after a few frames
    Mock,
    /// Always returns the seed mask
    Replay,
    /// Delegates to an external model process
    Process,
}

impl FromStr for TrackerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(TrackerKind::Mock),
            "replay" => Ok(TrackerKind::Replay),
            "process" => Ok(TrackerKind::Process),
            other => Err(format!("unknown tracker kind '{}' (expected mock, replay or process)", other)),
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerKind::Mock => write!(f, "mock"),
            TrackerKind::Replay => write!(f, "replay"),
            TrackerKind::Process => write!(f, "process"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// Tracker selection and per-kind options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub kind: TrackerKind,
    /// Mock tracker: number of frames answered with the seed mask before
    /// empty masks are returned. `None` never loses the track.
    pub mock_frames_before_lost: Option<u32>,
    /// Mock tracker: simulated inference time per frame
    pub mock_delay_ms: u64,
    /// Process tracker: executable to spawn per request
    pub process_command: Option<String>,
    /// Process tracker: leading arguments, before the per-request ones
    pub process_args: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: TrackerKind::Mock,
            mock_frames_before_lost: Some(9),
            mock_delay_ms: 100,
            process_command: None,
            process_args: Vec::new(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// gRPC port to listen on
    pub port: u16,
    /// Directory for cached images and debug output
    pub workspace: PathBuf,
    /// Max gRPC message size, both directions
    pub max_message_size: usize,
    /// Requests served concurrently
    pub request_workers: usize,
    /// Images fetched concurrently within one request
    pub image_workers: usize,
    pub download_timeout_secs: u64,
    /// Devices handed to trackers round-robin, e.g. "cpu", "cuda:0"
    pub devices: Vec<String>,
    /// Write per-frame overlay PNGs under `<workspace>/debug`
    pub debug_overlay: bool,
    pub palette_seed: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    pub tracker: TrackerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let workspace = dirs::home_dir()
            .map(|mut p| {
                p.push(".framewise");
                p.push("track-workspace");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./track-workspace"));
        let cpus = num_cpus::get().max(1);

        Self {
            port: DEFAULT_PORT,
            workspace,
            max_message_size: MIN_MESSAGE_SIZE,
            request_workers: cpus,
            image_workers: cpus,
            download_timeout_secs: 300,
            devices: vec!["cpu".to_string()],
            debug_overlay: false,
            palette_seed: DEFAULT_PALETTE_SEED,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            tracker: TrackerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_content(&content)
    }

    /// Parse configuration text, trying JSON, then TOML, then YAML
    pub fn from_content(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<ServiceConfig>(content) {
            return Ok(config);
        }
        if let Ok(config) = toml::from_str::<ServiceConfig>(content) {
            return Ok(config);
        }
        if let Ok(config) = serde_yaml::from_str::<ServiceConfig>(content) {
            return Ok(config);
        }
        Err(Error::Configuration("unrecognised configuration format".to_string()))
    }

    /// Defaults overlaid with `FRAMEWISE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay values from an environment lookup. Unparseable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("FRAMEWISE_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(workspace) = lookup("FRAMEWISE_WORKSPACE") {
            self.workspace = PathBuf::from(workspace);
        }
        if let Some(size) = lookup("FRAMEWISE_MAX_MESSAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.max_message_size = size;
        }
        if let Some(workers) = lookup("FRAMEWISE_REQUEST_WORKERS").and_then(|v| v.parse().ok()) {
            self.request_workers = workers;
        }
        if let Some(workers) = lookup("FRAMEWISE_IMAGE_WORKERS").and_then(|v| v.parse().ok()) {
            self.image_workers = workers;
        }
        if let Some(devices) = lookup("FRAMEWISE_DEVICES") {
            self.devices = split_list(&devices);
        }
        if let Some(level) = lookup("FRAMEWISE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = lookup("FRAMEWISE_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.log_format = format;
        }
        if let Some(kind) = lookup("FRAMEWISE_TRACKER").and_then(|v| v.parse().ok()) {
            self.tracker.kind = kind;
        }
        if let Some(command) = lookup("FRAMEWISE_TRACKER_COMMAND") {
            self.tracker.process_command = Some(command);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Configuration("port cannot be 0".to_string()));
        }
        if self.max_message_size < MIN_MESSAGE_SIZE {
            return Err(Error::Configuration(format!(
                "max_message_size must be at least {} bytes",
                MIN_MESSAGE_SIZE
            )));
        }
        if self.request_workers == 0 {
            return Err(Error::Configuration("request_workers must be > 0".to_string()));
        }
        if self.image_workers == 0 {
            return Err(Error::Configuration("image_workers must be > 0".to_string()));
        }
        if self.download_timeout_secs == 0 {
            return Err(Error::Configuration("download_timeout_secs must be > 0".to_string()));
        }
        if self.devices.is_empty() || self.devices.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::Configuration("devices must list at least one non-empty device".to_string()));
        }
        if self.tracker.kind == TrackerKind::Process
            && self.tracker.process_command.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(Error::Configuration(
                "tracker.process_command is required for the process tracker".to_string(),
            ));
        }
        Ok(())
    }

    pub fn images_dir(&self) -> PathBuf {
        self.workspace.join("images")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.workspace.join("debug")
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
