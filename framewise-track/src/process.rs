//! Tracker backed by an external process
//!
//! One child process is spawned per request:
//!
//! ```text
//! <command> <args...> --first-image <path> --device <device>
//! ```
//!
//! The seed mask is written to its stdin as one JSON line. After that every
//! `predict` writes one image path line and reads one JSON mask line back
//! from stdout. The child is killed when the tracker is dropped.

use crate::device::Device;
use crate::error::TrackError;
use crate::tracker::{Tracker, TrackerFactory};
use framewise_core::Mask;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProcessTrackerFactory {
    command: String,
    args: Vec<String>,
}

impl ProcessTrackerFactory {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl TrackerFactory for ProcessTrackerFactory {
    fn new_tracker(
        &self,
        first_image: &Path,
        first_mask: &Mask,
        device: &Device,
    ) -> Result<Box<dyn Tracker>, TrackError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg("--first-image")
            .arg(first_image)
            .arg("--device")
            .arg(device.name())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| TrackError::Tracker(format!("failed to spawn {}: {}", self.command, e)))?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TrackError::Tracker("tracker process has no stdio".to_string()));
            }
        };

        debug!("spawned tracker process {} (pid {})", self.command, child.id());
        let mut tracker = ProcessTracker {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let seed = serde_json::to_string(first_mask)
            .map_err(|e| TrackError::Tracker(format!("failed to serialize seed mask: {}", e)))?;
        tracker.send_line(&seed)?;
        Ok(Box::new(tracker))
    }

    fn name(&self) -> &str {
        "process"
    }
}

pub struct ProcessTracker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessTracker {
    fn send_line(&mut self, line: &str) -> Result<(), TrackError> {
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Tracker for ProcessTracker {
    fn predict(&mut self, image: &Path) -> Result<Mask, TrackError> {
        self.send_line(&image.to_string_lossy())?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(TrackError::Tracker("tracker process exited".to_string()));
        }
        serde_json::from_str(line.trim())
            .map_err(|e| TrackError::Tracker(format!("invalid mask from tracker process: {}", e)))
    }
}

impl Drop for ProcessTracker {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("failed to kill tracker process {}: {}", self.child.id(), e);
        }
        let _ = self.child.wait();
    }
}
