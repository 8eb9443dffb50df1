//! Round-robin assignment of compute devices to requests

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque device name handed to tracker factories, e.g. `cpu` or `cuda:1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device(String);

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn cpu() -> Self {
        Self::new("cpu")
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Devices cycled across requests so concurrent trackers spread over
/// accelerators.
#[derive(Debug)]
pub struct DevicePool {
    devices: Vec<Device>,
    next: AtomicUsize,
}

impl DevicePool {
    /// An empty list falls back to the CPU.
    pub fn new(devices: Vec<Device>) -> Self {
        let devices = if devices.is_empty() { vec![Device::cpu()] } else { devices };
        Self {
            devices,
            next: AtomicUsize::new(0),
        }
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(names.iter().map(|n| Device::new(n.as_ref())).collect())
    }

    pub fn next(&self) -> Device {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.devices.len();
        self.devices[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DevicePool {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
