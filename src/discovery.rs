//! # Discovery Screen
//!
//! Surfaces nearby printers and lets the user pick one.
//!
//! The SDK reports devices on its own thread. Each report is posted to the
//! screen's UI queue and appended to the visible list when the owner calls
//! [`DiscoveryScreen::pump`] (or awaits [`DiscoveryScreen::next_device`]).
//! Repeat announcements produce repeat entries. Restarting clears the list
//! and drops reports that have not been applied yet; everything the SDK
//! reports afterwards is appended, whichever scan it came from.
//!
//! ## Example
//!
//! ```
//! use tmprint::discovery::DiscoveryScreen;
//! use tmprint::permissions::StaticPermissions;
//! use tmprint::sdk::DeviceInfo;
//! use tmprint::sdk::sim::SimDiscovery;
//!
//! let sdk = SimDiscovery::new();
//! let mut screen = DiscoveryScreen::new(sdk.clone());
//! assert!(screen.open(&mut StaticPermissions::granted(33)));
//!
//! sdk.announce(DeviceInfo::new("TM-P80", "BT:00:11"));
//! screen.pump();
//!
//! let selection = screen.select(0).unwrap();
//! assert_eq!(selection.target, "BT:00:11");
//! ```

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::error::TmprintError;
use crate::permissions::{self, PermissionHost};
use crate::sdk::{DeviceInfo, Discovery, DiscoveryListener, FilterOption};
use crate::ui::{self, UiDispatcher, UiQueue};

/// The printer chosen by the user, handed to the printing screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub target: String,
}

/// Whether a scan is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Running,
}

/// Listener handed to the SDK. Runs on the SDK's thread.
struct DeviceForwarder {
    ui: UiDispatcher<DeviceInfo>,
}

impl DiscoveryListener for DeviceForwarder {
    fn on_discovery(&self, device: DeviceInfo) {
        debug!(name = %device.device_name, address = %device.target, "device found");
        self.ui.post(device);
    }
}

/// Discovery workflow over a [`Discovery`] backend.
pub struct DiscoveryScreen<D: Discovery> {
    discovery: D,
    filter: FilterOption,
    devices: Vec<DeviceInfo>,
    state: DiscoveryState,
    dispatcher: UiDispatcher<DeviceInfo>,
    queue: UiQueue<DeviceInfo>,
}

impl<D: Discovery> DiscoveryScreen<D> {
    /// Screen searching for printers filtered by vendor name.
    pub fn new(discovery: D) -> Self {
        Self::with_filter(discovery, FilterOption::default())
    }

    pub fn with_filter(discovery: D, filter: FilterOption) -> Self {
        let (dispatcher, queue) = ui::channel();
        Self {
            discovery,
            filter,
            devices: Vec::new(),
            state: DiscoveryState::Idle,
            dispatcher,
            queue,
        }
    }

    /// Request Bluetooth access, then start scanning if it was granted.
    ///
    /// Returns whether discovery is running afterwards. Denial leaves it
    /// stopped; nothing retries.
    pub fn open(&mut self, host: &mut dyn PermissionHost) -> bool {
        if !permissions::request_bluetooth(host).is_granted() {
            info!("Bluetooth access denied, discovery not started");
            return false;
        }

        if let Err(e) = self.start() {
            error!(error = %e, "failed to start discovery");
        }
        self.is_running()
    }

    /// Begin scanning. A busy SDK is ignored.
    pub fn start(&mut self) -> Result<(), TmprintError> {
        let listener = Arc::new(DeviceForwarder {
            ui: self.dispatcher.clone(),
        });

        match self.discovery.start(&self.filter, listener) {
            Ok(()) => {
                self.state = DiscoveryState::Running;
                info!(filter = ?self.filter, "discovery started");
                Ok(())
            }
            Err(e) if e.is_busy() => {
                debug!(error = %e, "discovery busy, ignoring start");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Halt scanning. A busy SDK is ignored.
    pub fn stop(&mut self) -> Result<(), TmprintError> {
        match self.discovery.stop() {
            Ok(()) => {
                if self.state == DiscoveryState::Running {
                    info!("discovery stopped");
                }
                self.state = DiscoveryState::Idle;
                Ok(())
            }
            Err(e) if e.is_busy() => {
                debug!(error = %e, "discovery busy, ignoring stop");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop, clear the list, and scan again.
    pub fn restart(&mut self) -> Result<(), TmprintError> {
        if let Err(e) = self.stop() {
            warn!(error = %e, "failed to stop discovery before restart");
        }
        self.clear();
        self.start()
    }

    /// Empty the list, discarding reports queued but not yet applied.
    pub fn clear(&mut self) {
        self.devices.clear();
        let stale = self.queue.drain().len();
        if stale > 0 {
            trace!(stale, "discarded queued device reports");
        }
    }

    /// Apply queued device reports to the list. Returns how many were added.
    pub fn pump(&mut self) -> usize {
        let found = self.queue.drain();
        let added = found.len();
        self.devices.extend(found);
        added
    }

    /// Wait for the next device report and append it.
    pub async fn next_device(&mut self) -> Option<DeviceInfo> {
        let device = self.queue.recv().await?;
        self.devices.push(device.clone());
        Some(device)
    }

    /// Pick the entry at `index`. Reachability is not checked.
    pub fn select(&self, index: usize) -> Option<Selection> {
        let device = self.devices.get(index)?;
        info!(name = %device.device_name, address = %device.target, "printer selected");
        Some(Selection {
            target: device.target.clone(),
        })
    }

    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    pub fn filter(&self) -> &FilterOption {
        &self.filter
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DiscoveryState::Running
    }
}

impl<D: Discovery> Drop for DiscoveryScreen<D> {
    fn drop(&mut self) {
        if let Err(e) = self.discovery.stop() {
            if !e.is_busy() {
                warn!(error = %e, "failed to stop discovery on close");
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
