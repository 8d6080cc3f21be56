//! # Printer SDK Boundary
//!
//! The printer vendor ships discovery, command encoding and transport as a
//! closed library. This module describes the part of that surface the
//! workflows use, as traits and plain value types, so the screens can be
//! driven by any backend that implements them.
//!
//! ## Surface
//!
//! | Trait | Role |
//! |-------|------|
//! | [`Discovery`] | start/stop a scan for nearby devices |
//! | [`DiscoveryListener`] | receives one [`DeviceInfo`] per announcement |
//! | [`PrinterFactory`] | constructs a [`Printer`] handle for a model |
//! | [`Printer`] | connect, transaction, command buffer, send |
//! | [`PrinterEventListener`] | data-received, connection and status events |
//!
//! Listeners are invoked on the SDK's own threads. Consumers marshal them
//! onto their owning thread (see [`crate::ui`]).
//!
//! ## Backends
//!
//! - [`sim`]: in-memory simulator used by the CLI and tests

pub mod sim;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use serde::Serialize;

use crate::error::SdkError;

// ============================================================================
// DISCOVERY
// ============================================================================

/// A device announced by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Human-readable device name (e.g. "TM-P80")
    pub device_name: String,
    /// Opaque connection target (e.g. "BT:00:01:90:AA:BB:CC")
    pub target: String,
}

impl DeviceInfo {
    pub fn new(device_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            target: target.into(),
        }
    }
}

/// Class of device a scan looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    All,
    #[default]
    Printer,
    Display,
}

/// Vendor name filter applied by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameFilter {
    /// Report every device
    None,
    /// Report only devices whose name identifies a vendor product
    #[default]
    Name,
}

/// Transport a scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortType {
    #[default]
    All,
    Tcp,
    Bluetooth,
    Usb,
}

/// What discovery should search for.
///
/// The default searches for printers on every transport, filtered by vendor
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOption {
    pub device_type: DeviceType,
    pub name_filter: NameFilter,
    pub port_type: PortType,
}

/// Callback receiving discovered devices.
pub trait DiscoveryListener: Send + Sync {
    fn on_discovery(&self, device: DeviceInfo);
}

/// Device discovery service.
pub trait Discovery {
    /// Begin an asynchronous scan. Returns `ErrorStatus::Processing` when a
    /// scan is already running.
    fn start(
        &self,
        filter: &FilterOption,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), SdkError>;

    /// Halt the running scan.
    fn stop(&self) -> Result<(), SdkError>;
}

// ============================================================================
// PRINTER
// ============================================================================

/// Printer series constant passed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Series {
    TmP20,
    TmP80,
    TmM30,
    TmT88,
}

/// Language model constant passed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ModelLang {
    #[default]
    Ank,
    Japanese,
    Chinese,
    Korean,
}

/// Text/image alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Ink color used for images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    None,
    #[default]
    Color1,
    Color2,
}

/// Image color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Mono,
    Gray16,
    MonoHighDensity,
}

/// Halftone method applied when an image is reduced to dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Halftone {
    #[default]
    Dither,
    ErrorDiffusion,
    Threshold,
}

/// Image compression on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compress {
    Deflate,
    None,
    #[default]
    Auto,
}

/// Cut command variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutType {
    /// Feed to the cutter, then cut
    #[default]
    Feed,
    /// Cut at the current position
    NoFeed,
    /// Cut once the next print reaches the cutter
    Reserve,
}

/// Parameters for [`Printer::add_image`].
///
/// `brightness` of `None` means the SDK default (1.0). Valid range is
/// 0.1 to 10.0; larger is lighter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageParams {
    pub color: Color,
    pub mode: Mode,
    pub halftone: Halftone,
    pub brightness: Option<f64>,
    pub compress: Compress,
}

/// Printer status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrinterStatus {
    /// Physically connected
    pub connection: bool,
    /// Online (cover closed, paper present, no error)
    pub online: bool,
}

impl fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection={} online={}", self.connection, self.online)
    }
}

/// Result code delivered with a data-received event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackCode {
    Success,
    ErrTimeout,
    ErrNotFound,
    ErrCoverOpen,
    ErrEmpty,
    ErrAutoRecover,
    ErrFailure,
}

/// Connection-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Reconnecting,
    Reconnect,
    Disconnect,
}

/// Status-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Online,
    Offline,
    PowerOff,
    CoverClose,
    CoverOpen,
    PaperOk,
    PaperNearEnd,
    PaperEmpty,
}

/// Printer callbacks, one method per event kind.
///
/// Registered once when the handle is created; invoked on the SDK's thread.
pub trait PrinterEventListener: Send + Sync {
    fn on_receive(&self, code: CallbackCode, status: PrinterStatus, print_job_id: &str);
    fn on_connection(&self, event: ConnectionEvent);
    fn on_status_change(&self, event: StatusEvent);
}

/// A printer handle.
///
/// `None` timeouts use the SDK default.
pub trait Printer: Send {
    fn connect(&mut self, target: &str, timeout: Option<Duration>) -> Result<(), SdkError>;
    fn disconnect(&mut self) -> Result<(), SdkError>;
    fn begin_transaction(&mut self) -> Result<(), SdkError>;
    fn end_transaction(&mut self) -> Result<(), SdkError>;
    fn clear_command_buffer(&mut self);
    fn add_text_align(&mut self, align: Align) -> Result<(), SdkError>;
    fn add_image(&mut self, image: &RgbaImage, params: &ImageParams) -> Result<(), SdkError>;
    fn add_feed_line(&mut self, lines: u32) -> Result<(), SdkError>;
    fn add_cut(&mut self, cut: CutType) -> Result<(), SdkError>;
    fn send_data(&mut self, timeout: Option<Duration>) -> Result<(), SdkError>;
    fn status(&self) -> PrinterStatus;
}

/// Constructs printer handles.
pub trait PrinterFactory {
    fn create(
        &self,
        series: Series,
        lang: ModelLang,
        listener: Arc<dyn PrinterEventListener>,
    ) -> Result<Box<dyn Printer>, SdkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_printers_by_name() {
        let filter = FilterOption::default();
        assert_eq!(filter.device_type, DeviceType::Printer);
        assert_eq!(filter.name_filter, NameFilter::Name);
        assert_eq!(filter.port_type, PortType::All);
    }

    #[test]
    fn test_default_image_params() {
        let params = ImageParams::default();
        assert_eq!(params.color, Color::Color1);
        assert_eq!(params.mode, Mode::Mono);
        assert_eq!(params.halftone, Halftone::Dither);
        assert_eq!(params.brightness, None);
        assert_eq!(params.compress, Compress::Auto);
    }

    #[test]
    fn test_device_info_json() {
        let device = DeviceInfo::new("TM-P80", "BT:00:11");
        let json = serde_json::to_string(&device).unwrap();
        assert_eq!(json, r#"{"device_name":"TM-P80","target":"BT:00:11"}"#);
    }
}
