//! # tmprint - Receipt Printer Discovery and Printing
//!
//! tmprint drives a thermal receipt printer through its vendor SDK: find the
//! printer, let the user pick it, capture a view as a bitmap, and run the
//! SDK's connect / transaction / print / disconnect lifecycle. It provides:
//!
//! - **Discovery workflow**: scan, device list, selection
//! - **Printing workflow**: lazy handle, receipt building, printable checks, teardown
//! - **SDK boundary**: traits over the vendor SDK, plus an in-memory simulator
//! - **Rendering**: view capture, halftoning, paper previews
//!
//! ## Quick Start
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use tmprint::{
//!     discovery::DiscoveryScreen,
//!     permissions::StaticPermissions,
//!     printing::PrintScreen,
//!     render::view::ImageView,
//!     sdk::{sim::{SimDiscovery, SimPrinterFactory}, DeviceInfo},
//!     PrinterModel,
//! };
//!
//! // Find a printer
//! let discovery = SimDiscovery::new();
//! let mut devices = DiscoveryScreen::new(discovery.clone());
//! devices.open(&mut StaticPermissions::granted(33));
//! discovery.announce(DeviceInfo::new("TM-P80", "BT:00:01:90:AA:BB:CC"));
//! devices.pump();
//!
//! // Hand the selection to the printing screen
//! let selection = devices.select(0);
//! let sdk = SimPrinterFactory::new();
//! let mut printing = PrintScreen::open(sdk.clone(), PrinterModel::TM_P80, selection);
//!
//! // Print a view
//! let view = ImageView::new(RgbaImage::from_pixel(576, 200, Rgba([0, 0, 0, 255])));
//! assert!(printing.print_view(&view));
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`discovery`] | Discovery screen workflow |
//! | [`printing`] | Printing screen workflow |
//! | [`permissions`] | Bluetooth permission gating |
//! | [`sdk`] | Vendor SDK traits and the simulator |
//! | [`ui`] | Marshaling SDK callbacks onto the owning thread |
//! | [`render`] | View capture, halftoning, previews |
//! | [`printer`] | Printer models |
//! | [`error`] | Error types |

pub mod discovery;
pub mod error;
pub mod permissions;
pub mod printer;
pub mod printing;
pub mod render;
pub mod sdk;
pub mod ui;

// Re-exports for convenience
pub use discovery::{DiscoveryScreen, Selection};
pub use error::TmprintError;
pub use printer::PrinterModel;
pub use printing::PrintScreen;
