//! # Printer Module
//!
//! This module provides printer-specific configurations.
//!
//! ## Modules
//!
//! - [`config`]: Printer models and their SDK constants

pub mod config;

pub use config::PrinterModel;
