//! # Rendering Module
//!
//! This module turns UI content into bitmaps and shows what the printer made
//! of them.
//!
//! ## Modules
//!
//! - [`view`]: Capture a drawable region into an RGBA bitmap
//! - [`dither`]: Halftoning to black/white dots
//! - [`preview`]: Paper preview of a simulated print job
//!
//! ## Usage Example
//!
//! ```
//! use image::RgbaImage;
//! use tmprint::render::view::{capture, ImageView};
//!
//! let view = ImageView::new(RgbaImage::new(576, 200));
//! let bitmap = capture(&view);
//! assert_eq!(bitmap.dimensions(), (576, 200));
//! ```

pub mod dither;
pub mod preview;
pub mod view;
