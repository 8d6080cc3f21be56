//! # View Capture
//!
//! The printing screen prints a region of its UI. A [`View`] is anything that
//! can paint itself into an RGBA canvas; [`load_bitmap_from_view`] captures it
//! into a fresh buffer of a fixed size.
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use tmprint::render::view::{load_bitmap_from_view, View};
//!
//! struct Stripe;
//!
//! impl View for Stripe {
//!     fn measured_size(&self) -> (u32, u32) {
//!         (64, 8)
//!     }
//!
//!     fn draw(&self, canvas: &mut RgbaImage) {
//!         for x in 0..canvas.width() {
//!             canvas.put_pixel(x, 0, Rgba([0, 0, 0, 255]));
//!         }
//!     }
//! }
//!
//! let bitmap = load_bitmap_from_view(&Stripe, 64, 8);
//! assert_eq!(bitmap.get_pixel(10, 0).0, [0, 0, 0, 255]);
//! assert_eq!(bitmap.get_pixel(10, 1).0, [0, 0, 0, 0]);
//! ```

use std::path::Path;

use image::{DynamicImage, RgbaImage, imageops};

use crate::error::TmprintError;

/// A drawable UI region.
pub trait View {
    /// Width and height the region was laid out at.
    fn measured_size(&self) -> (u32, u32);

    /// Paint into `canvas`. The canvas starts fully transparent.
    fn draw(&self, canvas: &mut RgbaImage);
}

/// Capture `view` into a transparent canvas of `width` x `height`.
///
/// Whatever the view paints outside the canvas is clipped.
pub fn load_bitmap_from_view(view: &dyn View, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    view.draw(&mut canvas);
    canvas
}

/// Capture `view` at its measured size.
pub fn capture(view: &dyn View) -> RgbaImage {
    let (width, height) = view.measured_size();
    load_bitmap_from_view(view, width, height)
}

/// A view showing a decoded image at its natural size.
#[derive(Debug, Clone)]
pub struct ImageView {
    image: RgbaImage,
}

impl ImageView {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Decode an image file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TmprintError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| TmprintError::Image(format!("Failed to open {}: {}", path.display(), e)))?;
        Ok(Self::new(image.to_rgba8()))
    }

    /// Scale down to at most `max_width`, keeping the aspect ratio.
    pub fn fit_width(self, max_width: u32) -> Self {
        let (width, height) = self.image.dimensions();
        if width <= max_width || width == 0 {
            return self;
        }
        let scaled_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
        let resized = DynamicImage::ImageRgba8(self.image).resize_exact(
            max_width,
            scaled_height,
            imageops::FilterType::Triangle,
        );
        Self::new(resized.to_rgba8())
    }
}

impl View for ImageView {
    fn measured_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        imageops::overlay(canvas, &self.image, 0, 0);
    }
}
