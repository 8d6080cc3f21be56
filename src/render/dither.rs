//! # Halftoning
//!
//! Reduces an RGBA image to the black/white dots a thermal head can make.
//! The SDK halftones images itself; this module reproduces the three methods
//! it offers closely enough to preview what a job will look like.
//!
//! ## Methods
//!
//! | [`Halftone`] | Algorithm |
//! |--------------|-----------|
//! | `Dither` | Bayer 8x8 ordered dither |
//! | `ErrorDiffusion` | Floyd-Steinberg |
//! | `Threshold` | fixed 50% cut |
//!
//! ## Intensity
//!
//! Pixels are composited over white paper first, so transparent regions of a
//! rendered view come out blank. Intensity is `0.0` for white and `1.0` for
//! black. Brightness acts as a gamma: values above 1.0 lighten.
//!
//! ## The Bayer Matrix
//!
//! ```text
//!     0   1   2   3   4   5   6   7   (x mod 8)
//!   ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! 0 │ 0 │32 │ 8 │40 │ 2 │34 │10 │42 │
//! 1 │48 │16 │56 │24 │50 │18 │58 │26 │
//! 2 │12 │44 │ 4 │36 │14 │46 │ 6 │38 │
//! 3 │60 │28 │52 │20 │62 │30 │54 │22 │
//! 4 │ 3 │35 │11 │43 │ 1 │33 │ 9 │41 │
//! 5 │51 │19 │59 │27 │49 │17 │57 │25 │
//! 6 │15 │47 │ 7 │39 │13 │45 │ 5 │37 │
//! 7 │63 │31 │55 │23 │61 │29 │53 │21 │
//!   └───┴───┴───┴───┴───┴───┴───┴───┘
//! (y mod 8)
//! ```
//!
//! ## Usage Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use tmprint::render::dither;
//! use tmprint::sdk::Halftone;
//!
//! let gray = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 128, 255]));
//! let dots = dither::monochrome(&gray, Halftone::Dither, 1.0);
//! assert_eq!(dots.dimensions(), (16, 16));
//! ```

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::sdk::Halftone;

/// Dot value for black in a monochrome buffer.
pub const BLACK: u8 = 0;

/// Dot value for white in a monochrome buffer.
pub const WHITE: u8 = 255;

/// Bayer 8x8 dithering matrix
///
/// Values range from 0-63. Low values activate first at low intensities.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Get the dithering threshold for a pixel position.
///
/// Returns a value in (0, 1), never exactly 0 or 1, so black always prints
/// and white never does.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Determine if a dot should be printed at the given position.
///
/// ```
/// use tmprint::render::dither::should_print;
///
/// assert!(should_print(0, 0, 1.0));
/// assert!(!should_print(0, 0, 0.0));
/// ```
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Ink intensity of a pixel printed on white paper.
///
/// `brightness` is clamped to the SDK's range (0.1 to 10.0).
pub fn intensity(pixel: Rgba<u8>, brightness: f64) -> f32 {
    let [r, g, b, a] = pixel.0;
    let alpha = a as f32 / 255.0;
    let over_white = |c: u8| c as f32 * alpha + 255.0 * (1.0 - alpha);

    let luminance =
        (0.299 * over_white(r) + 0.587 * over_white(g) + 0.114 * over_white(b)) / 255.0;
    let gamma = 1.0 / brightness.clamp(0.1, 10.0) as f32;

    1.0 - luminance.clamp(0.0, 1.0).powf(gamma)
}

/// Halftone an image into a black/white buffer ([`BLACK`] / [`WHITE`]).
pub fn monochrome(image: &RgbaImage, halftone: Halftone, brightness: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    let levels: Vec<f32> = image.pixels().map(|&p| intensity(p, brightness)).collect();

    let dots = match halftone {
        Halftone::Dither => ordered(&levels, width as usize),
        Halftone::Threshold => levels.iter().map(|&i| i > 0.5).collect(),
        Halftone::ErrorDiffusion => floyd_steinberg(levels, width as usize),
    };

    let mut out = GrayImage::new(width, height);
    for (pixel, black) in out.pixels_mut().zip(dots) {
        *pixel = Luma([if black { BLACK } else { WHITE }]);
    }
    out
}

fn ordered(levels: &[f32], width: usize) -> Vec<bool> {
    levels
        .iter()
        .enumerate()
        .map(|(i, &level)| should_print(i % width, i / width, level))
        .collect()
}

/// Floyd-Steinberg error diffusion over a row-major intensity buffer.
fn floyd_steinberg(mut levels: Vec<f32>, width: usize) -> Vec<bool> {
    if width == 0 {
        return Vec::new();
    }
    let height = levels.len() / width;
    let mut dots = vec![false; levels.len()];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let black = levels[idx] > 0.5;
            dots[idx] = black;

            let error = levels[idx] - if black { 1.0 } else { 0.0 };
            let mut spread = |dx: isize, dy: usize, weight: f32| {
                let nx = x as isize + dx;
                let ny = y + dy;
                if nx >= 0 && (nx as usize) < width && ny < height {
                    levels[ny * width + nx as usize] += error * weight;
                }
            };
            spread(1, 0, 7.0 / 16.0);
            spread(-1, 1, 3.0 / 16.0);
            spread(0, 1, 5.0 / 16.0);
            spread(1, 1, 1.0 / 16.0);
        }
    }

    dots
}

// ============================================================================
// TESTS
// ============================================================================
