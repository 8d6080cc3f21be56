//! # Paper Preview
//!
//! Renders a job accepted by the simulated printer to a grayscale image of
//! the paper roll, so a print can be checked without hardware.
//!
//! ```text
//! QueuedCommand list → render_job → GrayImage (model width) → PNG
//!                        ↓
//!              - alignment positions images
//!              - images are halftoned with their own parameters
//!              - feed lines advance by the model's line height
//!              - cuts draw a dashed line
//! ```

use std::path::Path;

use image::{GrayImage, Luma, imageops};

use crate::error::TmprintError;
use crate::printer::PrinterModel;
use crate::render::dither::{self, BLACK, WHITE};
use crate::sdk::sim::QueuedCommand;
use crate::sdk::{Align, CutType};

/// Paper fed between the print head and the cutter, in dots.
const CUTTER_FEED_DOTS: u32 = 24;

/// Length of one dash in the cut line, in dots.
const CUT_DASH_DOTS: u32 = 8;

/// Render a sequence of queued commands as printed paper.
pub fn render_job(model: &PrinterModel, commands: &[QueuedCommand]) -> GrayImage {
    let width = model.width_dots as u32;
    let mut align = Align::Left;
    let mut y = 0u32;
    let mut blocks: Vec<(u32, u32, GrayImage)> = Vec::new();
    let mut cuts: Vec<u32> = Vec::new();

    for command in commands {
        match command {
            QueuedCommand::TextAlign(a) => align = *a,
            QueuedCommand::Image { image, params } => {
                let mut dots =
                    dither::monochrome(image, params.halftone, params.brightness.unwrap_or(1.0));
                if dots.width() > width {
                    dots = imageops::crop_imm(&dots, 0, 0, width, dots.height()).to_image();
                }
                let x = match align {
                    Align::Left => 0,
                    Align::Center => (width - dots.width()) / 2,
                    Align::Right => width - dots.width(),
                };
                let height = dots.height();
                blocks.push((x, y, dots));
                y += height;
            }
            QueuedCommand::FeedLine(lines) => {
                y += lines * model.line_feed_dots as u32;
            }
            QueuedCommand::Cut(cut) => {
                if *cut != CutType::NoFeed {
                    y += CUTTER_FEED_DOTS;
                }
                cuts.push(y);
            }
        }
    }

    let height = cuts.iter().map(|c| c + 1).chain([y, 1]).max().unwrap_or(1);
    let mut paper = GrayImage::from_pixel(width, height, Luma([WHITE]));

    for (x, top, dots) in &blocks {
        imageops::replace(&mut paper, dots, *x as i64, *top as i64);
    }
    for &cut in &cuts {
        for x in (0..width).filter(|x| (x / CUT_DASH_DOTS) % 2 == 0) {
            paper.put_pixel(x, cut, Luma([BLACK]));
        }
    }

    paper
}

/// Save a preview as PNG.
pub fn save_png<P: AsRef<Path>>(path: P, image: &GrayImage) -> Result<(), TmprintError> {
    let path = path.as_ref();
    image
        .save(path)
        .map_err(|e| TmprintError::Image(format!("Failed to save {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::ImageParams;
    use image::{Rgba, RgbaImage};

    fn black_block(width: u32, height: u32) -> QueuedCommand {
        QueuedCommand::Image {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            params: ImageParams::default(),
        }
    }

    #[test]
    fn test_center_alignment() {
        let model = PrinterModel::TM_P80;
        let paper = render_job(
            &model,
            &[QueuedCommand::TextAlign(Align::Center), black_block(100, 10)],
        );

        assert_eq!(paper.dimensions(), (576, 10));
        assert_eq!(paper.get_pixel(237, 5).0, [WHITE]);
        assert_eq!(paper.get_pixel(238, 5).0, [BLACK]);
        assert_eq!(paper.get_pixel(337, 5).0, [BLACK]);
        assert_eq!(paper.get_pixel(338, 5).0, [WHITE]);
    }

    #[test]
    fn test_receipt_layout_height() {
        let model = PrinterModel::TM_P80;
        let paper = render_job(
            &model,
            &[
                QueuedCommand::TextAlign(Align::Center),
                black_block(576, 50),
                QueuedCommand::FeedLine(2),
                QueuedCommand::Cut(CutType::Feed),
            ],
        );

        let cut_row = 50 + 2 * 34 + CUTTER_FEED_DOTS;
        assert_eq!(paper.height(), cut_row + 1);
        assert_eq!(paper.get_pixel(0, cut_row).0, [BLACK]);
        assert_eq!(paper.get_pixel(CUT_DASH_DOTS, cut_row).0, [WHITE]);
    }

    #[test]
    fn test_wide_image_is_cropped() {
        let model = PrinterModel::TM_P20;
        let paper = render_job(
            &model,
            &[QueuedCommand::TextAlign(Align::Right), black_block(500, 4)],
        );
        assert_eq!(paper.dimensions(), (384, 4));
        assert!(paper.pixels().all(|p| p.0 == [BLACK]));
    }

    #[test]
    fn test_empty_job() {
        let paper = render_job(&PrinterModel::TM_P80, &[]);
        assert_eq!(paper.dimensions(), (576, 1));
    }
}
