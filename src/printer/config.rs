//! # Printer Models
//!
//! Hardware descriptions of the supported receipt printers, plus the SDK
//! constants needed to construct a handle for each.
//!
//! ## Supported Printers
//!
//! | Model | Paper | Width (dots) | Resolution |
//! |-------|-------|--------------|------------|
//! | TM-P20 | 58mm | 384 | 203 DPI |
//! | TM-P80 | 80mm | 576 | 203 DPI |
//! | TM-m30 | 80mm | 576 | 203 DPI |
//! | TM-T88 | 80mm | 512 | 180 DPI |
//!
//! ## Usage
//!
//! ```
//! use tmprint::printer::PrinterModel;
//!
//! let model = PrinterModel::by_name("tm-p80").unwrap();
//! println!("Print width: {} dots ({:.0} mm)", model.width_dots, model.width_mm());
//! ```

use serde::Serialize;

use crate::sdk::{ModelLang, Series};

/// # Printer Model
///
/// ## Physical Properties
///
/// - **width_dots**: Maximum printable width in dots (pixels)
/// - **dpi**: Resolution in dots per inch
/// - **line_feed_dots**: Paper advanced by one feed line
///
/// ## SDK Constants
///
/// - **series** and **lang** are passed to the SDK when the handle is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterModel {
    /// Model name
    pub name: &'static str,

    /// SDK series constant
    pub series: Series,

    /// SDK language constant
    pub lang: ModelLang,

    /// Maximum print width in dots (pixels)
    pub width_dots: u16,

    /// Resolution in dots per inch
    pub dpi: u16,

    /// Height of one feed line in dots (1/6 inch by default)
    pub line_feed_dots: u16,
}

impl PrinterModel {
    /// # TM-P20
    ///
    /// 58mm mobile printer, 48mm printable.
    pub const TM_P20: Self = Self {
        name: "TM-P20",
        series: Series::TmP20,
        lang: ModelLang::Ank,
        width_dots: 384,
        dpi: 203,
        line_feed_dots: 34,
    };

    /// # TM-P80
    ///
    /// 80mm mobile printer with auto-cutter, 72mm printable.
    ///
    /// ```text
    /// ├── 4mm ──┼────── 72mm printable ──────┼── 4mm ──┤
    /// │ margin  │         576 dots           │ margin  │
    /// ```
    pub const TM_P80: Self = Self {
        name: "TM-P80",
        series: Series::TmP80,
        lang: ModelLang::Ank,
        width_dots: 576,
        dpi: 203,
        line_feed_dots: 34,
    };

    /// # TM-m30
    ///
    /// 80mm desktop printer.
    pub const TM_M30: Self = Self {
        name: "TM-m30",
        series: Series::TmM30,
        lang: ModelLang::Ank,
        width_dots: 576,
        dpi: 203,
        line_feed_dots: 34,
    };

    /// # TM-T88
    ///
    /// 80mm desktop printer at 180 DPI.
    pub const TM_T88: Self = Self {
        name: "TM-T88",
        series: Series::TmT88,
        lang: ModelLang::Ank,
        width_dots: 512,
        dpi: 180,
        line_feed_dots: 30,
    };

    /// Every built-in model.
    pub fn list() -> &'static [PrinterModel] {
        &[Self::TM_P20, Self::TM_P80, Self::TM_M30, Self::TM_T88]
    }

    /// Look up a model by name, ignoring case and `-`/`_`.
    ///
    /// ```
    /// use tmprint::printer::PrinterModel;
    ///
    /// assert_eq!(PrinterModel::by_name("TM_M30"), Some(PrinterModel::TM_M30));
    /// assert_eq!(PrinterModel::by_name("tsp650"), None);
    /// ```
    pub fn by_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Self::list()
            .iter()
            .find(|model| normalize(model.name) == wanted)
            .copied()
    }

    /// Calculate dots per millimeter
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Calculate print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width_dots as f32 / self.dots_per_mm()
    }

    /// Convert millimeters to dots
    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u16 {
        (mm * self.dots_per_mm()).round() as u16
    }
}

impl Default for PrinterModel {
    fn default() -> Self {
        Self::TM_P80
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
