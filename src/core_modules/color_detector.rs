// THEORY:
// The `ColorDetector` is the simplest component in the engine: one row-major
// pass grouping every pixel index under its exact color. No thresholds, no
// neighborhoods, no dependence on the totals — only the scan order matters,
// because each color's index list must come out ascending.
//
// Invalidation is wholesale: a new image discards the histogram and the next
// read rescans from scratch. There is no incremental update path.

use std::collections::HashMap;

use log::debug;

use crate::core_modules::analyzer::{PixelAnalyzer, PixelIndex};
use crate::core_modules::pixel::Pixel;

/// Exact color to the ascending pixel indices holding it.
pub type ColorHistogram = HashMap<Pixel, Vec<PixelIndex>>;

/// Builds and caches the exact-color histogram for the current raster.
#[derive(Default)]
pub struct ColorDetector {
    colors: Option<ColorHistogram>,
}

impl ColorDetector {
    pub fn new() -> Self {
        Self { colors: None }
    }

    /// The histogram for the current raster, computing it on first access.
    pub fn get_colors(&mut self, analyzer: &PixelAnalyzer) -> &ColorHistogram {
        if self.colors.is_none() {
            self.detect_colors(analyzer);
        }
        self.colors.as_ref().unwrap()
    }

    /// Drop the histogram, e.g. after the analyzer loads a new raster.
    pub fn reset(&mut self) {
        self.colors = None;
    }

    fn detect_colors(&mut self, analyzer: &PixelAnalyzer) {
        let mut colors = ColorHistogram::new();

        analyzer.scan_pixels(|x, y| {
            let index = analyzer.coords_to_index(x, y);
            let current_color = analyzer.pixel_at(x, y);
            colors.entry(current_color).or_default().push(index);
        });

        debug!("color histogram recomputed: {} distinct colors", colors.len());
        self.colors = Some(colors);
    }
}
