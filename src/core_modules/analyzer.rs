// THEORY:
// The `PixelAnalyzer` is the base layer of the engine. It owns the decoded
// raster for the lifetime of one analysis session and provides everything the
// detector modules share: the scanning primitives, the row-major index math,
// the zeroed-mask template, and the memoized "Totals" — the named global
// statistics the detectors use as thresholds.
//
// Key architectural principles:
// 1.  **Strict scan order**: `scan_pixels` visits row-major (y outer, x inner,
//     both ascending) and `scan_mask` visits ascending pixel index, which is
//     the same order. The detectors read and write shared buffers mid-scan, so
//     this ordering is a correctness requirement, not a convention.
// 2.  **Lazy memoized totals**: totals live in an `Option` and are computed on
//     the first read. Every mutator that changes what they were computed from
//     (`load`, a total-pixel-count change) clears them; nothing recomputes
//     behind the caller's back.
// 3.  **Bounds before indexes**: all coordinate math is checked against width
//     and height before conversion to a flat index, so a flat index outside
//     `0..total_pixels` is a programming error, never a data condition.

use std::collections::HashMap;

use log::debug;

use crate::core_modules::error::AnalyzerError;
use crate::core_modules::pixel::Pixel;
use crate::core_modules::raster::RasterSource;

/// Row-major flat position of a pixel: `y * width + x`.
pub type PixelIndex = usize;
/// One entry per pixel. Flag masks hold 0/1; label masks hold 0 or an object id.
pub type Mask = Vec<u32>;
/// Name-keyed global statistics for the current image state.
pub type Totals = HashMap<String, Statistic>;

/// Mean local intensity delta across the image; the edge threshold base.
pub const TOTAL_AVERAGE_DELTA: &str = "AverageDelta";
/// Label id of the largest detected object.
pub const TOTAL_LARGEST_OBJECT: &str = "LargestObject";
/// Pixel count of the largest detected object.
pub const TOTAL_LARGEST_OBJECT_SIZE: &str = "LargestObjectSize";

/// A named global statistic: its value plus population variance and
/// standard deviation where the computation produces them (zero otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistic {
    pub value: f64,
    pub variance: f64,
    pub standard_deviation: f64,
}

impl Statistic {
    /// A statistic that is a plain value with no spread.
    pub fn scalar(value: f64) -> Self {
        Statistic {
            value,
            variance: 0.0,
            standard_deviation: 0.0,
        }
    }
}

/// Owns the raster image and the shared scanning/statistics infrastructure.
pub struct PixelAnalyzer {
    source: Box<dyn RasterSource>,
    width: u32,
    height: u32,
    total_pixels: usize,
    zeroed_mask: Mask,
    totals: Option<Totals>,
}

impl std::fmt::Debug for PixelAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelAnalyzer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("total_pixels", &self.total_pixels)
            .field("zeroed_mask", &self.zeroed_mask)
            .field("totals", &self.totals)
            .finish_non_exhaustive()
    }
}

impl PixelAnalyzer {
    pub fn new(source: Box<dyn RasterSource>) -> Result<Self, AnalyzerError> {
        let (width, height, total_pixels) = validated_dimensions(source.as_ref())?;
        Ok(Self {
            source,
            width,
            height,
            total_pixels,
            zeroed_mask: vec![0; total_pixels],
            totals: None,
        })
    }

    /// Replace the raster image and reset every derived structure this layer
    /// owns. Detector caches are invalidated by their owners via
    /// `total_pixels` comparison or an explicit reset.
    pub fn load(&mut self, source: Box<dyn RasterSource>) -> Result<(), AnalyzerError> {
        let (width, height, total_pixels) = validated_dimensions(source.as_ref())?;
        self.source = source;
        self.width = width;
        self.height = height;
        self.total_pixels = total_pixels;
        self.zeroed_mask = vec![0; total_pixels];
        self.totals = None;
        debug!("analyzer loaded {width}x{height} raster ({total_pixels} pixels)");
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn total_pixels(&self) -> usize {
        self.total_pixels
    }

    /// An all-zero mask sized for the current image, cloned per use.
    pub fn zeroed_mask(&self) -> &Mask {
        &self.zeroed_mask
    }

    pub fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        self.source.pixel_at(x, y)
    }

    /// Truncated channel-average intensity, widened for statistics math.
    pub fn intensity_at(&self, x: u32, y: u32) -> f64 {
        self.source.pixel_at(x, y).intensity() as f64
    }

    /// Visit every pixel coordinate in strict row-major order.
    pub fn scan_pixels(&self, mut visit: impl FnMut(u32, u32)) {
        for y in 0..self.height {
            for x in 0..self.width {
                visit(x, y);
            }
        }
    }

    /// Visit every pixel index in ascending order, with its coordinates.
    pub fn scan_mask(&self, mut visit: impl FnMut(u32, u32, PixelIndex)) {
        for index in 0..self.total_pixels {
            visit(self.index_x(index), self.index_y(index), index);
        }
    }

    pub fn coords_to_index(&self, x: u32, y: u32) -> PixelIndex {
        (y * self.width + x) as PixelIndex
    }

    pub fn index_x(&self, index: PixelIndex) -> u32 {
        (index % self.width as usize) as u32
    }

    pub fn index_y(&self, index: PixelIndex) -> u32 {
        (index / self.width as usize) as u32
    }

    /// The totals for the current image state, computing them on first read.
    pub fn get_totals(&mut self) -> &Totals {
        if self.totals.is_none() {
            let totals = self.calculate_totals();
            self.totals = Some(totals);
        }
        self.totals.as_ref().unwrap()
    }

    /// Look up one named total, computing the base totals if needed.
    pub fn get_total(&mut self, key: &str) -> Result<Statistic, AnalyzerError> {
        self.get_totals()
            .get(key)
            .copied()
            .ok_or_else(|| AnalyzerError::StatisticNotFound(key.to_string()))
    }

    /// Record a derived total (e.g. the object detector's largest-object
    /// figures), overwriting any previous value for the key. The base totals
    /// are materialized first so the map is never partially populated.
    pub fn insert_total(&mut self, key: &str, statistic: Statistic) {
        self.get_totals();
        if let Some(totals) = self.totals.as_mut() {
            totals.insert(key.to_string(), statistic);
        }
    }

    /// Drop the memoized totals; the next read recomputes from the raster.
    pub fn reset_totals(&mut self) {
        self.totals = None;
    }

    fn calculate_totals(&self) -> Totals {
        let mut local_average_deltas: Vec<f64> = Vec::new();
        let mut global_average_delta = 0.0_f64;

        self.scan_pixels(|x, y| {
            let intensity = self.intensity_at(x, y);
            let neighbors = [
                (x > 0).then(|| self.intensity_at(x - 1, y)),
                (x + 1 < self.width).then(|| self.intensity_at(x + 1, y)),
                (y > 0).then(|| self.intensity_at(x, y - 1)),
                (y + 1 < self.height).then(|| self.intensity_at(x, y + 1)),
            ];

            let mut local_average_delta = 0.0_f64;
            let mut local_delta_count = 0u32;
            for adjacent_intensity in neighbors.into_iter().flatten() {
                local_average_delta += (intensity - adjacent_intensity).abs();
                local_delta_count += 1;
            }

            if local_delta_count > 0 {
                let local_average_delta = local_average_delta / local_delta_count as f64;
                global_average_delta += local_average_delta;
                local_average_deltas.push(local_average_delta);
            }
        });

        let average_delta = calculate_average_deltas(&local_average_deltas, global_average_delta);
        debug!(
            "totals recomputed: {} = {:.3} (sd {:.3})",
            TOTAL_AVERAGE_DELTA, average_delta.value, average_delta.standard_deviation
        );

        let mut totals = Totals::new();
        totals.insert(TOTAL_AVERAGE_DELTA.to_string(), average_delta);
        totals
    }
}

fn validated_dimensions(
    source: &dyn RasterSource,
) -> Result<(u32, u32, usize), AnalyzerError> {
    let width = source.width();
    let height = source.height();
    let total_pixels = (width as usize)
        .checked_mul(height as usize)
        .filter(|_| width > 0 && height > 0)
        .ok_or(AnalyzerError::InvalidDimensions { width, height })?;
    Ok((width, height, total_pixels))
}

/// Population mean, variance and standard deviation of the per-pixel local
/// average deltas. An empty sample (a 1x1 image) yields the zero statistic.
fn calculate_average_deltas(local_averages: &[f64], global_average: f64) -> Statistic {
    let mut average_delta = Statistic::default();

    if !local_averages.is_empty() {
        let count = local_averages.len() as f64;
        average_delta.value = global_average / count;

        let mut sum = 0.0_f64;
        for local_average in local_averages {
            sum += (local_average - average_delta.value).powi(2);
        }
        average_delta.variance = sum / count;
        average_delta.standard_deviation = average_delta.variance.sqrt();
    }

    average_delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::test_utils::TestRaster;

    fn analyzer_for(raster: TestRaster) -> PixelAnalyzer {
        PixelAnalyzer::new(Box::new(raster)).expect("valid test raster")
    }

    #[test]
    fn dimensions_and_index_math() {
        let analyzer = analyzer_for(TestRaster::gray(&[&[0, 0, 0], &[0, 0, 0]]));
        assert_eq!(analyzer.width(), 3);
        assert_eq!(analyzer.height(), 2);
        assert_eq!(analyzer.total_pixels(), 6);
        assert_eq!(analyzer.coords_to_index(2, 1), 5);
        assert_eq!(analyzer.index_x(5), 2);
        assert_eq!(analyzer.index_y(5), 1);
        assert_eq!(analyzer.zeroed_mask().len(), 6);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let empty_row: &[u8] = &[];
        let raster = TestRaster::gray(&[empty_row]);
        let error = PixelAnalyzer::new(Box::new(raster)).unwrap_err();
        assert_eq!(
            error,
            AnalyzerError::InvalidDimensions {
                width: 0,
                height: 1
            }
        );
    }

    #[test]
    fn scan_pixels_is_row_major() {
        let analyzer = analyzer_for(TestRaster::gray(&[&[0, 0], &[0, 0]]));
        let mut visited = Vec::new();
        analyzer.scan_pixels(|x, y| visited.push((x, y)));
        assert_eq!(visited, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn scan_mask_matches_scan_pixels() {
        let analyzer = analyzer_for(TestRaster::gray(&[&[0, 0], &[0, 0]]));
        let mut by_pixel = Vec::new();
        let mut by_index = Vec::new();
        analyzer.scan_pixels(|x, y| by_pixel.push((x, y)));
        analyzer.scan_mask(|x, y, index| {
            assert_eq!(index, by_index.len());
            by_index.push((x, y));
        });
        assert_eq!(by_pixel, by_index);
    }

    #[test]
    fn average_delta_over_step_image() {
        // Intensities 0,0,255,255. Local averages: 0, 127.5, 127.5, 0.
        // Mean 63.75; every sample is 63.75 away, so variance = 63.75^2.
        let mut analyzer = analyzer_for(TestRaster::gray(&[&[0, 0, 255, 255]]));
        let average_delta = analyzer.get_total(TOTAL_AVERAGE_DELTA).unwrap();
        assert_eq!(average_delta.value, 63.75);
        assert_eq!(average_delta.variance, 63.75 * 63.75);
        assert_eq!(average_delta.standard_deviation, 63.75);
    }

    #[test]
    fn uniform_image_has_zero_delta() {
        let mut analyzer = analyzer_for(TestRaster::gray(&[&[9, 9, 9], &[9, 9, 9]]));
        let average_delta = analyzer.get_total(TOTAL_AVERAGE_DELTA).unwrap();
        assert_eq!(average_delta, Statistic::default());
    }

    #[test]
    fn single_pixel_image_yields_zero_statistic() {
        // No in-bounds neighbor anywhere, so no pixel contributes a sample.
        let mut analyzer = analyzer_for(TestRaster::gray(&[&[200]]));
        let average_delta = analyzer.get_total(TOTAL_AVERAGE_DELTA).unwrap();
        assert_eq!(average_delta, Statistic::default());
    }

    #[test]
    fn unknown_total_is_an_error() {
        let mut analyzer = analyzer_for(TestRaster::gray(&[&[1, 2]]));
        let error = analyzer.get_total("DoesNotExist").unwrap_err();
        assert_eq!(
            error,
            AnalyzerError::StatisticNotFound("DoesNotExist".to_string())
        );
    }

    #[test]
    fn totals_are_memoized_and_reset_by_load() {
        let mut analyzer = analyzer_for(TestRaster::gray(&[&[0, 255]]));
        let first = analyzer.get_total(TOTAL_AVERAGE_DELTA).unwrap();
        let second = analyzer.get_total(TOTAL_AVERAGE_DELTA).unwrap();
        assert_eq!(first, second);

        analyzer
            .load(Box::new(TestRaster::gray(&[&[7, 7]])))
            .unwrap();
        let reloaded = analyzer.get_total(TOTAL_AVERAGE_DELTA).unwrap();
        assert_eq!(reloaded, Statistic::default());
    }

    #[test]
    fn insert_total_overwrites() {
        let mut analyzer = analyzer_for(TestRaster::gray(&[&[0, 255]]));
        analyzer.insert_total(TOTAL_LARGEST_OBJECT, Statistic::scalar(2.0));
        analyzer.insert_total(TOTAL_LARGEST_OBJECT, Statistic::scalar(5.0));
        let total = analyzer.get_total(TOTAL_LARGEST_OBJECT).unwrap();
        assert_eq!(total.value, 5.0);
        // The base total is still present alongside the inserted one.
        assert!(analyzer.get_total(TOTAL_AVERAGE_DELTA).is_ok());
    }
}
