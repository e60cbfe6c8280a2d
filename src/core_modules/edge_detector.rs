// THEORY:
// The `EdgeDetector` turns the analyzer's global delta statistic into two
// binary masks. The edge mask marks every pixel whose intensity differs from
// some neighbor by more than a threshold derived from the image's own
// statistics; the outline mask then thins edge regions down to their border
// pixels. Sensitivity is a single integer knob, `deviations`: how many
// standard deviations above the mean local delta a jump must be to count.
//
// Key architectural principles:
// 1.  **Self-calibrating threshold**: `floor(mean + sd * deviations)` adapts
//     to each image; a noisy image raises its own bar. A neighbor delta must
//     strictly exceed the threshold, and the first hit flags the pixel (the
//     remaining neighbors are never examined).
// 2.  **Fixed neighbor order**: left, right, up, down, then the four
//     diagonals. Out-of-bounds neighbors are skipped, not treated as zero.
// 3.  **In-place outline pass**: the outline scan rewrites the mask it is
//     reading. An edge pixel survives only if one of its orthogonal
//     neighbors currently reads 0 (out-of-bounds counts as 0). Because the
//     pass is row-major over a single buffer, up/left neighbors reflect
//     already-thinned state while right/down still hold pre-pass values.
//     That asymmetry is part of the observable output; resist the temptation
//     to split into read and write buffers.
// 4.  **Lazy masks, explicit invalidation**: both masks are computed on first
//     access and cleared whenever `deviations` or the pixel count changes.

use log::debug;

use crate::core_modules::analyzer::{Mask, PixelAnalyzer, TOTAL_AVERAGE_DELTA};
use crate::core_modules::error::AnalyzerError;

/// Derives edge and outline masks from the raster owned by a `PixelAnalyzer`.
pub struct EdgeDetector {
    deviations: i32,
    edge_mask: Option<Mask>,
    outline_mask: Option<Mask>,
}

impl EdgeDetector {
    pub fn new(deviations: i32) -> Self {
        Self {
            deviations,
            edge_mask: None,
            outline_mask: None,
        }
    }

    pub fn deviations(&self) -> i32 {
        self.deviations
    }

    /// Change the sensitivity; both masks are dropped and recomputed lazily.
    pub fn set_deviations(&mut self, deviations: i32) {
        self.deviations = deviations;
        self.edge_mask = None;
        self.outline_mask = None;
    }

    /// Drop both masks, e.g. after the analyzer loads a new raster.
    pub fn reset(&mut self) {
        self.edge_mask = None;
        self.outline_mask = None;
    }

    /// The binary edge mask, computing it on first access.
    pub fn get_edge_mask(
        &mut self,
        analyzer: &mut PixelAnalyzer,
    ) -> Result<&Mask, AnalyzerError> {
        if self.edge_mask.is_none() {
            self.detect_edges(analyzer)?;
        }
        Ok(self.edge_mask.as_ref().unwrap())
    }

    /// The binary outline mask, computing the edge mask first if needed.
    pub fn get_outline_mask(
        &mut self,
        analyzer: &mut PixelAnalyzer,
    ) -> Result<&Mask, AnalyzerError> {
        if self.outline_mask.is_none() {
            if self.edge_mask.is_none() {
                self.detect_edges(analyzer)?;
            }
            self.detect_outline(analyzer);
        }
        Ok(self.outline_mask.as_ref().unwrap())
    }

    /// Inject an edge mask directly, bypassing detection. Clears the outline
    /// mask, which is derived from it.
    pub fn set_edge_mask(&mut self, edge_mask: Option<Mask>) {
        self.edge_mask = edge_mask;
        self.outline_mask = None;
    }

    fn detect_edges(&mut self, analyzer: &mut PixelAnalyzer) -> Result<(), AnalyzerError> {
        let average_delta = analyzer.get_total(TOTAL_AVERAGE_DELTA)?;
        let threshold =
            (average_delta.value + average_delta.standard_deviation * self.deviations as f64)
                .floor();

        let raster: &PixelAnalyzer = analyzer;
        let width = raster.width();
        let height = raster.height();
        let mut edge_mask: Mask = Vec::with_capacity(raster.total_pixels());

        raster.scan_pixels(|x, y| {
            let intensity = raster.intensity_at(x, y);
            let neighbors = [
                (x > 0).then(|| raster.intensity_at(x - 1, y)),
                (x + 1 < width).then(|| raster.intensity_at(x + 1, y)),
                (y > 0).then(|| raster.intensity_at(x, y - 1)),
                (y + 1 < height).then(|| raster.intensity_at(x, y + 1)),
                (x > 0 && y > 0).then(|| raster.intensity_at(x - 1, y - 1)),
                (x + 1 < width && y > 0).then(|| raster.intensity_at(x + 1, y - 1)),
                (x > 0 && y + 1 < height).then(|| raster.intensity_at(x - 1, y + 1)),
                (x + 1 < width && y + 1 < height).then(|| raster.intensity_at(x + 1, y + 1)),
            ];

            for adjacent_intensity in neighbors.into_iter().flatten() {
                let delta = (intensity - adjacent_intensity).abs();
                if delta > threshold {
                    edge_mask.push(1);
                    return;
                }
            }

            edge_mask.push(0);
        });

        debug!(
            "edge mask recomputed: threshold {threshold}, {} flagged of {}",
            edge_mask.iter().filter(|&&flag| flag == 1).count(),
            edge_mask.len()
        );
        self.edge_mask = Some(edge_mask);
        Ok(())
    }

    fn detect_outline(&mut self, analyzer: &PixelAnalyzer) {
        // Single shared buffer: the scan reads neighbor flags it may already
        // have rewritten earlier in the same pass.
        let mut outline_mask = self
            .edge_mask
            .clone()
            .expect("edge mask computed before outline detection");

        let width = analyzer.width();
        let height = analyzer.height();

        analyzer.scan_mask(|x, y, index| {
            if outline_mask[index] == 1 {
                let flag = detect_outline_pixel(analyzer, &outline_mask, x, y);
                outline_mask[index] = flag;
            }
        });

        debug!(
            "outline mask recomputed for {width}x{height}: {} boundary pixels",
            outline_mask.iter().filter(|&&flag| flag == 1).count()
        );
        self.outline_mask = Some(outline_mask);
    }
}

/// A flagged pixel stays flagged only while it borders non-edge territory.
fn detect_outline_pixel(analyzer: &PixelAnalyzer, mask: &Mask, x: u32, y: u32) -> u32 {
    let adjacent_flags = [
        if x > 0 {
            mask[analyzer.coords_to_index(x - 1, y)]
        } else {
            0
        },
        if x + 1 < analyzer.width() {
            mask[analyzer.coords_to_index(x + 1, y)]
        } else {
            0
        },
        if y > 0 {
            mask[analyzer.coords_to_index(x, y - 1)]
        } else {
            0
        },
        if y + 1 < analyzer.height() {
            mask[analyzer.coords_to_index(x, y + 1)]
        } else {
            0
        },
    ];

    for flag in adjacent_flags {
        if flag == 0 {
            return 1;
        }
    }

    0
}
