// THEORY:
// The `pipeline` module is the top-level API for the analysis engine. It
// bundles the analyzer and the three detectors into a single owner so hosts
// get one object to hold, one `load` to call, and a flat set of accessors for
// every derived product. Data flows strictly downward — raster, then
// statistics and histogram, then edge/outline masks, then object labeling and
// ranking — and each stage caches its output until an upstream mutation
// invalidates it.
//
// The pipeline is deliberately single-threaded and synchronous: every product
// is a pure function of the raster plus the configuration, computed to
// completion on first request. A host that wants parallelism across images
// creates one pipeline per image; the components assume exclusive ownership
// of their caches.

use crate::core_modules::analyzer::{Mask, PixelAnalyzer, Statistic};
use crate::core_modules::color_detector::ColorDetector;
use crate::core_modules::edge_detector::EdgeDetector;
use crate::core_modules::error::AnalyzerError;
use crate::core_modules::object_detector::ObjectDetector;
use crate::core_modules::raster::RasterSource;

// Re-export the data structures hosts consume through the pipeline API.
pub use crate::core_modules::analyzer::{
    PixelIndex, Totals, TOTAL_AVERAGE_DELTA, TOTAL_LARGEST_OBJECT, TOTAL_LARGEST_OBJECT_SIZE,
};
pub use crate::core_modules::color_detector::ColorHistogram;
pub use crate::core_modules::object_detector::{ObjectTable, ProximityRanking};
pub use crate::core_modules::pixel::Pixel;

/// Default edge sensitivity: flag any delta above the mean local delta.
const DEFAULT_DEVIATIONS: i32 = 0;

/// The main, top-level struct for the analysis engine.
pub struct AnalysisPipeline {
    analyzer: PixelAnalyzer,
    color_detector: ColorDetector,
    edge_detector: EdgeDetector,
    object_detector: ObjectDetector,
}

impl AnalysisPipeline {
    /// Build a pipeline around one decoded raster.
    pub fn new(source: Box<dyn RasterSource>) -> Result<Self, AnalyzerError> {
        let analyzer = PixelAnalyzer::new(source)?;
        let object_detector = ObjectDetector::new(analyzer.zeroed_mask().clone());
        Ok(Self {
            analyzer,
            color_detector: ColorDetector::new(),
            edge_detector: EdgeDetector::new(DEFAULT_DEVIATIONS),
            object_detector,
        })
    }

    /// Swap in a new raster and invalidate every cached product.
    pub fn load(&mut self, source: Box<dyn RasterSource>) -> Result<(), AnalyzerError> {
        self.analyzer.load(source)?;
        self.color_detector.reset();
        self.edge_detector.reset();
        self.object_detector
            .set_pixel_flags(self.analyzer.zeroed_mask().clone());
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.analyzer.width()
    }

    pub fn height(&self) -> u32 {
        self.analyzer.height()
    }

    pub fn total_pixels(&self) -> usize {
        self.analyzer.total_pixels()
    }

    /// The exact-color histogram for the current raster.
    pub fn get_colors(&mut self) -> &ColorHistogram {
        self.color_detector.get_colors(&self.analyzer)
    }

    /// The binary edge mask at the current sensitivity.
    pub fn get_edge_mask(&mut self) -> Result<&Mask, AnalyzerError> {
        self.edge_detector.get_edge_mask(&mut self.analyzer)
    }

    /// The boundary-of-edge-region mask derived from the edge mask.
    pub fn get_outline_mask(&mut self) -> Result<&Mask, AnalyzerError> {
        self.edge_detector.get_outline_mask(&mut self.analyzer)
    }

    pub fn deviations(&self) -> i32 {
        self.edge_detector.deviations()
    }

    /// Change the edge sensitivity; both edge-derived masks recompute lazily.
    pub fn set_deviations(&mut self, deviations: i32) {
        self.edge_detector.set_deviations(deviations);
    }

    /// Label connected components in the supplied flag mask and return the
    /// label mask. The flags replace any previously supplied mask.
    pub fn get_object_mask(&mut self, pixel_flags: Mask) -> &Mask {
        self.object_detector.set_pixel_flags(pixel_flags);
        self.object_detector.get_object_mask(&mut self.analyzer)
    }

    /// The object table for the current flag mask.
    pub fn get_objects(&mut self) -> &ObjectTable {
        self.object_detector.get_objects(&mut self.analyzer)
    }

    /// Objects ranked by the engine's proximity figure, ascending.
    pub fn get_sorted_objects(&mut self) -> &ProximityRanking {
        self.object_detector.get_sorted_objects(&mut self.analyzer)
    }

    /// Look up a named global statistic for the current image state.
    pub fn get_total(&mut self, name: &str) -> Result<Statistic, AnalyzerError> {
        self.analyzer.get_total(name)
    }
}
