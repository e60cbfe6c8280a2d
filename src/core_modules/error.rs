use thiserror::Error;

/// Recoverable failures surfaced by the analysis engine.
///
/// Internally computed pixel indices are bounds-checked against width and
/// height before conversion, so an out-of-range index is a contract violation
/// and panics via slice indexing rather than appearing here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// A named total was requested that the current image state never produced.
    #[error("Total for key {0} not found.")]
    StatisticNotFound(String),

    /// The source image has a zero dimension or a pixel count that cannot be
    /// represented, caught before any scan runs.
    #[error("Invalid raster dimensions {width}x{height}.")]
    InvalidDimensions { width: u32, height: u32 },
}
