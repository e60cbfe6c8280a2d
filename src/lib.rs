// THEORY:
// This file is the main entry point for the `pixel_analyzer` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API exposed to external consumers (host applications that own image
// acquisition and decoding).
//
// The primary export is the `AnalysisPipeline`: one object per image that
// produces the engine's four derived products — global intensity statistics,
// edge/outline masks, labeled objects with a proximity ranking, and the
// exact-color histogram. The internal `core_modules` remain public for hosts
// that want to drive an individual component directly.

pub mod core_modules;
pub mod pipeline;

pub use core_modules::analyzer::{Mask, PixelAnalyzer, Statistic};
pub use core_modules::error::AnalyzerError;
pub use core_modules::raster::RasterSource;
pub use pipeline::AnalysisPipeline;
