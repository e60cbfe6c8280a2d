pub mod analyzer;
pub mod color_detector;
pub mod edge_detector;
pub mod error;
pub mod object_detector;
pub mod pixel;
pub mod raster;

#[cfg(test)]
pub(crate) mod test_utils;
