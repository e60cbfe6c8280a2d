//! In-memory raster fixtures for the engine's unit tests.

use crate::core_modules::pixel::Pixel;
use crate::core_modules::raster::RasterSource;

/// A tiny owned raster backed by a flat pixel vector.
pub(crate) struct TestRaster {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl TestRaster {
    /// Build a grayscale raster from rows of channel values. A value `v`
    /// becomes the opaque pixel `(v, v, v, 255)`, whose intensity is exactly
    /// `v` again, which keeps expected statistics easy to compute by hand.
    pub(crate) fn gray(rows: &[&[u8]]) -> Self {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for row in rows {
            assert_eq!(row.len() as u32, width, "ragged test raster");
            for &value in *row {
                pixels.push(Pixel::new(value, value, value, 255));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A raster filled with a single color.
    pub(crate) fn solid(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; (width * height) as usize],
        }
    }
}

impl RasterSource for TestRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        self.pixels[(y * self.width + x) as usize]
    }
}
