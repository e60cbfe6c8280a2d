// THEORY:
// The `raster` module is the boundary between this engine and whatever
// acquired and decoded the image. The engine never touches byte streams or
// file formats; it only requires the `RasterSource` capability: a width, a
// height, and random pixel access by coordinate. Decoding is the host's job.
//
// Key architectural principles:
// 1.  **Capability, not format**: `RasterSource` is the entire contract. Any
//     decoded representation (an `image` crate buffer, a test fixture, a
//     framebuffer wrapper) can feed the engine by implementing it.
// 2.  **Immutable for the session**: the engine owns its source for the
//     lifetime of one analysis session and only ever reads from it. Swapping
//     images goes through `PixelAnalyzer::load`, which resets derived state.
// 3.  **`image` crate interop out of the box**: the buffers hosts most
//     commonly hold (`RgbaImage`, `DynamicImage`) implement the trait here so
//     a decoded file plugs straight into the pipeline.

use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::core_modules::pixel::Pixel;

/// Read-only access to one decoded raster image.
///
/// Implementations must answer `pixel_at` for every `0 <= x < width()`,
/// `0 <= y < height()`; the engine never asks outside those bounds.
pub trait RasterSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel_at(&self, x: u32, y: u32) -> Pixel;
}

impl RasterSource for RgbaImage {
    fn width(&self) -> u32 {
        RgbaImage::width(self)
    }

    fn height(&self) -> u32 {
        RgbaImage::height(self)
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let channels = self.get_pixel(x, y).0;
        Pixel::new(channels[0], channels[1], channels[2], channels[3])
    }
}

impl RasterSource for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let channels = self.get_pixel(x, y).0;
        Pixel::new(channels[0], channels[1], channels[2], channels[3])
    }
}
