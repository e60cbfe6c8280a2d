// THEORY:
// The `Pixel` module is the most fundamental unit of the analysis engine. It is
// a "dumb" data container for a single RGBA pixel plus the one single-pixel
// heuristic the rest of the engine is built on: intensity. Anything that needs
// a second pixel (deltas, thresholds, neighborhoods) belongs in the analyzer
// and detector modules.
//
// Key architectural principles:
// 1.  **Exact-equality color value**: `Pixel` derives `Eq` and `Hash` so it can
//     key the exact-color histogram. Two pixels are the same color only when
//     all four channels match byte-for-byte.
// 2.  **Truncating intensity**: intensity is `(r + g + b) / 3` with integer
//     division. The truncation is part of the engine's observable behavior —
//     every threshold downstream is computed from these truncated values.
// 3.  **Alpha carried, not analyzed**: the alpha channel participates in color
//     equality but never in intensity.

pub type Byte = u8;
pub type Channel = Byte;
/// Per-pixel derived scalar in 0..=255.
pub type Intensity = u32;

const CHANNELS: usize = 4;

/// A "dumb" data container representing a single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    /// The red channel value (0-255).
    pub red: Channel,
    /// The green channel value (0-255).
    pub green: Channel,
    /// The blue channel value (0-255).
    pub blue: Channel,
    /// The alpha (transparency) channel value (0-255).
    pub alpha: Channel,
}

impl Pixel {
    pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Average of the three color channels with truncating integer division.
    pub fn intensity(&self) -> Intensity {
        (self.red as Intensity + self.green as Intensity + self.blue as Intensity) / 3
    }
}

impl From<&[Byte]> for Pixel {
    fn from(bytes: &[Byte]) -> Self {
        if bytes.len() != CHANNELS {
            panic!("Cannot convert {} bytes into pixel.", bytes.len());
        }
        Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

impl From<Pixel> for Vec<Byte> {
    fn from(pixel: Pixel) -> Self {
        vec![pixel.red, pixel.green, pixel.blue, pixel.alpha]
    }
}
