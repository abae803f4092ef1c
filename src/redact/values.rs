//! Fill values for redacted regions and burned-in overlays.
//!
//! The **background** paints regions and overlay shadows, the
//! **foreground** paints overlay bits. Both are per band and lie within the
//! range of the stored bit depth.

use super::RedactionFlags;
use crate::imaging::rgb_to_ybr;
use crate::metadata::{Photometric, PixelMetadata};
use crate::raster::SampleType;

#[derive(Debug, Clone, PartialEq)]
pub struct FillValues {
    pub background: Vec<f64>,
    pub foreground: Vec<f64>,
}

/// Representable range of the stored bits.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StoredRange {
    min: f64,
    max: f64,
    bits: u32,
}

impl StoredRange {
    fn new(metadata: &PixelMetadata, sample_type: SampleType) -> Self {
        let width = sample_type.bits();
        let bits = match metadata.bits_stored {
            0 => width,
            stored => stored.min(width),
        };
        if sample_type.is_signed() {
            let half = 2f64.powi(bits as i32 - 1);
            Self {
                min: -half,
                max: half - 1.0,
                bits,
            }
        } else {
            Self {
                min: 0.0,
                max: 2f64.powi(bits as i32) - 1.0,
                bits,
            }
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        value.round().clamp(self.min, self.max)
    }
}

impl FillValues {
    /// Derive the fill values for `bands` samples of `sample_type`.
    ///
    /// The base value is, in order of preference: the explicit value, the
    /// pixel padding value, or the darkest representable value (the lightest
    /// when the image displays inverted). The foreground is the opposite
    /// extreme.
    pub fn derive(
        metadata: &PixelMetadata,
        flags: &RedactionFlags,
        sample_type: SampleType,
        bands: usize,
    ) -> Self {
        let range = StoredRange::new(metadata, sample_type);
        let inverted = metadata.is_inverted();
        let (dark, light) = if inverted {
            (range.max, range.min)
        } else {
            (range.min, range.max)
        };

        let base = if flags.use_explicit_value {
            flags.explicit_value as f64
        } else {
            match metadata.pixel_padding_value {
                Some(pad) if flags.use_pixel_padding_value => pad as f64,
                _ => dark,
            }
        };

        Self {
            background: per_band(metadata.photometric, range, bands, range.clamp(base)),
            foreground: per_band(metadata.photometric, range, bands, light),
        }
    }
}

/// Spread a gray value over the bands the photometric interpretation expects.
fn per_band(photometric: Photometric, range: StoredRange, bands: usize, gray: f64) -> Vec<f64> {
    if photometric.is_ybr() && bands == 3 {
        rgb_to_ybr(gray, gray, gray, range.bits)
            .into_iter()
            .map(|v| range.clamp(v))
            .collect()
    } else {
        vec![gray; bands]
    }
}
