//! Shared test utilities for the pixelscrub test suite.
//!
//! Builds small deterministic rasters so assertions can name exact sample
//! values without spelling out every pixel.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let gray = gradient(SampleType::U16, 7, 5);
//! let rgb = patterned_frame(SampleType::U8, 4, 4, 3, Layout::Planar, 0);
//! let clip = frame_sequence(SampleType::I16, 3, 3, 1, Layout::Interleaved, 4);
//! ```

use crate::raster::{
    FrameSequence, Layout, PixelBuffer, SampleKind, SampleType, with_sample_kind,
};

// =========================================================================
// Single frames
// =========================================================================

/// Value of sample (`x`, `y`, `band`) in frame `seed`. Stays within 0–99
/// so it fits every sample type, signed or not.
pub fn pattern_value(x: usize, y: usize, band: usize, seed: usize) -> f64 {
    ((x * 3 + y * 5 + band * 11 + seed * 7) % 100) as f64
}

/// One-band compact raster filled with [`pattern_value`] for frame 0.
pub fn gradient(sample_type: SampleType, width: usize, height: usize) -> PixelBuffer {
    patterned_frame(sample_type, width, height, 1, Layout::Interleaved, 0)
}

/// Compact raster in `layout` filled with [`pattern_value`].
pub fn patterned_frame(
    sample_type: SampleType,
    width: usize,
    height: usize,
    bands: usize,
    layout: Layout,
    seed: usize,
) -> PixelBuffer {
    let mut buffer = PixelBuffer::zeroed(width, height, bands, sample_type, layout).unwrap();
    with_sample_kind!(sample_type, K => {
        for band in 0..bands {
            let plane: Vec<_> = (0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .map(|(x, y)| K::from_f64(pattern_value(x, y, band, seed)))
                .collect();
            buffer.write_plane::<K>(band, &plane).unwrap();
        }
    });
    buffer
}

// =========================================================================
// Sequences
// =========================================================================

/// `count` patterned frames, each seeded with its index so frames differ.
pub fn frame_sequence(
    sample_type: SampleType,
    width: usize,
    height: usize,
    bands: usize,
    layout: Layout,
    count: usize,
) -> FrameSequence {
    let frames = (0..count)
        .map(|seed| patterned_frame(sample_type, width, height, bands, layout, seed))
        .collect();
    FrameSequence::new(frames).unwrap()
}
