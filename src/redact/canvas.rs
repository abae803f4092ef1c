//! Painting into one frame's compact storage.

use crate::raster::{Rect, SampleKind, Strides};

/// Mutable view of one frame's samples for painting whole pixels.
pub(crate) struct FrameCanvas<'a, K: SampleKind> {
    data: &'a mut [K::Raw],
    width: usize,
    height: usize,
    strides: Strides,
}

impl<'a, K: SampleKind> FrameCanvas<'a, K> {
    /// `strides.band` addresses bands inside the single bank.
    pub(crate) fn new(
        data: &'a mut [K::Raw],
        width: usize,
        height: usize,
        strides: Strides,
    ) -> Self {
        Self {
            data,
            width,
            height,
            strides,
        }
    }

    /// Set every band of the pixel at (`x`, `y`); positions outside the
    /// frame are ignored.
    pub(crate) fn put(&mut self, x: i64, y: i64, pixel: &[K::Raw]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let s = self.strides;
        let base = s.base_offset + y as usize * s.scanline + x as usize * s.pixel;
        for (band, &value) in pixel.iter().enumerate() {
            self.data[base + band * s.band] = value;
        }
    }

    /// Fill `rect`, already clipped to the frame.
    pub(crate) fn fill(&mut self, rect: Rect, pixel: &[K::Raw]) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.put(x, y, pixel);
            }
        }
    }
}
