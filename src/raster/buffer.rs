//! Canonical raw pixel buffers.
//!
//! A [`PixelBuffer`] is a 2D raster of `bands` samples per pixel addressed
//! through element strides (not byte strides), in the style of a Java
//! `ComponentSampleModel`:
//!
//! ```text
//! offset(x, y, b) = base_offset + y * scanline + x * pixel + b * band
//! ```
//!
//! Multi-bank (banded) buffers keep each band in its own bank and ignore the
//! band stride. Layout is inferred from the strides; combinations that are
//! neither interleaved, planar nor banded are rejected instead of guessed.

use super::error::PixelError;
use super::sample::{SampleData, SampleKind, SampleType, with_sample_kind};
use serde::{Deserialize, Serialize};

/// How the bands of a pixel are arranged in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `R G B R G B ...` in one bank.
    Interleaved,
    /// `R R R ... G G G ... B B B ...` in one bank.
    Planar,
    /// One bank per band.
    Banded,
}

/// Element strides locating a sample inside its bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strides {
    pub pixel: usize,
    pub scanline: usize,
    pub band: usize,
    pub base_offset: usize,
}

impl Strides {
    pub fn interleaved(width: usize, bands: usize) -> Self {
        Self {
            pixel: bands,
            scanline: width * bands,
            band: 1,
            base_offset: 0,
        }
    }

    pub fn planar(width: usize, height: usize) -> Self {
        Self {
            pixel: 1,
            scanline: width,
            band: width * height,
            base_offset: 0,
        }
    }

    pub fn banded(width: usize) -> Self {
        Self {
            pixel: 1,
            scanline: width,
            band: 0,
            base_offset: 0,
        }
    }

    /// Tightly packed strides for `layout`.
    pub fn compact(layout: Layout, width: usize, height: usize, bands: usize) -> Self {
        match layout {
            Layout::Interleaved => Self::interleaved(width, bands),
            Layout::Planar => Self::planar(width, height),
            Layout::Banded => Self::banded(width),
        }
    }
}

/// Axis-aligned rectangle in image-relative pixel coordinates.
///
/// Coordinates are signed so selections and regions may hang over the image
/// edge; [`Rect::clip`] produces the in-image part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole extent of a `width` x `height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// Intersection with `[0, width) x [0, height)`, or `None` when nothing
    /// of the rectangle lies inside the image.
    pub fn clip(&self, width: usize, height: usize) -> Option<Rect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i64);
        let y1 = self.bottom().min(height as i64);
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A decoded raster with its storage description.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    bands: usize,
    sample_type: SampleType,
    strides: Strides,
    banks: Vec<SampleData>,
}

impl PixelBuffer {
    /// Build a buffer over existing storage, validating that every addressed
    /// sample lies inside its bank.
    pub fn new(
        width: usize,
        height: usize,
        bands: usize,
        sample_type: SampleType,
        strides: Strides,
        banks: Vec<SampleData>,
    ) -> Result<Self, PixelError> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(PixelError::InvalidGeometry(format!(
                "degenerate buffer {width}x{height} with {bands} bands"
            )));
        }
        if banks.is_empty() {
            return Err(PixelError::InternalInconsistency(
                "buffer has no storage banks".into(),
            ));
        }
        if banks.len() != 1 && banks.len() != bands {
            return Err(PixelError::InternalInconsistency(format!(
                "{} banks cannot hold {bands} bands",
                banks.len()
            )));
        }
        if banks.iter().any(|bank| !bank.matches(sample_type)) {
            return Err(PixelError::InternalInconsistency(format!(
                "storage does not match sample type {sample_type}"
            )));
        }

        let band_span = if banks.len() == 1 {
            (bands - 1).checked_mul(strides.band)
        } else {
            Some(0)
        };
        let last = (height - 1)
            .checked_mul(strides.scanline)
            .zip((width - 1).checked_mul(strides.pixel))
            .zip(band_span)
            .and_then(|((rows, cols), span)| {
                strides
                    .base_offset
                    .checked_add(rows)?
                    .checked_add(cols)?
                    .checked_add(span)
            })
            .ok_or_else(|| PixelError::InvalidGeometry("stride arithmetic overflows".into()))?;

        if let Some(bank) = banks.iter().find(|bank| last >= bank.len()) {
            return Err(PixelError::InvalidGeometry(format!(
                "last sample at offset {last} but bank holds {} samples",
                bank.len()
            )));
        }

        Ok(Self {
            width,
            height,
            bands,
            sample_type,
            strides,
            banks,
        })
    }

    pub fn interleaved(
        width: usize,
        height: usize,
        bands: usize,
        sample_type: SampleType,
        data: SampleData,
    ) -> Result<Self, PixelError> {
        Self::new(
            width,
            height,
            bands,
            sample_type,
            Strides::interleaved(width, bands),
            vec![data],
        )
    }

    pub fn planar(
        width: usize,
        height: usize,
        bands: usize,
        sample_type: SampleType,
        data: SampleData,
    ) -> Result<Self, PixelError> {
        Self::new(
            width,
            height,
            bands,
            sample_type,
            Strides::planar(width, height),
            vec![data],
        )
    }

    pub fn banded(
        width: usize,
        height: usize,
        sample_type: SampleType,
        banks: Vec<SampleData>,
    ) -> Result<Self, PixelError> {
        let bands = banks.len();
        Self::new(
            width,
            height,
            bands,
            sample_type,
            Strides::banded(width),
            banks,
        )
    }

    /// A zero-filled, tightly packed buffer.
    pub fn zeroed(
        width: usize,
        height: usize,
        bands: usize,
        sample_type: SampleType,
        layout: Layout,
    ) -> Result<Self, PixelError> {
        let plane = width * height;
        let banks = match layout {
            Layout::Banded => (0..bands)
                .map(|_| SampleData::zeroed(sample_type, plane))
                .collect(),
            _ => vec![SampleData::zeroed(sample_type, plane * bands)],
        };
        Self::new(
            width,
            height,
            bands,
            sample_type,
            Strides::compact(layout, width, height, bands),
            banks,
        )
    }

    /// Single-band buffer from a row-major plane of raw words.
    pub fn from_plane<K: SampleKind>(
        width: usize,
        height: usize,
        plane: Vec<K::Raw>,
    ) -> Result<Self, PixelError> {
        Self::interleaved(width, height, 1, K::TYPE, K::wrap(plane))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn strides(&self) -> Strides {
        self.strides
    }

    pub fn banks(&self) -> &[SampleData] {
        &self.banks
    }

    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    pub(crate) fn bank_mut(&mut self, bank: usize) -> Option<&mut SampleData> {
        self.banks.get_mut(bank)
    }

    pub fn into_banks(self) -> Vec<SampleData> {
        self.banks
    }

    /// Size in bytes of the tightly packed samples.
    pub fn byte_len(&self) -> usize {
        self.width * self.height * self.bands * self.sample_type.bytes_per_sample()
    }

    pub fn same_geometry(&self, other: &PixelBuffer) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.bands == other.bands
            && self.sample_type == other.sample_type
    }

    /// Same storage, integer words reinterpreted as signed or unsigned.
    pub fn with_signedness(mut self, signed: bool) -> Self {
        self.sample_type = self.sample_type.with_signedness(signed);
        self
    }

    /// Infer the layout from the strides.
    pub fn layout(&self) -> Result<Layout, PixelError> {
        let s = self.strides;
        let regular = if self.banks.len() > 1 {
            (s.pixel == 1 && s.scanline >= self.width).then_some(Layout::Banded)
        } else if self.bands == 1 {
            (s.pixel >= 1 && s.scanline >= self.width * s.pixel).then_some(Layout::Interleaved)
        } else if s.band == 1 && s.pixel == self.bands && s.scanline >= self.width * self.bands {
            Some(Layout::Interleaved)
        } else if s.pixel == 1 && s.scanline >= self.width && s.band >= s.scanline * self.height {
            Some(Layout::Planar)
        } else {
            None
        };
        regular.ok_or_else(|| {
            PixelError::UnsupportedFormat(format!(
                "irregular strides {s:?} for {} bands",
                self.bands
            ))
        })
    }

    /// Bank index and element offset of a sample. Caller guarantees bounds.
    #[inline]
    pub(crate) fn locate(&self, x: usize, y: usize, band: usize) -> (usize, usize) {
        let s = self.strides;
        let (bank, band_offset) = if self.banks.len() > 1 {
            (band, 0)
        } else {
            (0, band * s.band)
        };
        (
            bank,
            s.base_offset + y * s.scanline + x * s.pixel + band_offset,
        )
    }

    fn check_bounds(&self, x: usize, y: usize, band: usize) -> Result<(), PixelError> {
        if x >= self.width || y >= self.height || band >= self.bands {
            return Err(PixelError::InvalidGeometry(format!(
                "sample ({x}, {y}, band {band}) outside {}x{}x{}",
                self.width, self.height, self.bands
            )));
        }
        Ok(())
    }

    /// Read one sample as a number, honouring the sample type's signedness.
    pub fn sample(&self, x: usize, y: usize, band: usize) -> Option<f64> {
        self.check_bounds(x, y, band).ok()?;
        let (bank, offset) = self.locate(x, y, band);
        with_sample_kind!(self.sample_type, K => {
            K::slice(&self.banks[bank]).map(|s| K::to_f64(s[offset]))
        })
    }

    /// Write one sample, rounding and clamping into the representable range.
    pub fn set_sample(
        &mut self,
        x: usize,
        y: usize,
        band: usize,
        value: f64,
    ) -> Result<(), PixelError> {
        self.check_bounds(x, y, band)?;
        let (bank, offset) = self.locate(x, y, band);
        with_sample_kind!(self.sample_type, K => {
            let slice = K::slice_mut(&mut self.banks[bank]).ok_or_else(storage_mismatch)?;
            slice[offset] = K::from_f64(value);
        });
        Ok(())
    }

    /// Gather one band into a row-major `width * height` vector.
    pub fn plane<K: SampleKind>(&self, band: usize) -> Result<Vec<K::Raw>, PixelError> {
        self.check_bounds(0, 0, band)?;
        let (bank, _) = self.locate(0, 0, band);
        let src = K::slice(&self.banks[bank]).ok_or_else(storage_mismatch)?;
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(src[self.locate(x, y, band).1]);
            }
        }
        Ok(out)
    }

    /// Scatter a row-major plane into one band.
    pub fn write_plane<K: SampleKind>(
        &mut self,
        band: usize,
        plane: &[K::Raw],
    ) -> Result<(), PixelError> {
        self.check_bounds(0, 0, band)?;
        if plane.len() != self.width * self.height {
            return Err(PixelError::InternalInconsistency(format!(
                "plane of {} samples does not fit {}x{}",
                plane.len(),
                self.width,
                self.height
            )));
        }
        let (bank, _) = self.locate(0, 0, band);
        let offsets: Vec<usize> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.locate(x, y, band).1)
            .collect();
        let dest = K::slice_mut(&mut self.banks[bank]).ok_or_else(storage_mismatch)?;
        for (offset, &value) in offsets.into_iter().zip(plane) {
            dest[offset] = value;
        }
        Ok(())
    }

    /// Copy into a new tightly packed buffer with the given layout.
    pub fn repack(&self, layout: Layout) -> Result<PixelBuffer, PixelError> {
        let mut out = PixelBuffer::zeroed(
            self.width,
            self.height,
            self.bands,
            self.sample_type,
            layout,
        )?;
        with_sample_kind!(self.sample_type, K => {
            for band in 0..self.bands {
                let plane = self.plane::<K>(band)?;
                out.write_plane::<K>(band, &plane)?;
            }
        });
        Ok(out)
    }
}

fn storage_mismatch() -> PixelError {
    PixelError::InternalInconsistency("bank storage does not match sample type".into())
}

/// Ordered frames sharing geometry and sample type.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    frames: Vec<PixelBuffer>,
}

impl FrameSequence {
    pub fn new(frames: Vec<PixelBuffer>) -> Result<Self, PixelError> {
        let first = frames
            .first()
            .ok_or_else(|| PixelError::InvalidGeometry("frame sequence is empty".into()))?;
        if let Some(index) = frames.iter().position(|f| !f.same_geometry(first)) {
            return Err(PixelError::InternalInconsistency(format!(
                "frame {index} differs in geometry or sample type from frame 0"
            )));
        }
        Ok(Self { frames })
    }

    pub fn single(frame: PixelBuffer) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    pub fn frames(&self) -> &[PixelBuffer] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<PixelBuffer> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> &PixelBuffer {
        &self.frames[0]
    }

    /// Packed size of one frame in bytes.
    pub fn frame_byte_size(&self) -> usize {
        self.first().byte_len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.frames.len() as u64 * self.frame_byte_size() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::sample::U8Kind;

    // =========================================================================
    // Construction and bounds
    // =========================================================================

    #[test]
    fn rejects_storage_shorter_than_strides() {
        let data = SampleData::Bytes(vec![0; 15]);
        let err = PixelBuffer::interleaved(4, 4, 1, SampleType::U8, data).unwrap_err();
        assert!(matches!(err, PixelError::InvalidGeometry(_)));
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        let data = SampleData::Bytes(vec![]);
        let err = PixelBuffer::interleaved(0, 4, 1, SampleType::U8, data).unwrap_err();
        assert!(matches!(err, PixelError::InvalidGeometry(_)));
    }

    #[test]
    fn rejects_storage_of_wrong_width() {
        let data = SampleData::Bytes(vec![0; 4]);
        let err = PixelBuffer::interleaved(2, 2, 1, SampleType::U16, data).unwrap_err();
        assert!(matches!(err, PixelError::InternalInconsistency(_)));
    }

    #[test]
    fn base_offset_counts_toward_bounds() {
        let strides = Strides {
            base_offset: 2,
            ..Strides::interleaved(2, 1)
        };
        let short = vec![SampleData::Bytes(vec![0; 5])];
        assert!(PixelBuffer::new(2, 2, 1, SampleType::U8, strides, short).is_err());

        let exact = vec![SampleData::Bytes(vec![0, 0, 1, 2, 3, 4])];
        let buf = PixelBuffer::new(2, 2, 1, SampleType::U8, strides, exact).unwrap();
        assert_eq!(buf.sample(0, 0, 0), Some(1.0));
        assert_eq!(buf.sample(1, 1, 0), Some(4.0));
    }

    // =========================================================================
    // Layout inference
    // =========================================================================

    #[test]
    fn infers_interleaved_planar_and_banded() {
        let inter = PixelBuffer::zeroed(3, 2, 3, SampleType::U8, Layout::Interleaved).unwrap();
        assert_eq!(inter.layout().unwrap(), Layout::Interleaved);

        let planar = PixelBuffer::zeroed(3, 2, 3, SampleType::U8, Layout::Planar).unwrap();
        assert_eq!(planar.layout().unwrap(), Layout::Planar);

        let banded = PixelBuffer::zeroed(3, 2, 3, SampleType::U16, Layout::Banded).unwrap();
        assert_eq!(banded.layout().unwrap(), Layout::Banded);
        assert_eq!(banded.bank_count(), 3);
    }

    #[test]
    fn irregular_strides_are_unsupported() {
        let strides = Strides {
            pixel: 2,
            scanline: 8,
            band: 3,
            base_offset: 0,
        };
        let buf = PixelBuffer::new(
            3,
            2,
            2,
            SampleType::U8,
            strides,
            vec![SampleData::Bytes(vec![0; 32])],
        )
        .unwrap();
        assert!(buf.layout().unwrap_err().is_unsupported());
    }

    // =========================================================================
    // Sample access and repacking
    // =========================================================================

    #[test]
    fn signed_words_read_back_negative() {
        let data = SampleData::Words(vec![0xFFFF, 5]);
        let buf = PixelBuffer::interleaved(2, 1, 1, SampleType::I16, data).unwrap();
        assert_eq!(buf.sample(0, 0, 0), Some(-1.0));
        assert_eq!(buf.sample(1, 0, 0), Some(5.0));
        assert_eq!(buf.sample(2, 0, 0), None);
    }

    #[test]
    fn set_sample_clamps_into_range() {
        let mut buf = PixelBuffer::zeroed(1, 1, 1, SampleType::U8, Layout::Interleaved).unwrap();
        buf.set_sample(0, 0, 0, 400.0).unwrap();
        assert_eq!(buf.sample(0, 0, 0), Some(255.0));
        assert!(buf.set_sample(1, 0, 0, 1.0).is_err());
    }

    #[test]
    fn repack_interleaved_to_planar() {
        let buf = PixelBuffer::interleaved(
            2,
            1,
            3,
            SampleType::U8,
            SampleData::Bytes(vec![1, 2, 3, 4, 5, 6]),
        )
        .unwrap();
        let planar = buf.repack(Layout::Planar).unwrap();
        assert_eq!(planar.banks()[0], SampleData::Bytes(vec![1, 4, 2, 5, 3, 6]));
        assert_eq!(planar.repack(Layout::Interleaved).unwrap(), buf);
    }

    #[test]
    fn plane_gathers_one_band() {
        let buf = PixelBuffer::interleaved(
            2,
            1,
            2,
            SampleType::U8,
            SampleData::Bytes(vec![10, 20, 11, 21]),
        )
        .unwrap();
        assert_eq!(buf.plane::<U8Kind>(1).unwrap(), vec![20, 21]);
    }

    // =========================================================================
    // Rect and FrameSequence
    // =========================================================================

    #[test]
    fn rect_clip_to_image() {
        assert_eq!(
            Rect::new(-5, 2, 10, 100).clip(8, 8),
            Some(Rect::new(0, 2, 5, 6))
        );
        assert_eq!(Rect::new(9, 0, 3, 3).clip(8, 8), None);
        assert!(Rect::new(0, 0, 0, 3).is_empty());
    }

    #[test]
    fn frame_sequence_requires_matching_frames() {
        let a = PixelBuffer::zeroed(2, 2, 1, SampleType::U8, Layout::Interleaved).unwrap();
        let b = PixelBuffer::zeroed(2, 3, 1, SampleType::U8, Layout::Interleaved).unwrap();
        assert!(matches!(
            FrameSequence::new(vec![a.clone(), b]).unwrap_err(),
            PixelError::InternalInconsistency(_)
        ));
        assert!(matches!(
            FrameSequence::new(vec![]).unwrap_err(),
            PixelError::InvalidGeometry(_)
        ));

        let seq = FrameSequence::new(vec![a.clone(), a]).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.total_bytes(), 8);
    }
}
