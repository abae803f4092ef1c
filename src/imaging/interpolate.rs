//! Interpolating resampler built on the `image` crate's filters.
//!
//! Second step of the resample chain. Handles any buffer with a
//! `DynamicImage` counterpart (1–4 bands, any layout) at the cost of
//! exactness: the result is filtered, not area-averaged.
//!
//! The `image` crate clamps float pixels to `[0, 1]`, so float selections are
//! mapped onto that range from their finite extremes before filtering and
//! mapped back afterwards.

use super::backend::ResampleBackend;
use super::dynamic::{from_dynamic, to_dynamic};
use super::params::{FallbackFilter, ResampleParams};
use crate::raster::{
    Layout, PixelBuffer, PixelError, Rect, SampleData, SampleKind, with_sample_kind,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolatingBackend {
    filter: FallbackFilter,
}

impl InterpolatingBackend {
    pub fn new(filter: FallbackFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FallbackFilter {
        self.filter
    }
}

impl ResampleBackend for InterpolatingBackend {
    fn name(&self) -> &'static str {
        "interpolating"
    }

    fn resample(
        &self,
        source: &PixelBuffer,
        params: &ResampleParams,
    ) -> Result<PixelBuffer, PixelError> {
        params.validate()?;
        let sample_type = source.sample_type().with_signedness(params.signed);

        let mut region = with_sample_kind!(sample_type, K => {
            extract_selection::<K>(source, params.selection, params.background)
        })?;
        let span = float_span(&region);
        if let Some((low, scale)) = span {
            region = map_floats(region, |v| (v - low) / scale)?;
        }
        let image = to_dynamic(&region)?;
        let resized = image.resize_exact(
            params.width as u32,
            params.height as u32,
            self.filter.filter_type(),
        );
        let out = from_dynamic(&resized, sample_type, source.bands())?;
        match span {
            Some((low, scale)) => map_floats(out, |v| v * scale + low),
            None => Ok(out),
        }
    }
}

/// `(minimum, range)` over the finite samples of a float buffer; `None` for
/// integer buffers or when nothing is finite. A flat buffer gets range 1.
fn float_span(buffer: &PixelBuffer) -> Option<(f64, f64)> {
    let (low, high) = match buffer.banks().first()? {
        SampleData::Floats(v) => finite_extremes(v.iter().map(|&s| f64::from(s))),
        SampleData::Doubles(v) => finite_extremes(v.iter().copied()),
        SampleData::Bytes(_) | SampleData::Words(_) => None,
    }?;
    let range = high - low;
    Some((low, if range > 0.0 { range } else { 1.0 }))
}

fn finite_extremes(samples: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    samples
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((low, high)) => Some((f64::min(low, v), f64::max(high, v))),
        })
}

/// Apply `f` to every sample of an interleaved float buffer.
fn map_floats(buffer: PixelBuffer, f: impl Fn(f64) -> f64) -> Result<PixelBuffer, PixelError> {
    let (width, height, bands) = (buffer.width(), buffer.height(), buffer.bands());
    let sample_type = buffer.sample_type();
    let data = match buffer.into_banks().into_iter().next() {
        Some(SampleData::Floats(v)) => {
            SampleData::Floats(v.into_iter().map(|s| f(f64::from(s)) as f32).collect())
        }
        Some(SampleData::Doubles(v)) => SampleData::Doubles(v.into_iter().map(f).collect()),
        Some(other) => other,
        None => {
            return Err(PixelError::InternalInconsistency("buffer has no bank".into()));
        }
    };
    PixelBuffer::interleaved(width, height, bands, sample_type, data)
}

/// Interleaved copy of `selection`, padding what lies outside the source
/// with `background`. Raw words are read as `K`, so the copy takes `K`'s
/// signedness.
fn extract_selection<K: SampleKind>(
    source: &PixelBuffer,
    selection: Rect,
    background: f64,
) -> Result<PixelBuffer, PixelError> {
    let (width, height) = (selection.width as usize, selection.height as usize);
    let mut out = PixelBuffer::zeroed(width, height, source.bands(), K::TYPE, Layout::Interleaved)?;
    let fill = K::from_f64(background);

    for band in 0..source.bands() {
        let plane = source.plane::<K>(band)?;
        let mut region = Vec::with_capacity(width * height);
        for y in selection.y..selection.bottom() {
            for x in selection.x..selection.right() {
                let inside = (0..source.width() as i64).contains(&x)
                    && (0..source.height() as i64).contains(&y);
                region.push(if inside {
                    plane[y as usize * source.width() + x as usize]
                } else {
                    fill
                });
            }
        }
        out.write_plane::<K>(band, &region)?;
    }
    Ok(out)
}
