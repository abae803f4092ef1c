//! Weighted-area resampling, the fast path of the resample chain.
//!
//! Each destination sample is the fixed-point weighted average of every
//! source sample whose area overlaps the destination cell. The filter is
//! separable and runs in two passes:
//!
//! 1. **Horizontal**: every selection row is reduced to `dest_width`
//!    undivided weighted sums, giving a `selection_height x dest_width`
//!    intermediate of accumulators.
//! 2. **Vertical**: the intermediate columns are reduced to `dest_height`
//!    rows and divided once by the product of both axes' weight sums.
//!
//! Integer kinds accumulate in `i64` after sign extension and truncate on
//! division; float kinds accumulate natively and divide exactly. Selection
//! samples that fall outside the source contribute the background value.

use super::backend::ResampleBackend;
use super::calculations::ResamplingVector;
use super::params::ResampleParams;
use crate::raster::{
    Accumulator, Layout, PixelBuffer, PixelError, Rect, SampleKind, with_sample_kind,
};

/// Exact area-average resampler for single-band and planar buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAreaBackend;

impl WeightedAreaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ResampleBackend for WeightedAreaBackend {
    fn name(&self) -> &'static str {
        "weighted-area"
    }

    fn resample(
        &self,
        source: &PixelBuffer,
        params: &ResampleParams,
    ) -> Result<PixelBuffer, PixelError> {
        params.validate()?;
        if params.is_identity_for(source) {
            return Ok(source.clone());
        }

        let layout = source.layout()?;
        if source.bands() > 1 && layout != Layout::Planar {
            return Err(PixelError::UnsupportedFormat(format!(
                "weighted-area resampling needs one band or planar storage, got {} bands {layout:?}",
                source.bands()
            )));
        }

        let selection = params.selection;
        let horizontal = ResamplingVector::new(selection.x, selection.width as usize, params.width);
        let vertical = ResamplingVector::new(selection.y, selection.height as usize, params.height);
        let sample_type = source.sample_type().with_signedness(params.signed);

        with_sample_kind!(sample_type, K => {
            resample_bands::<K>(source, &horizontal, &vertical, params)
        })
    }
}

fn resample_bands<K: SampleKind>(
    source: &PixelBuffer,
    horizontal: &ResamplingVector,
    vertical: &ResamplingVector,
    params: &ResampleParams,
) -> Result<PixelBuffer, PixelError> {
    let background = K::extend(K::from_f64(params.background));
    let mut samples = Vec::with_capacity(params.width * params.height * source.bands());

    for band in 0..source.bands() {
        let plane = source.plane::<K>(band)?;
        samples.extend(resample_plane::<K>(
            &plane,
            source.width(),
            source.height(),
            params.selection,
            horizontal,
            vertical,
            background,
        ));
    }

    PixelBuffer::planar(
        params.width,
        params.height,
        source.bands(),
        K::TYPE,
        K::wrap(samples),
    )
}

/// Resample one row-major plane. Both vectors carry source coordinates, so
/// only the selection's first row is needed to index the intermediate.
fn resample_plane<K: SampleKind>(
    plane: &[K::Raw],
    width: usize,
    height: usize,
    selection: Rect,
    horizontal: &ResamplingVector,
    vertical: &ResamplingVector,
    background: K::Acc,
) -> Vec<K::Raw> {
    let dest_width = horizontal.len();
    let dest_height = vertical.len();
    let origin_y = selection.y;

    let mut intermediate = vec![K::Acc::default(); selection.height as usize * dest_width];
    for (j, row) in intermediate.chunks_exact_mut(dest_width).enumerate() {
        let source_row = origin_y + j as i64;
        let row_start = (0..height as i64)
            .contains(&source_row)
            .then(|| source_row as usize * width);

        for (i, acc) in row.iter_mut().enumerate() {
            *acc = horizontal
                .contributions(i)
                .iter()
                .fold(K::Acc::default(), |sum, c| {
                    let value = match row_start {
                        Some(start) if (0..width as i64).contains(&c.source) => {
                            K::extend(plane[start + c.source as usize])
                        }
                        _ => background,
                    };
                    sum.add_weighted(value, c.weight)
                });
        }
    }

    let mut out = Vec::with_capacity(dest_height * dest_width);
    for k in 0..dest_height {
        let contributions = vertical.contributions(k);
        let vertical_sum = vertical.sum_of_weights(k);
        for i in 0..dest_width {
            let total = contributions.iter().fold(K::Acc::default(), |sum, c| {
                let j = (c.source - origin_y) as usize;
                sum.add_weighted(intermediate[j * dest_width + i], c.weight)
            });
            out.push(K::narrow(
                total.divide(vertical_sum * horizontal.sum_of_weights(i)),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::sample::{F32Kind, I16Kind, U8Kind, U16Kind};
    use crate::raster::{SampleData, SampleType};
    use crate::test_helpers::gradient;

    fn resample(source: &PixelBuffer, params: ResampleParams) -> PixelBuffer {
        WeightedAreaBackend.resample(source, &params).unwrap()
    }

    // =========================================================================
    // Identity and exact averages
    // =========================================================================

    #[test]
    fn identity_returns_source_unchanged() {
        let source = gradient(SampleType::U16, 7, 5);
        let out = resample(&source, ResampleParams::full(&source, 7, 5));
        assert_eq!(out, source);
    }

    #[test]
    fn full_extent_copy_through_filter_is_exact() {
        // A selection equal to the image but expressed as a 1-pixel-wider
        // canvas forces the filter to run while leaving interior samples 1:1.
        let source = gradient(SampleType::U8, 6, 4);
        let params = ResampleParams::full(&source, 7, 4)
            .with_selection(Rect::new(0, 0, 7, 4))
            .with_background(9.0);
        let out = resample(&source, params);
        let plane = out.plane::<U8Kind>(0).unwrap();
        let original = source.plane::<U8Kind>(0).unwrap();
        for y in 0..4 {
            assert_eq!(&plane[y * 7..y * 7 + 6], &original[y * 6..y * 6 + 6]);
            assert_eq!(plane[y * 7 + 6], 9);
        }
    }

    #[test]
    fn halving_averages_two_by_two_blocks() {
        let source = PixelBuffer::from_plane::<U8Kind>(
            4,
            2,
            vec![
                10, 20, 30, 40, //
                30, 40, 50, 61,
            ],
        )
        .unwrap();
        let out = resample(&source, ResampleParams::full(&source, 2, 1));
        // (10+20+30+40)/4 = 25, (30+40+50+61)/4 = 45.25 -> truncated
        assert_eq!(out.plane::<U8Kind>(0).unwrap(), vec![25, 45]);
    }

    #[test]
    fn first_sample_is_not_dropped() {
        let source = PixelBuffer::from_plane::<U16Kind>(2, 1, vec![1000, 0]).unwrap();
        let out = resample(&source, ResampleParams::full(&source, 1, 1));
        assert_eq!(out.plane::<U16Kind>(0).unwrap(), vec![500]);
    }

    #[test]
    fn upsampling_replicates_samples() {
        let source = PixelBuffer::from_plane::<U8Kind>(2, 1, vec![7, 200]).unwrap();
        let out = resample(&source, ResampleParams::full(&source, 4, 2));
        assert_eq!(
            out.plane::<U8Kind>(0).unwrap(),
            vec![7, 7, 200, 200, 7, 7, 200, 200]
        );
    }

    // =========================================================================
    // Sample kinds
    // =========================================================================

    #[test]
    fn signed_words_average_with_sign_extension() {
        let words = [-100i16, -300, 50, 150].map(|v| v as u16).to_vec();
        let source = PixelBuffer::from_plane::<I16Kind>(2, 2, words).unwrap();
        let out = resample(&source, ResampleParams::full(&source, 1, 1));
        // (-100 - 300 + 50 + 150) / 4 = -50
        assert_eq!(out.sample(0, 0, 0), Some(-50.0));
        assert_eq!(out.sample_type(), SampleType::I16);
    }

    #[test]
    fn signed_flag_reinterprets_unsigned_words() {
        let source = PixelBuffer::from_plane::<U8Kind>(2, 1, vec![0xFE, 0x02]).unwrap();
        let mut params = ResampleParams::full(&source, 1, 1);
        params.signed = true;
        let out = resample(&source, params);
        assert_eq!(out.sample_type(), SampleType::I8);
        assert_eq!(out.sample(0, 0, 0), Some(0.0));
    }

    #[test]
    fn float_kinds_divide_exactly() {
        let source = PixelBuffer::from_plane::<F32Kind>(2, 1, vec![1.0, 2.0]).unwrap();
        let out = resample(&source, ResampleParams::full(&source, 1, 1));
        let value = out.sample(0, 0, 0).unwrap();
        assert!((value - 1.5).abs() < 1e-6, "{value}");
    }

    #[test]
    fn doubles_are_supported() {
        let source = PixelBuffer::interleaved(
            3,
            1,
            1,
            SampleType::F64,
            SampleData::Doubles(vec![0.5, 1.5, 2.5]),
        )
        .unwrap();
        let out = resample(&source, ResampleParams::full(&source, 1, 1));
        assert!((out.sample(0, 0, 0).unwrap() - 1.5).abs() < 1e-9);
    }

    // =========================================================================
    // Selections and layouts
    // =========================================================================

    #[test]
    fn selection_outside_source_uses_background() {
        let source = PixelBuffer::from_plane::<U8Kind>(2, 2, vec![100; 4]).unwrap();
        let params = ResampleParams::full(&source, 4, 4)
            .with_selection(Rect::new(-2, -2, 4, 4))
            .with_background(0.0);
        let out = resample(&source, params);
        let plane = out.plane::<U8Kind>(0).unwrap();
        assert_eq!(plane[0], 0);
        assert_eq!(plane[3 * 4 + 3], 100);
        assert_eq!(plane[2 * 4 + 2], 100);
        assert_eq!(plane[2 * 4 + 1], 0);
    }

    #[test]
    fn planar_multi_band_is_resampled_per_band() {
        let source = PixelBuffer::planar(
            2,
            1,
            2,
            SampleType::U8,
            SampleData::Bytes(vec![10, 30, 100, 200]),
        )
        .unwrap();
        let out = resample(&source, ResampleParams::full(&source, 1, 1));
        assert_eq!(out.sample(0, 0, 0), Some(20.0));
        assert_eq!(out.sample(0, 0, 1), Some(150.0));
    }

    #[test]
    fn interleaved_multi_band_is_unsupported() {
        let source = PixelBuffer::zeroed(4, 4, 3, SampleType::U8, Layout::Interleaved).unwrap();
        let err = WeightedAreaBackend
            .resample(&source, &ResampleParams::full(&source, 2, 2))
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn degenerate_target_is_invalid() {
        let source = gradient(SampleType::U8, 4, 4);
        let err = WeightedAreaBackend
            .resample(&source, &ResampleParams::full(&source, 0, 4))
            .unwrap_err();
        assert!(matches!(err, PixelError::InvalidGeometry(_)));
    }
}
