//! Display preparation and transforms through the public API.

use pixelscrub::imaging::{
    ConversionPath, DisplayRaster, DisplayRequest, FallbackFilter, PackedMasks, ResamplePath,
    ResampleParams, ResamplingVector, Rotation, TargetFormat, flip_horizontally, flip_vertically,
    get_offset_into_matrix, get_position_in_view, prepare_for_display, resample, ybr_to_rgb,
};
use pixelscrub::raster::{Layout, PixelBuffer, Rect, SampleData, SampleType};

fn ybr_frame(width: usize, height: usize, pixel: [u8; 3]) -> PixelBuffer {
    let samples = (0..width * height).flat_map(|_| pixel).collect();
    PixelBuffer::interleaved(width, height, 3, SampleType::U8, SampleData::Bytes(samples)).unwrap()
}

fn ramp16(width: usize, height: usize) -> PixelBuffer {
    let samples = (0..width * height).map(|i| (i * 37 % 4096) as u16).collect();
    PixelBuffer::interleaved(width, height, 1, SampleType::U16, SampleData::Words(samples))
        .unwrap()
}

// =========================================================================
// YBR
// =========================================================================

#[test]
fn ybr_extremes_map_to_black_and_white() {
    assert_eq!(ybr_to_rgb(0, 128, 128), [0, 0, 0]);
    assert_eq!(ybr_to_rgb(255, 128, 128), [255, 255, 255]);
}

#[test]
fn ybr_frame_displays_as_rgb() {
    let source = ybr_frame(4, 4, [255, 128, 128]);
    let request = DisplayRequest {
        params: ResampleParams::full(&source, 2, 2),
        filter: FallbackFilter::Nearest,
        ybr: true,
        target: None,
    };
    let frame = prepare_for_display(&source, &request).unwrap();

    assert_eq!(frame.resample_path, ResamplePath::Fallback);
    assert_eq!(frame.conversion_path, ConversionPath::Repack);
    let buffer = frame.raster.into_samples().unwrap();
    assert_eq!((buffer.width(), buffer.height(), buffer.bands()), (2, 2, 3));
    assert_eq!(buffer.banks()[0], SampleData::Bytes(vec![255; 12]));
}

#[test]
fn packed_target_yields_packed_pixels() {
    let source = ybr_frame(2, 2, [0, 128, 128]);
    let request = DisplayRequest {
        params: ResampleParams::full(&source, 2, 2),
        filter: FallbackFilter::default(),
        ybr: true,
        target: Some(TargetFormat::Packed(PackedMasks::RGB)),
    };
    let frame = prepare_for_display(&source, &request).unwrap();
    match frame.raster {
        DisplayRaster::Packed(raster) => assert_eq!(raster.pixels, vec![0; 4]),
        DisplayRaster::Samples(_) => panic!("expected packed pixels"),
    }
}

#[test]
fn sixteen_bit_gray_reaches_an_eight_bit_display() {
    let source = ramp16(8, 6);
    let request = DisplayRequest {
        params: ResampleParams::full(&source, 4, 3),
        filter: FallbackFilter::default(),
        ybr: false,
        target: None,
    };
    let frame = prepare_for_display(&source, &request).unwrap();
    assert_eq!(frame.resample_path, ResamplePath::Primary);
    assert_eq!((frame.raster.width(), frame.raster.height()), (4, 3));
    let buffer = frame.raster.into_samples().unwrap();
    assert_eq!(buffer.sample_type(), SampleType::U8);
    assert_eq!(buffer.layout().unwrap(), Layout::Interleaved);
}

// =========================================================================
// Resampling
// =========================================================================

#[test]
fn identity_resample_is_exact() {
    let source = ramp16(13, 9);
    let params = ResampleParams::full(&source, 13, 9);
    let result = resample(&source, &params, FallbackFilter::default()).unwrap();
    assert_eq!(result.buffer, source);
}

#[test]
fn zoomed_selection_resamples_a_sub_rectangle() {
    let source = ramp16(8, 8);
    let params = ResampleParams::full(&source, 4, 4).with_selection(Rect::new(2, 2, 4, 4));
    let result = resample(&source, &params, FallbackFilter::default()).unwrap();
    assert_eq!(result.path, ResamplePath::Primary);
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(result.buffer.sample(x, y, 0), source.sample(x + 2, y + 2, 0));
        }
    }
}

#[test]
fn interleaved_float_fallback_keeps_magnitudes() {
    let source =
        PixelBuffer::interleaved(2, 2, 3, SampleType::F32, SampleData::Floats(vec![100.0; 12]))
            .unwrap();
    let params = ResampleParams::full(&source, 3, 3);
    let result = resample(&source, &params, FallbackFilter::Nearest).unwrap();
    assert_eq!(result.path, ResamplePath::Fallback);
    assert_eq!(result.buffer.sample(0, 0, 0), Some(100.0));
    assert_eq!(result.buffer.sample(2, 2, 1), Some(100.0));
}

#[test]
fn resampling_vectors_conserve_weight() {
    for (extent, dest) in [(7, 3), (3, 7), (100, 33), (1, 5), (640, 640)] {
        let vector = ResamplingVector::new(0, extent, dest);
        assert_eq!(vector.len(), dest);
        for index in 0..dest {
            let contributions = vector.contributions(index);
            let total: i64 = contributions.iter().map(|c| c.weight).sum();
            assert!((total - vector.sum_of_weights(index)).abs() <= 1);
            assert!(contributions.windows(2).all(|w| w[0].source <= w[1].source));
        }
    }
}

// =========================================================================
// Transforms
// =========================================================================

#[test]
fn flips_are_involutions() {
    let original = ramp16(5, 4);
    let mut buffer = original.clone();
    flip_horizontally(&mut buffer).unwrap();
    assert_ne!(buffer, original);
    flip_horizontally(&mut buffer).unwrap();
    flip_vertically(&mut buffer).unwrap();
    flip_vertically(&mut buffer).unwrap();
    assert_eq!(buffer, original);
}

#[test]
fn coordinate_mapping_round_trips() {
    let (height, width) = (3, 5);
    for rotation in [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270] {
        for flip in [false, true] {
            let (rows, columns) = if rotation.swaps_axes() {
                (width, height)
            } else {
                (height, width)
            };
            for row in 0..rows {
                for column in 0..columns {
                    let offset = get_offset_into_matrix(row, column, height, width, rotation, flip);
                    assert_eq!(
                        get_position_in_view(offset, height, width, rotation, flip),
                        (row, column),
                        "{rotation:?} flip={flip}"
                    );
                }
            }
        }
    }
    assert_eq!(get_offset_into_matrix(2, 4, 3, 5, Rotation::R0, false), 14);
}
