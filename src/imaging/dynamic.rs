//! Bridges between [`PixelBuffer`] and the `image` crate's [`DynamicImage`].
//!
//! Used by the interpolating resample fallback and by the last step of the
//! display conversion chain. Only 1–4 band buffers have a `DynamicImage`
//! counterpart.
//!
//! Signed 8/16-bit words travel as offset binary (sign bit flipped) so the
//! `image` crate's unsigned filters keep their ordering; the flip is undone
//! on the way back. Floats travel as `f32` RGB(A), which the `image` crate
//! clamps to `[0, 1]`; callers normalize first.

use crate::raster::{Layout, PixelBuffer, PixelError, SampleData, SampleType};
use image::{DynamicImage, ImageBuffer};

const SIGN_BIT_8: u8 = 0x80;
const SIGN_BIT_16: u16 = 0x8000;

pub fn to_dynamic(buffer: &PixelBuffer) -> Result<DynamicImage, PixelError> {
    let bands = buffer.bands();
    if !(1..=4).contains(&bands) {
        return Err(PixelError::UnsupportedFormat(format!(
            "no image model for {bands} bands"
        )));
    }
    let (width, height) = (buffer.width() as u32, buffer.height() as u32);
    let signed = buffer.sample_type().is_signed();
    let storage = buffer
        .repack(Layout::Interleaved)?
        .into_banks()
        .into_iter()
        .next()
        .ok_or_else(|| PixelError::InternalInconsistency("repacked buffer has no bank".into()))?;

    let image = match storage {
        SampleData::Bytes(mut raw) => {
            if signed {
                raw.iter_mut().for_each(|v| *v ^= SIGN_BIT_8);
            }
            match bands {
                1 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
                2 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageLumaA8),
                3 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
                _ => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
            }
        }
        SampleData::Words(mut raw) => {
            if signed {
                raw.iter_mut().for_each(|v| *v ^= SIGN_BIT_16);
            }
            match bands {
                1 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageLuma16),
                2 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageLumaA16),
                3 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgb16),
                _ => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgba16),
            }
        }
        SampleData::Floats(raw) => float_image(width, height, bands, raw),
        SampleData::Doubles(raw) => float_image(
            width,
            height,
            bands,
            raw.into_iter().map(|v| v as f32).collect(),
        ),
    };

    image.ok_or_else(|| {
        PixelError::InternalInconsistency(format!(
            "sample count does not fit a {width}x{height} image"
        ))
    })
}

/// The `image` crate has no gray float images; gray is replicated to RGB.
fn float_image(width: u32, height: u32, bands: usize, raw: Vec<f32>) -> Option<DynamicImage> {
    match bands {
        1 => {
            let rgb = raw.iter().flat_map(|&l| [l, l, l]).collect();
            ImageBuffer::from_raw(width, height, rgb).map(DynamicImage::ImageRgb32F)
        }
        2 => {
            let rgba = raw
                .chunks_exact(2)
                .flat_map(|la| [la[0], la[0], la[0], la[1]])
                .collect();
            ImageBuffer::from_raw(width, height, rgba).map(DynamicImage::ImageRgba32F)
        }
        3 => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgb32F),
        _ => ImageBuffer::from_raw(width, height, raw).map(DynamicImage::ImageRgba32F),
    }
}

/// Interleaved `bands`-band buffer of `sample_type` from any image, letting
/// the `image` crate do the color model and depth conversion.
pub fn from_dynamic(
    image: &DynamicImage,
    sample_type: SampleType,
    bands: usize,
) -> Result<PixelBuffer, PixelError> {
    let data = match sample_type {
        SampleType::U8 | SampleType::I8 => {
            let mut raw = match bands {
                1 => image.to_luma8().into_raw(),
                2 => image.to_luma_alpha8().into_raw(),
                3 => image.to_rgb8().into_raw(),
                4 => image.to_rgba8().into_raw(),
                _ => return Err(unsupported_bands(bands)),
            };
            if sample_type.is_signed() {
                raw.iter_mut().for_each(|v| *v ^= SIGN_BIT_8);
            }
            SampleData::Bytes(raw)
        }
        SampleType::U16 | SampleType::I16 => {
            let mut raw = match bands {
                1 => image.to_luma16().into_raw(),
                2 => image.to_luma_alpha16().into_raw(),
                3 => image.to_rgb16().into_raw(),
                4 => image.to_rgba16().into_raw(),
                _ => return Err(unsupported_bands(bands)),
            };
            if sample_type.is_signed() {
                raw.iter_mut().for_each(|v| *v ^= SIGN_BIT_16);
            }
            SampleData::Words(raw)
        }
        SampleType::F32 | SampleType::F64 => {
            let picks: &[usize] = match bands {
                1 => &[0],
                2 => &[0, 3],
                3 => &[0, 1, 2],
                4 => &[0, 1, 2, 3],
                _ => return Err(unsupported_bands(bands)),
            };
            let rgba = image.to_rgba32f().into_raw();
            let samples = rgba
                .chunks_exact(4)
                .flat_map(|px| picks.iter().map(move |&c| px[c]));
            if sample_type == SampleType::F32 {
                SampleData::Floats(samples.collect())
            } else {
                SampleData::Doubles(samples.map(f64::from).collect())
            }
        }
    };

    PixelBuffer::interleaved(
        image.width() as usize,
        image.height() as usize,
        bands,
        sample_type,
        data,
    )
}

fn unsupported_bands(bands: usize) -> PixelError {
    PixelError::UnsupportedFormat(format!("no image model for {bands} bands"))
}
