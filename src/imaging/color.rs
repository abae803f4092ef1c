//! Color-space and band-count conversion for display.
//!
//! Two groups of operations live here:
//!
//! - **YBR**: the JPEG/JFIF full-range matrix in both directions
//!   ([`ybr_to_rgb`], [`rgb_to_ybr`]) and the buffer-level
//!   [`convert_ybr_to_rgb`].
//! - **Most favorable format**: [`convert_to_format`] tries four
//!   increasingly general strategies, cheapest first, and reports which one
//!   produced the result:
//!
//! | Step | [`ConversionPath`] | Applies when |
//! |---|---|---|
//! | 1 | `DirectRemap` | gray source, same sample type, interleaved target, lengths an exact multiple |
//! | 2 | `Repack` | only storage differs: relayout, or 8-bit samples into packed pixels |
//! | 3 | `BandCombination` | same sample type, 1→3, 1→4 or 3→4 bands |
//! | 4 | `Composite` | anything the `image` crate can represent |

use super::dynamic::{from_dynamic, to_dynamic};
use crate::raster::sample::U8Kind;
use crate::raster::{Layout, PixelBuffer, PixelError, SampleKind, SampleType, with_sample_kind};
use log::debug;

// ============================================================================
// YBR
// ============================================================================

pub fn ybr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = f64::from(y);
    let cb = f64::from(cb) - 128.0;
    let cr = f64::from(cr) - 128.0;
    [
        y + 1.402 * cr,
        y - 0.34414 * cb - 0.71414 * cr,
        y + 1.772 * cb,
    ]
    .map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Forward transform at `bits` depth; chroma is centred on `2^(bits-1)`.
pub fn rgb_to_ybr(r: f64, g: f64, b: f64, bits: u32) -> [f64; 3] {
    let mid = 2f64.powi(bits.max(1) as i32 - 1);
    [
        0.299 * r + 0.587 * g + 0.114 * b,
        -0.168736 * r - 0.331264 * g + 0.5 * b + mid,
        0.5 * r - 0.418688 * g - 0.081312 * b + mid,
    ]
}

/// Convert the first three bands of an 8-bit YBR buffer to RGB. A fourth
/// band is carried over unchanged and the layout is preserved.
pub fn convert_ybr_to_rgb(buffer: &PixelBuffer) -> Result<PixelBuffer, PixelError> {
    let layout = buffer.layout()?;
    if buffer.sample_type() != SampleType::U8
        || !matches!(buffer.bands(), 3 | 4)
        || layout == Layout::Banded
    {
        return Err(PixelError::UnsupportedFormat(format!(
            "YBR conversion needs 8-bit 3 or 4 band interleaved or planar samples, got {} bands of {} ({layout:?})",
            buffer.bands(),
            buffer.sample_type()
        )));
    }

    let y = buffer.plane::<U8Kind>(0)?;
    let cb = buffer.plane::<U8Kind>(1)?;
    let cr = buffer.plane::<U8Kind>(2)?;
    let mut rgb = [
        Vec::with_capacity(y.len()),
        Vec::with_capacity(y.len()),
        Vec::with_capacity(y.len()),
    ];
    for ((&y, &cb), &cr) in y.iter().zip(&cb).zip(&cr) {
        let [r, g, b] = ybr_to_rgb(y, cb, cr);
        rgb[0].push(r);
        rgb[1].push(g);
        rgb[2].push(b);
    }

    let mut out = buffer.repack(layout)?;
    for (band, plane) in rgb.iter().enumerate() {
        out.write_plane::<U8Kind>(band, plane)?;
    }
    Ok(out)
}

// ============================================================================
// Target formats
// ============================================================================

/// Channel masks of a 32-bit packed pixel. Masks are contiguous; a zero
/// alpha mask means no alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

impl PackedMasks {
    pub const RGB: Self = Self {
        red: 0x00FF_0000,
        green: 0x0000_FF00,
        blue: 0x0000_00FF,
        alpha: 0,
    };

    pub const ARGB: Self = Self {
        alpha: 0xFF00_0000,
        ..Self::RGB
    };

    /// Number of 8-bit samples one pixel is packed from.
    pub fn channels(&self) -> usize {
        if self.alpha == 0 { 3 } else { 4 }
    }

    /// Pack red, green, blue (and alpha) 8-bit samples, rescaling each to
    /// its mask's width.
    pub fn pack(&self, samples: &[u8]) -> u32 {
        [self.red, self.green, self.blue, self.alpha]
            .iter()
            .zip(samples)
            .fold(0, |pixel, (&mask, &value)| pixel | scale_into_mask(value, mask))
    }
}

fn scale_into_mask(value: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let max = u64::from(mask >> shift);
    (((u64::from(value) * max + 127) / 255) as u32) << shift
}

/// What the display wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Samples {
        bands: usize,
        sample_type: SampleType,
        layout: Layout,
    },
    Packed(PackedMasks),
}

impl TargetFormat {
    /// Interleaved 8-bit gray, RGB or RGBA, whichever fits `bands`.
    pub fn preferred_for(bands: usize) -> Self {
        Self::Samples {
            bands: match bands {
                1 => 1,
                4 => 4,
                _ => 3,
            },
            sample_type: SampleType::U8,
            layout: Layout::Interleaved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRaster {
    pub width: usize,
    pub height: usize,
    pub masks: PackedMasks,
    /// Row-major, one `u32` per pixel.
    pub pixels: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayRaster {
    Samples(PixelBuffer),
    Packed(PackedRaster),
}

impl DisplayRaster {
    pub fn width(&self) -> usize {
        match self {
            Self::Samples(buffer) => buffer.width(),
            Self::Packed(raster) => raster.width,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::Samples(buffer) => buffer.height(),
            Self::Packed(raster) => raster.height,
        }
    }

    pub fn into_samples(self) -> Option<PixelBuffer> {
        match self {
            Self::Samples(buffer) => Some(buffer),
            Self::Packed(_) => None,
        }
    }
}

/// Which step of the conversion chain produced a [`Converted`] raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionPath {
    DirectRemap,
    Repack,
    BandCombination,
    Composite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub raster: DisplayRaster,
    pub path: ConversionPath,
}

// ============================================================================
// Conversion chain
// ============================================================================

type Step = fn(&PixelBuffer, &TargetFormat) -> Result<DisplayRaster, PixelError>;

const CHAIN: [(ConversionPath, Step); 4] = [
    (ConversionPath::DirectRemap, direct_remap),
    (ConversionPath::Repack, repack_samples),
    (ConversionPath::BandCombination, combine_bands),
    (ConversionPath::Composite, composite),
];

/// Convert `source` to `target` with the first strategy that applies.
///
/// Steps that decline report [`PixelError::UnsupportedFormat`] and the next
/// one is tried; any other error ends the chain. When every step declines,
/// the last step's error is returned.
pub fn convert_to_format(
    source: &PixelBuffer,
    target: &TargetFormat,
) -> Result<Converted, PixelError> {
    let mut last_decline = None;
    for (path, step) in CHAIN {
        match step(source, target) {
            Ok(raster) => {
                debug!(
                    "converted {}-band {} to {target:?} via {path:?}",
                    source.bands(),
                    source.sample_type()
                );
                return Ok(Converted { raster, path });
            }
            Err(err) if err.is_unsupported() => {
                debug!("{path:?} declined: {err}");
                last_decline = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_decline.unwrap_or_else(|| {
        PixelError::UnsupportedFormat(format!("no conversion to {target:?}"))
    }))
}

/// Change the band count keeping the sample type, interleaved.
pub fn convert_band_count(source: &PixelBuffer, bands: usize) -> Result<PixelBuffer, PixelError> {
    let target = TargetFormat::Samples {
        bands,
        sample_type: source.sample_type(),
        layout: Layout::Interleaved,
    };
    convert_to_format(source, &target)?
        .raster
        .into_samples()
        .ok_or_else(|| PixelError::InternalInconsistency("sample target produced packed pixels".into()))
}

fn declined(step: &str, source: &PixelBuffer, target: &TargetFormat) -> PixelError {
    PixelError::UnsupportedFormat(format!(
        "{step} cannot turn {}-band {} into {target:?}",
        source.bands(),
        source.sample_type()
    ))
}

fn direct_remap(source: &PixelBuffer, target: &TargetFormat) -> Result<DisplayRaster, PixelError> {
    let TargetFormat::Samples {
        bands,
        sample_type,
        layout: Layout::Interleaved,
    } = *target
    else {
        return Err(declined("direct remap", source, target));
    };
    let pixels = source.width() * source.height();
    let (source_len, dest_len) = (pixels * source.bands(), pixels * bands);
    if sample_type != source.sample_type()
        || source.bands() != 1
        || dest_len <= source_len
        || dest_len % source_len != 0
        || bands > 4
    {
        return Err(declined("direct remap", source, target));
    }

    let buffer = with_sample_kind!(sample_type, K => {
        let gray = source.plane::<K>(0)?;
        let opaque = K::from_f64(sample_type.max_value());
        let mut out = Vec::with_capacity(dest_len);
        for &g in &gray {
            match bands {
                2 => out.extend([g, opaque]),
                3 => out.extend([g, g, g]),
                _ => out.extend([g, g, g, opaque]),
            }
        }
        PixelBuffer::interleaved(source.width(), source.height(), bands, sample_type, K::wrap(out))
    })?;
    Ok(DisplayRaster::Samples(buffer))
}

fn repack_samples(
    source: &PixelBuffer,
    target: &TargetFormat,
) -> Result<DisplayRaster, PixelError> {
    match *target {
        TargetFormat::Samples {
            bands,
            sample_type,
            layout,
        } if bands == source.bands() && sample_type == source.sample_type() => {
            Ok(DisplayRaster::Samples(source.repack(layout)?))
        }
        TargetFormat::Packed(masks)
            if source.sample_type() == SampleType::U8 && source.bands() == masks.channels() =>
        {
            let planes = (0..source.bands())
                .map(|band| source.plane::<U8Kind>(band))
                .collect::<Result<Vec<_>, _>>()?;
            let pixel_count = source.width() * source.height();
            let pixels = (0..pixel_count)
                .map(|i| {
                    let mut samples = [0u8; 4];
                    for (sample, plane) in samples.iter_mut().zip(&planes) {
                        *sample = plane[i];
                    }
                    masks.pack(&samples[..planes.len()])
                })
                .collect();
            Ok(DisplayRaster::Packed(PackedRaster {
                width: source.width(),
                height: source.height(),
                masks,
                pixels,
            }))
        }
        _ => Err(declined("repack", source, target)),
    }
}

/// Row `k` holds output band `k`'s coefficients over the input bands; an
/// empty row is an opaque alpha band.
fn combination_matrix(from: usize, to: usize) -> Option<&'static [&'static [f64]]> {
    const GRAY_TO_RGB: &[&[f64]] = &[&[1.0], &[1.0], &[1.0]];
    const GRAY_TO_RGBA: &[&[f64]] = &[&[1.0], &[1.0], &[1.0], &[]];
    const RGB_TO_RGBA: &[&[f64]] = &[&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0], &[]];
    match (from, to) {
        (1, 3) => Some(GRAY_TO_RGB),
        (1, 4) => Some(GRAY_TO_RGBA),
        (3, 4) => Some(RGB_TO_RGBA),
        _ => None,
    }
}

fn combine_bands(source: &PixelBuffer, target: &TargetFormat) -> Result<DisplayRaster, PixelError> {
    let TargetFormat::Samples {
        bands,
        sample_type,
        layout,
    } = *target
    else {
        return Err(declined("band combination", source, target));
    };
    let matrix = combination_matrix(source.bands(), bands)
        .filter(|_| sample_type == source.sample_type())
        .ok_or_else(|| declined("band combination", source, target))?;

    let pixel_count = source.width() * source.height();
    let mut out = PixelBuffer::zeroed(source.width(), source.height(), bands, sample_type, layout)?;
    with_sample_kind!(sample_type, K => {
        let planes = (0..source.bands())
            .map(|band| source.plane::<K>(band))
            .collect::<Result<Vec<_>, _>>()?;
        let opaque = K::from_f64(sample_type.max_value());
        for (band, row) in matrix.iter().enumerate() {
            let plane: Vec<<K as SampleKind>::Raw> = if row.is_empty() {
                vec![opaque; pixel_count]
            } else {
                (0..pixel_count)
                    .map(|i| {
                        let value: f64 = row
                            .iter()
                            .zip(&planes)
                            .map(|(coefficient, plane)| coefficient * K::to_f64(plane[i]))
                            .sum();
                        K::from_f64(value)
                    })
                    .collect()
            };
            out.write_plane::<K>(band, &plane)?;
        }
    });
    Ok(DisplayRaster::Samples(out))
}

fn composite(source: &PixelBuffer, target: &TargetFormat) -> Result<DisplayRaster, PixelError> {
    let image = to_dynamic(source)?;
    match *target {
        TargetFormat::Samples {
            bands,
            sample_type,
            layout,
        } => {
            let buffer = from_dynamic(&image, sample_type, bands)?;
            let buffer = if layout == Layout::Interleaved {
                buffer
            } else {
                buffer.repack(layout)?
            };
            Ok(DisplayRaster::Samples(buffer))
        }
        TargetFormat::Packed(masks) => {
            let rgba = image.to_rgba8();
            let pixels = rgba
                .pixels()
                .map(|p| masks.pack(&p.0[..masks.channels()]))
                .collect();
            Ok(DisplayRaster::Packed(PackedRaster {
                width: source.width(),
                height: source.height(),
                masks,
                pixels,
            }))
        }
    }
}
