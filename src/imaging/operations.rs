//! Fallback chains over the imaging backends.
//!
//! Each chain tries the cheapest backend first, escalates on
//! [`PixelError::UnsupportedFormat`] and reports which path produced the
//! result.

use super::backend::ResampleBackend;
use super::color::{
    ConversionPath, DisplayRaster, TargetFormat, convert_to_format, convert_ybr_to_rgb,
};
use super::interpolate::InterpolatingBackend;
use super::params::{FallbackFilter, ResampleParams};
use super::weighted::WeightedAreaBackend;
use crate::raster::{PixelBuffer, PixelError};
use log::debug;

/// Result of an imaging operation.
pub type Result<T> = std::result::Result<T, PixelError>;

/// Which backend of the resample chain produced a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResamplePath {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub buffer: PixelBuffer,
    pub path: ResamplePath,
}

/// Resample with `primary`, escalating to `fallback` when the primary does
/// not support the buffer. A fallback failure is returned to the caller,
/// which decides whether to keep showing the source.
pub fn resample_with_fallback(
    primary: &impl ResampleBackend,
    fallback: &impl ResampleBackend,
    source: &PixelBuffer,
    params: &ResampleParams,
) -> Result<Resampled> {
    match primary.resample(source, params) {
        Ok(buffer) => Ok(Resampled {
            buffer,
            path: ResamplePath::Primary,
        }),
        Err(err) if err.is_unsupported() => {
            debug!(
                "{} declined {}-band {} buffer ({err}), trying {}",
                primary.name(),
                source.bands(),
                source.sample_type(),
                fallback.name()
            );
            let buffer = fallback.resample(source, params)?;
            Ok(Resampled {
                buffer,
                path: ResamplePath::Fallback,
            })
        }
        Err(err) => Err(err),
    }
}

/// The standard chain: weighted area first, `filter` interpolation second.
pub fn resample(
    source: &PixelBuffer,
    params: &ResampleParams,
    filter: FallbackFilter,
) -> Result<Resampled> {
    resample_with_fallback(
        &WeightedAreaBackend,
        &InterpolatingBackend::new(filter),
        source,
        params,
    )
}

/// A frame ready to hand to a display, with the paths that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub raster: DisplayRaster,
    pub resample_path: ResamplePath,
    pub conversion_path: ConversionPath,
}

/// What [`prepare_for_display`] should do besides resampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRequest {
    pub params: ResampleParams,
    pub filter: FallbackFilter,
    /// Source samples are 8-bit YBR to be shown as RGB.
    pub ybr: bool,
    /// Defaults to [`TargetFormat::preferred_for`] the source band count.
    pub target: Option<TargetFormat>,
}

/// Resample, undo YBR encoding and convert to the display's format.
pub fn prepare_for_display(
    source: &PixelBuffer,
    request: &DisplayRequest,
) -> Result<DisplayFrame> {
    let resampled = resample(source, &request.params, request.filter)?;
    let buffer = if request.ybr {
        convert_ybr_to_rgb(&resampled.buffer)?
    } else {
        resampled.buffer
    };
    let target = request
        .target
        .unwrap_or_else(|| TargetFormat::preferred_for(buffer.bands()));
    let converted = convert_to_format(&buffer, &target)?;

    Ok(DisplayFrame {
        raster: converted.raster,
        resample_path: resampled.path,
        conversion_path: converted.path,
    })
}
