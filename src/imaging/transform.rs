//! Flips and quarter-turn rotations of single-band integer buffers.
//!
//! Flips work in place on the buffer's own storage, honouring its strides.
//! Rotations build a new compact buffer by reading every view position
//! through [`get_offset_into_matrix`].

use super::calculations::{get_offset_into_matrix, view_dimensions};
use super::params::Rotation;
use crate::raster::{PixelBuffer, PixelError, SampleKind, with_sample_kind};
use log::warn;

/// Single-band 8/16-bit integer buffers only; anything else is logged and
/// reported without touching the buffer.
fn require_single_band_integer(buffer: &PixelBuffer, operation: &str) -> Result<(), PixelError> {
    if buffer.bands() == 1 && buffer.sample_type().is_integer() {
        return Ok(());
    }
    warn!(
        "{operation} skipped: unsupported {}-band {} buffer",
        buffer.bands(),
        buffer.sample_type()
    );
    Err(PixelError::UnsupportedFormat(format!(
        "{operation} needs a single-band 8 or 16-bit buffer, got {} bands of {}",
        buffer.bands(),
        buffer.sample_type()
    )))
}

pub fn flip_horizontally(buffer: &mut PixelBuffer) -> Result<(), PixelError> {
    require_single_band_integer(buffer, "horizontal flip")?;
    with_sample_kind!(buffer.sample_type(), K => flip_in_place::<K>(buffer, Axis::Horizontal))
}

pub fn flip_vertically(buffer: &mut PixelBuffer) -> Result<(), PixelError> {
    require_single_band_integer(buffer, "vertical flip")?;
    with_sample_kind!(buffer.sample_type(), K => flip_in_place::<K>(buffer, Axis::Vertical))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn flip_in_place<K: SampleKind>(buffer: &mut PixelBuffer, axis: Axis) -> Result<(), PixelError> {
    let (width, height) = (buffer.width(), buffer.height());
    let s = buffer.strides();
    let offset = |x: usize, y: usize| s.base_offset + y * s.scanline + x * s.pixel;
    let data = buffer
        .bank_mut(0)
        .and_then(K::slice_mut)
        .ok_or_else(|| PixelError::InternalInconsistency("flip found no matching bank".into()))?;

    match axis {
        Axis::Horizontal => {
            for y in 0..height {
                for x in 0..width / 2 {
                    data.swap(offset(x, y), offset(width - 1 - x, y));
                }
            }
        }
        Axis::Vertical => {
            for y in 0..height / 2 {
                for x in 0..width {
                    data.swap(offset(x, y), offset(x, height - 1 - y));
                }
            }
        }
    }
    Ok(())
}

/// Rotate clockwise by `rotation`, then optionally mirror the result left to
/// right. Returns a new compact buffer.
pub fn rotate_and_flip(
    buffer: &PixelBuffer,
    rotation: Rotation,
    horizontal_flip: bool,
) -> Result<PixelBuffer, PixelError> {
    require_single_band_integer(buffer, "rotation")?;
    with_sample_kind!(buffer.sample_type(), K => remap::<K>(buffer, rotation, horizontal_flip))
}

/// The quarter-turn case of [`rotate_and_flip`]: the result has width and
/// height swapped. `Rotation::R90` with a flip is a plain transpose.
pub fn rotate_and_flip_swapping_rows_and_columns(
    buffer: &PixelBuffer,
    rotation: Rotation,
    horizontal_flip: bool,
) -> Result<PixelBuffer, PixelError> {
    if !rotation.swaps_axes() {
        return Err(PixelError::InvalidGeometry(format!(
            "{} degrees does not swap rows and columns",
            rotation.degrees()
        )));
    }
    rotate_and_flip(buffer, rotation, horizontal_flip)
}

fn remap<K: SampleKind>(
    buffer: &PixelBuffer,
    rotation: Rotation,
    horizontal_flip: bool,
) -> Result<PixelBuffer, PixelError> {
    let (height, width) = (buffer.height(), buffer.width());
    let plane = buffer.plane::<K>(0)?;
    let (rows, columns) = view_dimensions(height, width, rotation);

    let mut out = Vec::with_capacity(plane.len());
    for row in 0..rows {
        for column in 0..columns {
            let offset =
                get_offset_into_matrix(row, column, height, width, rotation, horizontal_flip);
            out.push(plane[offset]);
        }
    }
    PixelBuffer::from_plane::<K>(columns, rows, out)
}
