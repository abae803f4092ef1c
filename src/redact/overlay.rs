//! Overlay burn-in.
//!
//! Every set overlay bit becomes a foreground pixel with a background
//! shadow one pixel down and to the right, so the overlay stays legible on
//! any image content.

use super::canvas::FrameCanvas;
use crate::metadata::{MAX_OVERLAYS, OverlayPlane};
use crate::raster::{PixelError, SampleKind};

/// Reject overlay sets a frame cannot carry: group indices outside 0–15,
/// the same group twice, or more than [`MAX_OVERLAYS`] planes.
pub(crate) fn validate_overlays(
    planes: &[(&OverlayPlane, usize)],
    frame: usize,
) -> Result<(), PixelError> {
    if planes.len() > MAX_OVERLAYS {
        return Err(PixelError::InvalidGeometry(format!(
            "frame {frame} has {} overlays, at most {MAX_OVERLAYS} are allowed",
            planes.len()
        )));
    }
    let mut seen = [false; MAX_OVERLAYS];
    for (plane, _) in planes {
        let group = usize::from(plane.group);
        if group >= MAX_OVERLAYS || std::mem::replace(&mut seen[group], true) {
            return Err(PixelError::InvalidGeometry(format!(
                "frame {frame} has overlay group {group} out of range or repeated"
            )));
        }
    }
    Ok(())
}

/// Paint each plane's shadow, then its bits.
pub(crate) fn burn_in<K: SampleKind>(
    canvas: &mut FrameCanvas<'_, K>,
    planes: &[(&OverlayPlane, usize)],
    background: &[K::Raw],
    foreground: &[K::Raw],
) {
    for &(plane, overlay_frame) in planes {
        let top = plane.origin_row - 1;
        let left = plane.origin_column - 1;
        for row in 0..plane.rows {
            for column in 0..plane.columns {
                if plane.is_set(overlay_frame, row, column) {
                    canvas.put(left + column as i64 + 1, top + row as i64 + 1, background);
                }
            }
        }
        for row in 0..plane.rows {
            for column in 0..plane.columns {
                if plane.is_set(overlay_frame, row, column) {
                    canvas.put(left + column as i64, top + row as i64, foreground);
                }
            }
        }
    }
}
