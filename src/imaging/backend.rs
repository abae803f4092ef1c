//! Resampling backend trait.
//!
//! The [`ResampleBackend`] trait is the seam of the resample fallback chain:
//! [`operations::resample_with_fallback`](super::operations::resample_with_fallback)
//! tries a primary backend and escalates to a secondary one when the primary
//! reports [`PixelError::UnsupportedFormat`].
//!
//! | Backend | Role |
//! |---|---|
//! | [`WeightedAreaBackend`](super::weighted::WeightedAreaBackend) | exact fixed-point area average, single-band or planar |
//! | [`InterpolatingBackend`](super::interpolate::InterpolatingBackend) | `image` crate filters, any 1–4 band buffer |

use super::params::ResampleParams;
use crate::raster::{PixelBuffer, PixelError};

/// Trait for resampling backends.
///
/// Backends are stateless apart from read-only settings so one instance can
/// serve concurrent calls on different images.
pub trait ResampleBackend: Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Resample `params.selection` of `source` to `params.width` x `params.height`.
    fn resample(
        &self,
        source: &PixelBuffer,
        params: &ResampleParams,
    ) -> Result<PixelBuffer, PixelError>;
}
