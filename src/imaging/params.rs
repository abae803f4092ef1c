//! Requests passed from the [`operations`](super::operations) chains to the
//! [`backend`](super::backend) implementations.
//!
//! - [`ResampleParams`] : selection, destination size, signedness, background.
//! - [`FallbackFilter`]: interpolation kernel for the generic resize path.
//! - [`Rotation`]: quarter-turn rotations for flip/rotate transforms.

use crate::raster::{PixelBuffer, PixelError, Rect};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Full specification of one resample call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleParams {
    /// Source region to resample; may extend past the source edges.
    pub selection: Rect,
    pub width: usize,
    pub height: usize,
    /// Interpret 8/16-bit integer words as signed.
    pub signed: bool,
    /// Value contributed by selection samples outside the source.
    pub background: f64,
}

impl ResampleParams {
    /// Resample the whole of `source` to `width` x `height`.
    pub fn full(source: &PixelBuffer, width: usize, height: usize) -> Self {
        Self {
            selection: Rect::full(source.width(), source.height()),
            width,
            height,
            signed: source.sample_type().is_signed(),
            background: 0.0,
        }
    }

    pub fn with_selection(mut self, selection: Rect) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    /// Whether this is a no-op for `source`.
    pub fn is_identity_for(&self, source: &PixelBuffer) -> bool {
        self.selection == Rect::full(source.width(), source.height())
            && self.width == source.width()
            && self.height == source.height()
    }

    pub fn validate(&self) -> Result<(), PixelError> {
        if self.selection.is_empty() || self.width == 0 || self.height == 0 {
            return Err(PixelError::InvalidGeometry(format!(
                "cannot resample selection {} to {}x{}",
                self.selection, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Interpolation kernel used when the weighted-area path is unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackFilter {
    Nearest,
    /// Linear; the closest the `image` crate offers to a box filter.
    Triangle,
    /// Bicubic.
    #[default]
    CatmullRom,
    Lanczos3,
}

impl FallbackFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Clockwise quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self, PixelError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::R0),
            90 => Ok(Self::R90),
            180 => Ok(Self::R180),
            270 => Ok(Self::R270),
            _ => Err(PixelError::InvalidGeometry(format!(
                "rotation of {degrees} degrees is not a multiple of 90"
            ))),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Whether rows and columns trade places.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }
}
