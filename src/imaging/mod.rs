//! Display-side pixel operations on canonical buffers.
//!
//! | Operation | Implementation |
//! |---|---|
//! | **Resample** | exact weighted-area filter, `image` crate interpolation as fallback |
//! | **Color conversion** | YBR→RGB matrix, four-step most-favorable-format chain |
//! | **Flip / rotate** | in-place flips, quarter turns through one coordinate mapping |
//!
//! Submodules:
//! - **Calculations**: resampling weights and rotation index math (unit testable)
//! - **Parameters**: request types handed to backends
//! - **Backend**: [`ResampleBackend`] trait + [`WeightedAreaBackend`] and
//!   [`InterpolatingBackend`]
//! - **Color** / **Transform**: conversions and flips on whole buffers
//! - **Operations**: fallback chains combining the above

pub mod backend;
pub mod calculations;
pub mod color;
mod dynamic;
pub mod interpolate;
pub mod operations;
mod params;
pub mod transform;
pub mod weighted;

pub use backend::ResampleBackend;
pub use calculations::{ResamplingVector, get_offset_into_matrix, get_position_in_view};
pub use color::{
    ConversionPath, Converted, DisplayRaster, PackedMasks, PackedRaster, TargetFormat,
    convert_band_count, convert_to_format, convert_ybr_to_rgb, rgb_to_ybr, ybr_to_rgb,
};
pub use interpolate::InterpolatingBackend;
pub use operations::{
    DisplayFrame, DisplayRequest, ResamplePath, Resampled, prepare_for_display, resample,
    resample_with_fallback,
};
pub use params::{FallbackFilter, ResampleParams, Rotation};
pub use transform::{
    flip_horizontally, flip_vertically, rotate_and_flip,
    rotate_and_flip_swapping_rows_and_columns,
};
pub use weighted::WeightedAreaBackend;
