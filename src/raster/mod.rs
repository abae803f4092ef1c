//! Canonical raw pixel data shared by every operation.
//!
//! - **Samples**: [`SampleType`] at runtime, [`SampleKind`] tags at compile time
//! - **Buffers**: [`PixelBuffer`] (strided, one or more banks) and [`FrameSequence`]
//! - **Errors**: [`PixelError`], the failure taxonomy for the whole engine

mod buffer;
mod error;
pub mod sample;

pub use buffer::{FrameSequence, Layout, PixelBuffer, Rect, Strides};
pub use error::PixelError;
pub(crate) use sample::with_sample_kind;
pub use sample::{Accumulator, SampleData, SampleKind, SampleType};
