//! # pixelscrub
//!
//! A pixel-buffer engine for decoded medical images. It prepares frames for
//! display and de-identifies them by blacking out regions; it never decodes
//! or encodes a file format. Callers hand it canonical raw buffers and a
//! metadata record and get raw buffers plus updated metadata back.
//!
//! # Operations
//!
//! ```text
//! display:    PixelBuffer ─ resample ─ YBR→RGB ─ favorable format ─→ DisplayRaster
//! redaction:  FrameSequence ─ copy ─ overlay burn-in ─ region fill ─→ RedactedFrames
//! transforms: PixelBuffer ─ flip / rotate / transpose ─→ PixelBuffer
//! ```
//!
//! Every operation is synchronous and holds no shared state beyond read-only
//! configuration, so independent studies can be processed on separate
//! threads (the batch driver does this with rayon).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`raster`] | Sample types, strided buffers, frame sequences and [`raster::PixelError`] |
//! | [`imaging`] | Resampling chain, color conversion, flips and rotations |
//! | [`redact`] | Region blackout, overlay burn-in and spill-to-disk storage |
//! | [`metadata`] | Pixel-describing attributes and overlay bitmaps |
//! | [`config`] | `pixelscrub.toml` loading, validation and merging |
//! | [`descriptor`] | JSON descriptors for raw sample files used by the CLI |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Loop Per Operation
//!
//! Five numeric representations (8/16-bit unsigned and signed, 32/64-bit
//! float) flow through every operation. Rather than one copy of each loop per
//! type, loops are generic over a zero-sized [`raster::SampleKind`] tag that
//! fixes the stored word, the accumulator and the sign-extension rule. A
//! runtime [`raster::SampleType`] selects the tag once per call.
//!
//! ## Escalation Instead of Guessing
//!
//! Inputs an algorithm cannot handle fail with
//! [`raster::PixelError::UnsupportedFormat`], and only that variant moves an
//! ordered chain on to its next step: weighted-area resampling falls back to
//! interpolation, a direct color remap falls back to repacking, band
//! combination and finally compositing. Geometry errors and I/O failures
//! stop immediately.
//!
//! ## Bounded Memory for Large Studies
//!
//! Multi-frame studies can run to gigabytes. Before the first redacted frame
//! is allocated, a [`redact::SpillPolicy`] picks memory, one temp file, or
//! one temp file per frame from the total output size. The result owns its
//! temp files and deletes them on release or drop.

pub mod config;
pub mod descriptor;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod raster;
pub mod redact;

#[cfg(test)]
pub(crate) mod test_helpers;
