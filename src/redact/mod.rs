//! Region redaction with optional overlay burn-in.
//!
//! [`RedactionEngine::redact`] turns a [`FrameSequence`] into a new sequence
//! in which every requested region is filled with the background value.
//! Each frame goes through the same three steps:
//!
//! 1. copy the source samples into a compact destination frame
//! 2. with `burn_in_overlays`, paint each overlay plane (shadow, then bits)
//! 3. fill every clipped region, all bands, with the background
//!
//! Destination frames land in memory or in temp files depending on the
//! engine's [`SpillPolicy`]; the choice is made once, before any frame is
//! allocated. The result owns that storage: see [`RedactedFrames::release`].
//!
//! Only 8- and 16-bit integer samples are redacted. The metadata's pixel
//! representation decides whether their words are read as signed.

mod canvas;
mod overlay;
pub mod spill;
mod values;

pub use spill::{SpillPolicy, SpilloverStorage, StorageKind};
pub use values::FillValues;

use crate::metadata::{Photometric, PixelMetadata};
use crate::raster::{
    FrameSequence, Layout, PixelBuffer, PixelError, Rect, SampleData, SampleKind, SampleType,
    Strides, with_sample_kind,
};
use canvas::FrameCanvas;
use log::debug;
use serde::{Deserialize, Serialize};
use spill::StorageWriter;
use std::path::Path;

/// A rectangle to black out, in pixel coordinates of the frame.
pub type RedactionRegion = Rect;

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedactionFlags {
    pub burn_in_overlays: bool,
    pub use_pixel_padding_value: bool,
    pub use_explicit_value: bool,
    pub explicit_value: i64,
}

impl Default for RedactionFlags {
    fn default() -> Self {
        Self {
            burn_in_overlays: false,
            use_pixel_padding_value: true,
            use_explicit_value: false,
            explicit_value: 0,
        }
    }
}

impl RedactionFlags {
    /// Fill with `value`, ignoring padding and polarity.
    pub fn explicit(value: i64) -> Self {
        Self {
            use_explicit_value: true,
            explicit_value: value,
            ..Self::default()
        }
    }
}

/// Redacted frames and the storage holding them.
#[derive(Debug)]
pub struct RedactedFrames {
    width: usize,
    height: usize,
    bands: usize,
    sample_type: SampleType,
    layout: Layout,
    frame_count: usize,
    storage: SpilloverStorage,
}

impl RedactedFrames {
    /// Frames produced by the redaction; unchanged by [`release`](Self::release).
    pub fn len(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// `None` once released.
    pub fn storage_kind(&self) -> Option<StorageKind> {
        self.storage.kind()
    }

    pub fn spill_paths(&self) -> Vec<&Path> {
        self.storage.paths()
    }

    /// Load frame `index` as a compact buffer.
    pub fn frame(&self, index: usize) -> Result<PixelBuffer, PixelError> {
        let data = self.storage.read(index)?;
        PixelBuffer::new(
            self.width,
            self.height,
            self.bands,
            self.sample_type,
            Strides::compact(self.layout, self.width, self.height, self.bands),
            vec![data],
        )
    }

    /// Load every frame.
    pub fn to_frame_sequence(&self) -> Result<FrameSequence, PixelError> {
        FrameSequence::new((0..self.len()).map(|i| self.frame(i)).collect::<Result<_, _>>()?)
    }

    /// Give up the storage, deleting any temp files. Idempotent.
    pub fn release(&mut self) -> Result<(), PixelError> {
        self.storage.release()
    }

    pub fn is_released(&self) -> bool {
        self.storage.is_released()
    }
}

#[derive(Debug)]
pub struct RedactionOutcome {
    pub frames: RedactedFrames,
    pub metadata: PixelMetadata,
}

/// Redacts frame sequences under one spill policy. Holds no per-call state,
/// so one engine can serve several threads.
#[derive(Debug, Clone, Default)]
pub struct RedactionEngine {
    policy: SpillPolicy,
}

impl RedactionEngine {
    pub fn new(policy: SpillPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SpillPolicy {
        &self.policy
    }

    pub fn redact(
        &self,
        frames: &FrameSequence,
        regions: &[RedactionRegion],
        metadata: &PixelMetadata,
        flags: &RedactionFlags,
    ) -> Result<RedactionOutcome, PixelError> {
        let first = frames.first();
        let (width, height, bands) = (first.width(), first.height(), first.bands());
        if !first.sample_type().is_integer() {
            return Err(PixelError::UnsupportedFormat(format!(
                "cannot redact {} samples",
                first.sample_type()
            )));
        }
        if let Some(index) = frames.frames().iter().position(|f| f.bank_count() > 1) {
            return Err(PixelError::InternalInconsistency(format!(
                "frame {index} stores its bands in separate banks"
            )));
        }
        let layout = match first.layout()? {
            Layout::Planar if bands > 1 => Layout::Planar,
            _ => Layout::Interleaved,
        };

        let clipped = clip_regions(regions, width, height)?;
        let overlays = if flags.burn_in_overlays {
            (0..frames.len())
                .map(|frame| {
                    let planes = metadata.overlays_for_frame(frame);
                    overlay::validate_overlays(&planes, frame)?;
                    Ok(planes)
                })
                .collect::<Result<Vec<_>, PixelError>>()?
        } else {
            Vec::new()
        };

        let sample_type = first.sample_type().with_signedness(metadata.is_signed());
        let fill = FillValues::derive(metadata, flags, sample_type, bands);
        let kind = self.policy.choose(frames.len(), frames.frame_byte_size());
        debug!(
            "redacting {} frame(s) of {width}x{height}x{bands} {sample_type}, {} region(s), storage: {kind}",
            frames.len(),
            clipped.len()
        );

        let strides = Strides::compact(layout, width, height, bands);
        let mut writer = StorageWriter::create(kind, &self.policy)?;
        with_sample_kind!(sample_type, K => {
            let background: Vec<<K as SampleKind>::Raw> =
                fill.background.iter().map(|&v| K::from_f64(v)).collect();
            let foreground: Vec<<K as SampleKind>::Raw> =
                fill.foreground.iter().map(|&v| K::from_f64(v)).collect();
            for (index, frame) in frames.frames().iter().enumerate() {
                let mut data = compact_copy(frame, layout)?;
                let samples = K::slice_mut(&mut data).ok_or_else(|| {
                    PixelError::InternalInconsistency(format!("frame {index} storage mismatch"))
                })?;
                let mut canvas = FrameCanvas::<K>::new(samples, width, height, strides);
                if let Some(planes) = overlays.get(index) {
                    overlay::burn_in(&mut canvas, planes, &background, &foreground);
                }
                for &region in &clipped {
                    canvas.fill(region, &background);
                }
                writer.push(data)?;
            }
        });

        let storage = writer.finish(sample_type, width * height * bands)?;
        Ok(RedactionOutcome {
            frames: RedactedFrames {
                width,
                height,
                bands,
                sample_type,
                layout,
                frame_count: frames.len(),
                storage,
            },
            metadata: updated_metadata(metadata, sample_type, bands, layout, flags),
        })
    }
}

/// Clip every region to the frame, dropping those entirely outside.
fn clip_regions(regions: &[Rect], width: usize, height: usize) -> Result<Vec<Rect>, PixelError> {
    let mut clipped = Vec::with_capacity(regions.len());
    for region in regions {
        if region.is_empty() {
            return Err(PixelError::InvalidGeometry(format!(
                "redaction region {region} has no area"
            )));
        }
        match region.clip(width, height) {
            Some(inside) => clipped.push(inside),
            None => debug!("region {region} lies outside the {width}x{height} frame, skipped"),
        }
    }
    Ok(clipped)
}

/// The frame's samples in a fresh compact bank.
fn compact_copy(frame: &PixelBuffer, layout: Layout) -> Result<SampleData, PixelError> {
    frame
        .repack(layout)?
        .into_banks()
        .into_iter()
        .next()
        .ok_or_else(|| PixelError::InternalInconsistency("repacked frame has no bank".into()))
}

fn updated_metadata(
    metadata: &PixelMetadata,
    sample_type: SampleType,
    bands: usize,
    layout: Layout,
    flags: &RedactionFlags,
) -> PixelMetadata {
    let bits = sample_type.bits();
    let mut out = metadata.clone();
    out.bits_allocated = bits;
    out.bits_stored = match metadata.bits_stored {
        0 => bits,
        stored => stored.min(bits),
    };
    out.high_bit = metadata.high_bit.min(bits - 1);
    out.samples_per_pixel = bands as u32;
    out.planar_configuration = u32::from(layout == Layout::Planar);
    if metadata.photometric == Photometric::YbrFull422 && metadata.chroma_upsampled {
        out.photometric = Photometric::YbrFull;
        out.chroma_upsampled = false;
    }
    if flags.burn_in_overlays {
        out.overlays.clear();
    }
    out
}
