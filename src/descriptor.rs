//! Raw study descriptors for the batch driver.
//!
//! A study is a file of little-endian samples, frame after frame, plus a JSON
//! descriptor giving its geometry and metadata:
//!
//! ```json
//! {
//!   "data": "ct-042.raw",
//!   "width": 512,
//!   "height": 512,
//!   "bands": 1,
//!   "sample_type": "i16",
//!   "layout": "interleaved",
//!   "frames": 120,
//!   "metadata": { "bits_allocated": 16, "bits_stored": 12, "high_bit": 11,
//!                 "pixel_representation": 1 }
//! }
//! ```
//!
//! `data` is resolved relative to the descriptor. Banded studies store each
//! frame's bands one after another, the same bytes as planar.

use crate::metadata::PixelMetadata;
use crate::raster::{FrameSequence, Layout, PixelBuffer, PixelError, SampleData, SampleType};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{} holds {actual} bytes, descriptor expects {expected}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
    #[error("unusable geometry: {0}")]
    Geometry(String),
    #[error(transparent)]
    Pixel(#[from] PixelError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DescriptorError {
    move |source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn default_layout() -> Layout {
    Layout::Interleaved
}

fn default_frames() -> usize {
    1
}

/// Geometry and metadata of one raw study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDescriptor {
    /// Sample file, relative to the descriptor.
    pub data: PathBuf,
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub sample_type: SampleType,
    #[serde(default = "default_layout")]
    pub layout: Layout,
    #[serde(default = "default_frames")]
    pub frames: usize,
    #[serde(default)]
    pub metadata: PixelMetadata,
}

impl RawDescriptor {
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = fs::read_to_string(path).map_err(io_error(path))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DescriptorError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_error(path))
    }

    /// The sample file, given where the descriptor lives.
    pub fn data_path(&self, descriptor: &Path) -> PathBuf {
        match descriptor.parent() {
            Some(dir) if self.data.is_relative() => dir.join(&self.data),
            _ => self.data.clone(),
        }
    }

    /// Bytes per frame. Empty or overflowing geometry is an error.
    pub fn frame_bytes(&self) -> Result<u64, DescriptorError> {
        let bytes = [self.height, self.bands, self.sample_type.bytes_per_sample()]
            .into_iter()
            .try_fold(self.width as u64, |acc, n| acc.checked_mul(n as u64))
            .ok_or_else(|| self.geometry_error("overflows"))?;
        if bytes == 0 {
            return Err(self.geometry_error("is empty"));
        }
        Ok(bytes)
    }

    fn geometry_error(&self, problem: &str) -> DescriptorError {
        DescriptorError::Geometry(format!(
            "{}x{}x{} {} x {} frames {problem}",
            self.width,
            self.height,
            self.bands,
            self.sample_type,
            self.frames
        ))
    }

    /// Read every frame of the study described by the file at `descriptor`.
    pub fn read_frames(&self, descriptor: &Path) -> Result<FrameSequence, DescriptorError> {
        let expected = self
            .frame_bytes()?
            .checked_mul(self.frames as u64)
            .ok_or_else(|| self.geometry_error("overflows"))?;
        if self.frames == 0 {
            return Err(self.geometry_error("is empty"));
        }
        let path = self.data_path(descriptor);
        let file = File::open(&path).map_err(io_error(&path))?;
        let actual = file.metadata().map_err(io_error(&path))?.len();
        if actual != expected {
            return Err(DescriptorError::SizeMismatch {
                path,
                expected,
                actual,
            });
        }

        let mut reader = BufReader::new(file);
        let plane = self.width * self.height;
        let mut frames = Vec::with_capacity(self.frames);
        for _ in 0..self.frames {
            let frame = match self.layout {
                Layout::Banded => {
                    let banks = (0..self.bands)
                        .map(|_| SampleData::read_le(self.sample_type, plane, &mut reader))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(io_error(&path))?;
                    PixelBuffer::banded(self.width, self.height, self.sample_type, banks)?
                }
                layout => {
                    let len = plane * self.bands;
                    let data = SampleData::read_le(self.sample_type, len, &mut reader)
                        .map_err(io_error(&path))?;
                    let build = match layout {
                        Layout::Planar => PixelBuffer::planar,
                        _ => PixelBuffer::interleaved,
                    };
                    build(self.width, self.height, self.bands, self.sample_type, data)?
                }
            };
            frames.push(frame);
        }
        Ok(FrameSequence::new(frames)?)
    }
}

/// Write frames to `path`, each bank in turn. Frames must be compact.
pub fn write_frames<I>(path: &Path, frames: I) -> Result<(), DescriptorError>
where
    I: IntoIterator<Item = Result<PixelBuffer, PixelError>>,
{
    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);
    for frame in frames {
        for bank in frame?.banks() {
            bank.write_le(&mut out).map_err(io_error(path))?;
        }
    }
    out.flush().map_err(io_error(path))
}
