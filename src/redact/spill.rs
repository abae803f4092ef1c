//! Capacity-aware storage for redacted frames.
//!
//! Before the first destination frame is allocated the [`SpillPolicy`]
//! picks one of three backings from the total output size:
//!
//! | Total size | Backing |
//! |---|---|
//! | ≤ `memory_threshold` | one in-memory array per frame |
//! | > `multi_file_threshold` (several frames, threshold set) | one temp file per frame |
//! | otherwise | one temp file, frames appended in order |
//!
//! Temp files are [`TempPath`]s owned by the storage: dropping the storage
//! deletes them as a best effort, [`SpilloverStorage::release`] deletes them
//! and reports failures.

use crate::raster::{PixelError, SampleData, SampleType};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// Default in-memory budget: 1 GiB.
pub const DEFAULT_MEMORY_THRESHOLD: u64 = 1 << 30;

/// Thresholds deciding where redacted frames live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpillPolicy {
    /// Largest total output, in bytes, kept in memory.
    pub memory_threshold: u64,
    /// Above this total, multi-frame output gets one file per frame.
    pub multi_file_threshold: Option<u64>,
    /// Directory for temp files; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for SpillPolicy {
    fn default() -> Self {
        Self {
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            multi_file_threshold: None,
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    Memory,
    SingleFile,
    FilePerFrame,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::SingleFile => "single temp file",
            Self::FilePerFrame => "temp file per frame",
        })
    }
}

impl SpillPolicy {
    pub fn choose(&self, frame_count: usize, frame_bytes: usize) -> StorageKind {
        let total = frame_count as u64 * frame_bytes as u64;
        if total <= self.memory_threshold {
            StorageKind::Memory
        } else if frame_count > 1 && self.multi_file_threshold.is_some_and(|t| total > t) {
            StorageKind::FilePerFrame
        } else {
            StorageKind::SingleFile
        }
    }
}

fn create_temp(temp_dir: Option<&Path>) -> Result<NamedTempFile, PixelError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pixelscrub-").suffix(".raw");
    match temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(PixelError::io("creating spill file"))
}

/// Frames being written, in order.
pub(crate) enum StorageWriter {
    Memory(Vec<SampleData>),
    SingleFile {
        file: BufWriter<NamedTempFile>,
        frames: usize,
    },
    FilePerFrame {
        temp_dir: Option<PathBuf>,
        paths: Vec<TempPath>,
    },
}

impl StorageWriter {
    /// Open the backing for `kind`. The single file is created up front;
    /// per-frame files are created as frames arrive.
    pub(crate) fn create(kind: StorageKind, policy: &SpillPolicy) -> Result<Self, PixelError> {
        Ok(match kind {
            StorageKind::Memory => Self::Memory(Vec::new()),
            StorageKind::SingleFile => Self::SingleFile {
                file: BufWriter::new(create_temp(policy.temp_dir.as_deref())?),
                frames: 0,
            },
            StorageKind::FilePerFrame => Self::FilePerFrame {
                temp_dir: policy.temp_dir.clone(),
                paths: Vec::new(),
            },
        })
    }

    pub(crate) fn push(&mut self, frame: SampleData) -> Result<(), PixelError> {
        match self {
            Self::Memory(frames) => frames.push(frame),
            Self::SingleFile { file, frames } => {
                frame
                    .write_le(file)
                    .map_err(PixelError::io(format!("writing frame {frames} to spill file")))?;
                *frames += 1;
            }
            Self::FilePerFrame { temp_dir, paths } => {
                let index = paths.len();
                let mut file = BufWriter::new(create_temp(temp_dir.as_deref())?);
                frame
                    .write_le(&mut file)
                    .map_err(PixelError::io(format!("writing frame {index} spill file")))?;
                let file = file.into_inner().map_err(|e| {
                    PixelError::io(format!("flushing frame {index} spill file"))(e.into_error())
                })?;
                paths.push(file.into_temp_path());
            }
        }
        Ok(())
    }

    /// Close any open file and hand the frames over for reading.
    pub(crate) fn finish(
        self,
        sample_type: SampleType,
        samples_per_frame: usize,
    ) -> Result<SpilloverStorage, PixelError> {
        let backing = match self {
            Self::Memory(frames) => Backing::Memory(frames),
            Self::SingleFile { mut file, frames } => {
                file.flush().map_err(PixelError::io("flushing spill file"))?;
                let file = file
                    .into_inner()
                    .map_err(|e| PixelError::io("closing spill file")(e.into_error()))?;
                Backing::SingleFile {
                    path: file.into_temp_path(),
                    frames,
                }
            }
            Self::FilePerFrame { paths, .. } => Backing::FilePerFrame(paths),
        };
        Ok(SpilloverStorage {
            backing,
            sample_type,
            samples_per_frame,
        })
    }
}

enum Backing {
    Memory(Vec<SampleData>),
    SingleFile { path: TempPath, frames: usize },
    FilePerFrame(Vec<TempPath>),
    Released,
}

/// Where the frames of a redaction result live.
pub struct SpilloverStorage {
    backing: Backing,
    sample_type: SampleType,
    samples_per_frame: usize,
}

impl std::fmt::Debug for SpilloverStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpilloverStorage")
            .field("kind", &self.kind())
            .field("frames", &self.len())
            .field("paths", &self.paths())
            .finish()
    }
}

impl SpilloverStorage {
    /// `None` once released.
    pub fn kind(&self) -> Option<StorageKind> {
        match self.backing {
            Backing::Memory(_) => Some(StorageKind::Memory),
            Backing::SingleFile { .. } => Some(StorageKind::SingleFile),
            Backing::FilePerFrame(_) => Some(StorageKind::FilePerFrame),
            Backing::Released => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Memory(frames) => frames.len(),
            Backing::SingleFile { frames, .. } => *frames,
            Backing::FilePerFrame(paths) => paths.len(),
            Backing::Released => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_released(&self) -> bool {
        matches!(self.backing, Backing::Released)
    }

    /// Temp files currently owned.
    pub fn paths(&self) -> Vec<&Path> {
        match &self.backing {
            Backing::SingleFile { path, .. } => vec![&**path],
            Backing::FilePerFrame(paths) => paths.iter().map(|p| &**p).collect(),
            Backing::Memory(_) | Backing::Released => Vec::new(),
        }
    }

    /// Samples of frame `index`.
    pub fn read(&self, index: usize) -> Result<SampleData, PixelError> {
        if index >= self.len() {
            return Err(PixelError::InvalidGeometry(format!(
                "frame {index} requested from storage holding {} frames",
                self.len()
            )));
        }
        let frame_bytes = self.samples_per_frame * self.sample_type.bytes_per_sample();
        match &self.backing {
            Backing::Memory(frames) => Ok(frames[index].clone()),
            Backing::SingleFile { path, .. } => {
                let mut file = File::open(path).map_err(PixelError::io("opening spill file"))?;
                file.seek(SeekFrom::Start((index * frame_bytes) as u64))
                    .map_err(PixelError::io(format!("seeking to frame {index}")))?;
                SampleData::read_le(
                    self.sample_type,
                    self.samples_per_frame,
                    &mut BufReader::new(file),
                )
                .map_err(PixelError::io(format!("reading frame {index}")))
            }
            Backing::FilePerFrame(paths) => {
                let file = File::open(&paths[index])
                    .map_err(PixelError::io(format!("opening frame {index} spill file")))?;
                SampleData::read_le(
                    self.sample_type,
                    self.samples_per_frame,
                    &mut BufReader::new(file),
                )
                .map_err(PixelError::io(format!("reading frame {index}")))
            }
            Backing::Released => Err(PixelError::InternalInconsistency(
                "storage already released".into(),
            )),
        }
    }

    /// Drop in-memory frames and delete temp files. Calling it again does
    /// nothing.
    pub fn release(&mut self) -> Result<(), PixelError> {
        let paths = match std::mem::replace(&mut self.backing, Backing::Released) {
            Backing::SingleFile { path, .. } => vec![path],
            Backing::FilePerFrame(paths) => paths,
            Backing::Memory(_) | Backing::Released => return Ok(()),
        };
        debug!("releasing {} spill file(s)", paths.len());
        let mut first_error = None;
        for path in paths {
            let display = path.to_path_buf();
            if let Err(err) = path.close() {
                first_error.get_or_insert(PixelError::Io {
                    context: format!("deleting spill file {}", display.display()),
                    source: err,
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
