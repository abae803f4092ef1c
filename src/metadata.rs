//! Pixel metadata travelling alongside a frame sequence.
//!
//! The record mirrors the image-pixel attributes a medical imaging header
//! carries: bit depths, sample layout, photometric interpretation, pixel
//! representation and padding, plus overlay planes. Parsing those headers is
//! somebody else's job; this crate only reads the record and returns an
//! updated copy.
//!
//! ## Overlays
//!
//! An [`OverlayPlane`] is a 1-bit bitmap placed over the image. Its origin is
//! **1-based** (`origin_row = 1, origin_column = 1` is the top-left pixel).
//! Bits are packed least significant bit first, row-major, frame after
//! frame. A plane with `frame_count > 1` covers the image frames
//! `image_frame_origin ..` (1-based); a single-frame plane applies to every
//! image frame.

use serde::{Deserialize, Serialize};

/// How many overlay planes one frame can carry.
pub const MAX_OVERLAYS: usize = 16;

/// Photometric interpretation of the stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Photometric {
    /// Minimum sample is white.
    #[serde(rename = "MONOCHROME1")]
    Monochrome1,
    #[default]
    #[serde(rename = "MONOCHROME2")]
    Monochrome2,
    #[serde(rename = "PALETTE COLOR")]
    PaletteColor,
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "YBR_FULL")]
    YbrFull,
    #[serde(rename = "YBR_FULL_422")]
    YbrFull422,
    #[serde(rename = "YBR_PARTIAL_422")]
    YbrPartial422,
    #[serde(rename = "YBR_ICT")]
    YbrIct,
    #[serde(rename = "YBR_RCT")]
    YbrRct,
}

impl Photometric {
    pub fn is_ybr(self) -> bool {
        matches!(
            self,
            Self::YbrFull | Self::YbrFull422 | Self::YbrPartial422 | Self::YbrIct | Self::YbrRct
        )
    }
}

/// A 1-bit overlay bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayPlane {
    /// Overlay group index, 0–15.
    pub group: u8,
    pub rows: usize,
    pub columns: usize,
    /// 1-based row of the bitmap's top-left bit in the image.
    pub origin_row: i64,
    /// 1-based column of the bitmap's top-left bit in the image.
    pub origin_column: i64,
    #[serde(default = "one")]
    pub frame_count: usize,
    /// 1-based first image frame covered by a multi-frame plane.
    #[serde(default = "one")]
    pub image_frame_origin: usize,
    /// Packed bits, LSB first.
    pub data: Vec<u8>,
}

fn one() -> usize {
    1
}

impl OverlayPlane {
    /// Overlay frame shown on the 0-based `image_frame`, if any.
    pub fn overlay_frame_for(&self, image_frame: usize) -> Option<usize> {
        if self.frame_count <= 1 {
            return Some(0);
        }
        let first = self.image_frame_origin.saturating_sub(1);
        image_frame
            .checked_sub(first)
            .filter(|&frame| frame < self.frame_count)
    }

    /// Whether the bit at (`row`, `column`) of `overlay_frame` is set.
    /// Bits past the end of `data` read as clear.
    pub fn is_set(&self, overlay_frame: usize, row: usize, column: usize) -> bool {
        let index = (overlay_frame * self.rows + row) * self.columns + column;
        self.data
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }

    /// Build a single-frame plane from a row-major bool grid.
    pub fn from_bits(group: u8, origin_row: i64, origin_column: i64, bits: &[Vec<bool>]) -> Self {
        let rows = bits.len();
        let columns = bits.first().map_or(0, Vec::len);
        let mut data = vec![0u8; (rows * columns).div_ceil(8)];
        for (index, _) in bits
            .iter()
            .flat_map(|row| row.iter())
            .enumerate()
            .filter(|(_, set)| **set)
        {
            data[index / 8] |= 1 << (index % 8);
        }
        Self {
            group,
            rows,
            columns,
            origin_row,
            origin_column,
            frame_count: 1,
            image_frame_origin: 1,
            data,
        }
    }
}

/// Pixel-describing attributes of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PixelMetadata {
    pub bits_allocated: u32,
    pub bits_stored: u32,
    pub high_bit: u32,
    pub samples_per_pixel: u32,
    /// 0 = interleaved, 1 = planar.
    pub planar_configuration: u32,
    pub photometric: Photometric,
    /// 0 = unsigned, 1 = two's complement.
    pub pixel_representation: u32,
    pub pixel_padding_value: Option<i64>,
    /// Display inverted on top of the photometric interpretation.
    pub inverted: bool,
    /// YBR_FULL_422 samples were already upsampled to full chroma.
    pub chroma_upsampled: bool,
    pub overlays: Vec<OverlayPlane>,
}

impl Default for PixelMetadata {
    fn default() -> Self {
        Self {
            bits_allocated: 8,
            bits_stored: 8,
            high_bit: 7,
            samples_per_pixel: 1,
            planar_configuration: 0,
            photometric: Photometric::Monochrome2,
            pixel_representation: 0,
            pixel_padding_value: None,
            inverted: false,
            chroma_upsampled: false,
            overlays: Vec::new(),
        }
    }
}

impl PixelMetadata {
    /// Monochrome metadata with `bits` allocated and stored.
    pub fn monochrome(bits: u32, signed: bool) -> Self {
        Self {
            bits_allocated: bits,
            bits_stored: bits,
            high_bit: bits.saturating_sub(1),
            pixel_representation: u32::from(signed),
            ..Self::default()
        }
    }

    pub fn is_signed(&self) -> bool {
        self.pixel_representation == 1
    }

    /// Whether the lowest sample value displays as white.
    pub fn is_inverted(&self) -> bool {
        self.inverted || self.photometric == Photometric::Monochrome1
    }

    /// Overlay planes shown on the 0-based `image_frame`, with the overlay
    /// frame each one contributes.
    pub fn overlays_for_frame(&self, image_frame: usize) -> Vec<(&OverlayPlane, usize)> {
        self.overlays
            .iter()
            .filter_map(|plane| Some((plane, plane.overlay_frame_for(image_frame)?)))
            .collect()
    }
}
