//! Numeric sample kinds.
//!
//! Pixel data arrives in six numeric representations. 8- and 16-bit integer
//! samples are stored as raw `u8`/`u16` words and the [`SampleType`] decides
//! whether a word is zero- or sign-extended when it is read. Floats are stored
//! natively.
//!
//! Every pixel loop in the crate (resample, redact, flip, convert) is written
//! once, generic over [`SampleKind`]. A kind is a zero-sized tag carrying:
//!
//! | Concern | Item |
//! |---|---|
//! | Storage word | [`SampleKind::Raw`] |
//! | Accumulator | [`SampleKind::Acc`] (`i64` for integers, native float otherwise) |
//! | Sign-extension rule | [`SampleKind::extend`] |
//! | Clamp range | [`SampleKind::narrow`], [`SampleKind::from_f64`] |
//!
//! Runtime [`SampleType`] values are turned into a static kind with
//! [`with_sample_kind!`](crate::raster::with_sample_kind).

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::{self, Read, Write};

/// Runtime tag for the numeric representation of a buffer's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    F32,
    F64,
}

impl SampleType {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Natural width in bits of one stored sample.
    pub fn bits(self) -> u32 {
        self.bytes_per_sample() as u32 * 8
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16)
    }

    /// Reinterpret integer words as signed or unsigned. Floats are unchanged.
    pub fn with_signedness(self, signed: bool) -> Self {
        match (self, signed) {
            (Self::U8 | Self::I8, true) => Self::I8,
            (Self::U8 | Self::I8, false) => Self::U8,
            (Self::U16 | Self::I16, true) => Self::I16,
            (Self::U16 | Self::I16, false) => Self::U16,
            (other, _) => other,
        }
    }

    /// Largest representable value; used for alpha fill and polarity maxima.
    pub fn max_value(self) -> f64 {
        match self {
            Self::U8 => u8::MAX as f64,
            Self::I8 => i8::MAX as f64,
            Self::U16 => u16::MAX as f64,
            Self::I16 => i16::MAX as f64,
            Self::F32 | Self::F64 => 1.0,
        }
    }

    pub fn min_value(self) -> f64 {
        match self {
            Self::U8 | Self::U16 => 0.0,
            Self::I8 => i8::MIN as f64,
            Self::I16 => i16::MIN as f64,
            Self::F32 | Self::F64 => 0.0,
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::F32 => "float32",
            Self::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Storage for one bank of samples.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    Bytes(Vec<u8>),
    Words(Vec<u16>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

impl SampleData {
    pub fn zeroed(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::U8 | SampleType::I8 => Self::Bytes(vec![0; len]),
            SampleType::U16 | SampleType::I16 => Self::Words(vec![0; len]),
            SampleType::F32 => Self::Floats(vec![0.0; len]),
            SampleType::F64 => Self::Doubles(vec![0.0; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(v) => v.len(),
            Self::Words(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Doubles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this storage can hold samples of `sample_type`.
    pub fn matches(&self, sample_type: SampleType) -> bool {
        matches!(
            (self, sample_type),
            (Self::Bytes(_), SampleType::U8 | SampleType::I8)
                | (Self::Words(_), SampleType::U16 | SampleType::I16)
                | (Self::Floats(_), SampleType::F32)
                | (Self::Doubles(_), SampleType::F64)
        )
    }

    /// Write every sample little-endian.
    pub fn write_le<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Self::Bytes(v) => out.write_all(v),
            Self::Words(v) => v.iter().try_for_each(|s| out.write_all(&s.to_le_bytes())),
            Self::Floats(v) => v.iter().try_for_each(|s| out.write_all(&s.to_le_bytes())),
            Self::Doubles(v) => v.iter().try_for_each(|s| out.write_all(&s.to_le_bytes())),
        }
    }

    /// Read exactly `len` little-endian samples of `sample_type`.
    pub fn read_le<R: Read>(sample_type: SampleType, len: usize, input: &mut R) -> io::Result<Self> {
        let mut bytes = vec![0u8; len * sample_type.bytes_per_sample()];
        input.read_exact(&mut bytes)?;
        Ok(match sample_type {
            SampleType::U8 | SampleType::I8 => Self::Bytes(bytes),
            SampleType::U16 | SampleType::I16 => Self::Words(
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            SampleType::F32 => Self::Floats(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            SampleType::F64 => Self::Doubles(
                bytes
                    .chunks_exact(8)
                    .map(|c| {
                        let mut word = [0u8; 8];
                        word.copy_from_slice(c);
                        f64::from_le_bytes(word)
                    })
                    .collect(),
            ),
        })
    }
}

/// Running sum used by the weighted-area filter.
pub trait Accumulator: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// `self + value * weight`
    fn add_weighted(self, value: Self, weight: i64) -> Self;
    /// Integer kinds truncate toward zero; float kinds divide exactly.
    fn divide(self, divisor: i64) -> Self;
}

impl Accumulator for i64 {
    fn add_weighted(self, value: Self, weight: i64) -> Self {
        self + value * weight
    }

    fn divide(self, divisor: i64) -> Self {
        self / divisor
    }
}

impl Accumulator for f32 {
    fn add_weighted(self, value: Self, weight: i64) -> Self {
        self + value * weight as f32
    }

    fn divide(self, divisor: i64) -> Self {
        self / divisor as f32
    }
}

impl Accumulator for f64 {
    fn add_weighted(self, value: Self, weight: i64) -> Self {
        self + value * weight as f64
    }

    fn divide(self, divisor: i64) -> Self {
        self / divisor as f64
    }
}

/// Static description of one numeric sample representation.
pub trait SampleKind: Copy + Send + Sync + 'static {
    type Raw: Copy + Default + PartialEq + Debug + Send + Sync + 'static;
    type Acc: Accumulator;

    const TYPE: SampleType;

    /// Widen a stored word, applying the kind's sign-extension rule.
    fn extend(raw: Self::Raw) -> Self::Acc;
    /// Narrow an accumulator back to a stored word, clamping to range.
    fn narrow(acc: Self::Acc) -> Self::Raw;
    /// Convert an arbitrary number, rounding integers and clamping to range.
    fn from_f64(value: f64) -> Self::Raw;
    fn to_f64(raw: Self::Raw) -> f64;

    fn slice(data: &SampleData) -> Option<&[Self::Raw]>;
    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self::Raw]>;
    fn wrap(raw: Vec<Self::Raw>) -> SampleData;
}

#[derive(Debug, Clone, Copy)]
pub struct U8Kind;
#[derive(Debug, Clone, Copy)]
pub struct I8Kind;
#[derive(Debug, Clone, Copy)]
pub struct U16Kind;
#[derive(Debug, Clone, Copy)]
pub struct I16Kind;
#[derive(Debug, Clone, Copy)]
pub struct F32Kind;
#[derive(Debug, Clone, Copy)]
pub struct F64Kind;

macro_rules! integer_kind {
    ($kind:ident, $raw:ty, $logical:ty, $variant:ident, $tag:expr) => {
        impl SampleKind for $kind {
            type Raw = $raw;
            type Acc = i64;

            const TYPE: SampleType = $tag;

            #[inline]
            fn extend(raw: $raw) -> i64 {
                raw as $logical as i64
            }

            #[inline]
            fn narrow(acc: i64) -> $raw {
                acc.clamp(<$logical>::MIN as i64, <$logical>::MAX as i64) as $logical as $raw
            }

            fn from_f64(value: f64) -> $raw {
                // `as` saturates for floats, NaN becomes zero.
                value.round() as $logical as $raw
            }

            fn to_f64(raw: $raw) -> f64 {
                raw as $logical as f64
            }

            fn slice(data: &SampleData) -> Option<&[$raw]> {
                match data {
                    SampleData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut SampleData) -> Option<&mut [$raw]> {
                match data {
                    SampleData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(raw: Vec<$raw>) -> SampleData {
                SampleData::$variant(raw)
            }
        }
    };
}

integer_kind!(U8Kind, u8, u8, Bytes, SampleType::U8);
integer_kind!(I8Kind, u8, i8, Bytes, SampleType::I8);
integer_kind!(U16Kind, u16, u16, Words, SampleType::U16);
integer_kind!(I16Kind, u16, i16, Words, SampleType::I16);

macro_rules! float_kind {
    ($kind:ident, $raw:ty, $variant:ident, $tag:expr) => {
        impl SampleKind for $kind {
            type Raw = $raw;
            type Acc = $raw;

            const TYPE: SampleType = $tag;

            #[inline]
            fn extend(raw: $raw) -> $raw {
                raw
            }

            #[inline]
            fn narrow(acc: $raw) -> $raw {
                acc
            }

            fn from_f64(value: f64) -> $raw {
                value as $raw
            }

            fn to_f64(raw: $raw) -> f64 {
                raw as f64
            }

            fn slice(data: &SampleData) -> Option<&[$raw]> {
                match data {
                    SampleData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut SampleData) -> Option<&mut [$raw]> {
                match data {
                    SampleData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(raw: Vec<$raw>) -> SampleData {
                SampleData::$variant(raw)
            }
        }
    };
}

float_kind!(F32Kind, f32, Floats, SampleType::F32);
float_kind!(F64Kind, f64, Doubles, SampleType::F64);

/// Bind a [`SampleKind`] tag type for a runtime [`SampleType`].
///
/// ```ignore
/// let total = with_sample_kind!(buffer.sample_type(), K => sum_plane::<K>(&buffer));
/// ```
macro_rules! with_sample_kind {
    ($sample_type:expr, $kind:ident => $body:expr) => {
        match $sample_type {
            $crate::raster::SampleType::U8 => {
                type $kind = $crate::raster::sample::U8Kind;
                $body
            }
            $crate::raster::SampleType::I8 => {
                type $kind = $crate::raster::sample::I8Kind;
                $body
            }
            $crate::raster::SampleType::U16 => {
                type $kind = $crate::raster::sample::U16Kind;
                $body
            }
            $crate::raster::SampleType::I16 => {
                type $kind = $crate::raster::sample::I16Kind;
                $body
            }
            $crate::raster::SampleType::F32 => {
                type $kind = $crate::raster::sample::F32Kind;
                $body
            }
            $crate::raster::SampleType::F64 => {
                type $kind = $crate::raster::sample::F64Kind;
                $body
            }
        }
    };
}

pub(crate) use with_sample_kind;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_byte_words_are_sign_extended() {
        assert_eq!(I8Kind::extend(0xFF), -1);
        assert_eq!(I8Kind::extend(0x80), -128);
        assert_eq!(U8Kind::extend(0xFF), 255);
    }

    #[test]
    fn signed_short_words_are_sign_extended() {
        assert_eq!(I16Kind::extend(0xFFFF), -1);
        assert_eq!(I16Kind::extend(0x8000), -32768);
        assert_eq!(U16Kind::extend(0xFFFF), 65535);
    }

    #[test]
    fn narrow_clamps_to_kind_range() {
        assert_eq!(U8Kind::narrow(300), 255);
        assert_eq!(U8Kind::narrow(-5), 0);
        assert_eq!(I8Kind::narrow(-200), 0x80);
        assert_eq!(I16Kind::narrow(40_000), 0x7FFF);
        assert_eq!(U16Kind::narrow(70_000), 0xFFFF);
    }

    #[test]
    fn from_f64_rounds_and_saturates() {
        assert_eq!(U8Kind::from_f64(12.6), 13);
        assert_eq!(U8Kind::from_f64(-3.0), 0);
        assert_eq!(I16Kind::from_f64(-1.0), 0xFFFF);
        assert_eq!(F32Kind::from_f64(0.25), 0.25);
    }

    #[test]
    fn integer_accumulator_truncates_toward_zero() {
        assert_eq!(7i64.divide(2), 3);
        assert_eq!((-7i64).divide(2), -3);
        assert_eq!(1.0f64.divide(4), 0.25);
    }

    #[test]
    fn with_signedness_only_touches_integers() {
        assert_eq!(SampleType::U16.with_signedness(true), SampleType::I16);
        assert_eq!(SampleType::I8.with_signedness(false), SampleType::U8);
        assert_eq!(SampleType::F64.with_signedness(true), SampleType::F64);
    }

    #[test]
    fn storage_matches_sample_type() {
        let words = SampleData::zeroed(SampleType::I16, 4);
        assert!(words.matches(SampleType::U16));
        assert!(words.matches(SampleType::I16));
        assert!(!words.matches(SampleType::U8));
        assert_eq!(words.len(), 4);
    }

    #[test]
    fn little_endian_io_preserves_words() {
        let data = SampleData::Words(vec![1, 0x1234, 0xFFFF]);
        let mut bytes = Vec::new();
        data.write_le(&mut bytes).unwrap();
        assert_eq!(bytes, vec![1, 0, 0x34, 0x12, 0xFF, 0xFF]);

        let back = SampleData::read_le(SampleType::U16, 3, &mut bytes.as_slice()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn dispatch_binds_matching_kind() {
        fn bits<K: SampleKind>() -> u32 {
            K::TYPE.bits()
        }
        assert_eq!(with_sample_kind!(SampleType::I16, K => bits::<K>()), 16);
        assert_eq!(with_sample_kind!(SampleType::F64, K => bits::<K>()), 64);
    }
}
