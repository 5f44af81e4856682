//! Fixed-width scalar and composite field access.
//!
//! A fixed region (the root block, one group element, or one composite) is
//! addressed through a [`FieldWriter`] or [`FieldReader`] whose offsets are
//! relative to the region's start. Composites are written through a nested
//! writer over their own sub-region, so they nest to any depth.

use std::fmt;

use super::buffer::check_bounds;
use super::types::{BitSet, EnumMode, SbeEnum, decode_enum, encode_enum};
use super::{Error, Result};

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width little-endian scalar.
pub trait Primitive: sealed::Sealed + Copy + PartialEq + fmt::Debug + 'static {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Write `self` into the first `SIZE` bytes of `dst`.
    fn write_le(self, dst: &mut [u8]);

    /// Read a value from the first `SIZE` bytes of `src`.
    fn read_le(src: &[u8]) -> Self;

    /// Wire bits, zero-extended to 64 bits.
    fn to_raw_bits(self) -> u64;

    /// Value from wire bits, truncated to `SIZE` bytes.
    fn from_raw_bits(bits: u64) -> Self;
}

macro_rules! impl_int_primitive {
    ($($ty:ty => $bits:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn write_le(self, dst: &mut [u8]) {
                dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(src: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&src[..Self::SIZE]);
                Self::from_le_bytes(raw)
            }

            #[inline]
            #[allow(clippy::cast_sign_loss, clippy::unnecessary_cast, trivial_numeric_casts)]
            fn to_raw_bits(self) -> u64 {
                u64::from(self as $bits)
            }

            #[inline]
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_possible_wrap,
                clippy::unnecessary_cast,
                trivial_numeric_casts
            )]
            fn from_raw_bits(bits: u64) -> Self {
                bits as $bits as $ty
            }
        }
    )*};
}

macro_rules! impl_float_primitive {
    ($($ty:ty => $bits:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn write_le(self, dst: &mut [u8]) {
                dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(src: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&src[..Self::SIZE]);
                Self::from_le_bytes(raw)
            }

            #[inline]
            fn to_raw_bits(self) -> u64 {
                u64::from(self.to_bits())
            }

            #[inline]
            #[allow(clippy::cast_possible_truncation)]
            fn from_raw_bits(bits: u64) -> Self {
                <$ty>::from_bits(bits as $bits)
            }
        }
    )*};
}

impl_int_primitive! {
    u8 => u8,
    i8 => u8,
    u16 => u16,
    i16 => u16,
    u32 => u32,
    i32 => u32,
    u64 => u64,
    i64 => u64,
}

impl_float_primitive! {
    f32 => u32,
    f64 => u64,
}

/// Fixed-layout nested structure embedded at a constant offset.
pub trait Composite: Sized {
    /// Encoded width in bytes
    const ENCODED_LENGTH: usize;

    /// Write the sub-fields, offsets relative to the composite's start.
    fn encode(&self, dst: &mut FieldWriter<'_>) -> Result<()>;

    /// Read the sub-fields, offsets relative to the composite's start.
    fn decode(src: &FieldReader<'_>) -> Result<Self>;
}

/// Writer over one fixed region.
#[derive(Debug)]
pub struct FieldWriter<'b> {
    data: &'b mut [u8],
    enum_mode: EnumMode,
}

impl<'b> FieldWriter<'b> {
    /// Wrap a fixed region.
    #[must_use]
    pub fn new(data: &'b mut [u8], enum_mode: EnumMode) -> Self {
        Self { data, enum_mode }
    }

    /// Width of the region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region is zero-width.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Enumeration handling in effect.
    #[must_use]
    pub const fn enum_mode(&self) -> EnumMode {
        self.enum_mode
    }

    /// Write a scalar at `offset`.
    pub fn put<P: Primitive>(&mut self, offset: usize, value: P) -> Result<()> {
        check_bounds(offset, P::SIZE, self.data.len())?;
        value.write_le(&mut self.data[offset..]);
        Ok(())
    }

    /// Write a fixed-width byte array, zero-padding short input.
    pub fn put_fixed_bytes(&mut self, offset: usize, width: usize, value: &[u8]) -> Result<()> {
        if value.len() > width {
            return Err(Error::FixedLengthOverflow {
                len: value.len(),
                width,
            });
        }
        check_bounds(offset, width, self.data.len())?;
        let field = &mut self.data[offset..offset + width];
        field[..value.len()].copy_from_slice(value);
        field[value.len()..].fill(0);
        Ok(())
    }

    /// Write an enumeration constant.
    pub fn put_enum<E: SbeEnum>(&mut self, offset: usize, value: E) -> Result<()> {
        let raw = encode_enum(value, self.enum_mode)?;
        self.put(offset, raw)
    }

    /// Write a bit set, reserved bits included.
    pub fn put_set<S: BitSet>(&mut self, offset: usize, value: S) -> Result<()> {
        self.put(offset, value.raw())
    }

    /// Write a composite at `offset`.
    pub fn put_composite<C: Composite>(&mut self, offset: usize, value: &C) -> Result<()> {
        let mut sub = self.sub(offset, C::ENCODED_LENGTH)?;
        value.encode(&mut sub)
    }

    /// Writer over `len` bytes at `offset`.
    pub fn sub(&mut self, offset: usize, len: usize) -> Result<FieldWriter<'_>> {
        check_bounds(offset, len, self.data.len())?;
        Ok(FieldWriter {
            data: &mut self.data[offset..offset + len],
            enum_mode: self.enum_mode,
        })
    }
}

/// Reader over one fixed region.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'b> {
    data: &'b [u8],
    enum_mode: EnumMode,
}

impl<'b> FieldReader<'b> {
    /// Wrap a fixed region.
    #[must_use]
    pub fn new(data: &'b [u8], enum_mode: EnumMode) -> Self {
        Self { data, enum_mode }
    }

    /// Width of the region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region is zero-width.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Enumeration handling in effect.
    #[must_use]
    pub const fn enum_mode(&self) -> EnumMode {
        self.enum_mode
    }

    /// Read a scalar at `offset`.
    pub fn get<P: Primitive>(&self, offset: usize) -> Result<P> {
        check_bounds(offset, P::SIZE, self.data.len())?;
        Ok(P::read_le(&self.data[offset..]))
    }

    /// Read a fixed-width byte array, trailing zeros included.
    pub fn get_fixed_bytes(&self, offset: usize, width: usize) -> Result<&'b [u8]> {
        check_bounds(offset, width, self.data.len())?;
        Ok(&self.data[offset..offset + width])
    }

    /// Read an enumeration, mapping undeclared values per the enum mode.
    pub fn get_enum<E: SbeEnum>(&self, offset: usize) -> Result<E> {
        decode_enum(self.get(offset)?, self.enum_mode)
    }

    /// Read a bit set, reserved bits included.
    pub fn get_set<S: BitSet>(&self, offset: usize) -> Result<S> {
        Ok(S::from_raw(self.get(offset)?))
    }

    /// Read a composite at `offset`.
    pub fn get_composite<C: Composite>(&self, offset: usize) -> Result<C> {
        C::decode(&self.sub(offset, C::ENCODED_LENGTH)?)
    }

    /// Reader over `len` bytes at `offset`.
    pub fn sub(&self, offset: usize, len: usize) -> Result<FieldReader<'b>> {
        check_bounds(offset, len, self.data.len())?;
        Ok(FieldReader {
            data: &self.data[offset..offset + len],
            enum_mode: self.enum_mode,
        })
    }
}

/// Strip trailing NUL bytes from a fixed-width array.
#[must_use]
pub fn trim_nulls(value: &[u8]) -> &[u8] {
    let end = value.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &value[..end]
}
