//! Length-prefixed variable-length data
//!
//! ```text
//! [LENGTH (1, 2 or 4 bytes)] [PAYLOAD (LENGTH bytes)]
//! ```
//!
//! The prefix width is declared per field. A zero length is a present, empty
//! value; there is no notion of an absent field.

use std::fmt;

use bytes::Bytes;

use super::buffer::{ReadBuf, WriteBuf, check_bounds};
use super::{Error, Result};
use crate::schema::VarDataDef;

/// Width of a length prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LengthWidth {
    /// `u8` prefix
    U8,
    /// `u16` prefix
    #[default]
    U16,
    /// `u32` prefix
    U32,
}

impl LengthWidth {
    /// Prefix width in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Longest payload the prefix can express
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::U8 => u8::MAX as usize,
            Self::U16 => u16::MAX as usize,
            Self::U32 => u32::MAX as usize,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write(self, buf: &mut WriteBuf<'_>, offset: usize, len: usize) -> Result<()> {
        match self {
            Self::U8 => buf.put(offset, len as u8),
            Self::U16 => buf.put(offset, len as u16),
            Self::U32 => buf.put(offset, len as u32),
        }
    }

    fn read(self, buf: &ReadBuf, offset: usize) -> Result<usize> {
        Ok(match self {
            Self::U8 => usize::from(buf.get::<u8>(offset)?),
            Self::U16 => usize::from(buf.get::<u16>(offset)?),
            Self::U32 => buf.get::<u32>(offset)? as usize,
        })
    }
}

/// Character encoding of a variable-length or fixed-width text field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CharacterEncoding {
    /// UTF-8 text
    #[default]
    Utf8,
    /// 7-bit ASCII text
    Ascii,
    /// Raw bytes with no implied encoding
    Raw,
}

impl CharacterEncoding {
    /// Encoding name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Ascii => "US-ASCII",
            Self::Raw => "raw",
        }
    }

    /// Check `payload` against the encoding.
    pub fn check(self, field: &str, payload: &[u8]) -> Result<()> {
        match self {
            Self::Raw => Ok(()),
            Self::Ascii if payload.is_ascii() => Ok(()),
            Self::Ascii => Err(Error::InvalidCharacterEncoding {
                field: field.to_owned(),
                encoding: self.name(),
            }),
            Self::Utf8 => std::str::from_utf8(payload)
                .map(|_| ())
                .map_err(|source| Error::InvalidUtf8 {
                    field: field.to_owned(),
                    source,
                }),
        }
    }

    /// Decode `payload` as text under this encoding.
    ///
    /// Raw fields are read as UTF-8.
    pub fn decode(self, field: &str, payload: &[u8]) -> Result<String> {
        if self == Self::Ascii {
            self.check(field, payload)?;
        }
        std::str::from_utf8(payload)
            .map(str::to_owned)
            .map_err(|source| Error::InvalidUtf8 {
                field: field.to_owned(),
                source,
            })
    }
}

impl fmt::Display for CharacterEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Write `payload` at the cursor and advance past it.
///
/// Nothing is written unless prefix and payload both fit.
pub(crate) fn write(buf: &mut WriteBuf<'_>, def: &VarDataDef, payload: &[u8]) -> Result<()> {
    let width = def.length_width;
    if payload.len() > width.max_len() {
        return Err(Error::VarDataTooLong {
            field: def.name.clone(),
            len: payload.len(),
            max: width.max_len(),
        });
    }
    def.encoding.check(&def.name, payload)?;

    let position = buf.position();
    check_bounds(position, width.size() + payload.len(), buf.capacity())?;
    width.write(buf, position, payload.len())?;
    buf.put_bytes(position + width.size(), payload)?;
    buf.advance(width.size() + payload.len())
}

/// Read the payload at the cursor and advance past it.
pub(crate) fn read(buf: &mut ReadBuf, def: &VarDataDef) -> Result<Bytes> {
    let width = def.length_width;
    let position = buf.position();
    let len = width.read(buf, position)?;
    let payload = buf.slice(position + width.size(), len)?;
    buf.advance(width.size() + len)?;
    Ok(payload)
}
