//! Message and group headers
//!
//! Both headers are schema-agnostic: they only move bytes. Identity checks
//! against an expected schema happen in the message assembler.

use super::buffer::{ReadBuf, WriteBuf};
use super::{Error, Result};
use crate::schema::MessageSchema;

/// Message header (8 bytes), always first.
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |        Block Length (2)       |        Template ID (2)        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Schema ID (2)         |          Version (2)          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    /// Width of the root fixed block
    pub block_length: u16,
    /// Template (message type) identity
    pub template_id: u16,
    /// Schema identity
    pub schema_id: u16,
    /// Schema version
    pub version: u16,
}

impl MessageHeader {
    /// Encoded width in bytes
    pub const ENCODED_LENGTH: usize = 8;

    /// Create a header
    #[must_use]
    pub const fn new(block_length: u16, template_id: u16, schema_id: u16, version: u16) -> Self {
        Self {
            block_length,
            template_id,
            schema_id,
            version,
        }
    }

    /// Header a schema's messages carry
    #[must_use]
    pub fn for_schema(schema: &MessageSchema) -> Self {
        Self::new(
            schema.root.block_length,
            schema.template_id,
            schema.schema_id,
            schema.version,
        )
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LENGTH] {
        let mut bytes = [0u8; Self::ENCODED_LENGTH];

        bytes[0..2].copy_from_slice(&self.block_length.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.template_id.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.schema_id.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.version.to_le_bytes());

        bytes
    }

    /// Parse from bytes (little-endian)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::ENCODED_LENGTH {
            return Err(Error::OutOfBounds {
                offset: 0,
                len: Self::ENCODED_LENGTH,
                capacity: bytes.len(),
            });
        }

        Ok(Self {
            block_length: u16::from_le_bytes([bytes[0], bytes[1]]),
            template_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            schema_id: u16::from_le_bytes([bytes[4], bytes[5]]),
            version: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    /// Write at the cursor and advance past the header.
    pub fn write_to(&self, buf: &mut WriteBuf<'_>) -> Result<()> {
        buf.put_bytes(buf.position(), &self.to_bytes())?;
        buf.advance(Self::ENCODED_LENGTH)
    }

    /// Read at the cursor and advance past the header.
    pub fn read_from(buf: &mut ReadBuf) -> Result<Self> {
        let header = Self::from_bytes(buf.get_bytes(buf.position(), Self::ENCODED_LENGTH)?)?;
        buf.advance(Self::ENCODED_LENGTH)?;
        Ok(header)
    }

    /// Validate against the schema the caller expects.
    ///
    /// Template, schema, version and root block length must all match.
    pub fn check(&self, schema: &MessageSchema) -> Result<()> {
        let expected = Self::for_schema(schema);
        let pairs = [
            ("templateId", expected.template_id, self.template_id),
            ("schemaId", expected.schema_id, self.schema_id),
            ("version", expected.version, self.version),
            ("blockLength", expected.block_length, self.block_length),
        ];
        for (field, expected, found) in pairs {
            if expected != found {
                return Err(Error::SchemaMismatch {
                    field,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Repeating group header (4 bytes).
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |        Block Length (2)       |        Num In Group (2)       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GroupHeader {
    /// Width of one element's fixed block
    pub block_length: u16,
    /// Number of elements
    pub num_in_group: u16,
}

impl GroupHeader {
    /// Encoded width in bytes
    pub const ENCODED_LENGTH: usize = 4;

    /// Create a group header
    #[must_use]
    pub const fn new(block_length: u16, num_in_group: u16) -> Self {
        Self {
            block_length,
            num_in_group,
        }
    }

    /// Write at the cursor and advance past the header.
    pub fn write_to(&self, buf: &mut WriteBuf<'_>) -> Result<()> {
        let mut bytes = [0u8; Self::ENCODED_LENGTH];
        bytes[0..2].copy_from_slice(&self.block_length.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.num_in_group.to_le_bytes());
        buf.put_bytes(buf.position(), &bytes)?;
        buf.advance(Self::ENCODED_LENGTH)
    }

    /// Read at the cursor and advance past the header.
    pub fn read_from(buf: &mut ReadBuf) -> Result<Self> {
        let position = buf.position();
        let header = Self {
            block_length: buf.get(position)?,
            num_in_group: buf.get(position + 2)?,
        };
        buf.advance(Self::ENCODED_LENGTH)?;
        Ok(header)
    }
}
