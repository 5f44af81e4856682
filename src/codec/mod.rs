//! Wire codec
//!
//! This module provides the byte cursors, headers, typed field access and the
//! schema-ordered message encoder and decoder.

mod buffer;
mod error;
mod group;
mod header;
mod message;
mod metrics;
mod primitive;
mod types;
mod var_data;

pub use buffer::{ReadBuf, WriteBuf};
pub use error::{Error, Result};
pub use group::Phase;
pub use header::{GroupHeader, MessageHeader};
pub use message::{MessageDecoder, MessageEncoder, peek_header};
pub use metrics::{MetricsSnapshot, metrics_snapshot};
pub use primitive::{Composite, FieldReader, FieldWriter, Primitive, trim_nulls};
pub use types::{BitSet, CodecOptions, EnumMode, SbeEnum, decode_enum, encode_enum};
pub use var_data::{CharacterEncoding, LengthWidth};

pub(crate) use metrics::Metrics;

/// Message header size in bytes
pub const HEADER_SIZE: usize = MessageHeader::ENCODED_LENGTH;

/// Group header size in bytes
pub const GROUP_HEADER_SIZE: usize = GroupHeader::ENCODED_LENGTH;
