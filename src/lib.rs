//! Blockwire - schema-driven binary message codec
//!
//! Messages are laid out for direct, allocation-free access: an 8-byte header,
//! a fixed-size root block, then repeating groups and length-prefixed
//! variable data in schema order.
//!
//! # Quick Start
//!
//! ```rust
//! use blockwire::schema::{BlockLayout, FieldKind, MessageSchema, PrimitiveType, VarDataDef};
//! use blockwire::{CharacterEncoding, CodecOptions, LengthWidth, MessageDecoder, MessageEncoder};
//!
//! let schema = MessageSchema::new(
//!     "Ping",
//!     1,
//!     1,
//!     0,
//!     BlockLayout::new()
//!         .field("seq", FieldKind::Primitive(PrimitiveType::UInt64))
//!         .var_data(VarDataDef::new("note", LengthWidth::U8, CharacterEncoding::Ascii)),
//! );
//!
//! let mut buf = [0u8; 64];
//! let mut encoder = MessageEncoder::new(&mut buf, &schema, CodecOptions::default())?;
//! encoder.fields()?.put(0, 7_u64)?;
//! encoder.put_str("note", "hello")?;
//! let len = encoder.finish()?;
//!
//! let mut decoder = MessageDecoder::new(buf[..len].to_vec(), &schema, CodecOptions::default())?;
//! assert_eq!(decoder.fields()?.get::<u64>(0)?, 7);
//! assert_eq!(decoder.get_str("note")?, "hello");
//! assert_eq!(decoder.finish()?, len);
//! # Ok::<(), blockwire::Error>(())
//! ```
//!
//! # Features
//!
//! - **Zero-copy decoding** - var data is returned as [`bytes::Bytes`] slices
//! - **Order enforcement** - groups and var data are checked against the schema
//! - **Typed enums and bit sets** - via [`sbe_enum!`] and [`sbe_bitset!`]
//! - **Dynamic records** - [`schema::encode_record`] and [`schema::decode_record`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod codec;
pub mod schema;

pub use codec::{
    BitSet, CharacterEncoding, CodecOptions, Composite, EnumMode, Error, FieldReader, FieldWriter,
    GroupHeader, LengthWidth, MessageDecoder, MessageEncoder, MessageHeader, Phase, Result,
    SbeEnum, metrics_snapshot, peek_header,
};
pub use schema::MessageSchema;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
