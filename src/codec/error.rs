//! Codec error types

use thiserror::Error;

/// Errors raised while encoding or decoding a message.
///
/// Every variant except [`Error::UnknownEnumValue`] (which only appears in
/// strict mode) means the buffer position can no longer be trusted and the
/// message must be abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Access outside the available byte region
    #[error("out of bounds: {len} bytes at offset {offset} exceed capacity {capacity}")]
    OutOfBounds {
        /// Offset of the attempted access
        offset: usize,
        /// Length of the attempted access
        len: usize,
        /// Capacity of the region
        capacity: usize,
    },

    /// Message header does not identify the expected schema
    #[error("schema mismatch on {field}: expected {expected}, got {found}")]
    SchemaMismatch {
        /// Header field that disagreed
        field: &'static str,
        /// Value required by the schema
        expected: u16,
        /// Value found in the header
        found: u16,
    },

    /// Group header block length disagrees with the schema
    #[error("group {group}: block length {found} does not match schema ({expected})")]
    BlockLengthMismatch {
        /// Group name
        group: String,
        /// Block length declared by the schema
        expected: u16,
        /// Block length found in the group header
        found: u16,
    },

    /// Field accessed outside the only valid traversal order
    #[error("sequencing violation in {phase}: expected {expected}, got {found}")]
    Sequencing {
        /// Phase the traversal was in
        phase: String,
        /// What the traversal allowed next
        expected: String,
        /// What the caller attempted
        found: String,
    },

    /// Enumeration value outside the declared symbol table (strict mode)
    #[error("unknown value {value:#x} for enum {name}")]
    UnknownEnumValue {
        /// Enumeration name
        name: String,
        /// Raw underlying bits
        value: u64,
    },

    /// Fixed-width array input longer than its declared width
    #[error("fixed-length field overflow: {len} bytes into width {width}")]
    FixedLengthOverflow {
        /// Supplied length
        len: usize,
        /// Declared width
        width: usize,
    },

    /// Variable-length payload longer than its prefix can express
    #[error("var data {field} too long: {len} bytes (max {max})")]
    VarDataTooLong {
        /// Field name
        field: String,
        /// Payload length
        len: usize,
        /// Maximum expressible length
        max: usize,
    },

    /// Group element count larger than the group header can express
    #[error("group {group} count {count} exceeds {max}")]
    CountOverflow {
        /// Group name
        group: String,
        /// Requested count
        count: usize,
        /// Maximum count
        max: usize,
    },

    /// Text payload is not valid UTF-8
    #[error("invalid UTF-8 in {field}: {source}")]
    InvalidUtf8 {
        /// Field name
        field: String,
        /// Underlying error
        #[source]
        source: std::str::Utf8Error,
    },

    /// Text payload violates the field's declared character encoding
    #[error("field {field} requires {encoding} text")]
    InvalidCharacterEncoding {
        /// Field name
        field: String,
        /// Declared encoding
        encoding: &'static str,
    },

    /// Dynamic value does not fit its field descriptor
    #[error("value for {field} does not match descriptor: expected {expected}")]
    ValueMismatch {
        /// Field name
        field: String,
        /// Expected value shape
        expected: String,
    },

    /// Schema descriptor is inconsistent
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
