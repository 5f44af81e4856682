//! Schema descriptors
//!
//! A [`MessageSchema`] describes one message template: its identity and a
//! root [`BlockLayout`]. Each layout lists its fixed fields (at constant
//! offsets inside the block), then its repeating groups, then its
//! variable-length fields, in the only order they may be encoded or decoded.
//! Group elements carry their own nested layout.

mod value;

use std::collections::HashSet;

use crate::codec::{CharacterEncoding, Error, LengthWidth, Result};

pub use value::{Record, Value, decode_record, encode_record};

/// Scalar wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PrimitiveType {
    /// Single byte character
    Char,
    /// `i8`
    Int8,
    /// `i16`
    Int16,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `u8`
    UInt8,
    /// `u16`
    UInt16,
    /// `u32`
    UInt32,
    /// `u64`
    UInt64,
    /// `f32`
    Float,
    /// `f64`
    Double,
}

impl PrimitiveType {
    /// Encoded width in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Char | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float => 4,
            Self::Int64 | Self::UInt64 | Self::Double => 8,
        }
    }

    /// Whether the type can back an enum or bit set
    #[must_use]
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Float | Self::Double)
    }

    /// Whether the type is a signed integer
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Bits that fit the type, as a mask
    #[must_use]
    pub const fn mask(self) -> u64 {
        match self.size() {
            8 => u64::MAX,
            size => (1 << (size * 8)) - 1,
        }
    }
}

/// One named constant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumSymbol {
    /// Symbol name
    pub name: String,
    /// Wire bits
    pub value: u64,
}

/// Enumeration descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumDef {
    /// Enumeration name
    pub name: String,
    /// Underlying wire type
    pub encoding: PrimitiveType,
    /// Declared constants
    pub symbols: Vec<EnumSymbol>,
    /// Wire bits of the null sentinel
    pub null_value: u64,
}

impl EnumDef {
    /// Enumeration with the null value of its encoding type: zero for
    /// `char`, the minimum for signed types, the maximum otherwise.
    pub fn new(name: impl Into<String>, encoding: PrimitiveType) -> Self {
        let null_value = match encoding {
            PrimitiveType::Char => 0,
            ty if ty.is_signed() => 1 << (ty.size() * 8 - 1),
            ty => ty.mask(),
        };
        Self {
            name: name.into(),
            encoding,
            symbols: Vec::new(),
            null_value,
        }
    }

    /// Add a constant
    #[must_use]
    pub fn symbol(mut self, name: impl Into<String>, value: u64) -> Self {
        self.symbols.push(EnumSymbol {
            name: name.into(),
            value,
        });
        self
    }

    /// Override the null value
    #[must_use]
    pub fn null_value(mut self, value: u64) -> Self {
        self.null_value = value;
        self
    }

    /// Wire bits of symbol `name`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.value)
    }

    /// Symbol for wire bits `value`.
    #[must_use]
    pub fn symbol_of(&self, value: u64) -> Option<&str> {
        self.symbols
            .iter()
            .find(|symbol| symbol.value == value)
            .map(|symbol| symbol.name.as_str())
    }
}

/// One named bit of a bit set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetChoice {
    /// Choice name
    pub name: String,
    /// Bit index
    pub bit: u8,
}

/// Bit set descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetDef {
    /// Set name
    pub name: String,
    /// Underlying wire type
    pub encoding: PrimitiveType,
    /// Named choices
    pub choices: Vec<SetChoice>,
}

impl SetDef {
    /// Empty set descriptor
    pub fn new(name: impl Into<String>, encoding: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            encoding,
            choices: Vec::new(),
        }
    }

    /// Add a choice
    #[must_use]
    pub fn choice(mut self, name: impl Into<String>, bit: u8) -> Self {
        self.choices.push(SetChoice {
            name: name.into(),
            bit,
        });
        self
    }

    /// Mask of choice `name`.
    #[must_use]
    pub fn mask_of(&self, name: &str) -> Option<u64> {
        self.choices
            .iter()
            .find(|choice| choice.name == name)
            .map(|choice| 1_u64 << choice.bit)
    }

    /// Whether choice `name` is set in `bits`.
    #[must_use]
    pub fn contains(&self, bits: u64, name: &str) -> bool {
        self.mask_of(name).is_some_and(|mask| bits & mask != 0)
    }

    /// `bits` with choice `name` set or cleared; other bits untouched.
    pub fn with(&self, bits: u64, name: &str, value: bool) -> Result<u64> {
        let mask = self.mask_of(name).ok_or_else(|| Error::ValueMismatch {
            field: self.name.clone(),
            expected: format!("a choice of {}", self.name),
        })?;
        Ok(if value { bits | mask } else { bits & !mask })
    }
}

/// Composite descriptor: fixed fields at offsets relative to its start.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeDef {
    /// Composite name
    pub name: String,
    /// Encoded width in bytes
    pub length: usize,
    /// Sub-fields
    pub fields: Vec<FieldDef>,
}

impl CompositeDef {
    /// Empty composite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: 0,
            fields: Vec::new(),
        }
    }

    /// Append a sub-field at the next free offset
    #[must_use]
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        let offset = self.length;
        self.field_at(name, offset, kind)
    }

    /// Place a sub-field at `offset`
    #[must_use]
    pub fn field_at(mut self, name: impl Into<String>, offset: usize, kind: FieldKind) -> Self {
        self.length = self.length.max(offset.saturating_add(kind.size()));
        self.fields.push(FieldDef {
            name: name.into(),
            offset,
            kind,
        });
        self
    }
}

/// Shape of a fixed field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "def", rename_all = "snake_case")
)]
pub enum FieldKind {
    /// Scalar
    Primitive(PrimitiveType),
    /// Fixed-width byte array
    FixedBytes {
        /// Declared width
        length: usize,
        /// Character encoding when read as text
        encoding: CharacterEncoding,
    },
    /// Enumeration
    Enum(EnumDef),
    /// Bit set
    Set(SetDef),
    /// Nested fixed-layout structure
    Composite(CompositeDef),
}

impl FieldKind {
    /// Encoded width in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Primitive(ty) => ty.size(),
            Self::FixedBytes { length, .. } => *length,
            Self::Enum(def) => def.encoding.size(),
            Self::Set(def) => def.encoding.size(),
            Self::Composite(def) => def.length,
        }
    }

    /// ASCII fixed-width array
    #[must_use]
    pub const fn ascii(length: usize) -> Self {
        Self::FixedBytes {
            length,
            encoding: CharacterEncoding::Ascii,
        }
    }
}

/// Fixed field at a constant offset inside its block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Offset from the start of the enclosing block or composite
    pub offset: usize,
    /// Field shape
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: FieldKind,
}

/// Repeating group descriptor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupDef {
    /// Group name
    pub name: String,
    /// Layout of one element
    pub layout: BlockLayout,
}

impl GroupDef {
    /// Create a group descriptor
    pub fn new(name: impl Into<String>, layout: BlockLayout) -> Self {
        Self {
            name: name.into(),
            layout,
        }
    }
}

/// Variable-length field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarDataDef {
    /// Field name
    pub name: String,
    /// Width of the length prefix
    pub length_width: LengthWidth,
    /// Payload encoding
    pub encoding: CharacterEncoding,
}

impl VarDataDef {
    /// Create a var data descriptor
    pub fn new(name: impl Into<String>, length_width: LengthWidth, encoding: CharacterEncoding) -> Self {
        Self {
            name: name.into(),
            length_width,
            encoding,
        }
    }
}

/// Layout of one level: the root or one group element.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlockLayout {
    /// Width of the fixed block; nested groups and var data are not included
    pub block_length: u16,
    /// Fixed fields
    pub fields: Vec<FieldDef>,
    /// Repeating groups, in order
    pub groups: Vec<GroupDef>,
    /// Variable-length fields, in order
    pub var_data: Vec<VarDataDef>,
}

impl BlockLayout {
    /// Empty layout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn end(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.offset.saturating_add(field.kind.size()))
            .max()
            .unwrap_or(0)
    }

    /// Append a fixed field after the last one
    #[must_use]
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        let offset = self.end();
        self.field_at(name, offset, kind)
    }

    /// Place a fixed field at `offset`, growing the block to cover it
    #[must_use]
    pub fn field_at(mut self, name: impl Into<String>, offset: usize, kind: FieldKind) -> Self {
        let end = offset.saturating_add(kind.size());
        let end = u16::try_from(end).unwrap_or(u16::MAX);
        self.block_length = self.block_length.max(end);
        self.fields.push(FieldDef {
            name: name.into(),
            offset,
            kind,
        });
        self
    }

    /// Set the block width explicitly, e.g. to reserve padding
    #[must_use]
    pub fn with_block_length(mut self, block_length: u16) -> Self {
        self.block_length = block_length;
        self
    }

    /// Add a repeating group
    #[must_use]
    pub fn group(mut self, group: GroupDef) -> Self {
        self.groups.push(group);
        self
    }

    /// Add a variable-length field
    #[must_use]
    pub fn var_data(mut self, var_data: VarDataDef) -> Self {
        self.var_data.push(var_data);
        self
    }

    fn validate(&self, path: &str) -> Result<()> {
        let mut names = HashSet::new();
        for field in &self.fields {
            let end = field_end(path, field)?;
            if end > usize::from(self.block_length) {
                return Err(Error::InvalidSchema(format!(
                    "{path}.{} ends at {end}, beyond block length {}",
                    field.name, self.block_length
                )));
            }
            validate_kind(&format!("{path}.{}", field.name), &field.kind)?;
            check_unique(&mut names, path, &field.name)?;
        }
        for group in &self.groups {
            check_unique(&mut names, path, &group.name)?;
            group.layout.validate(&format!("{path}.{}", group.name))?;
        }
        for var in &self.var_data {
            check_unique(&mut names, path, &var.name)?;
        }
        Ok(())
    }
}

fn field_end(path: &str, field: &FieldDef) -> Result<usize> {
    field
        .offset
        .checked_add(field.kind.size())
        .ok_or_else(|| {
            Error::InvalidSchema(format!(
                "{path}.{}: offset {} overflows",
                field.name, field.offset
            ))
        })
}

fn check_unique<'n>(names: &mut HashSet<&'n str>, path: &str, name: &'n str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSchema(format!("{path}: empty field name")));
    }
    if !names.insert(name) {
        return Err(Error::InvalidSchema(format!("{path}: duplicate name {name}")));
    }
    Ok(())
}

fn validate_kind(path: &str, kind: &FieldKind) -> Result<()> {
    match kind {
        FieldKind::Primitive(_) => Ok(()),
        FieldKind::FixedBytes { length, .. } => {
            if *length == 0 {
                return Err(Error::InvalidSchema(format!("{path}: zero-width array")));
            }
            Ok(())
        }
        FieldKind::Enum(def) => {
            if !def.encoding.is_integer() {
                return Err(Error::InvalidSchema(format!(
                    "{path}: enum {} needs an integer encoding",
                    def.name
                )));
            }
            let mask = def.encoding.mask();
            for symbol in &def.symbols {
                if symbol.value & !mask != 0 || symbol.value == def.null_value {
                    return Err(Error::InvalidSchema(format!(
                        "{path}: enum value {} = {:#x} does not fit or collides with null",
                        symbol.name, symbol.value
                    )));
                }
            }
            Ok(())
        }
        FieldKind::Set(def) => {
            if !def.encoding.is_integer() {
                return Err(Error::InvalidSchema(format!(
                    "{path}: set {} needs an integer encoding",
                    def.name
                )));
            }
            let bits = def.encoding.size() * 8;
            let mut seen = 0_u64;
            for choice in &def.choices {
                if usize::from(choice.bit) >= bits || seen & (1 << choice.bit) != 0 {
                    return Err(Error::InvalidSchema(format!(
                        "{path}: choice {} uses bit {} twice or beyond {bits} bits",
                        choice.name, choice.bit
                    )));
                }
                seen |= 1 << choice.bit;
            }
            Ok(())
        }
        FieldKind::Composite(def) => {
            for field in &def.fields {
                let end = field_end(path, field)?;
                if end > def.length {
                    return Err(Error::InvalidSchema(format!(
                        "{path}.{} ends at {end}, beyond composite length {}",
                        field.name, def.length
                    )));
                }
                validate_kind(&format!("{path}.{}", field.name), &field.kind)?;
            }
            Ok(())
        }
    }
}

/// Description of one message template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageSchema {
    /// Template name
    pub name: String,
    /// Template identity carried in the header
    pub template_id: u16,
    /// Schema identity carried in the header
    pub schema_id: u16,
    /// Schema version carried in the header
    pub version: u16,
    /// Root layout
    pub root: BlockLayout,
}

impl MessageSchema {
    /// Create a schema
    pub fn new(
        name: impl Into<String>,
        template_id: u16,
        schema_id: u16,
        version: u16,
        root: BlockLayout,
    ) -> Self {
        Self {
            name: name.into(),
            template_id,
            schema_id,
            version,
            root,
        }
    }

    /// Check that every field lies inside its block and names are unique per level.
    pub fn validate(&self) -> Result<()> {
        self.root.validate(&self.name)
    }
}
