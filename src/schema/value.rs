//! Dynamic records
//!
//! A [`Record`] carries one level of a message positionally: one [`Value`] per
//! fixed field, one element list per group and one payload per var data field,
//! each in layout order. Field names play no part in the wire format, so any
//! name a schema declares can be encoded this way.

use bytes::Bytes;
use tracing::debug;

use super::{BlockLayout, CompositeDef, EnumDef, FieldKind, MessageSchema, PrimitiveType};
use crate::codec::{
    CodecOptions, EnumMode, Error, FieldReader, FieldWriter, MessageDecoder, MessageEncoder,
    Metrics, Result,
};

/// Value of one fixed field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Single byte character
    Char(u8),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// Fixed-width array; shorter input is zero-padded
    Bytes(Vec<u8>),
    /// Enumeration symbol, `None` for the null sentinel
    Enum(Option<String>),
    /// Bit set bits, reserved bits included
    Set(u64),
    /// Composite sub-field values in declaration order
    Composite(Vec<Value>),
}

impl Value {
    /// Enumeration symbol
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Enum(Some(name.into()))
    }
}

/// One level of a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Fixed field values
    pub fields: Vec<Value>,
    /// Elements of each group
    pub groups: Vec<Vec<Record>>,
    /// Var data payloads
    pub var_data: Vec<Bytes>,
}

impl Record {
    /// Value of fixed field `name` under `layout`.
    #[must_use]
    pub fn field<'r>(&'r self, layout: &BlockLayout, name: &str) -> Option<&'r Value> {
        let index = layout.fields.iter().position(|field| field.name == name)?;
        self.fields.get(index)
    }

    /// Elements of group `name` under `layout`.
    #[must_use]
    pub fn group<'r>(&'r self, layout: &BlockLayout, name: &str) -> Option<&'r [Record]> {
        let index = layout.groups.iter().position(|group| group.name == name)?;
        self.groups.get(index).map(Vec::as_slice)
    }

    /// Payload of var data field `name` under `layout`.
    #[must_use]
    pub fn var_data<'r>(&'r self, layout: &BlockLayout, name: &str) -> Option<&'r Bytes> {
        let index = layout.var_data.iter().position(|var| var.name == name)?;
        self.var_data.get(index)
    }
}

/// Encode `record` as a complete message at the start of `buf`.
///
/// Returns the encoded length.
pub fn encode_record(
    schema: &MessageSchema,
    record: &Record,
    buf: &mut [u8],
    options: CodecOptions,
) -> Result<usize> {
    let result = MessageEncoder::new(buf, schema, options).and_then(|mut encoder| {
        encode_level(&mut encoder, &schema.root, record)?;
        encoder.finish()
    });
    if let Err(err) = &result {
        Metrics::record_error();
        debug!(template_id = schema.template_id, error = %err, "record encode failed");
    }
    result
}

/// Decode one complete message at the start of `data`.
///
/// Returns the record and the decoded length.
pub fn decode_record(
    schema: &MessageSchema,
    data: impl Into<Bytes>,
    options: CodecOptions,
) -> Result<(Record, usize)> {
    // header rejections are counted by the decoder itself
    let mut decoder = MessageDecoder::new(data, schema, options)?;
    let result = decode_level(&mut decoder, &schema.root).and_then(|record| {
        let length = decoder.finish()?;
        Ok((record, length))
    });
    if let Err(err) = &result {
        Metrics::record_error();
        debug!(template_id = schema.template_id, error = %err, "record decode failed");
    }
    result
}

fn check_arity(what: &str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        return Ok(());
    }
    Err(Error::ValueMismatch {
        field: what.to_owned(),
        expected: format!("{expected} entries, got {found}"),
    })
}

fn encode_level(encoder: &mut MessageEncoder<'_, '_>, layout: &BlockLayout, record: &Record) -> Result<()> {
    check_arity("fields", layout.fields.len(), record.fields.len())?;
    check_arity("groups", layout.groups.len(), record.groups.len())?;
    check_arity("var data", layout.var_data.len(), record.var_data.len())?;

    {
        let mut fields = encoder.fields()?;
        for (def, value) in layout.fields.iter().zip(&record.fields) {
            put_value(&mut fields, def.offset, &def.name, &def.kind, value)?;
        }
    }

    for (group, elements) in layout.groups.iter().zip(&record.groups) {
        encoder.begin_group(&group.name, elements.len())?;
        for element in elements {
            encoder.next_element()?;
            encode_level(encoder, &group.layout, element)?;
        }
        encoder.end_group()?;
    }

    for (var, payload) in layout.var_data.iter().zip(&record.var_data) {
        encoder.put_var_data(&var.name, payload)?;
    }
    Ok(())
}

fn decode_level(decoder: &mut MessageDecoder<'_>, layout: &BlockLayout) -> Result<Record> {
    let mut record = Record::default();

    let fields = decoder.fields()?;
    for def in &layout.fields {
        record
            .fields
            .push(get_value(&fields, def.offset, &def.kind)?);
    }

    for group in &layout.groups {
        decoder.begin_group(&group.name)?;
        let mut elements = Vec::new();
        while decoder.next_element()? {
            elements.push(decode_level(decoder, &group.layout)?);
        }
        decoder.end_group()?;
        record.groups.push(elements);
    }

    for var in &layout.var_data {
        record.var_data.push(decoder.get_var_data(&var.name)?);
    }
    Ok(record)
}

fn mismatch(field: &str, expected: impl Into<String>) -> Error {
    Error::ValueMismatch {
        field: field.to_owned(),
        expected: expected.into(),
    }
}

fn put_value(
    dst: &mut FieldWriter<'_>,
    offset: usize,
    name: &str,
    kind: &FieldKind,
    value: &Value,
) -> Result<()> {
    match (kind, value) {
        (FieldKind::Primitive(ty), value) => put_primitive(dst, offset, name, *ty, value),
        (FieldKind::FixedBytes { length, encoding }, Value::Bytes(bytes)) => {
            encoding.check(name, bytes)?;
            dst.put_fixed_bytes(offset, *length, bytes)
        }
        (FieldKind::Enum(def), Value::Enum(symbol)) => {
            let raw = enum_bits(def, name, symbol.as_deref(), dst.enum_mode())?;
            put_bits(dst, offset, def.encoding, raw)
        }
        (FieldKind::Set(def), Value::Set(bits)) => {
            if bits & !def.encoding.mask() != 0 {
                return Err(mismatch(name, format!("bits within {:?}", def.encoding)));
            }
            put_bits(dst, offset, def.encoding, *bits)
        }
        (FieldKind::Composite(def), Value::Composite(values)) => {
            put_composite(dst, offset, name, def, values)
        }
        (kind, _) => Err(mismatch(name, kind_name(kind))),
    }
}

fn put_composite(
    dst: &mut FieldWriter<'_>,
    offset: usize,
    name: &str,
    def: &CompositeDef,
    values: &[Value],
) -> Result<()> {
    check_arity(name, def.fields.len(), values.len())?;
    let mut sub = dst.sub(offset, def.length)?;
    for (field, value) in def.fields.iter().zip(values) {
        put_value(&mut sub, field.offset, &field.name, &field.kind, value)?;
    }
    Ok(())
}

/// Wire bits for `symbol`. The sentinel and undeclared symbols follow the
/// enum mode.
fn enum_bits(def: &EnumDef, name: &str, symbol: Option<&str>, mode: EnumMode) -> Result<u64> {
    if let Some(value) = symbol.and_then(|symbol| def.value_of(symbol)) {
        return Ok(value);
    }
    match mode {
        EnumMode::Strict => Err(Error::UnknownEnumValue {
            name: def.name.clone(),
            value: def.null_value,
        }),
        EnumMode::Lenient => {
            if let Some(symbol) = symbol {
                debug!(
                    field = name,
                    enum_name = %def.name,
                    symbol,
                    "undeclared enum symbol encoded as sentinel"
                );
                Metrics::record_enum_sentinel();
            }
            Ok(def.null_value)
        }
    }
}

fn enum_symbol(def: &EnumDef, raw: u64, mode: EnumMode) -> Result<Option<String>> {
    if raw == def.null_value {
        return Ok(None);
    }
    if let Some(symbol) = def.symbol_of(raw) {
        return Ok(Some(symbol.to_owned()));
    }
    match mode {
        EnumMode::Lenient => {
            debug!(
                enum_name = %def.name,
                value = raw,
                "undeclared enum value decoded as sentinel"
            );
            Metrics::record_enum_sentinel();
            Ok(None)
        }
        EnumMode::Strict => Err(Error::UnknownEnumValue {
            name: def.name.clone(),
            value: raw,
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn put_bits(dst: &mut FieldWriter<'_>, offset: usize, ty: PrimitiveType, bits: u64) -> Result<()> {
    match ty.size() {
        1 => dst.put(offset, bits as u8),
        2 => dst.put(offset, bits as u16),
        4 => dst.put(offset, bits as u32),
        _ => dst.put(offset, bits),
    }
}

fn get_bits(src: &FieldReader<'_>, offset: usize, ty: PrimitiveType) -> Result<u64> {
    Ok(match ty.size() {
        1 => u64::from(src.get::<u8>(offset)?),
        2 => u64::from(src.get::<u16>(offset)?),
        4 => u64::from(src.get::<u32>(offset)?),
        _ => src.get::<u64>(offset)?,
    })
}

fn put_primitive(
    dst: &mut FieldWriter<'_>,
    offset: usize,
    name: &str,
    ty: PrimitiveType,
    value: &Value,
) -> Result<()> {
    match (ty, value) {
        (PrimitiveType::Char, Value::Char(v)) | (PrimitiveType::UInt8, Value::U8(v)) => {
            dst.put(offset, *v)
        }
        (PrimitiveType::Int8, Value::I8(v)) => dst.put(offset, *v),
        (PrimitiveType::Int16, Value::I16(v)) => dst.put(offset, *v),
        (PrimitiveType::Int32, Value::I32(v)) => dst.put(offset, *v),
        (PrimitiveType::Int64, Value::I64(v)) => dst.put(offset, *v),
        (PrimitiveType::UInt16, Value::U16(v)) => dst.put(offset, *v),
        (PrimitiveType::UInt32, Value::U32(v)) => dst.put(offset, *v),
        (PrimitiveType::UInt64, Value::U64(v)) => dst.put(offset, *v),
        (PrimitiveType::Float, Value::F32(v)) => dst.put(offset, *v),
        (PrimitiveType::Double, Value::F64(v)) => dst.put(offset, *v),
        (ty, _) => Err(mismatch(name, format!("{ty:?}"))),
    }
}

fn get_primitive(src: &FieldReader<'_>, offset: usize, ty: PrimitiveType) -> Result<Value> {
    Ok(match ty {
        PrimitiveType::Char => Value::Char(src.get(offset)?),
        PrimitiveType::Int8 => Value::I8(src.get(offset)?),
        PrimitiveType::Int16 => Value::I16(src.get(offset)?),
        PrimitiveType::Int32 => Value::I32(src.get(offset)?),
        PrimitiveType::Int64 => Value::I64(src.get(offset)?),
        PrimitiveType::UInt8 => Value::U8(src.get(offset)?),
        PrimitiveType::UInt16 => Value::U16(src.get(offset)?),
        PrimitiveType::UInt32 => Value::U32(src.get(offset)?),
        PrimitiveType::UInt64 => Value::U64(src.get(offset)?),
        PrimitiveType::Float => Value::F32(src.get(offset)?),
        PrimitiveType::Double => Value::F64(src.get(offset)?),
    })
}

fn get_value(src: &FieldReader<'_>, offset: usize, kind: &FieldKind) -> Result<Value> {
    match kind {
        FieldKind::Primitive(ty) => get_primitive(src, offset, *ty),
        FieldKind::FixedBytes { length, .. } => {
            Ok(Value::Bytes(src.get_fixed_bytes(offset, *length)?.to_vec()))
        }
        FieldKind::Enum(def) => {
            let raw = get_bits(src, offset, def.encoding)?;
            Ok(Value::Enum(enum_symbol(def, raw, src.enum_mode())?))
        }
        FieldKind::Set(def) => Ok(Value::Set(get_bits(src, offset, def.encoding)?)),
        FieldKind::Composite(def) => {
            let sub = src.sub(offset, def.length)?;
            let values = def
                .fields
                .iter()
                .map(|field| get_value(&sub, field.offset, &field.kind))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Composite(values))
        }
    }
}

fn kind_name(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Primitive(ty) => format!("{ty:?}"),
        FieldKind::FixedBytes { length, .. } => format!("{length} bytes"),
        FieldKind::Enum(def) => format!("a symbol of {}", def.name),
        FieldKind::Set(def) => format!("bits of {}", def.name),
        FieldKind::Composite(def) => format!("composite {}", def.name),
    }
}
