//! Message assembler
//!
//! [`MessageEncoder`] and [`MessageDecoder`] drive one message through the
//! schema's only valid order:
//!
//! ```text
//! [HEADER (8)] [ROOT BLOCK] [GROUPS (header + elements, depth-first)] [VAR DATA]
//! ```
//!
//! Each element of a group is its fixed block followed by its own nested
//! groups and variable data. Out-of-order calls fail with
//! [`Error::Sequencing`](super::Error::Sequencing).

use bytes::Bytes;
use tracing::{debug, instrument, trace};

use super::buffer::{ReadBuf, WriteBuf, check_bounds};
use super::group::{Phase, Traversal};
use super::header::{GroupHeader, MessageHeader};
use super::metrics::Metrics;
use super::primitive::{FieldReader, FieldWriter};
use super::types::CodecOptions;
use super::{Error, Result, var_data};
use crate::schema::MessageSchema;

/// Read a message header without checking it against a schema.
pub fn peek_header(bytes: &[u8]) -> Result<MessageHeader> {
    MessageHeader::from_bytes(bytes)
}

/// Encoder for one message into a caller-owned buffer.
#[derive(Debug)]
pub struct MessageEncoder<'a, 's> {
    buf: WriteBuf<'a>,
    schema: &'s MessageSchema,
    options: CodecOptions,
    start: usize,
    traversal: Traversal<'s>,
}

impl<'a, 's> MessageEncoder<'a, 's> {
    /// Start a message at the beginning of `buf`.
    pub fn new(buf: &'a mut [u8], schema: &'s MessageSchema, options: CodecOptions) -> Result<Self> {
        Self::new_at(buf, 0, schema, options)
    }

    /// Start a message at `offset` inside `buf`.
    ///
    /// Writes the header and zeroes the root block.
    #[instrument(level = "trace", skip(buf, schema, options), fields(template_id = schema.template_id))]
    pub fn new_at(
        buf: &'a mut [u8],
        offset: usize,
        schema: &'s MessageSchema,
        options: CodecOptions,
    ) -> Result<Self> {
        let header = MessageHeader::for_schema(schema);
        let block_len = usize::from(header.block_length);
        check_bounds(offset, MessageHeader::ENCODED_LENGTH + block_len, buf.len())?;

        let mut buf = WriteBuf::new(buf);
        buf.set_position(offset)?;
        header.write_to(&mut buf)?;
        let base = buf.position();
        buf.zero(base, block_len)?;
        buf.advance(block_len)?;

        Ok(Self {
            buf,
            schema,
            options,
            start: offset,
            traversal: Traversal::new(&schema.root, base, block_len),
        })
    }

    /// Schema being encoded.
    #[must_use]
    pub const fn schema(&self) -> &'s MessageSchema {
        self.schema
    }

    /// Current traversal phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.traversal.phase()
    }

    /// Bytes written so far, header included.
    #[must_use]
    pub const fn encoded_length(&self) -> usize {
        self.buf.position() - self.start
    }

    /// Writer for the fixed fields of the current block.
    ///
    /// Available until the block's first group or var data field.
    pub fn fields(&mut self) -> Result<FieldWriter<'_>> {
        let (base, len) = self.traversal.fixed_block()?;
        let enum_mode = self.options.enum_mode;
        Ok(FieldWriter::new(self.buf.slice_mut(base, len)?, enum_mode))
    }

    /// Open the next group, declaring its element count once.
    pub fn begin_group(&mut self, name: &str, count: usize) -> Result<()> {
        let def = self.traversal.expect_group(name)?;
        let num_in_group = u16::try_from(count).map_err(|_| Error::CountOverflow {
            group: def.name.clone(),
            count,
            max: usize::from(u16::MAX),
        })?;
        let block_length = def.layout.block_length;
        GroupHeader::new(block_length, num_in_group).write_to(&mut self.buf)?;
        trace!(group = name, count, block_length, "begin group");
        self.traversal
            .enter_group(def, count, usize::from(block_length));
        Ok(())
    }

    /// Open the next element of the current group.
    ///
    /// The previous element, if any, must be complete.
    pub fn next_element(&mut self) -> Result<()> {
        self.traversal.close_element()?;
        let (remaining, block_len) = self.traversal.remaining()?;
        if remaining == 0 {
            return Err(Error::Sequencing {
                phase: self.traversal.phase().to_string(),
                expected: "end of group".to_owned(),
                found: "next element".to_owned(),
            });
        }
        let base = self.buf.position();
        self.buf.zero(base, block_len)?;
        self.buf.advance(block_len)?;
        let index = self.traversal.push_element(base)?;
        trace!(index, base, "next element");
        Ok(())
    }

    /// Close the current group after its declared number of elements.
    pub fn end_group(&mut self) -> Result<()> {
        self.traversal.end_group()
    }

    /// Write the next variable-length field.
    pub fn put_var_data(&mut self, name: &str, payload: &[u8]) -> Result<()> {
        let def = self.traversal.expect_var(name)?;
        var_data::write(&mut self.buf, def, payload)?;
        self.traversal.commit_var();
        Ok(())
    }

    /// Write the next variable-length text field.
    pub fn put_str(&mut self, name: &str, value: &str) -> Result<()> {
        self.put_var_data(name, value.as_bytes())
    }

    /// Complete the message and return its total encoded length.
    pub fn finish(mut self) -> Result<usize> {
        self.traversal.finish()?;
        let length = self.encoded_length();
        Metrics::record_encoded(length);
        debug!(
            template_id = self.schema.template_id,
            length, "encoded message"
        );
        Ok(length)
    }
}

/// Decoder for one message.
#[derive(Debug)]
pub struct MessageDecoder<'s> {
    buf: ReadBuf,
    schema: &'s MessageSchema,
    options: CodecOptions,
    header: MessageHeader,
    start: usize,
    traversal: Traversal<'s>,
}

impl<'s> MessageDecoder<'s> {
    /// Decode a message at the beginning of `data`.
    pub fn new(data: impl Into<Bytes>, schema: &'s MessageSchema, options: CodecOptions) -> Result<Self> {
        Self::new_at(data, 0, schema, options)
    }

    /// Decode a message at `offset` inside `data`.
    ///
    /// The header must identify `schema` exactly; nothing in the body is read
    /// otherwise.
    #[instrument(level = "trace", skip(data, schema, options), fields(template_id = schema.template_id))]
    pub fn new_at(
        data: impl Into<Bytes>,
        offset: usize,
        schema: &'s MessageSchema,
        options: CodecOptions,
    ) -> Result<Self> {
        let mut buf = ReadBuf::new(data);
        buf.set_position(offset)?;
        let header = MessageHeader::read_from(&mut buf)?;
        if let Err(err) = header.check(schema) {
            Metrics::record_error();
            debug!(?header, error = %err, "header rejected");
            return Err(err);
        }

        let base = buf.position();
        let block_len = usize::from(header.block_length);
        buf.advance(block_len)?;

        Ok(Self {
            buf,
            schema,
            options,
            header,
            start: offset,
            traversal: Traversal::new(&schema.root, base, block_len),
        })
    }

    /// Header read from the message.
    #[must_use]
    pub const fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Schema being decoded.
    #[must_use]
    pub const fn schema(&self) -> &'s MessageSchema {
        self.schema
    }

    /// Current traversal phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.traversal.phase()
    }

    /// Bytes consumed so far, header included.
    #[must_use]
    pub const fn decoded_length(&self) -> usize {
        self.buf.position() - self.start
    }

    /// Reader for the fixed fields of the current block.
    pub fn fields(&self) -> Result<FieldReader<'_>> {
        let (base, len) = self.traversal.fixed_block()?;
        Ok(FieldReader::new(
            self.buf.get_bytes(base, len)?,
            self.options.enum_mode,
        ))
    }

    /// Open the next group and return its element count.
    pub fn begin_group(&mut self, name: &str) -> Result<usize> {
        let def = self.traversal.expect_group(name)?;
        let header = GroupHeader::read_from(&mut self.buf)?;
        if header.block_length != def.layout.block_length {
            return Err(Error::BlockLengthMismatch {
                group: def.name.clone(),
                expected: def.layout.block_length,
                found: header.block_length,
            });
        }
        let count = usize::from(header.num_in_group);
        trace!(group = name, count, "begin group");
        self.traversal
            .enter_group(def, count, usize::from(header.block_length));
        Ok(count)
    }

    /// Advance to the next element; `false` once the group is exhausted.
    ///
    /// The previous element, if any, must be complete (see
    /// [`MessageDecoder::skip_rest`]).
    pub fn next_element(&mut self) -> Result<bool> {
        self.traversal.close_element()?;
        let (remaining, block_len) = self.traversal.remaining()?;
        if remaining == 0 {
            return Ok(false);
        }
        let base = self.buf.position();
        self.buf.advance(block_len)?;
        let index = self.traversal.push_element(base)?;
        trace!(index, base, "next element");
        Ok(true)
    }

    /// Close the current group after all its elements.
    pub fn end_group(&mut self) -> Result<()> {
        self.traversal.end_group()
    }

    /// Read the next variable-length field as a zero-copy slice.
    pub fn get_var_data(&mut self, name: &str) -> Result<Bytes> {
        let def = self.traversal.expect_var(name)?;
        let payload = var_data::read(&mut self.buf, def)?;
        self.traversal.commit_var();
        Ok(payload)
    }

    /// Read the next variable-length field as text.
    pub fn get_str(&mut self, name: &str) -> Result<String> {
        let def = self.traversal.expect_var(name)?;
        let payload = var_data::read(&mut self.buf, def)?;
        let text = def.encoding.decode(&def.name, &payload)?;
        self.traversal.commit_var();
        Ok(text)
    }

    /// Skip the remaining groups and var data of the current block.
    pub fn skip_rest(&mut self) -> Result<()> {
        let (layout, next_group, next_var) = self.traversal.current()?;
        for group in &layout.groups[next_group..] {
            self.skip_group(&group.name)?;
        }
        for var in &layout.var_data[next_var..] {
            self.get_var_data(&var.name)?;
        }
        Ok(())
    }

    /// Skip the whole group `name`, nested content included.
    pub fn skip_group(&mut self, name: &str) -> Result<()> {
        self.begin_group(name)?;
        while self.next_element()? {
            self.skip_rest()?;
        }
        self.end_group()
    }

    /// Complete the message and return its total decoded length.
    pub fn finish(mut self) -> Result<usize> {
        self.traversal.finish()?;
        let length = self.decoded_length();
        Metrics::record_decoded(length);
        debug!(
            template_id = self.header.template_id,
            length, "decoded message"
        );
        Ok(length)
    }
}
