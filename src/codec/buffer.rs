//! Bounds-checked cursor buffers.
//!
//! [`WriteBuf`] borrows a caller-owned region for the duration of one encode;
//! [`ReadBuf`] shares a [`Bytes`] region for one decode so that
//! variable-length payloads can be handed out without copying. Neither grows.
//! The position is explicit state advanced by the caller.

use bytes::Bytes;

use super::primitive::Primitive;
use super::{Error, Result};

/// Validate that `len` bytes at `offset` lie inside `[0, capacity)`.
#[inline]
pub(crate) fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(Error::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

/// Writable cursor over a fixed-capacity byte region.
#[derive(Debug)]
pub struct WriteBuf<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> WriteBuf<'a> {
    /// Wrap a caller-owned region with the cursor at zero.
    #[must_use]
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current cursor position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor to an absolute position.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        check_bounds(position, 0, self.data.len())?;
        self.position = position;
        Ok(())
    }

    /// Advance the cursor by `len` bytes.
    pub fn advance(&mut self, len: usize) -> Result<()> {
        check_bounds(self.position, len, self.data.len())?;
        self.position += len;
        Ok(())
    }

    /// Copy `src` verbatim to `offset`.
    pub fn put_bytes(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        self.slice_mut(offset, src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Write a little-endian scalar at `offset`.
    pub fn put<P: Primitive>(&mut self, offset: usize, value: P) -> Result<()> {
        value.write_le(self.slice_mut(offset, P::SIZE)?);
        Ok(())
    }

    /// Zero `len` bytes starting at `offset`.
    pub fn zero(&mut self, offset: usize, len: usize) -> Result<()> {
        self.slice_mut(offset, len)?.fill(0);
        Ok(())
    }

    /// Mutable view of `len` bytes at `offset`.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        check_bounds(offset, len, self.data.len())?;
        Ok(&mut self.data[offset..offset + len])
    }

    /// Bytes written so far, `[0, position)`.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.data[..self.position]
    }
}

/// Read-only cursor over a shared byte region.
#[derive(Debug, Clone)]
pub struct ReadBuf {
    data: Bytes,
    position: usize,
}

impl ReadBuf {
    /// Wrap a region with the cursor at zero.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current cursor position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor to an absolute position.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        check_bounds(position, 0, self.data.len())?;
        self.position = position;
        Ok(())
    }

    /// Advance the cursor by `len` bytes.
    pub fn advance(&mut self, len: usize) -> Result<()> {
        check_bounds(self.position, len, self.data.len())?;
        self.position += len;
        Ok(())
    }

    /// Borrow `len` bytes at `offset`.
    pub fn get_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        check_bounds(offset, len, self.data.len())?;
        Ok(&self.data[offset..offset + len])
    }

    /// Read a little-endian scalar at `offset`.
    pub fn get<P: Primitive>(&self, offset: usize) -> Result<P> {
        Ok(P::read_le(self.get_bytes(offset, P::SIZE)?))
    }

    /// Zero-copy slice of `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Bytes> {
        check_bounds(offset, len, self.data.len())?;
        Ok(self.data.slice(offset..offset + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_little_endian() {
        let mut raw = [0u8; 8];
        let mut buf = WriteBuf::new(&mut raw);
        buf.put(0, 0x0102_u16).unwrap();
        buf.put(2, -2_i32).unwrap();
        assert_eq!(&raw[0..2], &[0x02, 0x01]);
        assert_eq!(&raw[2..6], &[0xFE, 0xFF, 0xFF, 0xFF]);

        let read = ReadBuf::new(raw.to_vec());
        assert_eq!(read.get::<u16>(0).unwrap(), 0x0102);
        assert_eq!(read.get::<i32>(2).unwrap(), -2);
    }

    #[test]
    fn test_out_of_bounds_write_leaves_buffer_untouched() {
        let mut raw = [0xAAu8; 4];
        let mut buf = WriteBuf::new(&mut raw);
        let err = buf.put(2, 0u32).unwrap_err();
        assert_eq!(
            err,
            Error::OutOfBounds {
                offset: 2,
                len: 4,
                capacity: 4
            }
        );
        assert_eq!(raw, [0xAA; 4]);
    }

    #[test]
    fn test_offset_overflow_is_out_of_bounds() {
        let read = ReadBuf::new(vec![0u8; 4]);
        assert!(matches!(
            read.get_bytes(usize::MAX, 2),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_cursor_does_not_grow() {
        let mut raw = [0u8; 4];
        let mut buf = WriteBuf::new(&mut raw);
        buf.advance(4).unwrap();
        assert!(buf.advance(1).is_err());
        assert_eq!(buf.position(), 4);
        assert_eq!(buf.written().len(), 4);
    }

    #[test]
    fn test_slice_is_zero_copy_view() {
        let read = ReadBuf::new(Bytes::from_static(b"headerpayload"));
        let payload = read.slice(6, 7).unwrap();
        assert_eq!(payload.as_ref(), b"payload");
        assert!(read.slice(6, 8).is_err());
    }
}
