//! Byte cursors used by every encode/decode routine. `ReadBuffer` views
//! the whole message so that compression pointers, which are offsets
//! from the start of the message rather than the current record, can
//! always be followed. `WriteBuffer` is a size-capped sink: once its
//! cap is exceeded, every further write fails with `BufferOverflow`
//! rather than growing past the negotiated packet size.

use bytes::{BufMut, BytesMut};

use crate::error::Error;

/// A buffer being consumed during decode. Cheap to clone: it is just a
/// borrowed slice and a cursor.
#[derive(Debug, Clone, Copy)]
pub struct ReadBuffer<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self { octets, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_len(&self) -> usize {
        self.octets.len()
    }

    pub fn remaining(&self) -> usize {
        self.octets.len() - self.position
    }

    /// Move the cursor to an absolute offset into the whole message.
    /// Offsets past the end are allowed here; they will simply fail the
    /// next read, which is how an out-of-range pointer is reported.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        let b = *self.octets.get(self.position)?;
        self.position += 1;
        Some(b)
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        let bytes = self.take(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        if self.octets.len() < self.position + size {
            return None;
        }
        let slice = &self.octets[self.position..self.position + size];
        self.position += size;
        Some(slice)
    }
}

/// A size-capped sink for encoding. Writes past `max_size` return
/// `Error::BufferOverflow` instead of growing the underlying `BytesMut`.
pub struct WriteBuffer {
    octets: BytesMut,
    max_size: usize,
}

impl WriteBuffer {
    pub fn with_capacity(min_size: usize, max_size: usize) -> Self {
        Self {
            octets: BytesMut::with_capacity(min_size),
            max_size,
        }
    }

    pub fn index(&self) -> usize {
        self.octets.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn into_inner(self) -> BytesMut {
        self.octets
    }

    fn check_capacity(&self, additional: usize) -> Result<(), Error> {
        if self.octets.len() + additional > self.max_size {
            Err(Error::BufferOverflow)
        } else {
            Ok(())
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.check_capacity(1)?;
        self.octets.put_u8(value);
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        self.write_octets(&value.to_be_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        self.write_octets(&value.to_be_bytes())
    }

    pub fn write_octets(&mut self, octets: &[u8]) -> Result<(), Error> {
        self.check_capacity(octets.len())?;
        self.octets.put_slice(octets);
        Ok(())
    }

    /// Overwrite two already-written bytes with a big-endian `u16`. Used
    /// to back-patch RDLENGTH and the section counts once their true
    /// values are known.
    pub fn patch_u16(&mut self, at: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.octets[at] = hi;
        self.octets[at + 1] = lo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_buffer_seek_and_take() {
        let data = [1, 2, 3, 4, 5];
        let mut buf = ReadBuffer::new(&data);
        assert_eq!(buf.next_u8(), Some(1));
        buf.seek(3);
        assert_eq!(buf.take(2), Some(&data[3..5]));
        assert_eq!(buf.take(1), None);
    }

    #[test]
    fn write_buffer_rejects_overflow() {
        let mut buf = WriteBuffer::with_capacity(4, 4);
        assert!(buf.write_u32(1).is_ok());
        assert_eq!(buf.write_u8(0), Err(Error::BufferOverflow));
    }

    #[test]
    fn write_buffer_patch_u16() {
        let mut buf = WriteBuffer::with_capacity(8, 8);
        buf.write_u16(0).unwrap();
        buf.write_u16(0xBEEF).unwrap();
        buf.patch_u16(0, 0xCAFE);
        assert_eq!(buf.into_inner().as_ref(), &[0xCA, 0xFE, 0xBE, 0xEF]);
    }
}
