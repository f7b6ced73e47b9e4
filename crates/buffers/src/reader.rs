//! Bounds-checked binary reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A binary buffer reader over a borrowed byte slice.
///
/// Unlike a plain slice index, every accessor returns a [`BufferError`] when
/// the read would cross `end`, which lets decoders of untrusted input turn
/// truncation into an ordinary error.
///
/// # Example
///
/// ```
/// use oson_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8().unwrap(), 0x01);
/// assert_eq!(reader.u16().unwrap(), 0x0203);
/// assert!(reader.u8().is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
    /// End position (exclusive).
    pub end: usize,
}

impl<'a> Reader<'a> {
    pub fn new(uint8: &'a [u8]) -> Self {
        let end = uint8.len();
        Self { uint8, x: 0, end }
    }

    /// Creates a reader positioned at `x`, limited to `end` (clamped to the slice).
    pub fn from_slice(uint8: &'a [u8], x: usize, end: usize) -> Self {
        let end = end.min(uint8.len());
        Self { uint8, x, end }
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.end.saturating_sub(self.x)
    }

    fn check(&self, wanted: usize) -> Result<usize, BufferError> {
        if self.x > self.end || self.end - self.x < wanted {
            return Err(BufferError::Eof {
                at: self.x,
                wanted,
            });
        }
        Ok(self.x)
    }

    /// Peeks at the current byte without advancing the cursor.
    pub fn peek(&self) -> Result<u8, BufferError> {
        let x = self.check(1)?;
        Ok(self.uint8[x])
    }

    /// Moves the cursor to an absolute offset within `0..=end`.
    pub fn seek(&mut self, x: usize) -> Result<(), BufferError> {
        if x > self.end {
            return Err(BufferError::Eof {
                at: x,
                wanted: 0,
            });
        }
        self.x = x;
        Ok(())
    }

    pub fn skip(&mut self, length: usize) -> Result<(), BufferError> {
        let x = self.check(length)?;
        self.x = x + length;
        Ok(())
    }

    /// Returns a subslice of the given size and advances the cursor.
    pub fn buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        let x = self.check(size)?;
        self.x = x + size;
        Ok(&self.uint8[x..x + size])
    }

    /// Reads `size` bytes that must form valid UTF-8.
    pub fn utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        let at = self.x;
        let bytes = self.buf(size)?;
        str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8 { at })
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        let bytes = self.buf(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, BufferError> {
        let x = self.check(1)?;
        self.x = x + 1;
        Ok(self.uint8[x])
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, BufferError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, BufferError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    #[inline]
    pub fn i32(&mut self) -> Result<i32, BufferError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    #[inline]
    pub fn u64(&mut self) -> Result<u64, BufferError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    #[inline]
    pub fn i64(&mut self) -> Result<i64, BufferError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32, BufferError> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    #[inline]
    pub fn f64(&mut self) -> Result<f64, BufferError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    /// Reads a fixed-size byte array.
    pub fn bytes<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let data = [0, 0, 1, 0, 0xff];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u32().unwrap(), 256);
        assert_eq!(reader.u8().unwrap(), 0xff);
        assert_eq!(reader.size(), 0);
    }

    #[test]
    fn test_eof_does_not_advance() {
        let data = [1, 2, 3];
        let mut reader = Reader::new(&data);
        reader.u8().unwrap();
        assert_eq!(
            reader.u32(),
            Err(BufferError::Eof { at: 1, wanted: 4 })
        );
        assert_eq!(reader.x, 1);
        assert_eq!(reader.u16().unwrap(), 0x0203);
    }

    #[test]
    fn test_end_limits_reads() {
        let data = [1, 2, 3, 4];
        let mut reader = Reader::from_slice(&data, 1, 2);
        assert_eq!(reader.u8().unwrap(), 2);
        assert!(reader.u8().is_err());
    }

    #[test]
    fn test_utf8_rejects_invalid() {
        let data = [0x61, 0xff];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.utf8(2), Err(BufferError::InvalidUtf8 { at: 0 }));
    }

    #[test]
    fn test_seek_past_end_fails() {
        let data = [0u8; 4];
        let mut reader = Reader::new(&data);
        assert!(reader.seek(4).is_ok());
        assert!(reader.seek(5).is_err());
    }
}
