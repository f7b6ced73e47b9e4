//! Binary buffer writer with auto-growing capacity.

use crate::BufferError;

/// A binary buffer writer that grows automatically as needed.
///
/// Writes never fail at the call site. When the buffer cannot grow (hard
/// limit reached, or the allocator refused) the write is dropped and the
/// failure is kept as a sticky error, surfaced by [`Writer::error`] and
/// [`Writer::finish`].
///
/// # Example
///
/// ```
/// use oson_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// let slot = writer.reserve_u32();
/// writer.u16(0x0203);
/// writer.patch_u32(slot, 7);
/// let data = writer.finish().unwrap();
/// assert_eq!(data, [0x01, 0, 0, 0, 7, 0x02, 0x03]);
/// ```
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Position where last flush happened.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
    /// Hard cap on the number of unflushed bytes, if any.
    limit: Option<usize>,
    error: Option<BufferError>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with default allocation size (4KB).
    pub fn new() -> Self {
        Self::with_alloc_size(4 * 1024)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: Vec::new(),
            x0: 0,
            x: 0,
            alloc_size: alloc_size.max(16),
            limit: None,
            error: None,
        }
    }

    /// Creates a writer that refuses to hold more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        let mut writer = Self::with_alloc_size(limit.min(4 * 1024));
        writer.limit = Some(limit);
        writer
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    ///
    /// Returns `false` (and records the sticky error) when it cannot.
    pub fn ensure_capacity(&mut self, capacity: usize) -> bool {
        if self.error.is_some() {
            return false;
        }
        let required = self.x - self.x0 + capacity;
        if let Some(limit) = self.limit {
            if required > limit {
                self.error = Some(BufferError::LimitExceeded { limit, required });
                return false;
            }
        }
        let remaining = self.uint8.len() - self.x;
        if remaining >= capacity {
            return true;
        }
        let new_size = if required <= self.alloc_size {
            self.alloc_size
        } else {
            required * 2
        };
        let new_size = match self.limit {
            Some(limit) => new_size.min(limit),
            None => new_size,
        };
        self.grow(new_size)
    }

    fn grow(&mut self, new_size: usize) -> bool {
        let live = self.x - self.x0;
        let mut new_buf: Vec<u8> = Vec::new();
        if new_buf.try_reserve_exact(new_size).is_err() {
            self.error = Some(BufferError::OutOfMemory {
                requested: new_size,
            });
            return false;
        }
        new_buf.extend_from_slice(&self.uint8[self.x0..self.x]);
        new_buf.resize(new_size, 0);
        self.uint8 = new_buf;
        self.x = live;
        self.x0 = 0;
        true
    }

    /// Resets the flush position and clears any sticky error.
    pub fn reset(&mut self) {
        self.x0 = self.x;
        self.error = None;
    }

    /// Drops everything written so far, keeping the allocation.
    pub fn clear(&mut self) {
        self.x = 0;
        self.x0 = 0;
        self.error = None;
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.x - self.x0
    }

    pub fn is_empty(&self) -> bool {
        self.x == self.x0
    }

    /// The bytes written since the last flush.
    pub fn written(&self) -> &[u8] {
        &self.uint8[self.x0..self.x]
    }

    pub fn error(&self) -> Option<&BufferError> {
        self.error.as_ref()
    }

    /// Returns the written data and advances the flush position.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.uint8[self.x0..self.x].to_vec();
        self.x0 = self.x;
        result
    }

    /// Like [`Writer::flush`] but reports a dropped write as an error.
    pub fn finish(&mut self) -> Result<Vec<u8>, BufferError> {
        match self.error.take() {
            Some(err) => {
                self.x = self.x0;
                Err(err)
            }
            None => Ok(self.flush()),
        }
    }

    /// Position relative to the last flush, usable with the `patch_*` methods.
    pub fn position(&self) -> usize {
        self.x - self.x0
    }

    /// Writes a zeroed big-endian u32 and returns its position for patching.
    pub fn reserve_u32(&mut self) -> usize {
        let pos = self.position();
        self.u32(0);
        pos
    }

    /// Overwrites four bytes at a position returned by [`Writer::position`].
    pub fn patch_u32(&mut self, pos: usize, val: u32) {
        let at = self.x0 + pos;
        if at + 4 <= self.x {
            self.uint8[at..at + 4].copy_from_slice(&val.to_be_bytes());
        }
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        if self.ensure_capacity(1) {
            self.uint8[self.x] = val;
            self.x += 1;
        }
    }

    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.buf(&val.to_be_bytes());
    }

    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.buf(&val.to_be_bytes());
    }

    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.buf(&val.to_be_bytes());
    }

    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.buf(&val.to_be_bytes());
    }

    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.buf(&val.to_be_bytes());
    }

    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.buf(&val.to_be_bytes());
    }

    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.buf(&val.to_be_bytes());
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        if self.ensure_capacity(length) {
            self.uint8[self.x..self.x + length].copy_from_slice(buf);
            self.x += length;
        }
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        let before = self.x;
        self.buf(s.as_bytes());
        self.x - before
    }

    /// Writes an ASCII string.
    pub fn ascii(&mut self, s: &str) {
        self.buf(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_u32_big_endian() {
        let mut writer = Writer::new();
        writer.u32(0x01020304);
        assert_eq!(writer.flush(), [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_flush_multiple() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x02]);
    }

    #[test]
    fn test_grows_past_alloc_size() {
        let mut writer = Writer::with_alloc_size(16);
        let data: Vec<u8> = (0..100).collect();
        writer.buf(&data);
        assert_eq!(writer.flush(), data);
    }

    #[test]
    fn test_patch_after_flush_offset() {
        let mut writer = Writer::new();
        writer.u8(9);
        writer.flush();
        let slot = writer.reserve_u32();
        writer.u8(1);
        writer.patch_u32(slot, 0xdeadbeef);
        assert_eq!(writer.flush(), [0xde, 0xad, 0xbe, 0xef, 1]);
    }

    #[test]
    fn test_limit_is_sticky() {
        let mut writer = Writer::with_limit(3);
        writer.u16(1);
        writer.u16(2);
        writer.u8(3);
        assert_eq!(
            writer.error(),
            Some(&BufferError::LimitExceeded {
                limit: 3,
                required: 4
            })
        );
        assert!(writer.finish().is_err());
        writer.reset();
        writer.u8(7);
        assert_eq!(writer.finish().unwrap(), [7]);
    }

    #[test]
    fn test_utf8_counts_bytes() {
        let mut writer = Writer::new();
        let n = writer.utf8("café");
        let data = writer.flush();
        assert_eq!(n, data.len());
        assert_eq!(std::str::from_utf8(&data).unwrap(), "café");
    }
}
