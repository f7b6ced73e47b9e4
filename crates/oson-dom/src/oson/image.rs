//! Layout of an OSON image and bounds-checked readers over it.
//!
//! ```text
//! header   "OSN" u8:version u16:flags u32:dict_count u32:dict_len
//!          u32:tree_len u32:values_len u32:root
//! dict     (u32:hash u16:len bytes)*        absent with a shared dictionary
//! tree     node records, addressed by offset from the tree start
//! values   payloads too long to sit inline
//! ```
//!
//! Indexed images are written children first, so every child offset is
//! smaller than its parent's. Streaming images nest children inline.

use std::borrow::Cow;

use oson_buffers::Reader;
use uuid::Uuid;

use crate::scalar::{temporal, ScalarKind, ScalarValue, INLINE_MAX, OID_LEN};
use crate::{DomError, Result};

pub(crate) const MAGIC: &[u8; 3] = b"OSN";
pub(crate) const VERSION: u8 = 1;
pub(crate) const HEADER_LEN: usize = 26;

pub(crate) const FLAG_SORTED: u16 = 0x1;
pub(crate) const FLAG_STREAMING: u16 = 0x2;
pub(crate) const FLAG_SHARED_DICTIONARY: u16 = 0x4;

pub(crate) const TAG_OBJECT: u8 = 0x01;
pub(crate) const TAG_ARRAY: u8 = 0x02;
pub(crate) const TAG_SCALAR: u8 = 0x40;
/// Length byte announcing an out-of-line payload.
pub(crate) const OUT_OF_LINE: u8 = 0xFF;

/// Payload size of the fixed-width kinds; `None` for length-prefixed ones.
pub(crate) fn fixed_width(kind: ScalarKind) -> Option<usize> {
    match kind {
        ScalarKind::Null | ScalarKind::True | ScalarKind::False => Some(0),
        ScalarKind::Int32 | ScalarKind::UInt32 | ScalarKind::Float => Some(4),
        ScalarKind::Int64 | ScalarKind::UInt64 | ScalarKind::Double => Some(8),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    pub flags: u16,
    pub dict_count: u32,
    pub dict_start: usize,
    pub dict_len: usize,
    pub tree_start: usize,
    pub tree_len: usize,
    pub values_start: usize,
    pub values_len: usize,
    pub root: u32,
}

impl Layout {
    pub fn parse(bytes: &[u8]) -> Result<Layout> {
        let mut r = Reader::new(bytes);
        if r.buf(3)? != MAGIC {
            return Err(DomError::malformed(0, "not an OSON image"));
        }
        let version = r.u8()?;
        if version != VERSION {
            return Err(DomError::malformed(
                3,
                format!("unsupported OSON version {version}"),
            ));
        }
        let flags = r.u16()?;
        let dict_count = r.u32()?;
        let dict_len = r.u32()? as usize;
        let tree_len = r.u32()? as usize;
        let values_len = r.u32()? as usize;
        let root = r.u32()?;
        let dict_start = HEADER_LEN;
        let tree_start = dict_start + dict_len;
        let values_start = tree_start + tree_len;
        let total = values_start + values_len;
        if total > bytes.len() {
            return Err(DomError::malformed(
                bytes.len(),
                format!("image declares {total} bytes but holds {}", bytes.len()),
            ));
        }
        if root as usize >= tree_len {
            return Err(DomError::malformed(22, "root offset outside the tree segment"));
        }
        Ok(Layout {
            flags,
            dict_count,
            dict_start,
            dict_len,
            tree_start,
            tree_len,
            values_start,
            values_len,
            root,
        })
    }

    pub fn sorted(&self) -> bool {
        self.flags & FLAG_SORTED != 0
    }

    pub fn streaming(&self) -> bool {
        self.flags & FLAG_STREAMING != 0
    }

    pub fn shared_dictionary(&self) -> bool {
        self.flags & FLAG_SHARED_DICTIONARY != 0
    }

    pub fn total_len(&self) -> usize {
        self.values_start + self.values_len
    }
}

/// A decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    /// `at` is the absolute position of the payload.
    Scalar { kind: ScalarKind, at: usize },
    /// `body` is the absolute position right after the container header.
    Object { offset: u32, count: u32, body: usize },
    Array { offset: u32, count: u32, body: usize },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageView<'a> {
    pub bytes: &'a [u8],
    pub layout: Layout,
}

impl<'a> ImageView<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        Ok(Self {
            layout: Layout::parse(bytes)?,
            bytes,
        })
    }

    fn tree(&self, at: usize) -> Reader<'a> {
        Reader::from_slice(
            self.bytes,
            at,
            self.layout.tree_start + self.layout.tree_len,
        )
    }

    /// Names of the embedded dictionary in id order.
    pub fn dictionary(&self) -> Result<Vec<(u32, &'a str)>> {
        let start = self.layout.dict_start;
        let mut r = Reader::from_slice(self.bytes, start, start + self.layout.dict_len);
        let mut names = Vec::new();
        crate::error::reserve(&mut names, self.layout.dict_count.min(1 << 16) as usize)?;
        for _ in 0..self.layout.dict_count {
            let hash = r.u32()?;
            let len = r.u16()? as usize;
            names.push((hash, r.utf8(len)?));
        }
        if r.size() != 0 {
            return Err(DomError::malformed(r.x, "trailing bytes in the dictionary"));
        }
        Ok(names)
    }

    pub fn entry(&self, offset: u32) -> Result<Entry> {
        let at = self.layout.tree_start + offset as usize;
        let mut r = self.tree(at);
        let tag = r.u8()?;
        match tag {
            TAG_OBJECT | TAG_ARRAY => {
                let count = r.u32()?;
                if self.layout.streaming() {
                    r.u32()?;
                }
                let body = r.x;
                Ok(if tag == TAG_OBJECT {
                    Entry::Object { offset, count, body }
                } else {
                    Entry::Array { offset, count, body }
                })
            }
            t if t & 0xE0 == TAG_SCALAR => {
                let kind = ScalarKind::from_code(t & 0x1F)
                    .ok_or_else(|| DomError::malformed(at, format!("unknown scalar code {t:#04x}")))?;
                Ok(Entry::Scalar { kind, at: r.x })
            }
            t => Err(DomError::malformed(at, format!("unknown record tag {t:#04x}"))),
        }
    }

    /// Payload bytes of a length-prefixed scalar and the end of its record.
    fn payload(&self, at: usize) -> Result<(&'a [u8], usize)> {
        let mut r = self.tree(at);
        let len = r.u8()?;
        if len == OUT_OF_LINE {
            let offset = r.u32()? as usize;
            let size = r.u32()? as usize;
            let end = r.x;
            let start = self.layout.values_start + offset;
            let mut values = Reader::from_slice(
                self.bytes,
                start,
                self.layout.values_start + self.layout.values_len,
            );
            return Ok((values.buf(size)?, end));
        }
        if len as usize > INLINE_MAX {
            return Err(DomError::malformed(at, format!("inline length {len} too long")));
        }
        let bytes = r.buf(len as usize)?;
        Ok((bytes, r.x))
    }

    /// Decodes a scalar payload, returning the value and where its record ends.
    pub fn scalar(&self, kind: ScalarKind, at: usize) -> Result<(ScalarValue<'a>, usize)> {
        if let Some(width) = fixed_width(kind) {
            let mut r = self.tree(at);
            let value = match kind {
                ScalarKind::Null => ScalarValue::Null,
                ScalarKind::True => ScalarValue::Bool(true),
                ScalarKind::False => ScalarValue::Bool(false),
                ScalarKind::Int32 => ScalarValue::Int32(r.i32()?),
                ScalarKind::UInt32 => ScalarValue::UInt32(r.u32()?),
                ScalarKind::Float => ScalarValue::Float(r.f32()?),
                ScalarKind::Int64 => ScalarValue::Int64(r.i64()?),
                ScalarKind::UInt64 => ScalarValue::UInt64(r.u64()?),
                _ => ScalarValue::Double(r.f64()?),
            };
            return Ok((value, at + width));
        }
        let (bytes, end) = self.payload(at)?;
        let text = |bytes: &'a [u8]| {
            std::str::from_utf8(bytes).map_err(|_| DomError::malformed(at, "invalid utf-8 in string"))
        };
        let exact = |want: usize| {
            if bytes.len() == want {
                Ok(())
            } else {
                Err(DomError::malformed(
                    at,
                    format!("{kind} payload of {} bytes, expected {want}", bytes.len()),
                ))
            }
        };
        let value = match kind {
            ScalarKind::String => ScalarValue::String(Cow::Borrowed(text(bytes)?)),
            ScalarKind::Number => ScalarValue::Number(Cow::Borrowed(text(bytes)?)),
            ScalarKind::Binary => ScalarValue::Binary(Cow::Borrowed(bytes)),
            ScalarKind::Id => ScalarValue::id(Cow::Borrowed(bytes))?,
            ScalarKind::Timestamp => ScalarValue::Timestamp(temporal::decode_timestamp(bytes)?),
            ScalarKind::Oid => {
                exact(OID_LEN)?;
                let mut oid = [0u8; OID_LEN];
                oid.copy_from_slice(bytes);
                ScalarValue::Oid(oid)
            }
            ScalarKind::Uuid => {
                exact(16)?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                ScalarValue::Uuid(Uuid::from_bytes(raw))
            }
            ScalarKind::Decimal128 => {
                exact(16)?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                ScalarValue::Decimal128(raw)
            }
            other => ScalarValue::from_image(other, bytes)?,
        };
        Ok((value, end))
    }

    /// Absolute end of the record at `offset`.
    pub fn record_end(&self, offset: u32) -> Result<usize> {
        match self.entry(offset)? {
            Entry::Scalar { kind, at } => match fixed_width(kind) {
                Some(width) => Ok(at + width),
                None => Ok(self.payload(at)?.1),
            },
            Entry::Object { body, .. } | Entry::Array { body, .. } if self.layout.streaming() => {
                let body_len = self.tree(body - 4).u32()? as usize;
                Ok(body + body_len)
            }
            Entry::Object { count, body, .. } => Ok(body + count as usize * 8),
            Entry::Array { count, body, .. } => Ok(body + count as usize * 4),
        }
    }

    fn offset_of(&self, absolute: usize) -> Result<u32> {
        let relative = absolute
            .checked_sub(self.layout.tree_start)
            .ok_or_else(|| DomError::malformed(absolute, "position before the tree segment"))?;
        u32::try_from(relative).map_err(|_| DomError::malformed(absolute, "offset overflow"))
    }

    fn check_child(&self, parent: u32, child: u32) -> Result<u32> {
        if child >= parent {
            return Err(DomError::malformed(
                self.layout.tree_start + parent as usize,
                format!("child offset {child} does not precede its parent"),
            ));
        }
        Ok(child)
    }

    /// Member `index` of an object as `(field id, child offset)`.
    pub fn member(&self, entry: Entry, index: u32) -> Result<(u32, u32)> {
        let Entry::Object { offset, count, body } = entry else {
            return Err(DomError::invalid_state("node is not an object"));
        };
        if index >= count {
            return Err(DomError::OutOfBounds {
                index: index as usize,
                len: count as usize,
            });
        }
        if self.layout.streaming() {
            let mut at = body;
            for i in 0..count {
                let id = self.tree(at).u32()?;
                let child = self.offset_of(at + 4)?;
                if i == index {
                    return Ok((id, child));
                }
                at = self.record_end(child)?;
            }
            return Err(DomError::malformed(body, "object body shorter than its count"));
        }
        let mut r = self.tree(body + 4 * index as usize);
        let id = r.u32()?;
        let child = self.tree(body + 4 * (count + index) as usize).u32()?;
        Ok((id, self.check_child(offset, child)?))
    }

    /// Child offset for field `id`, binary searching sorted images.
    pub fn find_member(&self, entry: Entry, id: u32) -> Result<Option<u32>> {
        let Entry::Object { count, body, .. } = entry else {
            return Err(DomError::invalid_state("node is not an object"));
        };
        if self.layout.sorted() && !self.layout.streaming() {
            let (mut lo, mut hi) = (0u32, count);
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                let probe = self.tree(body + 4 * mid as usize).u32()?;
                match probe.cmp(&id) {
                    std::cmp::Ordering::Equal => return Ok(Some(self.member(entry, mid)?.1)),
                    std::cmp::Ordering::Less => lo = mid + 1,
                    std::cmp::Ordering::Greater => hi = mid,
                }
            }
            return Ok(None);
        }
        if self.layout.streaming() {
            let mut at = body;
            for _ in 0..count {
                let probe = self.tree(at).u32()?;
                let child = self.offset_of(at + 4)?;
                if probe == id {
                    return Ok(Some(child));
                }
                at = self.record_end(child)?;
            }
            return Ok(None);
        }
        for i in 0..count {
            if self.tree(body + 4 * i as usize).u32()? == id {
                return Ok(Some(self.member(entry, i)?.1));
            }
        }
        Ok(None)
    }

    /// Up to `count` children starting at `start` as `(field id, offset)`;
    /// the id is 0 for array elements. Streaming bodies are scanned once.
    pub fn children(&self, entry: Entry, start: u32, count: u32) -> Result<Vec<(u32, u32)>> {
        let (total, body, object) = match entry {
            Entry::Object { count, body, .. } => (count, body, true),
            Entry::Array { count, body, .. } => (count, body, false),
            Entry::Scalar { .. } => return Err(DomError::invalid_state("node is not a container")),
        };
        let end = start.saturating_add(count).min(total);
        let mut out = Vec::new();
        crate::error::reserve(&mut out, end.saturating_sub(start) as usize)?;
        if !self.layout.streaming() {
            for i in start..end {
                out.push(if object {
                    self.member(entry, i)?
                } else {
                    (0, self.item(entry, i)?)
                });
            }
            return Ok(out);
        }
        let mut at = body;
        for i in 0..end {
            let id = if object {
                let id = self.tree(at).u32()?;
                at += 4;
                id
            } else {
                0
            };
            let child = self.offset_of(at)?;
            if i >= start {
                out.push((id, child));
            }
            at = self.record_end(child)?;
        }
        Ok(out)
    }

    /// Child offset of array element `index`.
    pub fn item(&self, entry: Entry, index: u32) -> Result<u32> {
        let Entry::Array { offset, count, body } = entry else {
            return Err(DomError::invalid_state("node is not an array"));
        };
        if index >= count {
            return Err(DomError::OutOfBounds {
                index: index as usize,
                len: count as usize,
            });
        }
        if self.layout.streaming() {
            let mut at = body;
            for _ in 0..index {
                at = self.record_end(self.offset_of(at)?)?;
            }
            return self.offset_of(at);
        }
        let child = self.tree(body + 4 * index as usize).u32()?;
        self.check_child(offset, child)
    }
}
