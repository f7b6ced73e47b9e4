use tracing::debug;

use super::image::{fixed_width, Entry, ImageView, Layout, OUT_OF_LINE, TAG_SCALAR};
use crate::config::DomFlags;
use crate::dom::{Document, SharedDictionary};
use crate::scalar::{temporal, ScalarValue, INLINE_MAX};
use crate::{DomError, Result};

const TREE_LEN_AT: usize = 14;
const VALUES_LEN_AT: usize = 18;
const ROOT_AT: usize = 22;

/// How far a partial update may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    /// Values are only overwritten where their old record has room.
    ReplaceOnly,
    /// Segments may grow: payloads are appended and the path to the root is
    /// re-written after the old tree.
    General,
}

impl PatchMode {
    pub fn from_flags(flags: DomFlags) -> Self {
        if flags.contains(DomFlags::PARTIAL_UPDATE_REPLACE_ONLY) {
            PatchMode::ReplaceOnly
        } else {
            PatchMode::General
        }
    }
}

/// One hop from a container to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'s> {
    Field(&'s str),
    Index(usize),
}

/// Rewrites scalar values inside an indexed OSON image without re-encoding
/// the whole document.
///
/// Records that are replaced out of place are left behind unreferenced; the
/// image stays valid for [`Document::load_from_binary_image`].
#[derive(Debug, Clone)]
pub struct OsonPatcher {
    image: Vec<u8>,
    mode: PatchMode,
    dictionary: Option<SharedDictionary>,
}

struct Located {
    /// `(container offset, slot index)` from the root down to the parent.
    path: Vec<(u32, u32)>,
    target: u32,
}

impl OsonPatcher {
    pub fn new(
        image: impl Into<Vec<u8>>,
        mode: PatchMode,
        dictionary: Option<SharedDictionary>,
    ) -> Result<Self> {
        let image = image.into();
        let layout = Layout::parse(&image)?;
        if layout.streaming() {
            return Err(DomError::unsupported("partial update", "streaming image"));
        }
        Ok(Self {
            image,
            mode,
            dictionary,
        })
    }

    /// Starts from the image behind a binary document, with the mode its
    /// flags select.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let image = doc
            .image()
            .ok_or_else(|| DomError::unsupported("partial update", doc.backend_kind().name()))?;
        let options = doc.options();
        Self::new(
            image.to_vec(),
            PatchMode::from_flags(options.flags),
            options.dictionary.clone(),
        )
    }

    pub fn mode(&self) -> PatchMode {
        self.mode
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn finish(self) -> Vec<u8> {
        self.image
    }

    fn view(&self) -> Result<ImageView<'_>> {
        ImageView::new(&self.image)
    }

    fn field_id(&self, view: &ImageView<'_>, name: &str) -> Result<Option<u32>> {
        if view.layout.shared_dictionary() {
            let dict = self.dictionary.as_ref().ok_or_else(|| {
                DomError::invalid_state("image was encoded against a shared dictionary")
            })?;
            return Ok(dict.id_of(name));
        }
        Ok(view
            .dictionary()?
            .iter()
            .position(|(_, n)| *n == name)
            .map(|i| i as u32 + 1))
    }

    fn locate(&self, view: &ImageView<'_>, path: &[Step<'_>]) -> Result<Located> {
        let mut current = view.layout.root;
        let mut chain = Vec::with_capacity(path.len());
        for step in path {
            let entry = view.entry(current)?;
            let index = match (*step, entry) {
                (Step::Field(name), Entry::Object { count, .. }) => {
                    let missing = || DomError::NotFound(format!("no field {name:?}"));
                    let id = self.field_id(view, name)?.ok_or_else(missing)?;
                    let mut found = None;
                    for i in 0..count {
                        if view.member(entry, i)?.0 == id {
                            found = Some(i);
                            break;
                        }
                    }
                    found.ok_or_else(missing)?
                }
                (Step::Index(i), Entry::Array { count, .. }) => {
                    u32::try_from(i).ok().filter(|i| *i < count).ok_or(
                        DomError::OutOfBounds {
                            index: i,
                            len: count as usize,
                        },
                    )?
                }
                (Step::Field(_), _) => return Err(DomError::invalid_state("node is not an object")),
                (Step::Index(_), _) => return Err(DomError::invalid_state("node is not an array")),
            };
            chain.push((current, index));
            current = match entry {
                Entry::Object { .. } => view.member(entry, index)?.1,
                _ => view.item(entry, index)?,
            };
        }
        Ok(Located {
            path: chain,
            target: current,
        })
    }

    /// Replaces the value at `path` (empty for the root) with a scalar.
    pub fn replace(&mut self, path: &[Step<'_>], value: ScalarValue<'_>) -> Result<()> {
        let view = self.view()?;
        let layout = view.layout;
        let located = self.locate(&view, path)?;
        let payload = payload(&value);
        let tag = TAG_SCALAR | value.kind().code();
        let old = view.entry(located.target)?;
        let old_at = layout.tree_start + located.target as usize;
        let old_len = view.record_end(located.target)? - old_at;
        let old_out_of_line = match old {
            Entry::Scalar { kind, at } if fixed_width(kind).is_none() => {
                if self.image[at] == OUT_OF_LINE {
                    let off = read_u32(&self.image, at + 1) as usize;
                    let size = read_u32(&self.image, at + 5) as usize;
                    Some((off, size))
                } else {
                    None
                }
            }
            _ => None,
        };
        let old_is_scalar = matches!(old, Entry::Scalar { .. });

        let inline = inline_record(tag, &value, &payload);
        if let Some(record) = &inline {
            if old_is_scalar && record.len() <= old_len {
                self.image[old_at..old_at + record.len()].copy_from_slice(record);
                debug!(offset = located.target, "patched value in place");
                return Ok(());
            }
        }
        if inline.is_none() {
            if let Some((off, size)) = old_out_of_line {
                if size >= payload.len() {
                    let start = layout.values_start + off;
                    self.image[start..start + payload.len()].copy_from_slice(&payload);
                    let record = out_of_line_record(tag, off as u32, payload.len() as u32);
                    self.image[old_at..old_at + record.len()].copy_from_slice(&record);
                    debug!(offset = located.target, "patched value payload in place");
                    return Ok(());
                }
            }
        }
        if self.mode == PatchMode::ReplaceOnly {
            return Err(DomError::unsupported(
                "growing partial update",
                "replace-only patcher",
            ));
        }

        let record = match inline {
            Some(record) => record,
            None => {
                let off = self.append_value(&payload)?;
                let record = out_of_line_record(tag, off, payload.len() as u32);
                if old_is_scalar && old_len >= record.len() {
                    self.image[old_at..old_at + record.len()].copy_from_slice(&record);
                    debug!(offset = located.target, "patched value with appended payload");
                    return Ok(());
                }
                record
            }
        };
        self.append_path(located, record)
    }

    /// Appends `payload` to the value segment and returns its offset there.
    fn append_value(&mut self, payload: &[u8]) -> Result<u32> {
        let layout = Layout::parse(&self.image)?;
        let off = u32::try_from(layout.values_len)
            .map_err(|_| DomError::OutOfMemory("OSON value segment exceeds 4 GiB".into()))?;
        self.image
            .try_reserve(payload.len())
            .map_err(|_| DomError::OutOfMemory("image growth failed".into()))?;
        self.image.truncate(layout.total_len());
        self.image.extend_from_slice(payload);
        let values_len = (layout.values_len + payload.len()) as u32;
        self.image[VALUES_LEN_AT..VALUES_LEN_AT + 4].copy_from_slice(&values_len.to_be_bytes());
        Ok(off)
    }

    /// Writes `record` after the tree, followed by copies of every container
    /// on the path, each pointing at its re-written child.
    fn append_path(&mut self, located: Located, record: Vec<u8>) -> Result<()> {
        let view = self.view()?;
        let layout = view.layout;
        let mut tail = record;
        let mut child = layout.tree_len as u32;
        for &(container, index) in located.path.iter().rev() {
            let entry = view.entry(container)?;
            let start = layout.tree_start + container as usize;
            let end = view.record_end(container)?;
            let slot = match entry {
                Entry::Object { count, body, .. } => body + 4 * (count + index) as usize,
                Entry::Array { body, .. } => body + 4 * index as usize,
                Entry::Scalar { .. } => return Err(DomError::invalid_state("path runs through a scalar")),
            };
            let offset = layout.tree_len + tail.len();
            let mut copy = self.image[start..end].to_vec();
            let rel = slot - start;
            copy[rel..rel + 4].copy_from_slice(&child.to_be_bytes());
            tail.extend_from_slice(&copy);
            child = u32::try_from(offset)
                .map_err(|_| DomError::OutOfMemory("OSON tree segment exceeds 4 GiB".into()))?;
        }
        let tree_len = u32::try_from(layout.tree_len + tail.len())
            .map_err(|_| DomError::OutOfMemory("OSON tree segment exceeds 4 GiB".into()))?;
        let at = layout.values_start;
        self.image
            .try_reserve(tail.len())
            .map_err(|_| DomError::OutOfMemory("image growth failed".into()))?;
        self.image.splice(at..at, tail);
        self.image[TREE_LEN_AT..TREE_LEN_AT + 4].copy_from_slice(&tree_len.to_be_bytes());
        self.image[ROOT_AT..ROOT_AT + 4].copy_from_slice(&child.to_be_bytes());
        debug!(root = child, tree = tree_len, "re-wrote path to the root");
        Ok(())
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_be_bytes(raw)
}

fn payload(value: &ScalarValue<'_>) -> Vec<u8> {
    match value {
        ScalarValue::Int32(v) => v.to_be_bytes().to_vec(),
        ScalarValue::UInt32(v) => v.to_be_bytes().to_vec(),
        ScalarValue::Float(v) => v.to_be_bytes().to_vec(),
        ScalarValue::Int64(v) => v.to_be_bytes().to_vec(),
        ScalarValue::UInt64(v) => v.to_be_bytes().to_vec(),
        ScalarValue::Double(v) => v.to_be_bytes().to_vec(),
        ScalarValue::String(s) | ScalarValue::Number(s) => s.as_bytes().to_vec(),
        ScalarValue::Timestamp(t) => temporal::encode_timestamp(t).to_vec(),
        other => other.as_bytes().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

/// The record when it fits without the value segment.
fn inline_record(tag: u8, value: &ScalarValue<'_>, payload: &[u8]) -> Option<Vec<u8>> {
    let mut record = vec![tag];
    if fixed_width(value.kind()).is_none() {
        if payload.len() > INLINE_MAX {
            return None;
        }
        record.push(payload.len() as u8);
    }
    record.extend_from_slice(payload);
    Some(record)
}

fn out_of_line_record(tag: u8, off: u32, len: u32) -> Vec<u8> {
    let mut record = vec![tag, OUT_OF_LINE];
    record.extend_from_slice(&off.to_be_bytes());
    record.extend_from_slice(&len.to_be_bytes());
    record
}
