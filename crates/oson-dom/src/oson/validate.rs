use std::collections::HashSet;

use tracing::warn;

use super::image::{fixed_width, Entry, ImageView};
use crate::config::DomFlags;
use crate::dom::field_hash;
use crate::event::MAX_DEPTH;
use crate::scalar::{Decimal, ScalarKind};
use crate::{DomError, Result};

/// Structural checks run before an untrusted image is handed out.
///
/// Every record reachable from the root must decode within bounds, field
/// ids must exist in the dictionary, sorted objects must list ids in
/// strictly increasing order and nesting stays within [`MAX_DEPTH`].
pub(crate) fn validate(view: &ImageView<'_>, flags: DomFlags) -> Result<()> {
    check(view, flags).map_err(|err| {
        warn!(error = %err, "rejected OSON image");
        err
    })
}

fn check(view: &ImageView<'_>, flags: DomFlags) -> Result<()> {
    let layout = view.layout;
    if !layout.shared_dictionary() {
        let mut seen = HashSet::new();
        for (hash, name) in view.dictionary()? {
            if field_hash(name.as_bytes()) != hash {
                return Err(DomError::malformed(
                    layout.dict_start,
                    format!("dictionary hash mismatch for {name:?}"),
                ));
            }
            if !seen.insert(name) {
                return Err(DomError::malformed(
                    layout.dict_start,
                    format!("duplicate dictionary entry {name:?}"),
                ));
            }
        }
    }
    let tree_end = layout.tree_start + layout.tree_len;
    let strings = flags.contains(DomFlags::VALIDATE_STRINGS);
    let mut visits = 0usize;
    let mut stack = vec![(layout.root, 0usize)];
    while let Some((offset, depth)) = stack.pop() {
        visits += 1;
        if visits > layout.tree_len {
            return Err(DomError::malformed(
                layout.tree_start,
                "records are referenced more than once",
            ));
        }
        let entry = view.entry(offset)?;
        let end = view.record_end(offset)?;
        if end > tree_end {
            return Err(DomError::malformed(end, "record runs past the tree segment"));
        }
        match entry {
            Entry::Scalar { kind, at } => {
                if depth == 0 && flags.contains(DomFlags::DISALLOW_SCALARS) {
                    return Err(DomError::malformed(at, "scalar root is not allowed"));
                }
                if strings || (fixed_width(kind).is_none() && kind != ScalarKind::String) {
                    let (value, _) = view.scalar(kind, at)?;
                    if strings && kind == ScalarKind::Number {
                        let text = value.as_str().unwrap_or_default();
                        if Decimal::parse(text).is_none() {
                            return Err(DomError::malformed(at, format!("bad number {text:?}")));
                        }
                    }
                }
            }
            Entry::Object { count, body, .. } | Entry::Array { count, body, .. } => {
                if depth >= MAX_DEPTH {
                    return Err(DomError::malformed(
                        layout.tree_start + offset as usize,
                        format!("nesting deeper than {MAX_DEPTH}"),
                    ));
                }
                let children = view.children(entry, 0, count)?;
                let object = matches!(entry, Entry::Object { .. });
                if object {
                    check_ids(view, offset, &children)?;
                }
                if layout.streaming() {
                    let last = match children.last() {
                        Some(&(_, child)) => view.record_end(child)?,
                        None => body,
                    };
                    if last != end {
                        return Err(DomError::malformed(
                            last,
                            "container body length disagrees with its children",
                        ));
                    }
                }
                for &(_, child) in children.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
    }
    Ok(())
}

fn check_ids(view: &ImageView<'_>, offset: u32, members: &[(u32, u32)]) -> Result<()> {
    let layout = view.layout;
    let at = layout.tree_start + offset as usize;
    let mut previous = 0u32;
    for &(id, _) in members {
        if id == 0 || id > layout.dict_count {
            return Err(DomError::malformed(at, format!("field id {id} not in the dictionary")));
        }
        if layout.sorted() && !layout.streaming() && id <= previous {
            return Err(DomError::malformed(at, "field ids are not strictly increasing"));
        }
        previous = id;
    }
    if layout.streaming() || !layout.sorted() {
        let unique: HashSet<u32> = members.iter().map(|&(id, _)| id).collect();
        if unique.len() != members.len() {
            return Err(DomError::malformed(at, "duplicate field id in one object"));
        }
    }
    Ok(())
}
