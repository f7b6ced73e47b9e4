use std::collections::HashMap;

use super::{Document, Node, NodeType, BATCH_SIZE};
use crate::event::RecordedSource;
use crate::scalar::scalar_equals;
use crate::Result;

/// Structural deep equality across documents and backends. Objects match
/// when they hold the same member names with equal values in any order;
/// arrays compare by position; scalars by canonical value. Any read error
/// makes the nodes unequal.
pub fn equals(doc1: &Document, node1: Node, doc2: &Document, node2: Node) -> bool {
    equal_nodes(doc1, node1, doc2, node2).unwrap_or(false)
}

fn equal_nodes(doc1: &Document, node1: Node, doc2: &Document, node2: Node) -> Result<bool> {
    let mut stack = vec![(node1, node2)];
    while let Some((a, b)) = stack.pop() {
        let kind = doc1.node_type(a)?;
        if kind != doc2.node_type(b)? {
            return Ok(false);
        }
        match kind {
            NodeType::Scalar => {
                if !scalar_equals(&doc1.scalar_info(a)?, &doc2.scalar_info(b)?) {
                    return Ok(false);
                }
            }
            NodeType::Object => {
                let len = doc1.num_fields(a)?;
                if len != doc2.num_fields(b)? {
                    return Ok(false);
                }
                let mut right = HashMap::with_capacity(len);
                for start in (0..len).step_by(BATCH_SIZE) {
                    for pair in doc2.fields_batch(b, start, BATCH_SIZE)? {
                        right.insert(pair.name.name().to_owned(), pair.node);
                    }
                }
                for start in (0..len).step_by(BATCH_SIZE) {
                    for pair in doc1.fields_batch(a, start, BATCH_SIZE)? {
                        match right.get(pair.name.name()) {
                            Some(&other) => stack.push((pair.node, other)),
                            None => return Ok(false),
                        }
                    }
                }
            }
            NodeType::Array => {
                let len = doc1.array_size(a)?;
                if len != doc2.array_size(b)? {
                    return Ok(false);
                }
                for start in (0..len).step_by(BATCH_SIZE) {
                    let left = doc1.array_elements_batch(a, start, BATCH_SIZE)?;
                    let right = doc2.array_elements_batch(b, start, BATCH_SIZE)?;
                    stack.extend(left.into_iter().zip(right));
                }
            }
        }
    }
    Ok(true)
}

/// Deep copy of `node` into `dest` as an orphan. Use
/// [`Document::copy_within`] when source and destination are the same
/// document.
pub fn copy(src: &Document, node: Node, dest: &mut Document) -> Result<Node> {
    let mut source = src.as_event_source(node);
    dest.import_from_event_source(&mut source, true)
}

/// Copies through an owned recording, for callers holding only one handle.
pub(crate) fn copy_recorded(src: &Document, node: Node) -> Result<RecordedSource<'static>> {
    let mut source = src.as_event_source(node);
    Ok(RecordedSource::record(&mut source)?.into_owned())
}
