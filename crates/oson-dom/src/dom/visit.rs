use super::{Node, NodeType};

/// What a visitor callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Do not descend into the current container.
    SkipChildren,
    Stop,
}

/// A node as seen by [`super::Document::visit`].
#[derive(Debug, Clone, Copy)]
pub struct VisitInfo<'a> {
    pub node: Node,
    pub node_type: NodeType,
    /// 0 for the start node.
    pub depth: usize,
    /// Member name when the parent is an object.
    pub key: Option<&'a str>,
    /// Position when the parent is an array.
    pub index: Option<usize>,
    pub parent: Option<Node>,
}
