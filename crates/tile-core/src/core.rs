use std::sync::Arc;

use crate::error::EditError;
use crate::marks::MarkSet;
use crate::position::ResolvedPos;
use crate::schema::{Attrs, NodeKind, Schema};

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    kind: NodeKind,
    attrs: Attrs,
    children: Vec<Node>,
    content_size: usize,
    inline: bool,
    inline_content: bool,
}

impl ElementNode {
    pub(crate) fn new(
        kind: NodeKind,
        attrs: Attrs,
        children: Vec<Node>,
        inline: bool,
        inline_content: bool,
    ) -> Self {
        let content_size = children.iter().map(Node::node_size).sum();
        Self {
            kind,
            attrs,
            children,
            content_size,
            inline,
            inline_content,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn content_size(&self) -> usize {
        self.content_size
    }

    pub fn node_size(&self) -> usize {
        self.content_size + 2
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text(&mut out);
        }
        out
    }

    /// Child index at `offset` and the offset where that child starts.
    /// An offset on a child boundary resolves to the child after it.
    pub(crate) fn find_index(&self, offset: usize) -> (usize, usize) {
        if offset == 0 {
            return (0, 0);
        }
        if offset >= self.content_size {
            return (self.children.len(), self.content_size);
        }
        let mut pos = 0usize;
        for (ix, child) in self.children.iter().enumerate() {
            let end = pos + child.node_size();
            if end >= offset {
                if end == offset {
                    return (ix + 1, end);
                }
                return (ix, pos);
            }
            pos = end;
        }
        (self.children.len(), self.content_size)
    }

    pub(crate) fn nodes_between(
        &self,
        from: usize,
        to: usize,
        node_start: usize,
        f: &mut dyn FnMut(&Node, usize, &ElementNode, usize) -> Walk,
    ) -> bool {
        let mut pos = 0usize;
        for (ix, child) in self.children.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                match f(child, node_start + pos, self, ix) {
                    Walk::Stop => return false,
                    Walk::Skip => {}
                    Walk::Descend => {
                        if let Node::Element(el) = child {
                            if el.content_size > 0 {
                                let start = pos + 1;
                                let inner_from = from.saturating_sub(start);
                                let inner_to = to.saturating_sub(start).min(el.content_size);
                                if !el.nodes_between(inner_from, inner_to, node_start + start, f) {
                                    return false;
                                }
                            }
                        }
                    }
                }
            }
            pos = end;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    text: String,
    marks: MarkSet,
    len: usize,
}

impl TextNode {
    pub(crate) fn new(text: String, marks: MarkSet) -> Self {
        let len = text.chars().count();
        Self { text, marks, len }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    /// Length in document positions (one per char).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn slice(&self, from: usize, to: usize) -> TextNode {
        let text: String = self
            .text
            .chars()
            .skip(from)
            .take(to.saturating_sub(from))
            .collect();
        TextNode::new(text, self.marks.clone())
    }

    pub(crate) fn with_marks(&self, marks: MarkSet) -> TextNode {
        TextNode::new(self.text.clone(), marks)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    kind: NodeKind,
    attrs: Attrs,
    marks: MarkSet,
    inline: bool,
}

impl LeafNode {
    pub(crate) fn new(kind: NodeKind, attrs: Attrs, marks: MarkSet, inline: bool) -> Self {
        Self {
            kind,
            attrs,
            marks,
            inline,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub(crate) fn with_marks(&self, marks: MarkSet) -> LeafNode {
        LeafNode {
            marks,
            ..self.clone()
        }
    }
}

/// A node handle. Cloning shares the subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Arc<ElementNode>),
    Text(Arc<TextNode>),
    Leaf(Arc<LeafNode>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Element(el) => el.kind,
            Node::Text(_) => NodeKind::Text,
            Node::Leaf(leaf) => leaf.kind,
        }
    }

    pub fn node_size(&self) -> usize {
        match self {
            Node::Element(el) => el.node_size(),
            Node::Text(t) => t.len,
            Node::Leaf(_) => 1,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Element(el) => el.inline,
            Node::Text(_) => true,
            Node::Leaf(leaf) => leaf.inline,
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn marks(&self) -> &MarkSet {
        static NONE: MarkSet = MarkSet::empty();
        match self {
            Node::Element(_) => &NONE,
            Node::Text(t) => &t.marks,
            Node::Leaf(leaf) => &leaf.marks,
        }
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Text(_) => None,
            Node::Leaf(leaf) => Some(&leaf.attrs),
        }
    }

    pub fn as_element(&self) -> Option<&Arc<ElementNode>> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => {
                for child in &el.children {
                    child.push_text(out);
                }
            }
            Node::Text(t) => out.push_str(&t.text),
            Node::Leaf(_) => {}
        }
    }

    /// Whether both handles point at the same shared subtree.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Element(a), Node::Element(b)) => Arc::ptr_eq(a, b),
            (Node::Text(a), Node::Text(b)) => Arc::ptr_eq(a, b),
            (Node::Leaf(a), Node::Leaf(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn with_marks(&self, marks: MarkSet) -> Node {
        match self {
            Node::Element(_) => self.clone(),
            Node::Text(t) => Node::Text(Arc::new(t.with_marks(marks))),
            Node::Leaf(leaf) => Node::Leaf(Arc::new(leaf.with_marks(marks))),
        }
    }
}

/// What a `nodes_between` visitor wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Descend,
    Skip,
    Stop,
}

/// An immutable document version. The root is always a `doc` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Arc<ElementNode>,
}

impl Document {
    pub(crate) fn from_root(root: Arc<ElementNode>) -> Self {
        Self { root }
    }

    pub fn new(schema: &Schema, children: Vec<Node>) -> Result<Self, EditError> {
        schema
            .element(NodeKind::Doc, Attrs::new(), children)
            .map(Self::from_root)
    }

    /// The smallest valid document for `schema`.
    pub fn empty(schema: &Schema) -> Result<Self, EditError> {
        match schema.create_and_fill(NodeKind::Doc)? {
            Node::Element(root) => Ok(Self::from_root(root)),
            _ => Err(EditError::schema("`doc` must be a container")),
        }
    }

    pub fn root(&self) -> &Arc<ElementNode> {
        &self.root
    }

    pub fn children(&self) -> &[Node] {
        &self.root.children
    }

    pub fn content_size(&self) -> usize {
        self.root.content_size
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    pub fn check_position(&self, pos: usize) -> Result<(), EditError> {
        if pos > self.content_size() {
            return Err(EditError::InvalidPosition {
                pos,
                size: self.content_size(),
            });
        }
        Ok(())
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, EditError> {
        self.check_position(pos)?;
        Ok(ResolvedPos::resolve(&self.root, pos))
    }

    /// Depth-first walk over nodes overlapping `[from, to]`. Returns `false`
    /// if the visitor stopped early.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        mut f: impl FnMut(&Node, usize, &ElementNode, usize) -> Walk,
    ) -> bool {
        let to = to.min(self.content_size());
        self.root.nodes_between(from, to, 0, &mut f)
    }

    /// Content ranges `(start, end)` of every element holding inline content, in order.
    pub fn textblock_ranges(&self) -> Vec<(usize, usize)> {
        fn walk(el: &ElementNode, start: usize, out: &mut Vec<(usize, usize)>) {
            if el.inline_content {
                out.push((start, start + el.content_size));
                return;
            }
            let mut pos = start;
            for child in &el.children {
                if let Node::Element(inner) = child {
                    walk(inner, pos + 1, out);
                }
                pos += child.node_size();
            }
        }
        let mut out = Vec::new();
        walk(&self.root, 0, &mut out);
        out
    }

    /// The closest position inside inline content, searching backwards first
    /// when `bias` is negative and forwards otherwise.
    pub fn text_position_near(&self, pos: usize, bias: i8) -> Option<usize> {
        let blocks = self.textblock_ranges();
        if let Some(&(start, end)) = blocks.iter().find(|(s, e)| *s <= pos && pos <= *e) {
            return Some(pos.clamp(start, end));
        }
        let before = blocks.iter().rev().find(|(_, e)| *e < pos).map(|(_, e)| *e);
        let after = blocks.iter().find(|(s, _)| *s > pos).map(|(s, _)| *s);
        if bias < 0 {
            before.or(after)
        } else {
            after.or(before)
        }
    }
}
