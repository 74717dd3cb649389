use std::sync::Arc;

use crate::core::{ElementNode, Node};
use crate::marks::MarkSet;

#[derive(Debug, Clone)]
struct Level {
    node: Arc<ElementNode>,
    index: usize,
    /// Absolute position where this node's content starts.
    start: usize,
}

/// A document position together with the path of ancestors that contain it.
#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pos: usize,
    levels: Vec<Level>,
    parent_offset: usize,
    text_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(root: &Arc<ElementNode>, pos: usize) -> Self {
        let mut levels = Vec::new();
        let mut node = root.clone();
        let mut start = 0usize;
        let mut parent_offset = pos;
        let mut text_offset = 0usize;
        loop {
            let (index, offset) = node.find_index(parent_offset);
            let rem = parent_offset - offset;
            levels.push(Level {
                node: node.clone(),
                index,
                start,
            });
            if rem == 0 {
                break;
            }
            match node.child(index) {
                Some(Node::Element(child)) => {
                    start += offset + 1;
                    parent_offset = rem - 1;
                    node = child.clone();
                }
                _ => {
                    text_offset = rem;
                    break;
                }
            }
        }
        Self {
            pos,
            levels,
            parent_offset,
            text_offset,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn node(&self, depth: usize) -> &Arc<ElementNode> {
        &self.levels[depth].node
    }

    pub fn parent(&self) -> &Arc<ElementNode> {
        self.node(self.depth())
    }

    pub fn index(&self, depth: usize) -> usize {
        self.levels[depth].index
    }

    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Offset into the text node at `index()` when the position falls inside one.
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    pub fn node_after(&self) -> Option<&Node> {
        self.parent().child(self.index(self.depth()))
    }

    pub fn node_before(&self) -> Option<&Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if self.text_offset > 0 {
            return parent.child(index);
        }
        index.checked_sub(1).and_then(|ix| parent.child(ix))
    }

    /// The marks content inserted here would pick up: those of the inline node
    /// before the position, or of the one after it at the start of a parent.
    pub fn marks(&self) -> MarkSet {
        let parent = self.parent();
        if parent.content_size() == 0 {
            return MarkSet::empty();
        }
        let index = self.index(self.depth());
        if self.text_offset > 0 {
            return parent
                .child(index)
                .map(|n| n.marks().clone())
                .unwrap_or_default();
        }
        let before = index.checked_sub(1).and_then(|ix| parent.child(ix));
        before
            .or_else(|| parent.child(index))
            .map(|n| n.marks().clone())
            .unwrap_or_default()
    }

    /// Deepest depth whose node contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }
}
