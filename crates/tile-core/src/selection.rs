use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Document, ElementNode};
use crate::error::EditError;
use crate::marks::MarkSet;

/// Which part of a document is focused. Only meaningful against the document
/// version it was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    Cursor { pos: usize },
    Range { anchor: usize, head: usize },
    /// An atom node selected as a whole; `pos` is the position before it.
    Node { pos: usize },
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Cursor { pos }
    }

    pub fn node(pos: usize) -> Self {
        Selection::Node { pos }
    }

    /// Orders the endpoints so `anchor <= head`; equal endpoints collapse to a cursor.
    pub fn normalize(anchor: usize, head: usize) -> Self {
        if anchor == head {
            return Selection::Cursor { pos: anchor };
        }
        Selection::Range {
            anchor: anchor.min(head),
            head: anchor.max(head),
        }
    }

    pub fn from(&self) -> usize {
        match *self {
            Selection::Cursor { pos } | Selection::Node { pos } => pos,
            Selection::Range { anchor, head } => anchor.min(head),
        }
    }

    pub fn to(&self) -> usize {
        match *self {
            Selection::Cursor { pos } => pos,
            Selection::Node { pos } => pos + 1,
            Selection::Range { anchor, head } => anchor.max(head),
        }
    }

    pub fn empty(&self) -> bool {
        self.from() == self.to()
    }

    pub fn is_text_selection(&self) -> bool {
        !matches!(self, Selection::Node { .. })
    }

    /// The collapsed cursor position, if this is a text cursor.
    pub fn cursor_pos(&self) -> Option<usize> {
        match *self {
            Selection::Cursor { pos } => Some(pos),
            Selection::Range { anchor, head } if anchor == head => Some(anchor),
            _ => None,
        }
    }

    /// Checks that the selection addresses valid content of `doc`.
    pub fn validate(&self, doc: &Document) -> Result<(), EditError> {
        doc.check_position(self.from())?;
        doc.check_position(self.to())?;
        if let Selection::Node { pos } = *self {
            let rp = doc.resolve(pos)?;
            if !rp.node_after().is_some_and(|n| n.is_atom()) || rp.text_offset() > 0 {
                return Err(EditError::schema(format!("no atom node at {pos}")));
            }
        }
        Ok(())
    }

    /// Moves text endpoints that fall between blocks into the nearest inline content.
    pub fn snap(self, doc: &Document) -> Selection {
        let snap_pos = |pos: usize, bias: i8| {
            doc.resolve(pos)
                .ok()
                .filter(|rp| rp.parent().inline_content())
                .map(|_| pos)
                .or_else(|| doc.text_position_near(pos, bias))
                .unwrap_or(pos)
        };
        match self {
            Selection::Cursor { pos } => Selection::Cursor {
                pos: snap_pos(pos, 1),
            },
            Selection::Range { anchor, head } => {
                Selection::normalize(snap_pos(anchor, 1), snap_pos(head, -1))
            }
            Selection::Node { .. } => self,
        }
    }
}

pub fn is_text_selection(selection: &Selection) -> bool {
    selection.is_text_selection()
}

/// The parent holding a cursor and the marks ambient at it.
#[derive(Debug, Clone)]
pub struct CursorContext {
    pub parent: Arc<ElementNode>,
    pub marks: MarkSet,
}

pub fn resolve_cursor_context(doc: &Document, pos: usize) -> Result<CursorContext, EditError> {
    let rp = doc.resolve(pos)?;
    Ok(CursorContext {
        parent: rp.parent().clone(),
        marks: rp.marks(),
    })
}
