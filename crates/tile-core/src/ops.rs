use serde::{Deserialize, Serialize};

use crate::core::Node;
use crate::marks::Mark;
use crate::schema::MarkKind;
use crate::selection::Selection;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `[from, to]` with `content`.
    Replace {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    /// Replace the current selection with `node`, fitting it into the nearest
    /// ancestor that accepts it.
    ReplaceSelection(Node),
    /// Replace the current selection with text carrying the stored or ambient marks.
    InsertText(String),
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    /// Removes every mark of `kind` in the range regardless of its attrs.
    RemoveMark {
        from: usize,
        to: usize,
        kind: MarkKind,
    },
    AddStoredMark(Mark),
    RemoveStoredMark(MarkKind),
    SetSelection(Selection),
    ScrollIntoView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            meta: TransactionMeta::default(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn scroll_into_view(self) -> Self {
        self.step(Step::ScrollIntoView)
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
