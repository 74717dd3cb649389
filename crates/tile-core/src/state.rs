use std::sync::Arc;

use crate::core::{Document, Node};
use crate::error::EditError;
use crate::formatting::range_allows_mark;
use crate::marks::{Mark, MarkSet};
use crate::ops::{Step, Transaction};
use crate::replace::{insert_node, map_marks, replace_range};
use crate::schema::{MarkKind, Schema};
use crate::selection::{Selection, resolve_cursor_context};

/// One committed document version with the selection made against it.
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Document,
    selection: Selection,
    stored_marks: Option<MarkSet>,
}

/// The outcome of a successful `EditorState::apply`.
#[derive(Debug, Clone)]
pub struct Commit {
    pub state: EditorState,
    pub scroll_into_view: bool,
}

impl EditorState {
    pub fn new(schema: Arc<Schema>, doc: Document, selection: Selection) -> Result<Self, EditError> {
        selection.validate(&doc)?;
        let selection = selection.snap(&doc);
        Ok(Self {
            schema,
            doc,
            selection,
            stored_marks: None,
        })
    }

    /// The empty document with the cursor in its first textblock.
    pub fn empty(schema: Arc<Schema>) -> Result<Self, EditError> {
        let doc = Document::empty(&schema)?;
        Self::new(schema, doc, Selection::cursor(0))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    /// Stored marks if any, else the marks ambient at the head of the selection.
    pub fn cursor_marks(&self) -> MarkSet {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        self.doc
            .resolve(self.selection.from())
            .map(|rp| rp.marks())
            .unwrap_or_default()
    }

    /// Folds every step of `tx` over this state. Either all steps apply and a
    /// new state is returned, or the first failing step's error is returned and
    /// `self` is untouched.
    pub fn apply(&self, tx: &Transaction) -> Result<Commit, EditError> {
        let mut draft = Draft {
            schema: &self.schema,
            doc: self.doc.clone(),
            selection: self.selection,
            stored_marks: self.stored_marks.clone(),
            scroll_into_view: false,
        };

        for (index, step) in tx.steps.iter().enumerate() {
            if let Err(err) = draft.apply_step(step) {
                tracing::warn!(
                    index,
                    source = tx.meta.source.as_deref().unwrap_or("-"),
                    %err,
                    "transaction rejected"
                );
                return Err(err);
            }
        }

        if draft.selection.cursor_pos().is_none() {
            draft.stored_marks = None;
        }

        tracing::debug!(
            steps = tx.steps.len(),
            source = tx.meta.source.as_deref().unwrap_or("-"),
            size = draft.doc.content_size(),
            "transaction committed"
        );

        Ok(Commit {
            state: EditorState {
                schema: self.schema.clone(),
                doc: draft.doc,
                selection: draft.selection,
                stored_marks: draft.stored_marks,
            },
            scroll_into_view: draft.scroll_into_view,
        })
    }
}

struct Draft<'a> {
    schema: &'a Schema,
    doc: Document,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    scroll_into_view: bool,
}

impl Draft<'_> {
    fn apply_step(&mut self, step: &Step) -> Result<(), EditError> {
        match step {
            Step::Replace { from, to, content } => self.replace(*from, *to, content),
            Step::ReplaceSelection(node) => self.replace_selection(node),
            Step::InsertText(text) => self.insert_text(text),
            Step::AddMark { from, to, mark } => self.add_mark(*from, *to, mark),
            Step::RemoveMark { from, to, kind } => {
                let kind = *kind;
                self.doc = map_marks(
                    self.schema,
                    &self.doc,
                    *from,
                    *to,
                    &|_| true,
                    &|set| set.without(kind),
                )?;
                self.stored_marks = None;
                Ok(())
            }
            Step::AddStoredMark(mark) => {
                let pos = self.collapsed_cursor()?;
                let ctx = resolve_cursor_context(&self.doc, pos)?;
                if !self.schema.allows_mark_type(ctx.parent.kind(), mark.kind) {
                    return Err(EditError::schema(format!(
                        "`{}` does not allow mark `{}`",
                        ctx.parent.kind().name(),
                        mark.kind.name()
                    )));
                }
                let base = self.stored_marks.take().unwrap_or(ctx.marks);
                self.stored_marks = Some(self.schema.add_to_set(&base, mark.clone()));
                Ok(())
            }
            Step::RemoveStoredMark(kind) => {
                let pos = self.collapsed_cursor()?;
                let base = match self.stored_marks.take() {
                    Some(marks) => marks,
                    None => resolve_cursor_context(&self.doc, pos)?.marks,
                };
                self.stored_marks = Some(base.without(*kind));
                Ok(())
            }
            Step::SetSelection(selection) => {
                selection.validate(&self.doc)?;
                self.selection = selection.snap(&self.doc);
                self.stored_marks = None;
                Ok(())
            }
            Step::ScrollIntoView => {
                self.scroll_into_view = true;
                Ok(())
            }
        }
    }

    fn collapsed_cursor(&self) -> Result<usize, EditError> {
        self.selection
            .cursor_pos()
            .ok_or(EditError::NotApplicable("stored marks need a collapsed cursor"))
    }

    fn replace(&mut self, from: usize, to: usize, content: &[Node]) -> Result<(), EditError> {
        self.doc = replace_range(self.schema, &self.doc, from, to, content)?;
        let inserted: usize = content.iter().map(Node::node_size).sum();
        let map = |pos: usize| {
            if pos < from {
                pos
            } else if pos > to {
                pos - (to - from) + inserted
            } else {
                from + inserted
            }
        };
        self.selection = match self.selection {
            Selection::Cursor { pos } => Selection::cursor(map(pos)),
            Selection::Range { anchor, head } => Selection::normalize(map(anchor), map(head)),
            Selection::Node { pos } => {
                let mapped = Selection::node(map(pos));
                if mapped.validate(&self.doc).is_ok() {
                    mapped
                } else {
                    Selection::cursor(map(pos))
                }
            }
        }
        .snap(&self.doc);
        self.stored_marks = None;
        Ok(())
    }

    fn replace_selection(&mut self, node: &Node) -> Result<(), EditError> {
        let (from, to) = (self.selection.from(), self.selection.to());
        let inherited = match self.stored_marks.take() {
            Some(marks) => marks,
            None => self.doc.resolve(from)?.marks(),
        };

        let doc = if from < to {
            replace_range(self.schema, &self.doc, from, to, &[])?
        } else {
            self.doc.clone()
        };

        let node = if node.is_inline() && node.marks().is_empty() {
            let parent = doc.resolve(from)?.parent().kind();
            node.with_marks(inherited.retain(|m| self.schema.allows_mark_type(parent, m.kind)))
        } else {
            node.clone()
        };
        let inline = node.is_inline();

        let insertion = insert_node(self.schema, &doc, from, node)?;
        self.selection = if inline {
            Selection::cursor(insertion.end)
        } else {
            let pos = insertion
                .doc
                .text_position_near(insertion.end, -1)
                .unwrap_or(insertion.end);
            Selection::cursor(pos)
        };
        self.doc = insertion.doc;
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), EditError> {
        let (from, to) = (self.selection.from(), self.selection.to());
        let inherited = match self.stored_marks.take() {
            Some(marks) => marks,
            None => self.doc.resolve(from)?.marks(),
        };

        let mut doc = if from < to {
            replace_range(self.schema, &self.doc, from, to, &[])?
        } else {
            self.doc.clone()
        };

        if !text.is_empty() {
            let parent = doc.resolve(from)?.parent().clone();
            if !parent.inline_content() {
                return Err(EditError::schema(format!(
                    "`{}` cannot hold text",
                    parent.kind().name()
                )));
            }
            let marks = inherited.retain(|m| self.schema.allows_mark_type(parent.kind(), m.kind));
            let run = self.schema.create_text_run(text, marks)?;
            doc = replace_range(self.schema, &doc, from, from, &[run])?;
        }

        self.selection = Selection::cursor(from + text.chars().count());
        self.doc = doc;
        Ok(())
    }

    fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<(), EditError> {
        self.doc.check_position(from)?;
        self.doc.check_position(to)?;
        let kind: MarkKind = mark.kind;
        if from < to && !range_allows_mark(self.schema, &self.doc, from, to, kind) {
            return Err(EditError::schema(format!(
                "no content in {from}..{to} allows mark `{}`",
                kind.name()
            )));
        }
        let schema = self.schema;
        self.doc = map_marks(
            schema,
            &self.doc,
            from,
            to,
            &|parent| schema.allows_mark_type(parent, kind),
            &|set| schema.add_to_set(set, mark.clone()),
        )?;
        self.stored_marks = None;
        Ok(())
    }
}
