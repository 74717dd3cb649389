use serde::{Deserialize, Serialize};

use crate::core::{Document, Node, Walk};
use crate::error::EditError;
use crate::ops::{Step, Transaction};
use crate::schema::{Attrs, MarkKind, Schema};
use crate::selection::resolve_cursor_context;
use crate::state::EditorState;

/// Whether any inline-content node overlapping `[from, to]` allows `kind`.
pub fn range_allows_mark(
    schema: &Schema,
    doc: &Document,
    from: usize,
    to: usize,
    kind: MarkKind,
) -> bool {
    let mut allowed = false;
    doc.nodes_between(from, to, |node, _, _, _| match node {
        Node::Element(el) if el.inline_content() && schema.allows_mark_type(el.kind(), kind) => {
            allowed = true;
            Walk::Stop
        }
        _ => Walk::Descend,
    });
    allowed
}

/// Whether `kind` applies to the whole selection.
///
/// Node selections are never active. At a cursor the stored marks win over
/// the ambient ones. A range is active when no inline node in it lacks the
/// mark, so a range without inline content counts as active.
pub fn is_mark_active(state: &EditorState, kind: MarkKind) -> bool {
    let selection = state.selection();
    if !selection.is_text_selection() {
        return false;
    }
    if selection.cursor_pos().is_some() {
        return state.cursor_marks().contains(kind);
    }

    let mut active = true;
    state
        .doc()
        .nodes_between(selection.from(), selection.to(), |node, _, _, _| {
            if node.is_inline() && !node.marks().contains(kind) {
                active = false;
                return Walk::Stop;
            }
            Walk::Descend
        });
    active
}

pub fn can_set_mark(state: &EditorState, kind: MarkKind) -> bool {
    let selection = state.selection();
    if !selection.is_text_selection() {
        return false;
    }
    if let Some(pos) = selection.cursor_pos() {
        return resolve_cursor_context(state.doc(), pos)
            .is_ok_and(|ctx| state.schema().allows_mark_type(ctx.parent.kind(), kind));
    }
    range_allows_mark(
        state.schema(),
        state.doc(),
        selection.from(),
        selection.to(),
        kind,
    )
}

/// Adds `kind` with `attrs` to the selection, replacing any mark of the same
/// kind. Returns `None` where the mark cannot be set.
pub fn set_mark(
    state: &EditorState,
    kind: MarkKind,
    attrs: &Attrs,
) -> Result<Option<Transaction>, EditError> {
    let mark = state.schema().create_mark(kind, attrs)?;
    if !can_set_mark(state, kind) {
        return Ok(None);
    }
    let selection = state.selection();
    let step = if selection.cursor_pos().is_some() {
        Step::AddStoredMark(mark)
    } else {
        Step::AddMark {
            from: selection.from(),
            to: selection.to(),
            mark,
        }
    };
    Ok(Some(Transaction::new(vec![step])))
}

pub fn unset_mark(state: &EditorState, kind: MarkKind) -> Option<Transaction> {
    let selection = state.selection();
    if selection.cursor_pos().is_some() {
        if !state.cursor_marks().contains(kind) {
            return None;
        }
        return Some(Transaction::new(vec![Step::RemoveStoredMark(kind)]));
    }
    Some(Transaction::new(vec![Step::RemoveMark {
        from: selection.from(),
        to: selection.to(),
        kind,
    }]))
}

/// Removes `kind` when it is active over the selection, adds it otherwise.
pub fn toggle_mark(
    state: &EditorState,
    kind: MarkKind,
    attrs: &Attrs,
) -> Result<Option<Transaction>, EditError> {
    if is_mark_active(state, kind) {
        return Ok(unset_mark(state, kind));
    }
    set_mark(state, kind, attrs)
}

/// Attrs of the `kind` mark at the cursor, or at the start of a range. Runs
/// further into the range are not consulted.
pub fn uniform_attrs(state: &EditorState, kind: MarkKind) -> Option<Attrs> {
    let selection = state.selection();
    if selection.cursor_pos().is_some() {
        return state.cursor_marks().get(kind).map(|m| m.attrs.clone());
    }
    let rp = state.doc().resolve(selection.from()).ok()?;
    rp.marks().get(kind).map(|m| m.attrs.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkButtonState {
    pub active: bool,
    pub disabled: bool,
}

pub fn mark_button_state(state: &EditorState, kind: MarkKind) -> MarkButtonState {
    MarkButtonState {
        active: is_mark_active(state, kind),
        disabled: !can_set_mark(state, kind),
    }
}

/// The size shown by a font-size picker: the size at the selection when a
/// font size is active there, `default` otherwise.
pub fn font_size_select_value(state: &EditorState, default: &str) -> String {
    if !is_mark_active(state, MarkKind::FontSize) {
        return default.to_string();
    }
    uniform_attrs(state, MarkKind::FontSize)
        .and_then(|attrs| attrs.get("size").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| default.to_string())
}
