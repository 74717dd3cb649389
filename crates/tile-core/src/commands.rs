use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::Node;
use crate::error::EditError;
use crate::marks::MarkSet;
use crate::ops::{Step, Transaction};
use crate::schema::{Attrs, NodeKind, Schema};
use crate::state::EditorState;

/// A block tile holding one paragraph with `text` (possibly empty).
pub fn block_tile_with_paragraph(schema: &Schema, text: &str) -> Result<Node, EditError> {
    let inline = if text.is_empty() {
        Vec::new()
    } else {
        vec![schema.create_text_run(text, MarkSet::empty())?]
    };
    let paragraph = schema.create_container(NodeKind::Paragraph, &Attrs::new(), inline)?;
    schema.create_container(NodeKind::BlockTile, &Attrs::new(), vec![paragraph])
}

/// Inserts a new block tile with a paragraph at the selection.
pub fn insert_paragraph(state: &EditorState, text: &str) -> Result<Transaction, EditError> {
    let tile = block_tile_with_paragraph(state.schema(), text)?;
    Ok(Transaction::new(vec![Step::ReplaceSelection(tile)]).source("command:core.insert_paragraph"))
}

/// Enter: replaces the selection with a new block tile wrapping an empty
/// paragraph and asks the host to scroll to it.
pub fn split_block(state: &EditorState) -> Result<Transaction, EditError> {
    let tile = block_tile_with_paragraph(state.schema(), "")?;
    Ok(Transaction::new(vec![Step::ReplaceSelection(tile)])
        .scroll_into_view()
        .source("command:core.split_block"))
}

pub fn insert_heading(state: &EditorState, level: u8, text: &str) -> Result<Transaction, EditError> {
    let schema = state.schema();
    let inline = if text.is_empty() {
        Vec::new()
    } else {
        vec![schema.create_text_run(text, MarkSet::empty())?]
    };
    let attrs = Attrs::from([("level".to_string(), json!(level))]);
    let heading = schema.create_container(NodeKind::Heading, &attrs, inline)?;
    Ok(Transaction::new(vec![Step::ReplaceSelection(heading)]).source("command:heading.insert"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Natural size; the schema default applies when unknown.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl ImageSource {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: None,
            title: None,
            width: None,
            height: None,
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Scales `(width, height)` down to `max_width`, keeping the aspect ratio.
pub fn clamp_image_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, scaled as u32)
}

pub fn insert_image(
    state: &EditorState,
    image: &ImageSource,
    max_width: u32,
) -> Result<Transaction, EditError> {
    let mut attrs = Attrs::from([("src".to_string(), json!(image.src))]);
    if let Some(alt) = &image.alt {
        attrs.insert("alt".to_string(), json!(alt));
    }
    if let Some(title) = &image.title {
        attrs.insert("title".to_string(), json!(title));
    }
    if let (Some(width), Some(height)) = (image.width, image.height) {
        let (width, height) = clamp_image_size(width, height, max_width);
        attrs.insert("width".to_string(), json!(width));
        attrs.insert("height".to_string(), json!(height));
    }
    let node = state.schema().create_leaf(NodeKind::Image, &attrs)?;
    Ok(Transaction::new(vec![Step::ReplaceSelection(node)]).source("command:image.insert"))
}

pub fn insert_datetime(state: &EditorState, timestamp: Option<i64>) -> Result<Transaction, EditError> {
    let attrs = Attrs::from([(
        "timestamp".to_string(),
        timestamp.map(Value::from).unwrap_or(Value::Null),
    )]);
    let node = state.schema().create_leaf(NodeKind::Datetime, &attrs)?;
    Ok(Transaction::new(vec![Step::ReplaceSelection(node)]).source("command:datetime.insert"))
}
