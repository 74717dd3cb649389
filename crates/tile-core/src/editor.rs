use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::{ImageSource, block_tile_with_paragraph, insert_image};
use crate::config::EditorConfig;
use crate::core::{Document, Node};
use crate::error::{CommandError, EditError, QueryError};
use crate::keymap::{KeyCombo, Keymap};
use crate::ops::{Step, Transaction};
use crate::plugin::CommandRegistry;
use crate::schema::{NodeKind, Schema};
use crate::selection::Selection;
use crate::serde_value::DocValue;
use crate::state::EditorState;
use crate::structure::{Structure, import_fragment};

/// What a gesture did to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Nothing is bound to the gesture, or the bound command does not apply.
    Ignored,
    Committed {
        version: u64,
        scroll_into_view: bool,
    },
    /// The transaction was invalid; the document is unchanged.
    Rejected(EditError),
}

impl EditorEvent {
    pub fn is_committed(&self) -> bool {
        matches!(self, EditorEvent::Committed { .. })
    }
}

/// Clipboard content handed over by the host. Image bytes are decoded by the
/// host, which passes a source and the natural size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PastePayload {
    Image(ImageSource),
    Text { text: String },
    Structure { content: Vec<Structure> },
}

type Listener = Box<dyn FnMut(&EditorState, u64)>;

/// The host-facing editor. Each gesture yields at most one commit, after which
/// listeners receive the new state.
pub struct Editor {
    state: EditorState,
    registry: CommandRegistry,
    keymap: Keymap,
    config: EditorConfig,
    version: u64,
    listeners: Vec<Listener>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Result<Self, EditError> {
        let state = EditorState::empty(Arc::new(Schema::tile()))?;
        Ok(Self::with_state(state, config))
    }

    pub fn with_document(config: EditorConfig, doc: Document) -> Result<Self, EditError> {
        let state = EditorState::new(Arc::new(Schema::tile()), doc, Selection::cursor(0))?;
        Ok(Self::with_state(state, config))
    }

    pub fn with_state(state: EditorState, config: EditorConfig) -> Self {
        let config = config.with_defaults();
        Self {
            state,
            registry: CommandRegistry::tile(),
            keymap: Keymap::from_config(&config),
            config,
            version: 0,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        self.state.doc()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.state.schema()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Number of commits so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorState, u64) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn dispatch(&mut self, tx: Transaction) -> EditorEvent {
        if tx.is_empty() {
            return EditorEvent::Ignored;
        }
        match self.state.apply(&tx) {
            Ok(commit) => {
                self.state = commit.state;
                self.version += 1;
                for listener in &mut self.listeners {
                    listener(&self.state, self.version);
                }
                EditorEvent::Committed {
                    version: self.version,
                    scroll_into_view: commit.scroll_into_view,
                }
            }
            Err(err) => EditorEvent::Rejected(err),
        }
    }

    pub fn on_key(&mut self, combo: &KeyCombo) -> EditorEvent {
        let Some(command) = self.keymap.lookup(combo).map(str::to_string) else {
            tracing::trace!(%combo, "unbound key");
            return EditorEvent::Ignored;
        };
        tracing::trace!(%combo, %command, "key dispatch");
        match self.on_command(&command, None) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(%command, %err, "key command failed");
                EditorEvent::Ignored
            }
        }
    }

    pub fn on_text_input(&mut self, text: &str) -> EditorEvent {
        self.dispatch(Transaction::new(vec![Step::InsertText(text.to_string())]).source("input"))
    }

    pub fn on_selection_change(&mut self, selection: Selection) -> EditorEvent {
        self.dispatch(Transaction::new(vec![Step::SetSelection(selection)]).source("selection"))
    }

    pub fn on_command(&mut self, id: &str, args: Option<Value>) -> Result<EditorEvent, CommandError> {
        match self.registry.run_command(id, &self.state, &self.config, args)? {
            Some(tx) => Ok(self.dispatch(tx)),
            None => Ok(EditorEvent::Ignored),
        }
    }

    pub fn on_paste(&mut self, mime: &str, payload: PastePayload) -> EditorEvent {
        let tx = match (mime, payload) {
            (mime, PastePayload::Image(image)) if mime.starts_with("image/") => {
                insert_image(&self.state, &image, self.config.max_image_width)
            }
            ("text/plain", PastePayload::Text { text }) => self.paste_text(&text),
            ("text/html", PastePayload::Structure { content }) => Ok(self.paste_structure(&content)),
            (mime, _) => {
                tracing::debug!(mime, "paste not handled");
                return EditorEvent::Ignored;
            }
        };
        match tx {
            Ok(tx) => self.dispatch(tx.source("paste")),
            Err(err) => EditorEvent::Rejected(err),
        }
    }

    /// The first line goes in at the cursor, each further line becomes its own block.
    fn paste_text(&self, text: &str) -> Result<Transaction, EditError> {
        let mut lines = text.lines();
        let mut tx = Transaction::new(Vec::new());
        if let Some(first) = lines.next() {
            tx = tx.step(Step::InsertText(first.to_string()));
        }
        for line in lines {
            tx = tx.step(Step::ReplaceSelection(block_tile_with_paragraph(
                self.state.schema(),
                line,
            )?));
        }
        Ok(tx)
    }

    /// Imported content that is a single paragraph is inserted inline at the
    /// cursor; anything else goes in block by block.
    fn paste_structure(&self, content: &[Structure]) -> Transaction {
        let fragment = import_fragment(self.state.schema(), content, NodeKind::Doc);
        let inline = match fragment.nodes.as_slice() {
            [Node::Element(tile)] => match tile.children() {
                [Node::Element(block)] if block.kind() == NodeKind::Paragraph => {
                    Some(block.children().to_vec())
                }
                _ => None,
            },
            _ => None,
        };
        let nodes = inline.unwrap_or(fragment.nodes);
        Transaction::new(nodes.into_iter().map(Step::ReplaceSelection).collect())
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        self.registry
            .run_query_json(id, &self.state, &self.config, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::Decode(err.to_string()))
    }

    pub fn to_value(&self) -> DocValue {
        DocValue::from_document(self.state.schema(), self.state.doc())
    }

    /// Replaces the document with `value`, resetting the selection to the start.
    pub fn load_value(&mut self, value: DocValue) -> Result<EditorEvent, EditError> {
        let imported = value.into_document(self.state.schema())?;
        let size = self.state.doc().content_size();
        let content = imported.doc.children().to_vec();
        let tx = Transaction::new(vec![
            Step::Replace {
                from: 0,
                to: size,
                content,
            },
            Step::SetSelection(Selection::cursor(0)),
        ])
        .source("load");
        Ok(self.dispatch(tx))
    }
}
