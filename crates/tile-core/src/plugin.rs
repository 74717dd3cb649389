use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::commands::{
    ImageSource, insert_datetime, insert_heading, insert_image, insert_paragraph, split_block,
};
use crate::config::EditorConfig;
use crate::error::{CommandError, QueryError};
use crate::formatting::{
    can_set_mark, font_size_select_value, is_mark_active, mark_button_state, set_mark,
    toggle_mark, unset_mark,
};
use crate::ops::Transaction;
use crate::schema::{Attrs, MarkKind};
use crate::state::EditorState;

/// `Ok(None)` means the command does not apply to the current state.
pub type CommandResult = Result<Option<Transaction>, CommandError>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub handler:
        std::sync::Arc<dyn Fn(&EditorState, &EditorConfig, Option<Value>) -> CommandResult + Send + Sync>,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&EditorState, &EditorConfig, Option<Value>) -> CommandResult
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            handler: std::sync::Arc::new(handler),
        }
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: std::sync::Arc<
        dyn Fn(&EditorState, &EditorConfig, Option<Value>) -> Result<Value, QueryError>
            + Send
            + Sync,
    >,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&EditorState, &EditorConfig, Option<Value>) -> Result<Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: std::sync::Arc::new(handler),
        }
    }
}

pub trait TilePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl CommandRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn TilePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn tile() -> Self {
        let plugins: Vec<Box<dyn TilePlugin>> = vec![
            Box::new(CorePlugin),
            Box::new(HeadingPlugin),
            Box::new(ImagePlugin),
            Box::new(DatetimePlugin),
            Box::new(MarksPlugin),
        ];
        Self::new(plugins).expect("tile registry must be valid")
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn TilePlugin>) -> Result<(), String> {
        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        tracing::trace!(plugin = plugin.id(), "plugin registered");
        Ok(())
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn run_command(
        &self,
        id: &str,
        state: &EditorState,
        config: &EditorConfig,
        args: Option<Value>,
    ) -> CommandResult {
        let Some(command) = self.commands.get(id) else {
            return Err(CommandError::Unknown(id.to_string()));
        };
        (command.handler)(state, config, args)
    }

    pub fn run_query_json(
        &self,
        id: &str,
        state: &EditorState,
        config: &EditorConfig,
        args: Option<Value>,
    ) -> Result<Value, QueryError> {
        let Some(query) = self.queries.get(id) else {
            return Err(QueryError::Unknown(id.to_string()));
        };
        (query.handler)(state, config, args)
    }
}

fn command_args<T: DeserializeOwned>(args: Option<Value>) -> Result<T, CommandError> {
    serde_json::from_value(args.unwrap_or(Value::Null))
        .map_err(|err| CommandError::InvalidArgs(err.to_string()))
}

fn query_args<T: DeserializeOwned>(args: Option<Value>) -> Result<T, QueryError> {
    serde_json::from_value(args.unwrap_or(Value::Null))
        .map_err(|err| QueryError::InvalidArgs(err.to_string()))
}

fn encode<T: serde::Serialize>(value: T) -> Result<Value, QueryError> {
    serde_json::to_value(value).map_err(|err| QueryError::Encode(err.to_string()))
}

struct CorePlugin;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParagraphArgs {
    text: String,
}

impl TilePlugin for CorePlugin {
    fn id(&self) -> &'static str {
        "core"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(
                "core.insert_paragraph",
                "Insert paragraph",
                |state, _config, args| {
                    let args: ParagraphArgs = match args {
                        Some(args) => command_args(Some(args))?,
                        None => ParagraphArgs::default(),
                    };
                    Ok(Some(insert_paragraph(state, &args.text)?))
                },
            ),
            CommandSpec::new("core.split_block", "New block", |state, _config, _args| {
                Ok(Some(split_block(state)?))
            }),
        ]
    }
}

struct HeadingPlugin;

#[derive(Debug, Deserialize)]
struct HeadingArgs {
    #[serde(default = "default_heading_level")]
    level: u8,
    #[serde(default)]
    text: String,
}

fn default_heading_level() -> u8 {
    1
}

impl TilePlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("heading.insert", "Insert heading", |state, _config, args| {
                let args: HeadingArgs = match args {
                    Some(args) => command_args(Some(args))?,
                    None => HeadingArgs {
                        level: default_heading_level(),
                        text: String::new(),
                    },
                };
                if !(1..=6).contains(&args.level) {
                    return Err(CommandError::BadValue(format!(
                        "Heading level must be 1-6, got {}",
                        args.level
                    )));
                }
                Ok(Some(insert_heading(state, args.level, &args.text)?))
            }),
        ]
    }
}

struct ImagePlugin;

impl TilePlugin for ImagePlugin {
    fn id(&self) -> &'static str {
        "image"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Insert image", |state, config, args| {
                let image: ImageSource = command_args(args)?;
                if image.src.trim().is_empty() {
                    return Err(CommandError::BadValue("Missing args.src".to_string()));
                }
                Ok(Some(insert_image(state, &image, config.max_image_width)?))
            }),
        ]
    }
}

struct DatetimePlugin;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatetimeArgs {
    timestamp: Option<i64>,
}

impl TilePlugin for DatetimePlugin {
    fn id(&self) -> &'static str {
        "datetime"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("datetime.insert", "Insert date", |state, _config, args| {
                let args: DatetimeArgs = match args {
                    Some(args) => command_args(Some(args))?,
                    None => DatetimeArgs::default(),
                };
                Ok(Some(insert_datetime(state, args.timestamp)?))
            }),
        ]
    }
}

struct MarksPlugin;

#[derive(Debug, Deserialize)]
struct MarkArgs {
    mark: MarkKind,
}

#[derive(Debug, Deserialize)]
struct FontSizeArgs {
    size: String,
}

#[derive(Debug, Deserialize)]
struct LinkArgs {
    #[serde(alias = "url")]
    href: String,
}

fn toggle_command(id: &str, label: &str, kind: MarkKind) -> CommandSpec {
    CommandSpec::new(id, label, move |state, _config, _args| {
        Ok(toggle_mark(state, kind, &Attrs::new())?)
    })
}

impl TilePlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            toggle_command("marks.toggle_bold", "Toggle bold", MarkKind::Bold),
            toggle_command("marks.toggle_italic", "Toggle italic", MarkKind::Italic),
            toggle_command("marks.toggle_strike", "Toggle strikethrough", MarkKind::Strike),
            toggle_command("marks.toggle_underline", "Toggle underline", MarkKind::Underline),
            CommandSpec::new("marks.set_font_size", "Set font size", |state, config, args| {
                let args: FontSizeArgs = command_args(args)?;
                if !config.font_sizes.iter().any(|s| *s == args.size) {
                    return Err(CommandError::BadValue(format!("Unknown font size: {}", args.size)));
                }
                let attrs = Attrs::from([("size".to_string(), Value::String(args.size))]);
                Ok(set_mark(state, MarkKind::FontSize, &attrs)?)
            }),
            CommandSpec::new(
                "marks.unset_font_size",
                "Unset font size",
                |state, _config, _args| Ok(unset_mark(state, MarkKind::FontSize)),
            ),
            CommandSpec::new("marks.set_link", "Set link", |state, _config, args| {
                let args: LinkArgs = command_args(args)?;
                let attrs = Attrs::from([("href".to_string(), Value::String(args.href))]);
                Ok(set_mark(state, MarkKind::Link, &attrs)?)
            }),
            CommandSpec::new("marks.unset_link", "Unset link", |state, _config, _args| {
                Ok(unset_mark(state, MarkKind::Link))
            }),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.is_active", |state, _config, args| {
                let args: MarkArgs = query_args(args)?;
                Ok(Value::Bool(is_mark_active(state, args.mark)))
            }),
            QuerySpec::new("marks.can_set", |state, _config, args| {
                let args: MarkArgs = query_args(args)?;
                Ok(Value::Bool(can_set_mark(state, args.mark)))
            }),
            QuerySpec::new("marks.button_state", |state, _config, args| {
                let args: MarkArgs = query_args(args)?;
                encode(mark_button_state(state, args.mark))
            }),
            QuerySpec::new("marks.font_size", |state, config, _args| {
                Ok(Value::String(font_size_select_value(
                    state,
                    &config.default_font_size,
                )))
            }),
        ]
    }
}
