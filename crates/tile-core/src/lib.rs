mod commands;
mod config;
mod content;
mod core;
mod editor;
mod error;
mod formatting;
mod keymap;
mod marks;
mod ops;
mod plugin;
mod position;
mod replace;
mod schema;
mod selection;
mod serde_value;
mod state;
mod structure;
mod tile_schema;

pub use crate::commands::*;
pub use crate::config::*;
pub use crate::content::{ContentExpr, ContentTerm};
pub use crate::core::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::formatting::*;
pub use crate::keymap::*;
pub use crate::marks::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::position::*;
pub use crate::replace::*;
pub use crate::schema::*;
pub use crate::selection::*;
pub use crate::serde_value::*;
pub use crate::state::*;
pub use crate::structure::*;
