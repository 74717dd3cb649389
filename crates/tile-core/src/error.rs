use thiserror::Error;

/// Configuration errors. Raised while building a [`crate::Schema`], never while editing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("node type `{0}` registered twice")]
    DuplicateNode(&'static str),
    #[error("mark type `{0}` registered twice")]
    DuplicateMark(&'static str),
    #[error("malformed content rule `{rule}` on `{node}`: {reason}")]
    MalformedContentRule {
        node: &'static str,
        rule: String,
        reason: String,
    },
    #[error("content rule on `{node}` references unknown type or group `{name}`")]
    UnknownContentName { node: &'static str, name: String },
    #[error("attribute `{attr}` on `{owner}` has a default that does not match its type")]
    BadAttrDefault { owner: &'static str, attr: &'static str },
    #[error("schema is missing required type `{0}`")]
    MissingType(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    #[error("position {pos} is outside the document (size {size})")]
    InvalidPosition { pos: usize, size: usize },
    #[error("not applicable: {0}")]
    NotApplicable(&'static str),
}

impl EditError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaViolation(message.into())
    }
}

/// Failure of a registered command. Commands that merely do not apply return
/// `Ok(None)` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid args: {0}")]
    InvalidArgs(String),
    #[error("{0}")]
    BadValue(String),
    #[error(transparent)]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Unknown query: {0}")]
    Unknown(String),
    #[error("Invalid args: {0}")]
    InvalidArgs(String),
    #[error("Failed to encode query result: {0}")]
    Encode(String),
    #[error("Failed to decode query result: {0}")]
    Decode(String),
}

/// A structural piece that matched no registered import rule and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dropped `<{tag}>`: {reason}")]
pub struct MalformedImport {
    pub tag: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid key combo `{0}`")]
pub struct KeyParseError(pub String);
