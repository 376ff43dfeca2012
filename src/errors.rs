//! Error types for item composition
//!
//! Low-level errors (`SpanError`, `RenderError`) carry no item context; the
//! composer wraps them into `ComposeError` with the offending item and part
//! identifiers attached.

use thiserror::Error;

/// Errors raised while resolving locations against a base text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    /// Location cannot be parsed, is reversed, or improperly overlaps another span
    #[error("malformed span `{location}`: {reason}")]
    Malformed { location: String, reason: String },

    /// Location parses but points outside the base text
    #[error("location `{location}` is outside the text: {reason}")]
    UnknownCoordinate { location: String, reason: String },
}

impl SpanError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SpanError::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SpanError::UnknownCoordinate {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Span error located in a specific layer part
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("layer {part_id}: {source}")]
pub struct FlattenError {
    pub part_id: String,
    pub source: SpanError,
}

/// Errors raised by part renderers
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Renderer-specific failure
    #[error("{0}")]
    Message(String),

    /// Template compilation or rendering failed
    #[error("template error: {0}")]
    Template(String),

    /// Part JSON did not have the expected shape
    #[error("unexpected part data: {0}")]
    Json(String),

    /// XML writer failure
    #[error("XML output failed: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for RenderError {
    fn from(err: quick_xml::Error) -> Self {
        RenderError::Xml(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for RenderError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        RenderError::Xml(err.to_string())
    }
}

impl From<mustache::Error> for RenderError {
    fn from(err: mustache::Error) -> Self {
        RenderError::Template(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Json(err.to_string())
    }
}

/// Template filling failure for head/tail wrappers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Placeholder names a value missing from the data bag
    #[error("unresolved placeholder `{0}`")]
    Unresolved(String),

    /// Template text is not valid mustache
    #[error("invalid template: {0}")]
    Invalid(String),
}

/// Top-level composition error, always attached to an item (or to the run on close)
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    #[error("item {item_id}, part {part_id}: {source}")]
    MalformedSpan {
        item_id: String,
        part_id: String,
        source: SpanError,
    },

    #[error("item {item_id}, part {part_id}: {source}")]
    UnknownCoordinate {
        item_id: String,
        part_id: String,
        source: SpanError,
    },

    #[error("item {item_id}, part {part_id}: no renderer registered for {key}")]
    UnregisteredRenderer {
        item_id: String,
        part_id: String,
        key: String,
    },

    /// `item_id` is `None` for the wrap-up tail emitted on close
    #[error("template for flow `{flow}` ({}): {source}", .item_id.as_deref().unwrap_or("close"))]
    TemplateFill {
        item_id: Option<String>,
        flow: String,
        source: TemplateError,
    },

    #[error("item {item_id}, part {part_id}: render failed: {source}")]
    Render {
        item_id: String,
        part_id: String,
        source: RenderError,
    },

    #[error("composer is not open")]
    NotOpen,
}

impl ComposeError {
    /// Attach item/part context to a span error, keeping its category
    pub fn from_span(item_id: &str, part_id: &str, err: SpanError) -> Self {
        match err {
            SpanError::Malformed { .. } => ComposeError::MalformedSpan {
                item_id: item_id.to_string(),
                part_id: part_id.to_string(),
                source: err,
            },
            SpanError::UnknownCoordinate { .. } => ComposeError::UnknownCoordinate {
                item_id: item_id.to_string(),
                part_id: part_id.to_string(),
                source: err,
            },
        }
    }

    /// Item id the error refers to, if any
    pub fn item_id(&self) -> Option<&str> {
        match self {
            ComposeError::MalformedSpan { item_id, .. }
            | ComposeError::UnknownCoordinate { item_id, .. }
            | ComposeError::UnregisteredRenderer { item_id, .. }
            | ComposeError::Render { item_id, .. } => Some(item_id),
            ComposeError::TemplateFill { item_id, .. } => item_id.as_deref(),
            ComposeError::NotOpen => None,
        }
    }
}

/// Settings parsing failure
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a complete export run
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid item source: {0}")]
    Source(#[from] serde_json::Error),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
