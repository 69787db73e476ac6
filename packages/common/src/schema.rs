//! The persisted schema describing application-form fields and task content
//! blocks.
//!
//! A schema is a JSON array of [`ContentBlock`]s attached to a parent entity
//! (an internship's application form, or a learning-path task's content).
//! Blocks are a tagged union keyed by `type`; per-variant fields are enforced
//! at construction and validation time rather than by runtime duck-typing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod builder;

/// Errors produced by schema validation and builder operations.
///
/// These are recoverable input errors; the HTTP layer maps them to 400
/// responses and the builder surfaces them as user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Block '{0}' has an empty label")]
    EmptyLabel(String),
    #[error("Choice block '{0}' must have at least one option")]
    NoOptions(String),
    #[error("Cannot remove the last option of block '{0}'")]
    LastOption(String),
    #[error("Duplicate block id '{0}'")]
    DuplicateId(String),
    #[error("No block with id '{0}'")]
    UnknownBlock(String),
    #[error("Option index {index} out of range for block '{id}'")]
    OptionOutOfRange { id: String, index: usize },
    #[error("Block index {0} out of range")]
    IndexOutOfRange(usize),
}

/// The closed set of block types a schema may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Text,
    LongText,
    Number,
    Email,
    Url,
    Date,
    SingleSelect,
    MultiSelect,
    Radio,
    CheckboxGroup,
    File,
    Video,
    Image,
    Code,
}

impl BlockKind {
    /// Returns true for types that carry an option list.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            Self::SingleSelect | Self::MultiSelect | Self::Radio | Self::CheckboxGroup
        )
    }

    /// Label assigned to a freshly created block of this kind.
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::LongText => "Long text",
            Self::Number => "Number",
            Self::Email => "Email",
            Self::Url => "Link",
            Self::Date => "Date",
            Self::SingleSelect => "Select one",
            Self::MultiSelect => "Select any",
            Self::Radio => "Choose one",
            Self::CheckboxGroup => "Check all that apply",
            Self::File => "File",
            Self::Video => "Video",
            Self::Image => "Image",
            Self::Code => "Code",
        }
    }
}

/// Type-specific payload of a block. Choice types carry their option list,
/// media types carry a URL, free-text types carry content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockPayload {
    Text {
        #[serde(default)]
        content: String,
    },
    LongText {
        #[serde(default)]
        content: String,
    },
    Number,
    Email,
    Url,
    Date,
    SingleSelect {
        options: Vec<String>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    Radio {
        options: Vec<String>,
    },
    CheckboxGroup {
        options: Vec<String>,
    },
    File {
        #[serde(default)]
        url: String,
    },
    Video {
        #[serde(default)]
        url: String,
    },
    Image {
        #[serde(default)]
        url: String,
    },
    Code {
        #[serde(default)]
        content: String,
    },
}

impl BlockPayload {
    /// Fresh payload for a block of the given kind. Choice kinds start with a
    /// single placeholder option so the option-list invariant holds from
    /// creation.
    pub fn new(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => Self::Text {
                content: String::new(),
            },
            BlockKind::LongText => Self::LongText {
                content: String::new(),
            },
            BlockKind::Number => Self::Number,
            BlockKind::Email => Self::Email,
            BlockKind::Url => Self::Url,
            BlockKind::Date => Self::Date,
            BlockKind::SingleSelect => Self::SingleSelect {
                options: vec!["Option 1".to_string()],
            },
            BlockKind::MultiSelect => Self::MultiSelect {
                options: vec!["Option 1".to_string()],
            },
            BlockKind::Radio => Self::Radio {
                options: vec!["Option 1".to_string()],
            },
            BlockKind::CheckboxGroup => Self::CheckboxGroup {
                options: vec!["Option 1".to_string()],
            },
            BlockKind::File => Self::File { url: String::new() },
            BlockKind::Video => Self::Video { url: String::new() },
            BlockKind::Image => Self::Image { url: String::new() },
            BlockKind::Code => Self::Code {
                content: String::new(),
            },
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Text { .. } => BlockKind::Text,
            Self::LongText { .. } => BlockKind::LongText,
            Self::Number => BlockKind::Number,
            Self::Email => BlockKind::Email,
            Self::Url => BlockKind::Url,
            Self::Date => BlockKind::Date,
            Self::SingleSelect { .. } => BlockKind::SingleSelect,
            Self::MultiSelect { .. } => BlockKind::MultiSelect,
            Self::Radio { .. } => BlockKind::Radio,
            Self::CheckboxGroup { .. } => BlockKind::CheckboxGroup,
            Self::File { .. } => BlockKind::File,
            Self::Video { .. } => BlockKind::Video,
            Self::Image { .. } => BlockKind::Image,
            Self::Code { .. } => BlockKind::Code,
        }
    }

    pub fn options(&self) -> Option<&Vec<String>> {
        match self {
            Self::SingleSelect { options }
            | Self::MultiSelect { options }
            | Self::Radio { options }
            | Self::CheckboxGroup { options } => Some(options),
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Self::SingleSelect { options }
            | Self::MultiSelect { options }
            | Self::Radio { options }
            | Self::CheckboxGroup { options } => Some(options),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Text { content } | Self::LongText { content } | Self::Code { content } => {
                Some(content)
            }
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::File { url } | Self::Video { url } | Self::Image { url } => Some(url),
            _ => None,
        }
    }
}

/// A single configurable form field or task content block.
///
/// `id` is stable across edits and reorderings; `order` is the dense render
/// index, recomputed after every structural mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContentBlock {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(flatten)]
    pub payload: BlockPayload,
}

impl ContentBlock {
    pub fn kind(&self) -> BlockKind {
        self.payload.kind()
    }
}

/// Validate a single block: non-empty label, and at least one option for
/// choice types.
pub fn validate_block(block: &ContentBlock) -> Result<(), SchemaError> {
    if block.label.trim().is_empty() {
        return Err(SchemaError::EmptyLabel(block.id.clone()));
    }
    if block.kind().is_choice() && block.payload.options().is_none_or(|o| o.is_empty()) {
        return Err(SchemaError::NoOptions(block.id.clone()));
    }
    Ok(())
}

/// Validate a whole schema array: every block valid, ids unique.
pub fn validate_schema(blocks: &[ContentBlock]) -> Result<(), SchemaError> {
    let mut seen = std::collections::HashSet::with_capacity(blocks.len());
    for block in blocks {
        validate_block(block)?;
        if !seen.insert(block.id.as_str()) {
            return Err(SchemaError::DuplicateId(block.id.clone()));
        }
    }
    Ok(())
}

/// Recompute `order` as the dense 0-based index. Blocks are first stably
/// sorted by their stored order so a sparse or duplicated incoming sequence
/// keeps its relative arrangement.
pub fn normalize_order(blocks: &mut [ContentBlock]) {
    blocks.sort_by_key(|b| b.order);
    for (i, block) in blocks.iter_mut().enumerate() {
        block.order = i as u32;
    }
}
