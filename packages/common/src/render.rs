//! Read-time projection of a schema array into renderable values, plus the
//! authoritative required-field check over a response map.
//!
//! The projection is pure: callers fetch the schema and any prior responses,
//! project them, and convert the collected response map into the wire format
//! (`{field_id, value}` pairs) on submit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::json::parse_or_default;
use crate::schema::{BlockKind, BlockPayload, ContentBlock};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

/// One answered form field in wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldAnswer {
    pub field_id: String,
    #[schema(value_type = Object)]
    pub value: Value,
}

/// A block projected for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum RenderedBlock {
    /// An input control collecting a response keyed by block id.
    Input {
        kind: BlockKind,
        label: String,
        required: bool,
        options: Vec<String>,
        prior: Option<Value>,
    },
    TextView {
        content: String,
    },
    CodeView {
        content: String,
    },
    Image {
        url: String,
    },
    /// Video URL matched a known watch/share/embed pattern.
    EmbeddedVideo {
        video_id: String,
    },
    /// Unrecognized video URL; rendered as an external watch link.
    VideoLink {
        url: String,
    },
    /// PDF file: offered both as inline view and as download.
    PdfFile {
        url: String,
        download_name: String,
    },
    /// Any other file: single download action named after the URL's last
    /// path segment.
    FileDownload {
        url: String,
        download_name: String,
    },
    /// Stored checkbox-group selections.
    Badges { values: Vec<String> },
}

/// Extract a canonical video identifier from the known host URL shapes:
/// `watch?v=`, `embed/`, short links (`youtu.be/`), and `/v/`.
pub fn video_id(url: &str) -> Option<String> {
    const MARKERS: &[&str] = &["watch?v=", "embed/", "youtu.be/", "/v/"];
    for marker in MARKERS {
        if let Some(pos) = url.find(marker) {
            let id: String = url[pos + marker.len()..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect();
            // Canonical ids are exactly 11 characters.
            if id.len() == 11 {
                return Some(id);
            }
        }
    }
    None
}

/// Last path segment of a URL, query string and fragment stripped.
pub fn download_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("download")
        .to_string()
}

fn is_pdf(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Project one block. Media and free-text content render read-only; every
/// other kind becomes an input control carrying any prior response.
pub fn render_block(block: &ContentBlock, prior: Option<&Value>) -> RenderedBlock {
    match &block.payload {
        BlockPayload::Text { content } | BlockPayload::LongText { content }
            if !content.is_empty() =>
        {
            RenderedBlock::TextView {
                content: content.clone(),
            }
        }
        BlockPayload::Code { content } => RenderedBlock::CodeView {
            content: content.clone(),
        },
        BlockPayload::Image { url } => RenderedBlock::Image { url: url.clone() },
        BlockPayload::Video { url } => match video_id(url) {
            Some(video_id) => RenderedBlock::EmbeddedVideo { video_id },
            None => RenderedBlock::VideoLink { url: url.clone() },
        },
        BlockPayload::File { url } => {
            let name = download_name(url);
            if is_pdf(url) {
                RenderedBlock::PdfFile {
                    url: url.clone(),
                    download_name: name,
                }
            } else {
                RenderedBlock::FileDownload {
                    url: url.clone(),
                    download_name: name,
                }
            }
        }
        payload => RenderedBlock::Input {
            kind: payload.kind(),
            label: block.label.clone(),
            required: block.required,
            options: payload.options().cloned().unwrap_or_default(),
            prior: prior.cloned(),
        },
    }
}

/// Project a whole schema in `order` sequence with prior responses keyed by
/// block id.
pub fn render_schema(
    blocks: &[ContentBlock],
    prior: &HashMap<String, Value>,
) -> Vec<RenderedBlock> {
    let mut ordered: Vec<&ContentBlock> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.order);
    ordered
        .into_iter()
        .map(|b| render_block(b, prior.get(&b.id)))
        .collect()
}

/// Project a stored response for read-only display (admin review views).
///
/// Checkbox-group selections are persisted as a JSON array string; malformed
/// documents render as an empty badge list rather than failing the view.
pub fn render_answer(block: &ContentBlock, value: &Value) -> RenderedBlock {
    match block.kind() {
        BlockKind::CheckboxGroup | BlockKind::MultiSelect => {
            let badges = match value {
                Value::String(raw) => parse_or_default::<Vec<String>>(raw),
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            RenderedBlock::Badges { values: badges }
        }
        _ => RenderedBlock::TextView {
            content: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        },
    }
}

fn is_answerable(kind: BlockKind) -> bool {
    !matches!(kind, BlockKind::Video | BlockKind::Image | BlockKind::Code)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Authoritative required-field check: returns the response map converted to
/// wire format in `order` sequence, or the labels of required fields left
/// unanswered. Empty strings and empty arrays do not satisfy `required`.
pub fn validate_responses(
    blocks: &[ContentBlock],
    responses: &HashMap<String, Value>,
) -> Result<Vec<FieldAnswer>, RenderError> {
    let mut ordered: Vec<&ContentBlock> = blocks
        .iter()
        .filter(|b| is_answerable(b.kind()))
        .collect();
    ordered.sort_by_key(|b| b.order);

    let mut missing = Vec::new();
    let mut answers = Vec::new();

    for block in ordered {
        match responses.get(&block.id) {
            Some(value) if !is_empty_value(value) => answers.push(FieldAnswer {
                field_id: block.id.clone(),
                value: value.clone(),
            }),
            _ if block.required => missing.push(block.label.clone()),
            _ => {}
        }
    }

    if missing.is_empty() {
        Ok(answers)
    } else {
        Err(RenderError::MissingRequired(missing))
    }
}
