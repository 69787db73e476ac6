//! Response requirements: the kinds of payload a task demands from a
//! submission (a repository link, free text, an image, a PDF).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseRequirement {
    Github,
    Text,
    Image,
    Pdf,
}

impl ResponseRequirement {
    pub const ALL: &'static [ResponseRequirement] =
        &[Self::Github, Self::Text, Self::Image, Self::Pdf];

    /// JSON key of this requirement in a submission payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Text => "text",
            Self::Image => "image",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ResponseRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Missing required response '{0}'")]
    Missing(&'static str),
    #[error("Response '{0}' must be a non-empty string")]
    Empty(&'static str),
    #[error("Unknown response key '{0}'")]
    UnknownKey(String),
}

/// Check a submission payload against a task's declared requirements: every
/// declared key present with a non-empty string value, no undeclared keys.
pub fn validate_payload(
    requirements: &[ResponseRequirement],
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), PayloadError> {
    for req in requirements {
        match payload.get(req.as_str()) {
            None => return Err(PayloadError::Missing(req.as_str())),
            Some(value) => {
                let ok = value.as_str().is_some_and(|s| !s.trim().is_empty());
                if !ok {
                    return Err(PayloadError::Empty(req.as_str()));
                }
            }
        }
    }

    for key in payload.keys() {
        if !requirements.iter().any(|r| r.as_str() == key) {
            return Err(PayloadError::UnknownKey(key.clone()));
        }
    }

    Ok(())
}
