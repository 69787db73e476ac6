#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review status of a task submission.
///
/// A submission is created `Pending` and only leaves that state through an
/// admin review action. `RequiresChanges` permits one resubmission path back
/// to `Pending`; `Approved` is terminal.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in
/// SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Waiting for an admin review.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// Accepted by a reviewer. Unlocks the next task in the learning path.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Approved"))]
    Approved,
    /// Rejected by a reviewer.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Rejected"))]
    Rejected,
    /// Sent back for rework; the owner may resubmit once.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RequiresChanges"))]
    RequiresChanges,
}

impl SubmissionStatus {
    /// Returns true once a reviewer has acted on the submission.
    pub fn is_reviewed(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the submission counts toward learning-path progress.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::RequiresChanges,
    ];

    /// Statuses a reviewer may assign.
    pub const REVIEWED: &'static [SubmissionStatus] =
        &[Self::Approved, Self::Rejected, Self::RequiresChanges];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::RequiresChanges => "RequiresChanges",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
    valid: &'static str,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid, self.valid
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            "RequiresChanges" => Ok(Self::RequiresChanges),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
                valid: "Pending, Approved, Rejected, RequiresChanges",
            }),
        }
    }
}

/// Review status of an internship application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum ApplicationStatus {
    /// Waiting for an admin decision.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// Applicant admitted to the internship.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    /// Applicant turned down.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Rejected"))]
    Rejected,
}

impl ApplicationStatus {
    pub fn is_reviewed(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// All possible status values.
    pub const ALL: &'static [ApplicationStatus] = &[Self::Pending, Self::Accepted, Self::Rejected];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ApplicationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
                valid: "Pending, Accepted, Rejected",
            }),
        }
    }
}
