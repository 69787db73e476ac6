use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use common::progress::ProgressSummary;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::Pagination;

/// Request body for creating or resubmitting a submission. The payload is
/// keyed by the task's response requirements, e.g.
/// `{"github": "https://github.com/acme/intro", "text": "Done."}`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    #[schema(value_type = Object)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Request body for reviewing a submission.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReviewSubmissionRequest {
    /// `Approved`, `Rejected` or `RequiresChanges` to decide; `Pending` to
    /// leave the submission in the queue.
    pub status: SubmissionStatus,
    /// Mandatory when rejecting or requesting changes.
    pub feedback: Option<String>,
    /// Optional grade, 0-100.
    #[schema(example = 85)]
    pub grade: Option<i32>,
}

/// Full submission details.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub task_id: i32,
    #[schema(example = "Set up your development environment")]
    pub task_title: String,
    pub internship_id: i32,
    pub user_id: i32,
    #[schema(example = "alice")]
    pub username: String,
    pub status: SubmissionStatus,
    /// Response payload keyed by requirement tag.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub grade: Option<i32>,
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Submission summary for list views (payload omitted).
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListItem {
    pub id: i32,
    pub task_id: i32,
    pub task_title: String,
    pub internship_id: i32,
    pub user_id: i32,
    pub username: String,
    pub status: SubmissionStatus,
    pub grade: Option<i32>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Filter by task ID.
    pub task_id: Option<i32>,
    /// Filter by internship ID.
    pub internship_id: Option<i32>,
    /// Filter by submitting user ID.
    pub user_id: Option<i32>,
    /// Filter by status.
    pub status: Option<SubmissionStatus>,
    /// Sort field: `submitted_at` (default), `status`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

/// Review result: the updated submission plus the owner's recomputed
/// learning-path progress, so unlocks are observed immediately.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ReviewSubmissionResponse {
    pub submission: SubmissionResponse,
    pub progress: ProgressSummary,
}

pub fn validate_review_submission(req: &ReviewSubmissionRequest) -> Result<(), AppError> {
    if matches!(
        req.status,
        SubmissionStatus::Rejected | SubmissionStatus::RequiresChanges
    ) && req.feedback.as_deref().is_none_or(|f| f.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Feedback is required when rejecting or requesting changes".into(),
        ));
    }
    if let Some(grade) = req.grade
        && !(0..=100).contains(&grade)
    {
        return Err(AppError::Validation("Grade must be 0-100".into()));
    }
    Ok(())
}
