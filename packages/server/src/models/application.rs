use chrono::{DateTime, Utc};
use common::ApplicationStatus;
use common::render::FieldAnswer;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::Pagination;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitApplicationRequest {
    /// Answers to the internship's application form.
    #[serde(default)]
    pub answers: Vec<FieldAnswer>,
}

/// Request body for reviewing an application.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReviewApplicationRequest {
    /// `Accepted` or `Rejected` to decide; `Pending` to keep the application
    /// in the queue.
    pub status: ApplicationStatus,
    /// Mandatory when rejecting.
    pub feedback: Option<String>,
}

/// Full application details.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApplicationResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub internship_id: i32,
    #[schema(example = "Backend Engineering Internship")]
    pub internship_title: String,
    pub user_id: i32,
    #[schema(example = "alice")]
    pub username: String,
    pub status: ApplicationStatus,
    pub answers: Vec<FieldAnswer>,
    pub feedback: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Application summary for admin list views (answers omitted).
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApplicationListItem {
    pub id: i32,
    pub internship_id: i32,
    pub internship_title: String,
    pub user_id: i32,
    pub username: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ApplicationListResponse {
    pub data: Vec<ApplicationListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ApplicationListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Filter by internship ID.
    pub internship_id: Option<i32>,
    /// Filter by applicant user ID.
    pub user_id: Option<i32>,
    /// Filter by status.
    pub status: Option<ApplicationStatus>,
    /// Sort field: `applied_at` (default), `status`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

pub fn validate_review_application(req: &ReviewApplicationRequest) -> Result<(), AppError> {
    if matches!(req.status, ApplicationStatus::Rejected)
        && req.feedback.as_deref().is_none_or(|f| f.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Feedback is required when rejecting an application".into(),
        ));
    }
    Ok(())
}
