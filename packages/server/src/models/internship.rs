use chrono::{DateTime, Utc};
use common::schema::ContentBlock;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use super::shared::{Pagination, escape_like};
use super::shared::{validate_description, validate_title};
use super::task::TaskListItem;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateInternshipRequest {
    #[schema(example = "Backend Engineering Internship")]
    pub title: String,
    /// Description in Markdown.
    pub description: String,
    /// First day of the internship; task deadlines are offsets from it.
    #[schema(example = "2026-09-01T00:00:00Z")]
    pub start_date: DateTime<Utc>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateInternshipRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Full internship details, including the learning path.
#[derive(Serialize, utoipa::ToSchema)]
pub struct InternshipResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Backend Engineering Internship")]
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    /// Whether a custom application form has been published.
    pub has_form: bool,
    /// Learning-path tasks in position order.
    pub tasks: Vec<TaskListItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct InternshipListItem {
    pub id: i32,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct InternshipListResponse {
    pub data: Vec<InternshipListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct InternshipListQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    /// Sort field: `created_at` (default), `updated_at`, `start_date`, `title`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

/// The published application form.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FormResponse {
    /// Schema blocks in render order.
    pub blocks: Vec<ContentBlock>,
}

impl InternshipResponse {
    pub fn from_model(m: crate::entity::internship::Model, tasks: Vec<TaskListItem>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            start_date: m.start_date,
            has_form: m.form.is_some(),
            tasks,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_internship(req: &CreateInternshipRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    Ok(())
}

pub fn validate_update_internship(req: &UpdateInternshipRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    Ok(())
}

/// Validate and normalize an incoming form schema: block-level invariants
/// checked, order re-densified before the document is persisted.
pub fn validate_form_schema(blocks: &mut Vec<ContentBlock>) -> Result<(), AppError> {
    common::schema::normalize_order(blocks);
    common::schema::validate_schema(blocks)?;
    Ok(())
}
