use chrono::{DateTime, Utc};
use common::ResponseRequirement;
use common::schema::ContentBlock;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{double_option, validate_description, validate_reorder_ids, validate_title};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTaskRequest {
    #[schema(example = "Set up your development environment")]
    pub title: String,
    /// Description in Markdown.
    pub description: String,
    /// Days from the internship start date to the deadline. Omit for no
    /// deadline.
    #[schema(example = 7)]
    pub deadline_offset_days: Option<i32>,
    /// Content blocks shown to the intern.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Payload kinds a submission must contain.
    #[serde(default)]
    pub response_requirements: Vec<ResponseRequirement>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub deadline_offset_days: Option<Option<i32>>,
    pub content: Option<Vec<ContentBlock>>,
    pub response_requirements: Option<Vec<ResponseRequirement>>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReorderTasksRequest {
    /// Ordered list of task ids. Positions assigned 1, 2, 3, ... by array index.
    pub task_ids: Vec<i32>,
}

/// Full task details, content included.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub internship_id: i32,
    pub title: String,
    pub description: String,
    /// 1-based position within the learning path.
    #[schema(example = 1)]
    pub position: i32,
    pub deadline_offset_days: Option<i32>,
    pub content: Vec<ContentBlock>,
    pub response_requirements: Vec<ResponseRequirement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task summary for list views (content omitted).
#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskListItem {
    pub id: i32,
    pub title: String,
    #[schema(example = 1)]
    pub position: i32,
    pub deadline_offset_days: Option<i32>,
    pub response_requirements: Vec<ResponseRequirement>,
}

impl From<crate::entity::task::Model> for TaskResponse {
    fn from(m: crate::entity::task::Model) -> Self {
        Self {
            id: m.id,
            internship_id: m.internship_id,
            title: m.title,
            description: m.description,
            position: m.position,
            deadline_offset_days: m.deadline_offset_days,
            // Fallback: a malformed content document renders as no blocks.
            content: common::json::from_value_or_default(&m.content),
            // Fallback: no requirements means free-form submissions.
            response_requirements: common::json::from_value_or_default(&m.response_requirements),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<crate::entity::task::Model> for TaskListItem {
    fn from(m: crate::entity::task::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            position: m.position,
            deadline_offset_days: m.deadline_offset_days,
            response_requirements: common::json::from_value_or_default(&m.response_requirements),
        }
    }
}

fn validate_requirements(requirements: &[ResponseRequirement]) -> Result<(), AppError> {
    let mut seen = std::collections::HashSet::new();
    for req in requirements {
        if !seen.insert(req) {
            return Err(AppError::Validation(format!(
                "Duplicate response requirement '{req}'"
            )));
        }
    }
    Ok(())
}

fn validate_deadline_offset(offset: Option<i32>) -> Result<(), AppError> {
    if let Some(days) = offset
        && days < 0
    {
        return Err(AppError::Validation(
            "deadline_offset_days must be >= 0".into(),
        ));
    }
    Ok(())
}

/// Saving a task requires a non-empty title and description; content blocks
/// are normalized and validated like any other schema array.
pub fn validate_create_task(req: &mut CreateTaskRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    validate_deadline_offset(req.deadline_offset_days)?;
    validate_requirements(&req.response_requirements)?;
    common::schema::normalize_order(&mut req.content);
    common::schema::validate_schema(&req.content)?;
    Ok(())
}

pub fn validate_update_task(req: &mut UpdateTaskRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(offset) = req.deadline_offset_days {
        validate_deadline_offset(offset)?;
    }
    if let Some(ref requirements) = req.response_requirements {
        validate_requirements(requirements)?;
    }
    if let Some(ref mut content) = req.content {
        common::schema::normalize_order(content);
        common::schema::validate_schema(content)?;
    }
    Ok(())
}

pub fn validate_reorder_tasks(req: &ReorderTasksRequest) -> Result<(), AppError> {
    validate_reorder_ids(&req.task_ids, "task_id")
}
