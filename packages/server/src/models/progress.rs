use chrono::{DateTime, Utc};
use common::progress::{ProgressSummary, TaskAvailability};
use serde::{Deserialize, Serialize};

/// One task's evaluated availability for the target user.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskProgressItem {
    pub task_id: i32,
    #[schema(example = "Set up your development environment")]
    pub title: String,
    #[schema(example = 1)]
    pub position: i32,
    pub availability: TaskAvailability,
    pub deadline: Option<DateTime<Utc>>,
}

/// Learning-path progress for one user: per-task states plus the aggregate
/// completion summary.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProgressResponse {
    pub tasks: Vec<TaskProgressItem>,
    #[serde(flatten)]
    pub summary: ProgressSummary,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ProgressQuery {
    /// Evaluate for this user instead of the caller. Requires
    /// `submission:view_all`.
    pub user_id: Option<i32>,
}
