use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::SubmissionStatus;
use common::progress::{ProgressSummary, TaskMeta, evaluate, summarize};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{internship, submission, task};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::internship::find_internship;
use crate::models::progress::{ProgressQuery, ProgressResponse, TaskProgressItem};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{id}/progress",
    tag = "Progress",
    operation_id = "getProgress",
    summary = "Get learning-path progress",
    description = "Evaluates every task's availability (locked, overdue, pending, requires_changes, completed, rejected, available) and the aggregate completion percentage for the caller. Pass `user_id` to evaluate another user; that requires `submission:view_all` permission. Recomputed from current data on every call.",
    params(
        ("id" = i32, Path, description = "Internship ID"),
        ProgressQuery
    ),
    responses(
        (status = 200, description = "Per-task states and completion summary", body = ProgressResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(internship_id))]
pub async fn get_progress(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(internship_id): Path<i32>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, AppError> {
    let target_user = match query.user_id {
        Some(uid) if uid != auth_user.user_id => {
            auth_user.require_permission("submission:view_all")?;
            uid
        }
        _ => auth_user.user_id,
    };

    let internship_model = find_internship(&state.db, internship_id).await?;
    let response = compute_progress(&state.db, &internship_model, target_user).await?;
    Ok(Json(response))
}

/// Evaluate a user's progress over an internship's learning path.
///
/// Shared with the review handlers so every status transition is followed by
/// a recompute before the response leaves the server.
pub(crate) async fn compute_progress<C: ConnectionTrait>(
    db: &C,
    internship_model: &internship::Model,
    user_id: i32,
) -> Result<ProgressResponse, AppError> {
    let tasks = task::Entity::find()
        .filter(task::Column::InternshipId.eq(internship_model.id))
        .order_by_asc(task::Column::Position)
        .all(db)
        .await?;

    let task_ids: Vec<i32> = tasks.iter().map(|t| t.id).collect();
    let statuses: HashMap<i32, SubmissionStatus> = if task_ids.is_empty() {
        HashMap::new()
    } else {
        submission::Entity::find()
            .filter(submission::Column::UserId.eq(user_id))
            .filter(submission::Column::TaskId.is_in(task_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.task_id, s.status))
            .collect()
    };

    let metas: Vec<TaskMeta> = tasks
        .iter()
        .map(|t| TaskMeta {
            id: t.id,
            position: t.position,
            deadline_offset_days: t.deadline_offset_days,
        })
        .collect();

    let states = evaluate(
        &metas,
        &statuses,
        internship_model.start_date,
        chrono::Utc::now(),
    );
    let summary: ProgressSummary = summarize(&metas, &statuses);

    let titles: HashMap<i32, String> = tasks.into_iter().map(|t| (t.id, t.title)).collect();
    let items = states
        .into_iter()
        .map(|s| TaskProgressItem {
            task_id: s.task_id,
            title: titles.get(&s.task_id).cloned().unwrap_or_default(),
            position: s.position,
            availability: s.availability,
            deadline: s.deadline,
        })
        .collect();

    Ok(ProgressResponse {
        tasks: items,
        summary,
    })
}
