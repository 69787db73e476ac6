use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{submission, task};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::internship::{find_internship, find_internship_for_update};
use crate::models::task::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Tasks",
    operation_id = "createTask",
    summary = "Create a learning-path task",
    description = "Appends a new task at the end of the internship's learning path. Requires `internship:edit` permission. Content blocks are validated and their order re-densified before saving.",
    params(("id" = i32, Path, description = "Internship ID")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(internship_id, title = %payload.title))]
pub async fn create_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(internship_id): Path<i32>,
    AppJson(mut payload): AppJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("internship:edit")?;
    validate_create_task(&mut payload)?;

    let txn = state.db.begin().await?;
    find_internship_for_update(&txn, internship_id).await?;

    // Positions are contiguous from 1, so the next slot is count + 1.
    let position = task::Entity::find()
        .filter(task::Column::InternshipId.eq(internship_id))
        .count(&txn)
        .await? as i32
        + 1;

    let now = chrono::Utc::now();
    let new_task = task::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        position: Set(position),
        deadline_offset_days: Set(payload.deadline_offset_days),
        content: Set(serde_json::to_value(&payload.content)
            .map_err(|e| AppError::Internal(format!("Content serialization error: {e}")))?),
        response_requirements: Set(serde_json::to_value(&payload.response_requirements)
            .map_err(|e| AppError::Internal(format!("Requirements serialization error: {e}")))?),
        internship_id: Set(internship_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_task.insert(&txn).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Tasks",
    operation_id = "listTasks",
    summary = "List the internship's learning-path tasks",
    description = "Returns all tasks in position order. Content is omitted from list results.",
    params(("id" = i32, Path, description = "Internship ID")),
    responses(
        (status = 200, description = "List of tasks", body = Vec<TaskListItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(internship_id))]
pub async fn list_tasks(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(internship_id): Path<i32>,
) -> Result<Json<Vec<TaskListItem>>, AppError> {
    find_internship(&state.db, internship_id).await?;

    let tasks = task::Entity::find()
        .filter(task::Column::InternshipId.eq(internship_id))
        .order_by_asc(task::Column::Position)
        .all(&state.db)
        .await?;

    Ok(Json(tasks.into_iter().map(TaskListItem::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{task_id}",
    tag = "Tasks",
    operation_id = "getTask",
    summary = "Get a task by ID",
    description = "Returns the full details of a task, including its content blocks and response requirements.",
    params(
        ("id" = i32, Path, description = "Internship ID"),
        ("task_id" = i32, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task details", body = TaskResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(internship_id, task_id))]
pub async fn get_task(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path((internship_id, task_id)): Path<(i32, i32)>,
) -> Result<Json<TaskResponse>, AppError> {
    let model = find_task_in_internship(&state.db, internship_id, task_id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{task_id}",
    tag = "Tasks",
    operation_id = "updateTask",
    summary = "Update an existing task",
    description = "Partially updates a task using PATCH semantics — only provided fields are modified. Requires `internship:edit` permission. Setting `deadline_offset_days` to null removes the deadline.",
    params(
        ("id" = i32, Path, description = "Internship ID"),
        ("task_id" = i32, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(internship_id, task_id))]
pub async fn update_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((internship_id, task_id)): Path<(i32, i32)>,
    AppJson(mut payload): AppJson<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    auth_user.require_permission("internship:edit")?;
    validate_update_task(&mut payload)?;

    let txn = state.db.begin().await?;

    let existing = find_task_in_internship(&txn, internship_id, task_id).await?;
    let mut active: task::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(offset) = payload.deadline_offset_days {
        active.deadline_offset_days = Set(offset);
    }
    if let Some(ref content) = payload.content {
        active.content = Set(serde_json::to_value(content)
            .map_err(|e| AppError::Internal(format!("Content serialization error: {e}")))?);
    }
    if let Some(ref requirements) = payload.response_requirements {
        active.response_requirements = Set(serde_json::to_value(requirements)
            .map_err(|e| AppError::Internal(format!("Requirements serialization error: {e}")))?);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{task_id}",
    tag = "Tasks",
    operation_id = "deleteTask",
    summary = "Delete a task by ID",
    description = "Permanently deletes a task and closes the position gap so the learning path stays contiguous. Requires `internship:edit` permission. Returns 409 CONFLICT while the task has submissions.",
    params(
        ("id" = i32, Path, description = "Internship ID"),
        ("task_id" = i32, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Cannot delete: has submissions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(internship_id, task_id))]
pub async fn delete_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((internship_id, task_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("internship:edit")?;

    let txn = state.db.begin().await?;
    find_internship_for_update(&txn, internship_id).await?;

    let existing = find_task_in_internship(&txn, internship_id, task_id).await?;

    let sub_count = submission::Entity::find()
        .filter(submission::Column::TaskId.eq(task_id))
        .count(&txn)
        .await?;
    if sub_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete task with existing submissions".into(),
        ));
    }

    task::Entity::delete_by_id(task_id).exec(&txn).await?;

    // Close the gap: every later task moves up one position.
    let later_ids: Vec<(i32, i32)> = task::Entity::find()
        .filter(task::Column::InternshipId.eq(internship_id))
        .filter(task::Column::Position.gt(existing.position))
        .select_only()
        .column(task::Column::Id)
        .column(task::Column::Position)
        .into_tuple()
        .all(&txn)
        .await?;

    for (id, position) in later_ids {
        task::Entity::update_many()
            .filter(task::Column::Id.eq(id))
            .col_expr(task::Column::Position, Expr::value(position - 1))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/reorder",
    tag = "Tasks",
    operation_id = "reorderTasks",
    summary = "Reorder the learning path",
    description = "Replaces the task order with the given permutation. The list must contain exactly the internship's current task ids; positions are assigned 1, 2, 3, ... by array index. Requires `internship:edit` permission.",
    params(("id" = i32, Path, description = "Internship ID")),
    request_body = ReorderTasksRequest,
    responses(
        (status = 204, description = "Tasks reordered"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(internship_id))]
pub async fn reorder_tasks(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(internship_id): Path<i32>,
    AppJson(payload): AppJson<ReorderTasksRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("internship:edit")?;
    validate_reorder_tasks(&payload)?;

    let txn = state.db.begin().await?;
    find_internship_for_update(&txn, internship_id).await?;

    let existing: Vec<i32> = task::Entity::find()
        .filter(task::Column::InternshipId.eq(internship_id))
        .select_only()
        .column(task::Column::Id)
        .into_tuple::<i32>()
        .all(&txn)
        .await?;

    let existing_set: std::collections::HashSet<i32> = existing.into_iter().collect();
    let payload_set: std::collections::HashSet<i32> = payload.task_ids.iter().copied().collect();
    if existing_set != payload_set {
        return Err(AppError::Validation(
            "task_ids must contain exactly the tasks currently in the learning path".into(),
        ));
    }

    for (i, &id) in payload.task_ids.iter().enumerate() {
        task::Entity::update_many()
            .filter(task::Column::Id.eq(id))
            .col_expr(
                task::Column::Position,
                Expr::value(
                    i32::try_from(i + 1)
                        .map_err(|_| AppError::Validation("Too many tasks to reorder".into()))?,
                ),
            )
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_task_in_internship<C: ConnectionTrait>(
    db: &C,
    internship_id: i32,
    task_id: i32,
) -> Result<task::Model, AppError> {
    let task = task::Entity::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if task.internship_id != internship_id {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(task)
}
