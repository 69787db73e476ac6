use std::cmp;
use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{ResponseRequirement, SubmissionStatus};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{submission, task, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{Pagination, validate_sort};
use crate::models::submission::*;
use crate::state::AppState;
use crate::utils::identity::sync_user;

/// Check the submission payload against the task's declared requirements.
fn check_payload(
    task: &task::Model,
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), AppError> {
    // Fallback: a malformed requirements document accepts free-form payloads.
    let requirements: Vec<ResponseRequirement> =
        common::json::from_value_or_default(&task.response_requirements);
    common::requirement::validate_payload(&requirements, payload)
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Enforce the sequential unlock: the task at position 1 is always open,
/// every later task needs an approved submission on its predecessor.
///
/// The deadline is deliberately not checked here — overdue tasks stay
/// submittable; the evaluator reports them as overdue.
async fn check_unlocked<C: ConnectionTrait>(
    db: &C,
    task_model: &task::Model,
    user_id: i32,
) -> Result<(), AppError> {
    if task_model.position <= 1 {
        return Ok(());
    }

    let predecessor = task::Entity::find()
        .filter(task::Column::InternshipId.eq(task_model.internship_id))
        .filter(task::Column::Position.eq(task_model.position - 1))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("Learning path has a position gap".into()))?;

    let approved = submission::Entity::find()
        .filter(submission::Column::TaskId.eq(predecessor.id))
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Approved))
        .one(db)
        .await?
        .is_some();

    if !approved {
        return Err(AppError::TaskLocked(format!(
            "Task is locked until '{}' is approved",
            predecessor.title
        )));
    }

    Ok(())
}

#[utoipa::path(
    post,
    path = "/{task_id}/submissions",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit a response to a task",
    description = "Creates the caller's submission for the task with status `Pending`. The payload must contain exactly the task's declared response requirements. The task must be unlocked: its predecessor in the learning path needs an approved submission first. A task already holding a submission by the caller returns 409 CONFLICT; use resubmission after changes are requested. Requires `submission:submit` permission.",
    params(("task_id" = i32, Path, description = "Task ID")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED, TASK_LOCKED)", body = ErrorBody),
        (status = 404, description = "Task not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already submitted (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(task_id, user_id = auth_user.user_id))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("submission:submit")?;

    let txn = state.db.begin().await?;

    let task_model = find_task(&txn, task_id).await?;
    check_payload(&task_model, &payload.payload)?;
    check_unlocked(&txn, &task_model, auth_user.user_id).await?;

    sync_user(&txn, &auth_user).await?;

    let existing = submission::Entity::find()
        .filter(submission::Column::TaskId.eq(task_id))
        .filter(submission::Column::UserId.eq(auth_user.user_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already submitted to this task".into(),
        ));
    }

    let new_submission = submission::ActiveModel {
        status: Set(SubmissionStatus::Pending),
        payload: Set(serde_json::Value::Object(payload.payload)),
        grade: Set(None),
        feedback: Set(None),
        task_id: Set(task_id),
        user_id: Set(auth_user.user_id),
        submitted_at: Set(chrono::Utc::now()),
        reviewed_at: Set(None),
        ..Default::default()
    };

    // The unique index catches the race where two submits pass the
    // existence check concurrently.
    let model = new_submission
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("You have already submitted to this task".into())
            }
            _ => AppError::from(e),
        })?;

    txn.commit().await?;

    let response = build_submission_response(&state.db, model).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "resubmitSubmission",
    summary = "Resubmit after changes were requested",
    description = "Replaces the payload of the caller's submission and returns it to `Pending`. Only allowed while the submission's status is `RequiresChanges`; the prior review feedback is retained until the next review. The payload is re-validated against the task's response requirements.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 200, description = "Submission resubmitted", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Submission is not awaiting changes (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(submission_id = %id))]
pub async fn resubmit_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let txn = state.db.begin().await?;

    let model = submission::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    if model.user_id != auth_user.user_id {
        // Not found rather than forbidden, to prevent enumeration.
        return Err(AppError::NotFound("Submission not found".into()));
    }

    if model.status != SubmissionStatus::RequiresChanges {
        return Err(AppError::Conflict(
            "Only submissions awaiting changes can be resubmitted".into(),
        ));
    }

    let task_model = find_task(&txn, model.task_id).await?;
    check_payload(&task_model, &payload.payload)?;

    let mut active: submission::ActiveModel = model.into();
    active.payload = Set(serde_json::Value::Object(payload.payload));
    active.status = Set(SubmissionStatus::Pending);
    active.grade = Set(None);
    active.submitted_at = Set(chrono::Utc::now());
    active.reviewed_at = Set(None);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    let response = build_submission_response(&state.db, updated).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get submission details",
    description = "Returns full details of a submission including its payload. Owners can view their own submissions; users with `submission:view_all` permission can view any.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission details", body = SubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn get_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let model = find_submission(&state.db, id).await?;

    if model.user_id != auth_user.user_id && !auth_user.has_permission("submission:view_all") {
        return Err(AppError::NotFound("Submission not found".into()));
    }

    let response = build_submission_response(&state.db, model).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List submissions",
    description = "Returns a paginated list of submissions. Users see their own submissions; users with `submission:view_all` permission see all submissions and may filter by user.",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "List of submissions", body = SubmissionListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    validate_sort(
        query.sort_by.as_deref(),
        query.sort_order.as_deref(),
        &["submitted_at", "status"],
    )?;

    let can_view_all = auth_user.has_permission("submission:view_all");

    let page = cmp::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut base_select = submission::Entity::find();

    if !can_view_all {
        base_select = base_select.filter(submission::Column::UserId.eq(auth_user.user_id));
    }

    if let Some(tid) = query.task_id {
        base_select = base_select.filter(submission::Column::TaskId.eq(tid));
    }
    if let Some(iid) = query.internship_id {
        let task_ids: Vec<i32> = task::Entity::find()
            .filter(task::Column::InternshipId.eq(iid))
            .select_only()
            .column(task::Column::Id)
            .into_tuple()
            .all(&state.db)
            .await?;
        base_select = base_select.filter(submission::Column::TaskId.is_in(task_ids));
    }
    if let Some(uid) = query.user_id
        && (can_view_all || uid == auth_user.user_id)
    {
        base_select = base_select.filter(submission::Column::UserId.eq(uid));
    }
    if let Some(status) = query.status {
        base_select = base_select.filter(submission::Column::Status.eq(status));
    }

    let total = base_select.clone().count(&state.db).await?;

    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let select = match query.sort_by.as_deref().unwrap_or("submitted_at") {
        "status" => base_select.order_by(submission::Column::Status, sort_order),
        _ => base_select.order_by(submission::Column::SubmittedAt, sort_order),
    };

    let submissions = select
        .find_also_related(user::Entity)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = build_submission_list_items(&state.db, submissions).await?;
    let total_pages = total.div_ceil(per_page);

    Ok(Json(SubmissionListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

/// Build full submission response with related data.
pub(crate) async fn build_submission_response(
    db: &DatabaseConnection,
    model: submission::Model,
) -> Result<SubmissionResponse, AppError> {
    let task_model = task::Entity::find_by_id(model.task_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("Submission task not found".into()))?;

    let username = user::Entity::find_by_id(model.user_id)
        .one(db)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| model.user_id.to_string());

    Ok(SubmissionResponse {
        id: model.id,
        task_id: model.task_id,
        task_title: task_model.title,
        internship_id: task_model.internship_id,
        user_id: model.user_id,
        username,
        status: model.status,
        payload: model.payload,
        grade: model.grade,
        feedback: model.feedback,
        submitted_at: model.submitted_at,
        reviewed_at: model.reviewed_at,
    })
}

/// Build list items, batch-fetching task titles.
async fn build_submission_list_items(
    db: &DatabaseConnection,
    submissions: Vec<(submission::Model, Option<user::Model>)>,
) -> Result<Vec<SubmissionListItem>, AppError> {
    if submissions.is_empty() {
        return Ok(vec![]);
    }

    let task_ids: Vec<i32> = submissions.iter().map(|(s, _)| s.task_id).collect();

    let tasks: HashMap<i32, task::Model> = task::Entity::find()
        .filter(task::Column::Id.is_in(task_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let mut data = Vec::with_capacity(submissions.len());
    for (sub, user_opt) in submissions {
        let task_model = tasks
            .get(&sub.task_id)
            .ok_or_else(|| AppError::Internal("Submission task not found".into()))?;

        data.push(SubmissionListItem {
            id: sub.id,
            task_id: sub.task_id,
            task_title: task_model.title.clone(),
            internship_id: task_model.internship_id,
            user_id: sub.user_id,
            username: user_opt
                .map(|u| u.username)
                .unwrap_or_else(|| sub.user_id.to_string()),
            status: sub.status,
            grade: sub.grade,
            submitted_at: sub.submitted_at,
            reviewed_at: sub.reviewed_at,
        });
    }

    Ok(data)
}

pub(crate) async fn find_task<C: ConnectionTrait>(db: &C, id: i32) -> Result<task::Model, AppError> {
    task::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

pub(crate) async fn find_submission<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<submission::Model, AppError> {
    submission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}
