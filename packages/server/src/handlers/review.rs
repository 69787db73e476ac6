use axum::Json;
use axum::extract::{Path, State};
use common::SubmissionStatus;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{internship, submission};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::progress::compute_progress;
use crate::handlers::submission::{build_submission_response, find_task};
use crate::models::submission::{
    ReviewSubmissionRequest, ReviewSubmissionResponse, validate_review_submission,
};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/review",
    tag = "Review",
    operation_id = "reviewSubmission",
    summary = "Review a submission",
    description = "Approves, rejects or requests changes on a submission; feedback is mandatory when rejecting or requesting changes, and an optional 0-100 grade may be attached. Sending `Pending` keeps the submission in the queue unchanged. Approved and rejected submissions are final and return 409 CONFLICT. The response includes the owner's recomputed learning-path progress, since an approval may unlock the next task. Requires `submission:review` permission.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = ReviewSubmissionRequest,
    responses(
        (status = 200, description = "Submission reviewed", body = ReviewSubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Submission already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(submission_id = %id, reviewer = auth_user.user_id))]
pub async fn review_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ReviewSubmissionRequest>,
) -> Result<Json<ReviewSubmissionResponse>, AppError> {
    auth_user.require_permission("submission:review")?;
    validate_review_submission(&payload)?;

    let txn = state.db.begin().await?;

    let model = submission::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    // Approved and rejected are terminal; only pending work (and reworked
    // submissions still awaiting changes) can be decided.
    if matches!(
        model.status,
        SubmissionStatus::Approved | SubmissionStatus::Rejected
    ) {
        return Err(AppError::Conflict(
            "Submission has already been decided".into(),
        ));
    }

    let model = if payload.status == SubmissionStatus::Pending {
        // Quick action "keep pending": no transition.
        model
    } else {
        let mut active: submission::ActiveModel = model.into();
        active.status = Set(payload.status);
        active.feedback = Set(payload.feedback.map(|f| f.trim().to_string()));
        active.grade = Set(payload.grade);
        active.reviewed_at = Set(Some(chrono::Utc::now()));
        let updated = active.update(&txn).await?;

        info!(
            submission_id = updated.id,
            status = %updated.status,
            "Submission reviewed"
        );
        updated
    };

    txn.commit().await?;

    // Recompute the owner's progress so a freshly unlocked task is observed
    // before any follow-up request.
    let task_model = find_task(&state.db, model.task_id).await?;
    let internship_model = internship::Entity::find_by_id(task_model.internship_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Task internship not found".into()))?;
    let progress = compute_progress(&state.db, &internship_model, model.user_id).await?;

    let submission = build_submission_response(&state.db, model).await?;

    Ok(Json(ReviewSubmissionResponse {
        submission,
        progress: progress.summary,
    }))
}
