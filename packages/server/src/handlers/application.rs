use std::cmp;
use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::ApplicationStatus;
use common::render::FieldAnswer;
use common::schema::ContentBlock;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{application, internship, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::internship::find_internship;
use crate::models::application::*;
use crate::models::shared::{Pagination, validate_sort};
use crate::state::AppState;
use crate::utils::identity::sync_user;

/// Validate submitted answers against the internship's published form.
///
/// The client already gates required fields; this is the authoritative
/// re-check. Internships without a form accept no answers.
fn check_answers(
    form: Option<&serde_json::Value>,
    answers: Vec<FieldAnswer>,
) -> Result<Vec<FieldAnswer>, AppError> {
    let Some(form) = form else {
        if answers.is_empty() {
            return Ok(vec![]);
        }
        return Err(AppError::Validation(
            "Internship has no application form".into(),
        ));
    };

    // Fallback: a malformed stored form accepts an empty answer set.
    let blocks: Vec<ContentBlock> = common::json::from_value_or_default(form);

    let mut response_map = HashMap::with_capacity(answers.len());
    for answer in answers {
        if response_map.insert(answer.field_id.clone(), answer.value).is_some() {
            return Err(AppError::Validation(format!(
                "Duplicate answer for field '{}'",
                answer.field_id
            )));
        }
    }

    let wire = common::render::validate_responses(&blocks, &response_map)?;
    Ok(wire)
}

#[utoipa::path(
    post,
    path = "/{id}/applications",
    tag = "Applications",
    operation_id = "submitApplication",
    summary = "Apply to an internship",
    description = "Submits an application with answers to the internship's custom form, if one is published. Required fields are re-validated server-side. At most one application per user and internship; a second attempt returns 409 CONFLICT. Requires `application:submit` permission.",
    params(("id" = i32, Path, description = "Internship ID")),
    request_body = SubmitApplicationRequest,
    responses(
        (status = 201, description = "Application created", body = ApplicationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already applied (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(internship_id, user_id = auth_user.user_id))]
pub async fn submit_application(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(internship_id): Path<i32>,
    AppJson(payload): AppJson<SubmitApplicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("application:submit")?;

    let txn = state.db.begin().await?;

    let internship_model = find_internship(&txn, internship_id).await?;
    let answers = check_answers(internship_model.form.as_ref(), payload.answers)?;

    sync_user(&txn, &auth_user).await?;

    let existing = application::Entity::find()
        .filter(application::Column::InternshipId.eq(internship_id))
        .filter(application::Column::UserId.eq(auth_user.user_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already applied to this internship".into(),
        ));
    }

    let new_application = application::ActiveModel {
        status: Set(ApplicationStatus::Pending),
        responses: Set(serde_json::to_value(&answers)
            .map_err(|e| AppError::Internal(format!("Answer serialization error: {e}")))?),
        feedback: Set(None),
        internship_id: Set(internship_id),
        user_id: Set(auth_user.user_id),
        applied_at: Set(chrono::Utc::now()),
        reviewed_at: Set(None),
        ..Default::default()
    };

    // The unique index catches the race where two submits pass the
    // existence check concurrently.
    let model = new_application
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                "You have already applied to this internship".into(),
            ),
            _ => AppError::from(e),
        })?;

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(build_application_response(
            model,
            auth_user.username,
            internship_model.title,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Applications",
    operation_id = "listApplications",
    summary = "List applications",
    description = "Returns a paginated list of applications with optional filters. Requires `application:review` permission.",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "List of applications", body = ApplicationListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_applications(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    auth_user.require_permission("application:review")?;
    validate_sort(
        query.sort_by.as_deref(),
        query.sort_order.as_deref(),
        &["applied_at", "status"],
    )?;

    let page = cmp::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut base_select = application::Entity::find();

    if let Some(iid) = query.internship_id {
        base_select = base_select.filter(application::Column::InternshipId.eq(iid));
    }
    if let Some(uid) = query.user_id {
        base_select = base_select.filter(application::Column::UserId.eq(uid));
    }
    if let Some(status) = query.status {
        base_select = base_select.filter(application::Column::Status.eq(status));
    }

    let total = base_select.clone().count(&state.db).await?;

    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let select = match query.sort_by.as_deref().unwrap_or("applied_at") {
        "status" => base_select.order_by(application::Column::Status, sort_order),
        _ => base_select.order_by(application::Column::AppliedAt, sort_order),
    };

    let applications = select
        .find_also_related(user::Entity)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = build_application_list_items(&state.db, applications).await?;
    let total_pages = total.div_ceil(per_page);

    Ok(Json(ApplicationListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Applications",
    operation_id = "getApplication",
    summary = "Get application details",
    description = "Returns full details of an application including the submitted answers. Applicants can view their own applications; users with `application:review` permission can view any.",
    params(("id" = i32, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application details", body = ApplicationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Application not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(application_id = %id))]
pub async fn get_application(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let model = find_application(&state.db, id).await?;

    if model.user_id != auth_user.user_id && !auth_user.has_permission("application:review") {
        // Not found rather than forbidden, to prevent enumeration.
        return Err(AppError::NotFound("Application not found".into()));
    }

    let internship_model = find_internship(&state.db, model.internship_id).await?;
    let username = user::Entity::find_by_id(model.user_id)
        .one(&state.db)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| model.user_id.to_string());

    Ok(Json(build_application_response(
        model,
        username,
        internship_model.title,
    )))
}

#[utoipa::path(
    post,
    path = "/{id}/review",
    tag = "Applications",
    operation_id = "reviewApplication",
    summary = "Review an application",
    description = "Accepts or rejects a pending application; feedback is mandatory when rejecting. Sending `Pending` keeps the application in the queue unchanged. Already-decided applications return 409 CONFLICT. Requires `application:review` permission.",
    params(("id" = i32, Path, description = "Application ID")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Application reviewed", body = ApplicationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Application not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Application already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(application_id = %id))]
pub async fn review_application(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ReviewApplicationRequest>,
) -> Result<Json<ApplicationResponse>, AppError> {
    auth_user.require_permission("application:review")?;
    validate_review_application(&payload)?;

    let txn = state.db.begin().await?;

    let model = application::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".into()))?;

    if model.status.is_reviewed() {
        return Err(AppError::Conflict(
            "Application has already been decided".into(),
        ));
    }

    let model = if payload.status == ApplicationStatus::Pending {
        // Quick action "keep pending": no transition.
        model
    } else {
        let mut active: application::ActiveModel = model.into();
        active.status = Set(payload.status);
        active.feedback = Set(payload.feedback.map(|f| f.trim().to_string()));
        active.reviewed_at = Set(Some(chrono::Utc::now()));
        active.update(&txn).await?
    };

    txn.commit().await?;

    let internship_model = find_internship(&state.db, model.internship_id).await?;
    let username = user::Entity::find_by_id(model.user_id)
        .one(&state.db)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| model.user_id.to_string());

    Ok(Json(build_application_response(
        model,
        username,
        internship_model.title,
    )))
}

fn build_application_response(
    model: application::Model,
    username: String,
    internship_title: String,
) -> ApplicationResponse {
    ApplicationResponse {
        id: model.id,
        internship_id: model.internship_id,
        internship_title,
        user_id: model.user_id,
        username,
        status: model.status,
        // Fallback: malformed stored answers display as none.
        answers: common::json::from_value_or_default(&model.responses),
        feedback: model.feedback,
        applied_at: model.applied_at,
        reviewed_at: model.reviewed_at,
    }
}

/// Build list items, batch-fetching internship titles.
async fn build_application_list_items(
    db: &DatabaseConnection,
    applications: Vec<(application::Model, Option<user::Model>)>,
) -> Result<Vec<ApplicationListItem>, AppError> {
    if applications.is_empty() {
        return Ok(vec![]);
    }

    let internship_ids: Vec<i32> = applications.iter().map(|(a, _)| a.internship_id).collect();

    let internships: HashMap<i32, internship::Model> = internship::Entity::find()
        .filter(internship::Column::Id.is_in(internship_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let mut data = Vec::with_capacity(applications.len());
    for (app, user_opt) in applications {
        let internship_model = internships
            .get(&app.internship_id)
            .ok_or_else(|| AppError::Internal("Application internship not found".into()))?;

        data.push(ApplicationListItem {
            id: app.id,
            internship_id: app.internship_id,
            internship_title: internship_model.title.clone(),
            user_id: app.user_id,
            username: user_opt
                .map(|u| u.username)
                .unwrap_or_else(|| app.user_id.to_string()),
            status: app.status,
            applied_at: app.applied_at,
            reviewed_at: app.reviewed_at,
        });
    }

    Ok(data)
}

async fn find_application<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<application::Model, AppError> {
    application::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".into()))
}
