use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::schema::ContentBlock;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{application, internship, submission, task};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::internship::*;
use crate::models::shared::{Pagination, validate_sort};
use crate::models::task::TaskListItem;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Internships",
    operation_id = "createInternship",
    summary = "Create a new internship",
    description = "Creates a new internship posting. Requires `internship:create` permission.",
    request_body = CreateInternshipRequest,
    responses(
        (status = 201, description = "Internship created", body = InternshipResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_internship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateInternshipRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("internship:create")?;
    validate_create_internship(&payload)?;

    let now = chrono::Utc::now();
    let new_internship = internship::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        start_date: Set(payload.start_date),
        form: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_internship.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(InternshipResponse::from_model(model, vec![])),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Internships",
    operation_id = "listInternships",
    summary = "List internships with pagination and search",
    description = "Returns a paginated list of internships with optional case-insensitive title search and sorting. Descriptions and forms are omitted from list results.",
    params(InternshipListQuery),
    responses(
        (status = 200, description = "List of internships", body = InternshipListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_internships(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<InternshipListQuery>,
) -> Result<Json<InternshipListResponse>, AppError> {
    validate_sort(
        query.sort_by.as_deref(),
        query.sort_order.as_deref(),
        &["created_at", "updated_at", "start_date", "title"],
    )?;

    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = internship::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(internship::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "updated_at" => internship::Column::UpdatedAt,
        "start_date" => internship::Column::StartDate,
        "title" => internship::Column::Title,
        _ => internship::Column::CreatedAt,
    };

    let total = select.clone().count(&state.db).await?;
    let total_pages = total.div_ceil(per_page);

    let data = select
        .order_by(sort_column, sort_order)
        .select_only()
        .column(internship::Column::Id)
        .column(internship::Column::Title)
        .column(internship::Column::StartDate)
        .column(internship::Column::CreatedAt)
        .column(internship::Column::UpdatedAt)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .into_model::<InternshipListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(InternshipListResponse {
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
    tag = "Internships",
    operation_id = "getInternship",
    summary = "Get an internship by ID",
    description = "Returns the full details of an internship, including its learning-path tasks in position order.",
    params(("id" = i32, Path, description = "Internship ID")),
    responses(
        (status = 200, description = "Internship details", body = InternshipResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_internship(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<InternshipResponse>, AppError> {
    let model = find_internship(&state.db, id).await?;

    let tasks: Vec<TaskListItem> = task::Entity::find()
        .filter(task::Column::InternshipId.eq(id))
        .order_by_asc(task::Column::Position)
        .all(&state.db)
        .await?
        .into_iter()
        .map(TaskListItem::from)
        .collect();

    Ok(Json(InternshipResponse::from_model(model, tasks)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Internships",
    operation_id = "updateInternship",
    summary = "Update an existing internship",
    description = "Partially updates an internship using PATCH semantics — only provided fields are modified. Requires `internship:edit` permission. An empty payload returns the current resource unchanged.",
    params(("id" = i32, Path, description = "Internship ID")),
    request_body = UpdateInternshipRequest,
    responses(
        (status = 200, description = "Internship updated", body = InternshipResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_internship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateInternshipRequest>,
) -> Result<Json<InternshipResponse>, AppError> {
    auth_user.require_permission("internship:edit")?;
    validate_update_internship(&payload)?;

    if payload == UpdateInternshipRequest::default() {
        let existing = find_internship(&state.db, id).await?;
        return Ok(Json(InternshipResponse::from_model(existing, vec![])));
    }

    let txn = state.db.begin().await?;

    let existing = find_internship_for_update(&txn, id).await?;
    let mut active: internship::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(start_date);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(InternshipResponse::from_model(model, vec![])))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Internships",
    operation_id = "deleteInternship",
    summary = "Delete an internship by ID",
    description = "Permanently deletes an internship and its learning-path tasks. Requires `internship:delete` permission. Returns 409 CONFLICT while applications or submissions exist.",
    params(("id" = i32, Path, description = "Internship ID")),
    responses(
        (status = 204, description = "Internship deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Cannot delete: has applications or submissions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_internship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("internship:delete")?;

    let txn = state.db.begin().await?;

    let _internship = find_internship_for_update(&txn, id).await?;

    let app_count = application::Entity::find()
        .filter(application::Column::InternshipId.eq(id))
        .count(&txn)
        .await?;
    if app_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete internship with existing applications".into(),
        ));
    }

    let task_ids: Vec<i32> = task::Entity::find()
        .filter(task::Column::InternshipId.eq(id))
        .select_only()
        .column(task::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;

    if !task_ids.is_empty() {
        let sub_count = submission::Entity::find()
            .filter(submission::Column::TaskId.is_in(task_ids.clone()))
            .count(&txn)
            .await?;
        if sub_count > 0 {
            return Err(AppError::Conflict(
                "Cannot delete internship with existing submissions".into(),
            ));
        }

        task::Entity::delete_many()
            .filter(task::Column::InternshipId.eq(id))
            .exec(&txn)
            .await?;
    }

    internship::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/form",
    tag = "Internships",
    operation_id = "getApplicationForm",
    summary = "Get the internship's application form",
    description = "Returns the published application form schema, or 404 if the internship has no custom form.",
    params(("id" = i32, Path, description = "Internship ID")),
    responses(
        (status = 200, description = "Application form schema", body = FormResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Internship or form not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_application_form(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FormResponse>, AppError> {
    let model = find_internship(&state.db, id).await?;

    let form = model
        .form
        .ok_or_else(|| AppError::NotFound("Internship has no application form".into()))?;

    // Fallback: a malformed stored form renders as an empty schema.
    let blocks: Vec<ContentBlock> = common::json::from_value_or_default(&form);
    Ok(Json(FormResponse { blocks }))
}

#[utoipa::path(
    put,
    path = "/{id}/form",
    tag = "Internships",
    operation_id = "putApplicationForm",
    summary = "Publish or replace the application form",
    description = "Validates the block array (non-empty labels, at least one option per choice block, unique ids), re-densifies the order sequence and stores the schema. Requires `internship:edit` permission.",
    params(("id" = i32, Path, description = "Internship ID")),
    request_body = Vec<ContentBlock>,
    responses(
        (status = 200, description = "Form saved", body = FormResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Internship not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn put_application_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(mut payload): AppJson<Vec<ContentBlock>>,
) -> Result<Json<FormResponse>, AppError> {
    auth_user.require_permission("internship:edit")?;
    validate_form_schema(&mut payload)?;

    let txn = state.db.begin().await?;

    let existing = find_internship_for_update(&txn, id).await?;
    let mut active: internship::ActiveModel = existing.into();
    active.form = Set(Some(serde_json::to_value(&payload).map_err(|e| {
        AppError::Internal(format!("Form serialization error: {e}"))
    })?));
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;

    Ok(Json(FormResponse { blocks: payload }))
}

pub(crate) async fn find_internship<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<internship::Model, AppError> {
    internship::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Internship not found".into()))
}

pub(crate) async fn find_internship_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<internship::Model, AppError> {
    use sea_orm::sea_query::LockType;
    internship::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Internship not found".into()))
}
