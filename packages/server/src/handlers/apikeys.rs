use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bbdata_common::{DateConfig, duration};
use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::instrument;

use super::modified;
use crate::entity::apikey;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::OptionalJson;
use crate::extractors::query::AppQuery;
use crate::models::auth::{
    ApikeyResponse, CreateApikeyQuery, CreateApikeyRequest, DESCRIPTION_MAX, EditApikeyRequest,
};
use crate::models::shared::validate_max_len;
use crate::state::AppState;
use crate::utils::secret;

pub(crate) async fn insert_apikey<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    readonly: bool,
    expirationdate: Option<DateTime<Utc>>,
    description: Option<String>,
) -> Result<apikey::Model, AppError> {
    let key = apikey::ActiveModel {
        user_id: Set(user_id),
        secret: Set(secret::generate()),
        readonly: Set(readonly),
        expirationdate: Set(expirationdate),
        description: Set(description),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(key)
}

/// An ISO date or a duration from now; `"null"` means no expiration.
pub(crate) fn parse_expiration(
    dates: &DateConfig,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    if let Ok(date) = bbdata_common::dates::parse_iso(raw) {
        return Ok(Some(dates.check(date)?));
    }
    Ok(Some(duration::from_now(raw, now)?))
}

#[utoipa::path(
    get,
    path = "/apikeys",
    tag = "Authentication",
    operation_id = "getApikeys",
    summary = "List your apikeys",
    description = "Requires a writable apikey even though it only reads.",
    responses(
        (status = 200, description = "Apikeys of the caller", body = [ApikeyResponse]),
        (status = 403, description = "Invalid or read-only apikey", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id))]
pub async fn list_apikeys(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<ApikeyResponse>>, AppError> {
    let keys = apikey::Entity::find()
        .filter(apikey::Column::UserId.eq(principal.user_id))
        .order_by_asc(apikey::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(keys.into_iter().map(ApikeyResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/apikeys",
    tag = "Authentication",
    operation_id = "createApikey",
    summary = "Create an apikey",
    description = "`expirationDate` is an ISO date (UTC) or a duration such as `1d`, `3h` or `1d-3h`. Leave it out, or set it to `null`, for a key that never expires.",
    params(CreateApikeyQuery),
    request_body(content = Option<CreateApikeyRequest>, description = "Optional description"),
    responses(
        (status = 200, description = "New apikey", body = ApikeyResponse),
        (status = 400, description = "Bad expiration date (WrongParamsException)", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, body), fields(user_id = principal.user_id, writable = query.writable))]
pub async fn create_apikey(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CreateApikeyQuery>,
    OptionalJson(body): OptionalJson<CreateApikeyRequest>,
) -> Result<Json<ApikeyResponse>, AppError> {
    validate_max_len("description", body.description.as_deref(), DESCRIPTION_MAX)?;
    let expiration = match query.expiration_date.as_deref() {
        Some(raw) => parse_expiration(&state.dates, raw, Utc::now())?,
        None => None,
    };
    let key = insert_apikey(
        &state.db,
        principal.user_id,
        !query.writable,
        expiration,
        body.description,
    )
    .await?;
    Ok(Json(ApikeyResponse::from(key)))
}

#[utoipa::path(
    post,
    path = "/apikeys/{id}",
    tag = "Authentication",
    operation_id = "editApikey",
    summary = "Edit one of your apikeys",
    description = "Absent fields are left untouched. Pass `expirationDate: \"null\"` to remove the expiration.",
    params(("id" = i32, Path, description = "Apikey ID")),
    request_body = EditApikeyRequest,
    responses(
        (status = 200, description = "Updated apikey", body = ApikeyResponse),
        (status = 404, description = "No such apikey (ItemNotFoundException)", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, body), fields(user_id = principal.user_id, apikey_id = id))]
pub async fn edit_apikey(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    OptionalJson(body): OptionalJson<EditApikeyRequest>,
) -> Result<Json<ApikeyResponse>, AppError> {
    validate_max_len("description", body.description.as_deref(), DESCRIPTION_MAX)?;
    let key = apikey::Entity::find_by_id(id)
        .filter(apikey::Column::UserId.eq(principal.user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("apikey (id={id})")))?;

    let mut active: apikey::ActiveModel = key.into();
    if let Some(raw) = body.expiration_date.as_deref() {
        active.expirationdate = Set(parse_expiration(&state.dates, raw, Utc::now())?);
    }
    if let Some(readonly) = body.read_only {
        active.readonly = Set(readonly);
    }
    if let Some(description) = body.description {
        active.description = Set(Some(description));
    }
    let updated = active.update(&state.db).await?;
    Ok(Json(ApikeyResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/apikeys/{id}",
    tag = "Authentication",
    operation_id = "deleteApikey",
    summary = "Delete one of your apikeys",
    params(("id" = i32, Path, description = "Apikey ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 304, description = "Nothing to delete"),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, apikey_id = id))]
pub async fn delete_apikey(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let result = apikey::Entity::delete_many()
        .filter(apikey::Column::Id.eq(id))
        .filter(apikey::Column::UserId.eq(principal.user_id))
        .exec(&state.db)
        .await?;
    Ok(modified(result.rows_affected > 0))
}
