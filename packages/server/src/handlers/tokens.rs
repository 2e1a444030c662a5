use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::*;
use tracing::{info, instrument};

use super::modified;
use crate::entity::token;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::OptionalJson;
use crate::models::token::{TokenDescription, TokenResponse, validate_description};
use crate::state::AppState;
use crate::utils::access::Access;
use crate::utils::secret;

async fn find_token<C: ConnectionTrait>(
    db: &C,
    object_id: i64,
    token_id: i32,
) -> Result<Option<token::Model>, DbErr> {
    token::Entity::find_by_id(token_id)
        .filter(token::Column::ObjectId.eq(object_id))
        .one(db)
        .await
}

#[utoipa::path(
    get,
    path = "/objects/{id}/tokens",
    tag = "Object tokens",
    operation_id = "getObjectTokens",
    summary = "List the tokens of an object",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Tokens", body = [TokenResponse]),
        (status = 404, description = "Object not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn list_tokens(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TokenResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;
    let tokens = token::Entity::find()
        .filter(token::Column::ObjectId.eq(id))
        .order_by_asc(token::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(tokens.into_iter().map(TokenResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/objects/{id}/tokens",
    tag = "Object tokens",
    operation_id = "createObjectToken",
    summary = "Create a token for an object",
    description = "The body is optional and only carries a description.",
    params(("id" = i64, Path, description = "Object ID")),
    request_body(content = Option<TokenDescription>, description = "Optional description"),
    responses(
        (status = 200, description = "New token", body = TokenResponse),
        (status = 400, description = "The object is disabled", body = ErrorBody),
        (status = 404, description = "Object not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, body), fields(user_id = principal.user_id, object_id = id))]
pub async fn create_token(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    OptionalJson(body): OptionalJson<TokenDescription>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_description(&body)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    let obj = access.object(&state.db, id, true).await?;
    if obj.disabled {
        return Err(AppError::WrongParams(format!("Object {id} is disabled.")));
    }

    let created = token::ActiveModel {
        object_id: Set(id),
        token: Set(secret::generate()),
        description: Set(body.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    info!(token_id = created.id, "Created token");
    Ok(Json(TokenResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/objects/{id}/tokens/{tokenId}",
    tag = "Object tokens",
    operation_id = "getObjectToken",
    summary = "Get a token of an object",
    params(
        ("id" = i64, Path, description = "Object ID"),
        ("tokenId" = i32, Path, description = "Token ID"),
    ),
    responses(
        (status = 200, description = "Token", body = TokenResponse),
        (status = 404, description = "Object or token not found", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id, token_id))]
pub async fn get_token(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, token_id)): Path<(i64, i32)>,
) -> Result<Json<TokenResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;
    let found = find_token(&state.db, id, token_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("token (oid={id}, id={token_id})")))?;
    Ok(Json(TokenResponse::from(found)))
}

#[utoipa::path(
    post,
    path = "/objects/{id}/tokens/{tokenId}",
    tag = "Object tokens",
    operation_id = "editObjectToken",
    summary = "Edit the description of a token",
    params(
        ("id" = i64, Path, description = "Object ID"),
        ("tokenId" = i32, Path, description = "Token ID"),
    ),
    request_body = TokenDescription,
    responses(
        (status = 200, description = "Token", body = TokenResponse),
        (status = 404, description = "Object or token not found", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, body), fields(user_id = principal.user_id, object_id = id, token_id))]
pub async fn edit_token(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, token_id)): Path<(i64, i32)>,
    OptionalJson(body): OptionalJson<TokenDescription>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_description(&body)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;
    let found = find_token(&state.db, id, token_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("token (oid={id}, id={token_id})")))?;
    if found.description == body.description {
        return Ok(Json(TokenResponse::from(found)));
    }

    let mut active: token::ActiveModel = found.into();
    active.description = Set(body.description);
    let updated = active.update(&state.db).await?;
    Ok(Json(TokenResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/objects/{id}/tokens/{tokenId}",
    tag = "Object tokens",
    operation_id = "deleteObjectToken",
    summary = "Delete a token",
    params(
        ("id" = i64, Path, description = "Object ID"),
        ("tokenId" = i32, Path, description = "Token ID"),
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 304, description = "No such token"),
        (status = 404, description = "Object not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id, token_id))]
pub async fn delete_token(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, token_id)): Path<(i64, i32)>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;
    let result = token::Entity::delete_many()
        .filter(token::Column::Id.eq(token_id))
        .filter(token::Column::ObjectId.eq(id))
        .exec(&state.db)
        .await?;
    if result.rows_affected > 0
        && let Some(cache) = &state.meta_cache
    {
        cache.clear();
    }
    Ok(modified(result.rows_affected > 0))
}
