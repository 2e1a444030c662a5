use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::*;
use tracing::instrument;

use super::modified;
use crate::entity::comment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::comment::{
    CommentResponse, CommentsQuery, CreateCommentRequest, validate_comment_text,
};
use crate::state::AppState;
use crate::utils::access::Access;

#[utoipa::path(
    get,
    path = "/objects/{id}/comments",
    tag = "Object comments",
    operation_id = "getObjectComments",
    summary = "List the comments of an object",
    description = "With `forDate`, only the comments whose period covers that date.",
    params(("id" = i64, Path, description = "Object ID"), CommentsQuery),
    responses(
        (status = 200, description = "Comments", body = [CommentResponse]),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, object_id = id))]
pub async fn list_comments(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppQuery(query): AppQuery<CommentsQuery>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;

    let mut select = comment::Entity::find().filter(comment::Column::ObjectId.eq(id));
    if let Some(date) = state.dates.parse_opt(query.for_date.as_deref())? {
        select = select
            .filter(comment::Column::Dfrom.lte(date))
            .filter(comment::Column::Dto.gte(date));
    }
    let comments = select
        .order_by_asc(comment::Column::Dfrom)
        .order_by_asc(comment::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/objects/{id}/comments",
    tag = "Object comments",
    operation_id = "createObjectComment",
    summary = "Attach a comment to a period of an object",
    params(("id" = i64, Path, description = "Object ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "New comment", body = CommentResponse),
        (status = 400, description = "Invalid dates or empty comment", body = ErrorBody),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, object_id = id))]
pub async fn create_comment(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    validate_comment_text(&payload.comment)?;
    let from = state.dates.parse(&payload.from)?;
    let to = state.dates.parse(&payload.to)?;
    if from > to {
        return Err(AppError::WrongParams(format!(
            "from ('{}') should be <= to ('{}')",
            payload.from, payload.to
        )));
    }

    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;

    let created = comment::ActiveModel {
        object_id: Set(id),
        dfrom: Set(from),
        dto: Set(to),
        comment: Set(payload.comment.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    Ok(Json(CommentResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/objects/{id}/comments/{commentId}",
    tag = "Object comments",
    operation_id = "getObjectComment",
    summary = "Get a comment",
    params(
        ("id" = i64, Path, description = "Object ID"),
        ("commentId" = i32, Path, description = "Comment ID"),
    ),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Object or comment not found", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id, comment_id))]
pub async fn get_comment(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(i64, i32)>,
) -> Result<Json<CommentResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;
    let found = comment::Entity::find_by_id(comment_id)
        .filter(comment::Column::ObjectId.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("comment (id={comment_id})")))?;
    Ok(Json(CommentResponse::from(found)))
}

#[utoipa::path(
    delete,
    path = "/objects/{id}/comments/{commentId}",
    tag = "Object comments",
    operation_id = "deleteObjectComment",
    summary = "Delete a comment",
    params(
        ("id" = i64, Path, description = "Object ID"),
        ("commentId" = i32, Path, description = "Comment ID"),
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 304, description = "No such comment"),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id, comment_id))]
pub async fn delete_comment(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(i64, i32)>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;
    let result = comment::Entity::delete_many()
        .filter(comment::Column::Id.eq(comment_id))
        .filter(comment::Column::ObjectId.eq(id))
        .exec(&state.db)
        .await?;
    Ok(modified(result.rows_affected > 0))
}
