use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{user, user_group, user_group_mapping};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::user::{CreateUserQuery, CreateUserRequest, UserResponse, validate_create_user};
use crate::models::user_group::{AdminQuery, MembershipResponse};
use crate::state::AppState;
use crate::utils::access::Access;
use crate::utils::hash;

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    operation_id = "getUsers",
    summary = "List all users",
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id))]
pub async fn list_users(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, target = id))]
pub async fn get_user(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user (id={id})")))?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/users",
    tag = "Users",
    operation_id = "createUser",
    summary = "Create a user and add it to a user group",
    description = "The caller must be an admin of `userGroupId`.",
    params(CreateUserQuery),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "New user", body = UserResponse),
        (status = 400, description = "Invalid fields or duplicate name", body = ErrorBody),
        (status = 404, description = "User group not administered by the caller", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, payload), fields(user_id = principal.user_id, group = query.user_group_id))]
pub async fn create_user(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CreateUserQuery>,
    AppJson(mut payload): AppJson<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_create_user(&mut payload)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    access.user_group(&state.db, query.user_group_id, true).await?;

    let password = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

    let txn = state.db.begin().await?;
    let created = user::ActiveModel {
        name: Set(payload.name),
        password: Set(password),
        email: Set(payload.email),
        creationdate: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    user_group_mapping::ActiveModel {
        user_id: Set(created.id),
        ugrp_id: Set(query.user_group_id),
        is_admin: Set(query.admin),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(new_user = created.id, "Created user");
    Ok(Json(UserResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    operation_id = "getMe",
    summary = "Get the profile of the caller",
    responses(
        (status = 200, description = "Caller", body = UserResponse),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id))]
pub async fn me(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(principal.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user (id={})", principal.user_id)))?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/me/userGroups",
    tag = "Users",
    operation_id = "getMyUserGroups",
    summary = "List the user groups of the caller",
    description = "With `admin=true`, only the groups the caller administers. A superadmin sees every group.",
    params(AdminQuery),
    responses(
        (status = 200, description = "Memberships", body = [MembershipResponse]),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, admin = query.admin))]
pub async fn my_user_groups(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AdminQuery>,
) -> Result<Json<Vec<MembershipResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    if access.superadmin {
        let groups = user_group::Entity::find()
            .order_by_asc(user_group::Column::Id)
            .all(&state.db)
            .await?;
        return Ok(Json(
            groups
                .into_iter()
                .map(|g| MembershipResponse {
                    id: g.id,
                    name: g.name,
                    admin: true,
                })
                .collect(),
        ));
    }

    let mut select = user_group_mapping::Entity::find()
        .filter(user_group_mapping::Column::UserId.eq(principal.user_id))
        .find_also_related(user_group::Entity)
        .order_by_asc(user_group_mapping::Column::UgrpId);
    if query.admin {
        select = select.filter(user_group_mapping::Column::IsAdmin.eq(true));
    }
    let memberships = select
        .all(&state.db)
        .await?
        .into_iter()
        .filter_map(|(mapping, group)| {
            group.map(|g| MembershipResponse {
                id: g.id,
                name: g.name,
                admin: mapping.is_admin,
            })
        })
        .collect();
    Ok(Json(memberships))
}
