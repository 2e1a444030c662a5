use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::*;
use tracing::{info, instrument};

use super::modified;
use crate::entity::{
    object, object_group, object_group_right, user, user_group, user_group_mapping,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::user_group::{
    AdminQuery, CreateUserGroupRequest, MemberResponse, UserGroupResponse,
    validate_create_user_group,
};
use crate::state::AppState;
use crate::utils::access::Access;

/// The first user, admin of the superadmin group, cannot lose that membership.
const ROOT_USER: i32 = 1;

/// Check the caller may see (or, with `admin`, modify) the members of a group.
///
/// Non-members get a 404, members without admin rights a 403.
async fn ensure_member<C: ConnectionTrait>(
    db: &C,
    access: &Access,
    group_id: i32,
    admin: bool,
) -> Result<(), AppError> {
    access.user_group(db, group_id, false).await?;
    if admin && !access.superadmin {
        let mapping = user_group_mapping::Entity::find_by_id((access.user_id, group_id))
            .one(db)
            .await?;
        if !mapping.is_some_and(|m| m.is_admin) {
            return Err(AppError::Forbidden(
                "You must be admin of this userGroup to manage its users.".into(),
            ));
        }
    }
    Ok(())
}

fn protect_root(group_id: i32, user_id: i32) -> Result<(), AppError> {
    if group_id == user_group::SUPERADMIN_GROUP && user_id == ROOT_USER {
        return Err(AppError::Forbidden(format!(
            "Cannot edit the membership of user {ROOT_USER} in the SUPERADMIN group."
        )));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/userGroups",
    tag = "UserGroups",
    operation_id = "getUserGroups",
    summary = "List your user groups",
    description = "A superadmin sees every group.",
    params(AdminQuery),
    responses(
        (status = 200, description = "User groups", body = [UserGroupResponse]),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, admin = query.admin))]
pub async fn list_user_groups(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AdminQuery>,
) -> Result<Json<Vec<UserGroupResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let groups = access
        .user_groups(query.admin)
        .order_by_asc(user_group::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(groups.into_iter().map(UserGroupResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/userGroups",
    tag = "UserGroups",
    operation_id = "createUserGroup",
    summary = "Create a user group",
    description = "The caller becomes admin of the new group.",
    request_body = CreateUserGroupRequest,
    responses(
        (status = 200, description = "New user group", body = UserGroupResponse),
        (status = 400, description = "Invalid or duplicate name", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id))]
pub async fn create_user_group(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<CreateUserGroupRequest>,
) -> Result<Json<UserGroupResponse>, AppError> {
    validate_create_user_group(&mut payload)?;

    let txn = state.db.begin().await?;
    let group = user_group::ActiveModel {
        name: Set(payload.name),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    user_group_mapping::ActiveModel {
        user_id: Set(principal.user_id),
        ugrp_id: Set(group.id),
        is_admin: Set(true),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(group_id = group.id, "Created user group");
    Ok(Json(UserGroupResponse::from(group)))
}

#[utoipa::path(
    get,
    path = "/userGroups/{id}",
    tag = "UserGroups",
    operation_id = "getUserGroup",
    summary = "Get a user group you belong to",
    params(("id" = i32, Path, description = "User group ID")),
    responses(
        (status = 200, description = "User group", body = UserGroupResponse),
        (status = 404, description = "Not found or not a member", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, group_id = id))]
pub async fn get_user_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserGroupResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let group = access.user_group(&state.db, id, false).await?;
    Ok(Json(UserGroupResponse::from(group)))
}

#[utoipa::path(
    delete,
    path = "/userGroups/{id}",
    tag = "UserGroups",
    operation_id = "deleteUserGroup",
    summary = "Delete a user group you administer",
    description = "Only groups that own no objects and no object groups can be deleted. The SUPERADMIN group (id 1) cannot be deleted.",
    params(("id" = i32, Path, description = "User group ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 304, description = "No such group"),
        (status = 400, description = "The group still owns resources", body = ErrorBody),
        (status = 403, description = "SUPERADMIN group, or caller not admin", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, group_id = id))]
pub async fn delete_user_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if id == user_group::SUPERADMIN_GROUP {
        return Err(AppError::Forbidden(
            "Deleting SUPERADMIN group is forbidden.".into(),
        ));
    }
    if user_group::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Ok(StatusCode::NOT_MODIFIED);
    }
    let access = Access::load(&state.db, principal.user_id).await?;
    if access
        .user_groups(true)
        .filter(user_group::Column::Id.eq(id))
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(AppError::Forbidden("Only admins can delete usergroups".into()));
    }

    let owned_objects = object::Entity::find()
        .filter(object::Column::UgrpId.eq(id))
        .count(&state.db)
        .await?;
    let owned_groups = object_group::Entity::find()
        .filter(object_group::Column::UgrpId.eq(id))
        .count(&state.db)
        .await?;
    if owned_objects + owned_groups > 0 {
        return Err(AppError::WrongParams(
            "This usergroup owns resources. It cannot be deleted. Ask you admin for support."
                .into(),
        ));
    }

    // Mappings and rights go with the group.
    let txn = state.db.begin().await?;
    user_group_mapping::Entity::delete_many()
        .filter(user_group_mapping::Column::UgrpId.eq(id))
        .exec(&txn)
        .await?;
    object_group_right::Entity::delete_many()
        .filter(object_group_right::Column::UgrpId.eq(id))
        .exec(&txn)
        .await?;
    user_group::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted user group");
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/userGroups/{id}/users",
    tag = "UserGroups",
    operation_id = "getUserGroupUsers",
    summary = "List the members of a user group",
    params(("id" = i32, Path, description = "User group ID")),
    responses(
        (status = 200, description = "Members", body = [MemberResponse]),
        (status = 404, description = "Not found or not a member", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, group_id = id))]
pub async fn list_members(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<MemberResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    ensure_member(&state.db, &access, id, false).await?;

    let rows = user_group_mapping::Entity::find()
        .filter(user_group_mapping::Column::UgrpId.eq(id))
        .find_also_related(user::Entity)
        .order_by_asc(user_group_mapping::Column::UserId)
        .all(&state.db)
        .await?;
    let members = rows
        .into_iter()
        .filter_map(|(mapping, usr)| {
            usr.map(|u| MemberResponse {
                id: u.id,
                name: u.name,
                admin: mapping.is_admin,
            })
        })
        .collect();
    Ok(Json(members))
}

#[utoipa::path(
    get,
    path = "/userGroups/{id}/users/{userId}",
    tag = "UserGroups",
    operation_id = "getUserGroupUser",
    summary = "Get one member of a user group",
    params(
        ("id" = i32, Path, description = "User group ID"),
        ("userId" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Member", body = MemberResponse),
        (status = 404, description = "Not a member", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, group_id = id, member = member_id))]
pub async fn get_member(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, member_id)): Path<(i32, i32)>,
) -> Result<Json<MemberResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    ensure_member(&state.db, &access, id, false).await?;

    let (mapping, usr) = user_group_mapping::Entity::find_by_id((member_id, id))
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user (id={member_id}) in userGroup (id={id})")))?;
    let usr = usr.ok_or_else(|| AppError::not_found(format!("user (id={member_id})")))?;
    Ok(Json(MemberResponse {
        id: usr.id,
        name: usr.name,
        admin: mapping.is_admin,
    }))
}

#[utoipa::path(
    put,
    path = "/userGroups/{id}/users/{userId}",
    tag = "UserGroups",
    operation_id = "addUserToGroup",
    summary = "Add a user to a group, or change their admin flag",
    params(
        ("id" = i32, Path, description = "User group ID"),
        ("userId" = i32, Path, description = "User ID"),
        AdminQuery,
    ),
    responses(
        (status = 200, description = "Membership created or updated"),
        (status = 304, description = "Membership already as requested"),
        (status = 403, description = "Caller not admin, or protected membership", body = ErrorBody),
        (status = 404, description = "No such group or user", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, group_id = id, member = member_id, admin = query.admin))]
pub async fn put_member(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, member_id)): Path<(i32, i32)>,
    AppQuery(query): AppQuery<AdminQuery>,
) -> Result<StatusCode, AppError> {
    protect_root(id, member_id)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    ensure_member(&state.db, &access, id, true).await?;
    user::Entity::find_by_id(member_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user (id={member_id})")))?;

    let existing = user_group_mapping::Entity::find_by_id((member_id, id))
        .one(&state.db)
        .await?;
    match existing {
        Some(mapping) if mapping.is_admin == query.admin => Ok(StatusCode::NOT_MODIFIED),
        Some(mapping) => {
            let mut active: user_group_mapping::ActiveModel = mapping.into();
            active.is_admin = Set(query.admin);
            active.update(&state.db).await?;
            Ok(StatusCode::OK)
        }
        None => {
            user_group_mapping::ActiveModel {
                user_id: Set(member_id),
                ugrp_id: Set(id),
                is_admin: Set(query.admin),
            }
            .insert(&state.db)
            .await?;
            Ok(StatusCode::OK)
        }
    }
}

#[utoipa::path(
    delete,
    path = "/userGroups/{id}/users/{userId}",
    tag = "UserGroups",
    operation_id = "removeUserFromGroup",
    summary = "Remove a user from a group",
    params(
        ("id" = i32, Path, description = "User group ID"),
        ("userId" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Removed"),
        (status = 304, description = "Not a member"),
        (status = 403, description = "Caller not admin, or protected membership", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, group_id = id, member = member_id))]
pub async fn delete_member(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, member_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    protect_root(id, member_id)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    ensure_member(&state.db, &access, id, true).await?;

    let result = user_group_mapping::Entity::delete_by_id((member_id, id))
        .exec(&state.db)
        .await?;
    Ok(modified(result.rows_affected > 0))
}
