use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::{info, instrument};

use super::modified;
use super::objects::with_tags;
use crate::entity::{object, object_group, object_group_member, object_group_right, user_group};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::{AppJson, OptionalJson};
use crate::extractors::query::AppQuery;
use crate::models::object::ObjectResponse;
use crate::models::object_group::{
    CreateObjectGroupRequest, EditObjectGroupRequest, ListObjectGroupsQuery, ObjectGroupResponse,
    WithObjectsQuery, validate_create_object_group, validate_edit_object_group,
};
use crate::models::user_group::UserGroupResponse;
use crate::state::AppState;
use crate::utils::access::Access;

async fn objects_of<C: ConnectionTrait>(
    db: &C,
    group_ids: &[i32],
) -> Result<HashMap<i32, Vec<ObjectResponse>>, DbErr> {
    let mut by_group: HashMap<i32, Vec<ObjectResponse>> = HashMap::new();
    if group_ids.is_empty() {
        return Ok(by_group);
    }
    let members = object_group_member::Entity::find()
        .filter(object_group_member::Column::OgrpId.is_in(group_ids.iter().copied()))
        .all(db)
        .await?;
    let ids: Vec<i64> = members.iter().map(|m| m.object_id).collect();
    let objects = object::Entity::find()
        .filter(object::Column::Id.is_in(ids))
        .order_by_asc(object::Column::Id)
        .all(db)
        .await?;
    let objects: HashMap<i64, ObjectResponse> = with_tags(db, objects)
        .await?
        .into_iter()
        .map(|o| (o.id, o))
        .collect();
    for m in members {
        if let Some(obj) = objects.get(&m.object_id) {
            by_group.entry(m.ogrp_id).or_default().push(obj.clone());
        }
    }
    for list in by_group.values_mut() {
        list.sort_by_key(|o| o.id);
    }
    Ok(by_group)
}

async fn respond<C: ConnectionTrait>(
    db: &C,
    groups: Vec<object_group::Model>,
    with_objects: bool,
) -> Result<Vec<ObjectGroupResponse>, DbErr> {
    let mut objects = if with_objects {
        let ids: Vec<i32> = groups.iter().map(|g| g.id).collect();
        Some(objects_of(db, &ids).await?)
    } else {
        None
    };
    Ok(groups
        .into_iter()
        .map(|g| {
            let id = g.id;
            let mut resp = ObjectGroupResponse::from(g);
            if let Some(objects) = objects.as_mut() {
                resp.objects = Some(objects.remove(&id).unwrap_or_default());
            }
            resp
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/objectGroups",
    tag = "ObjectGroups",
    operation_id = "getObjectGroups",
    summary = "List the object groups you can access",
    description = "The `objects` array is only present with `withObjects=true`.",
    params(ListObjectGroupsQuery),
    responses(
        (status = 200, description = "Object groups", body = [ObjectGroupResponse]),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, writable = query.writable))]
pub async fn list_object_groups(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListObjectGroupsQuery>,
) -> Result<Json<Vec<ObjectGroupResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let groups = access
        .object_groups(query.writable)
        .order_by_asc(object_group::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(respond(&state.db, groups, query.with_objects).await?))
}

#[utoipa::path(
    put,
    path = "/objectGroups",
    tag = "ObjectGroups",
    operation_id = "createObjectGroup",
    summary = "Create an object group",
    description = "`owner` is the ID of a user group you administer.",
    request_body = CreateObjectGroupRequest,
    responses(
        (status = 200, description = "New object group", body = ObjectGroupResponse),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Owner not administered by the caller", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, owner = payload.owner))]
pub async fn create_object_group(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<CreateObjectGroupRequest>,
) -> Result<Json<ObjectGroupResponse>, AppError> {
    validate_create_object_group(&mut payload)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    access.user_group(&state.db, payload.owner, true).await?;

    let created = object_group::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        ugrp_id: Set(payload.owner),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    info!(object_group_id = created.id, "Created object group");
    Ok(Json(ObjectGroupResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/objectGroups/{id}",
    tag = "ObjectGroups",
    operation_id = "getObjectGroup",
    summary = "Get an object group",
    params(("id" = i32, Path, description = "Object group ID"), WithObjectsQuery),
    responses(
        (status = 200, description = "Object group", body = ObjectGroupResponse),
        (status = 404, description = "Not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, object_group_id = id))]
pub async fn get_object_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<WithObjectsQuery>,
) -> Result<Json<ObjectGroupResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let group = access.object_group(&state.db, id, false).await?;
    respond(&state.db, vec![group], query.with_objects)
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("objectGroup (id={id})")))
}

#[utoipa::path(
    post,
    path = "/objectGroups/{id}",
    tag = "ObjectGroups",
    operation_id = "editObjectGroup",
    summary = "Edit the name or description of an object group",
    params(("id" = i32, Path, description = "Object group ID")),
    request_body = EditObjectGroupRequest,
    responses(
        (status = 200, description = "Updated object group", body = ObjectGroupResponse),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, object_group_id = id))]
pub async fn edit_object_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    OptionalJson(mut payload): OptionalJson<EditObjectGroupRequest>,
) -> Result<Json<ObjectGroupResponse>, AppError> {
    validate_edit_object_group(&mut payload)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    let group = access.object_group(&state.db, id, true).await?;
    if payload.name.is_none() && payload.description.is_none() {
        return Ok(Json(ObjectGroupResponse::from(group)));
    }

    let mut active: object_group::ActiveModel = group.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    let updated = active.update(&state.db).await?;
    Ok(Json(ObjectGroupResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/objectGroups/{id}",
    tag = "ObjectGroups",
    operation_id = "deleteObjectGroup",
    summary = "Delete an object group",
    description = "The objects themselves are kept.",
    params(("id" = i32, Path, description = "Object group ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 304, description = "Not found or not accessible"),
        (status = 403, description = "Readable but not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id))]
pub async fn delete_object_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    if access.object_group(&state.db, id, false).await.is_err() {
        return Ok(StatusCode::NOT_MODIFIED);
    }
    if access.object_group(&state.db, id, true).await.is_err() {
        return Err(AppError::Forbidden(
            "You must have admin rights on this object group to delete it.".into(),
        ));
    }

    let txn = state.db.begin().await?;
    object_group_member::Entity::delete_many()
        .filter(object_group_member::Column::OgrpId.eq(id))
        .exec(&txn)
        .await?;
    object_group_right::Entity::delete_many()
        .filter(object_group_right::Column::OgrpId.eq(id))
        .exec(&txn)
        .await?;
    object_group::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted object group");
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/objectGroups/{id}/objects",
    tag = "ObjectGroups",
    operation_id = "getObjectGroupObjects",
    summary = "List the objects of an object group",
    params(("id" = i32, Path, description = "Object group ID")),
    responses(
        (status = 200, description = "Objects", body = [ObjectResponse]),
        (status = 404, description = "Not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id))]
pub async fn list_group_objects(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ObjectResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object_group(&state.db, id, false).await?;
    let objects = objects_of(&state.db, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    Ok(Json(objects))
}

#[utoipa::path(
    put,
    path = "/objectGroups/{id}/objects/{objectId}",
    tag = "ObjectGroups",
    operation_id = "addObjectToGroup",
    summary = "Add an object to an object group",
    description = "Requires write access to both the group and the object.",
    params(
        ("id" = i32, Path, description = "Object group ID"),
        ("objectId" = i64, Path, description = "Object ID"),
    ),
    responses(
        (status = 200, description = "Added"),
        (status = 304, description = "Already in the group"),
        (status = 404, description = "Group or object not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id, object_id))]
pub async fn add_group_object(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, object_id)): Path<(i32, i64)>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object_group(&state.db, id, true).await?;
    if object_group_member::Entity::find_by_id((id, object_id))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Ok(StatusCode::NOT_MODIFIED);
    }
    access.object(&state.db, object_id, true).await?;

    object_group_member::ActiveModel {
        ogrp_id: Set(id),
        object_id: Set(object_id),
    }
    .insert(&state.db)
    .await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/objectGroups/{id}/objects/{objectId}",
    tag = "ObjectGroups",
    operation_id = "removeObjectFromGroup",
    summary = "Remove an object from an object group",
    params(
        ("id" = i32, Path, description = "Object group ID"),
        ("objectId" = i64, Path, description = "Object ID"),
    ),
    responses(
        (status = 200, description = "Removed"),
        (status = 304, description = "Not in the group"),
        (status = 404, description = "Group not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id, object_id))]
pub async fn remove_group_object(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, object_id)): Path<(i32, i64)>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object_group(&state.db, id, true).await?;
    let result = object_group_member::Entity::delete_by_id((id, object_id))
        .exec(&state.db)
        .await?;
    Ok(modified(result.rows_affected > 0))
}

#[utoipa::path(
    get,
    path = "/objectGroups/{id}/userGroups",
    tag = "ObjectGroups",
    operation_id = "getObjectGroupPermissions",
    summary = "List the user groups granted read access to an object group",
    params(("id" = i32, Path, description = "Object group ID")),
    responses(
        (status = 200, description = "User groups", body = [UserGroupResponse]),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id))]
pub async fn list_permissions(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<UserGroupResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object_group(&state.db, id, true).await?;
    let granted = SeaQuery::select()
        .column(object_group_right::Column::UgrpId)
        .from(object_group_right::Entity)
        .and_where(object_group_right::Column::OgrpId.eq(id))
        .to_owned();
    let groups = user_group::Entity::find()
        .filter(user_group::Column::Id.in_subquery(granted))
        .order_by_asc(user_group::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(groups.into_iter().map(UserGroupResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/objectGroups/{id}/userGroups/{userGroupId}",
    tag = "ObjectGroups",
    operation_id = "grantObjectGroup",
    summary = "Grant a user group read access to an object group",
    params(
        ("id" = i32, Path, description = "Object group ID"),
        ("userGroupId" = i32, Path, description = "User group ID"),
    ),
    responses(
        (status = 200, description = "Granted"),
        (status = 304, description = "Already granted"),
        (status = 404, description = "Group not writable, or no such user group", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id, user_group_id))]
pub async fn grant_permission(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, user_group_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object_group(&state.db, id, true).await?;
    user_group::Entity::find_by_id(user_group_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("userGroup (id={user_group_id})")))?;

    if object_group_right::Entity::find_by_id((id, user_group_id))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Ok(StatusCode::NOT_MODIFIED);
    }
    object_group_right::ActiveModel {
        ogrp_id: Set(id),
        ugrp_id: Set(user_group_id),
    }
    .insert(&state.db)
    .await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/objectGroups/{id}/userGroups/{userGroupId}",
    tag = "ObjectGroups",
    operation_id = "revokeObjectGroup",
    summary = "Revoke the read access of a user group",
    params(
        ("id" = i32, Path, description = "Object group ID"),
        ("userGroupId" = i32, Path, description = "User group ID"),
    ),
    responses(
        (status = 200, description = "Revoked"),
        (status = 304, description = "Was not granted"),
        (status = 404, description = "Group not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_group_id = id, user_group_id))]
pub async fn revoke_permission(
    principal: Principal,
    State(state): State<AppState>,
    Path((id, user_group_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object_group(&state.db, id, true).await?;
    let result = object_group_right::Entity::delete_by_id((id, user_group_id))
        .exec(&state.db)
        .await?;
    Ok(modified(result.rows_affected > 0))
}
