use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::{info, instrument};

use super::modified;
use crate::entity::{
    aggregation, comment, object, object_group, object_group_member, object_stats, tag, token,
    unit,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::{AppJson, OptionalJson};
use crate::extractors::query::AppQuery;
use crate::models::object::{
    CreateObjectRequest, EditObjectRequest, ListObjectsQuery, ObjectResponse, TagsQuery,
    validate_create_object, validate_edit_object, validate_tags,
};
use crate::models::object_group::ObjectGroupResponse;
use crate::models::shared::split_list;
use crate::state::AppState;
use crate::timeseries;
use crate::utils::access::Access;

/// Tags of every object in `ids`, sorted by name.
pub(crate) async fn load_tags<C: ConnectionTrait>(
    db: &C,
    ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>, DbErr> {
    let mut by_object: HashMap<i64, Vec<String>> = HashMap::new();
    if ids.is_empty() {
        return Ok(by_object);
    }
    let rows = tag::Entity::find()
        .filter(tag::Column::ObjectId.is_in(ids.iter().copied()))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;
    for row in rows {
        by_object.entry(row.object_id).or_default().push(row.name);
    }
    Ok(by_object)
}

pub(crate) async fn with_tags<C: ConnectionTrait>(
    db: &C,
    objects: Vec<object::Model>,
) -> Result<Vec<ObjectResponse>, DbErr> {
    let ids: Vec<i64> = objects.iter().map(|o| o.id).collect();
    let mut tags = load_tags(db, &ids).await?;
    Ok(objects
        .into_iter()
        .map(|o| {
            let t = tags.remove(&o.id).unwrap_or_default();
            ObjectResponse::new(o, t)
        })
        .collect())
}

/// Drop cached ingestion metadata after a change that affects it.
fn evict_metadata(state: &AppState) {
    if let Some(cache) = &state.meta_cache {
        cache.clear();
    }
}

async fn insert_objects(
    state: &AppState,
    principal: &Principal,
    mut requests: Vec<CreateObjectRequest>,
) -> Result<Vec<ObjectResponse>, AppError> {
    let Some(first) = requests.first() else {
        return Err(AppError::WrongParams("object array is empty.".into()));
    };
    let owner = first.owner;
    if requests.iter().any(|r| r.owner != owner) {
        return Err(AppError::WrongParams(
            "cannot create objects in bulk with different owners".into(),
        ));
    }
    for req in requests.iter_mut() {
        validate_create_object(req)?;
    }

    let access = Access::load(&state.db, principal.user_id).await?;
    access.user_group(&state.db, owner, true).await?;

    let symbols: HashSet<&str> = requests.iter().map(|r| r.unit_symbol.as_str()).collect();
    let known: HashSet<String> = unit::Entity::find()
        .filter(unit::Column::Symbol.is_in(symbols.iter().copied()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| u.symbol)
        .collect();
    if let Some(bad) = requests.iter().find(|r| !known.contains(&r.unit_symbol)) {
        return Err(AppError::WrongParams(format!(
            "Object '{}': unit '{}' does not exist.",
            bad.name, bad.unit_symbol
        )));
    }

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let mut created = Vec::with_capacity(requests.len());
    for req in requests {
        let obj = object::ActiveModel {
            name: Set(req.name),
            description: Set(req.description),
            unit_symbol: Set(req.unit_symbol),
            ugrp_id: Set(owner),
            disabled: Set(false),
            creationdate: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        if !req.tags.is_empty() {
            tag::Entity::insert_many(req.tags.iter().map(|name| tag::ActiveModel {
                object_id: Set(obj.id),
                name: Set(name.clone()),
            }))
            .exec(&txn)
            .await?;
        }
        let mut tags = req.tags;
        tags.sort();
        created.push(ObjectResponse::new(obj, tags));
    }
    txn.commit().await?;

    info!(count = created.len(), owner, "Created objects");
    Ok(created)
}

#[utoipa::path(
    get,
    path = "/objects",
    tag = "Objects",
    operation_id = "getObjects",
    summary = "List the objects you can access",
    description = "Use `writable=true` to list only the objects you may edit, `tags=a,b` to keep objects carrying any of the tags and `search` to match a substring of the name.",
    params(ListObjectsQuery),
    responses(
        (status = 200, description = "Objects", body = [ObjectResponse]),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, writable = query.writable))]
pub async fn list_objects(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListObjectsQuery>,
) -> Result<Json<Vec<ObjectResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let mut select = access.objects(query.writable);

    let tags = query.tags.as_deref().map(split_list).unwrap_or_default();
    if !tags.is_empty() {
        let tagged = SeaQuery::select()
            .column(tag::Column::ObjectId)
            .from(tag::Entity)
            .and_where(tag::Column::Name.is_in(tags))
            .to_owned();
        select = select.filter(object::Column::Id.in_subquery(tagged));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(object::Column::Name.contains(search));
    }

    let objects = select
        .order_by_asc(object::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(with_tags(&state.db, objects).await?))
}

#[utoipa::path(
    put,
    path = "/objects",
    tag = "Objects",
    operation_id = "createObject",
    summary = "Create an object",
    description = "`owner` is the ID of a user group you administer.",
    request_body = CreateObjectRequest,
    responses(
        (status = 200, description = "New object", body = ObjectResponse),
        (status = 400, description = "Invalid fields or unknown unit", body = ErrorBody),
        (status = 404, description = "Owner not administered by the caller", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, owner = payload.owner))]
pub async fn create_object(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateObjectRequest>,
) -> Result<Json<ObjectResponse>, AppError> {
    let mut created = insert_objects(&state, &principal, vec![payload]).await?;
    let obj = created
        .pop()
        .ok_or_else(|| AppError::Internal("object insert returned nothing".into()))?;
    Ok(Json(obj))
}

#[utoipa::path(
    put,
    path = "/objects/bulk",
    tag = "Objects",
    operation_id = "createObjectsBulk",
    summary = "Create several objects at once",
    description = "All objects must have the same owner. Nothing is created if any of them is invalid.",
    request_body = [CreateObjectRequest],
    responses(
        (status = 200, description = "New objects", body = [ObjectResponse]),
        (status = 400, description = "Empty list, mixed owners or invalid fields", body = ErrorBody),
        (status = 404, description = "Owner not administered by the caller", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, count = payload.len()))]
pub async fn create_objects_bulk(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(payload): AppJson<Vec<CreateObjectRequest>>,
) -> Result<Json<Vec<ObjectResponse>>, AppError> {
    Ok(Json(insert_objects(&state, &principal, payload).await?))
}

#[utoipa::path(
    get,
    path = "/objects/{id}",
    tag = "Objects",
    operation_id = "getObject",
    summary = "Get an object",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Object", body = ObjectResponse),
        (status = 404, description = "Not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn get_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ObjectResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let obj = access.object(&state.db, id, false).await?;
    let mut objects = with_tags(&state.db, vec![obj]).await?;
    objects
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("object (id={id})")))
}

#[utoipa::path(
    post,
    path = "/objects/{id}",
    tag = "Objects",
    operation_id = "editObject",
    summary = "Edit the name or description of an object",
    params(("id" = i64, Path, description = "Object ID")),
    request_body = EditObjectRequest,
    responses(
        (status = 200, description = "Updated object", body = ObjectResponse),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, object_id = id))]
pub async fn edit_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    OptionalJson(mut payload): OptionalJson<EditObjectRequest>,
) -> Result<Json<ObjectResponse>, AppError> {
    validate_edit_object(&mut payload)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    let obj = access.object(&state.db, id, true).await?;

    let obj = if payload.name.is_some() || payload.description.is_some() {
        let mut active: object::ActiveModel = obj.into();
        if let Some(name) = payload.name {
            active.name = Set(name);
        }
        if let Some(description) = payload.description {
            active.description = Set(Some(description));
        }
        active.update(&state.db).await?
    } else {
        obj
    };
    let mut objects = with_tags(&state.db, vec![obj]).await?;
    objects
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("object (id={id})")))
}

#[utoipa::path(
    delete,
    path = "/objects/{id}",
    tag = "Objects",
    operation_id = "deleteObject",
    summary = "Delete an object that never received values",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "The object has values", body = ErrorBody),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn delete_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;
    if timeseries::query::has_values(&state.db, id).await? {
        return Err(AppError::Forbidden(
            "This object has values associated to it. It cannot be deleted.".into(),
        ));
    }

    let txn = state.db.begin().await?;
    tag::Entity::delete_many()
        .filter(tag::Column::ObjectId.eq(id))
        .exec(&txn)
        .await?;
    token::Entity::delete_many()
        .filter(token::Column::ObjectId.eq(id))
        .exec(&txn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::ObjectId.eq(id))
        .exec(&txn)
        .await?;
    object_group_member::Entity::delete_many()
        .filter(object_group_member::Column::ObjectId.eq(id))
        .exec(&txn)
        .await?;
    aggregation::Entity::delete_many()
        .filter(aggregation::Column::ObjectId.eq(id))
        .exec(&txn)
        .await?;
    object_stats::Entity::delete_by_id(id).exec(&txn).await?;
    object::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    evict_metadata(&state);
    info!("Deleted object");
    Ok(StatusCode::OK)
}

async fn set_disabled(
    state: &AppState,
    principal: &Principal,
    id: i64,
    disabled: bool,
) -> Result<StatusCode, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    let obj = access.object(&state.db, id, true).await?;
    if obj.disabled == disabled {
        return Ok(StatusCode::NOT_MODIFIED);
    }

    let txn = state.db.begin().await?;
    let mut active: object::ActiveModel = obj.into();
    active.disabled = Set(disabled);
    active.update(&txn).await?;
    if disabled {
        // A disabled object must not accept values: revoke every token.
        token::Entity::delete_many()
            .filter(token::Column::ObjectId.eq(id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    evict_metadata(state);
    info!(object_id = id, disabled, "Changed object state");
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/objects/{id}/enable",
    tag = "Objects",
    operation_id = "enableObject",
    summary = "Enable an object",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Enabled"),
        (status = 304, description = "Already enabled"),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn enable_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    set_disabled(&state, &principal, id, false).await
}

#[utoipa::path(
    post,
    path = "/objects/{id}/disable",
    tag = "Objects",
    operation_id = "disableObject",
    summary = "Disable an object",
    description = "Every token of the object is deleted, so it stops accepting values.",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Disabled"),
        (status = 304, description = "Already disabled"),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn disable_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    set_disabled(&state, &principal, id, true).await
}

#[utoipa::path(
    put,
    path = "/objects/{id}/tags",
    tag = "Objects",
    operation_id = "addTags",
    summary = "Add tags to an object",
    params(("id" = i64, Path, description = "Object ID"), TagsQuery),
    responses(
        (status = 200, description = "At least one tag added"),
        (status = 304, description = "All tags already present"),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, object_id = id))]
pub async fn add_tags(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppQuery(query): AppQuery<TagsQuery>,
) -> Result<StatusCode, AppError> {
    let tags = validate_tags(&[query.tags])?;
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;

    let existing: HashSet<String> = load_tags(&state.db, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default()
        .into_iter()
        .collect();
    let missing: Vec<String> = tags.into_iter().filter(|t| !existing.contains(t)).collect();
    if missing.is_empty() {
        return Ok(StatusCode::NOT_MODIFIED);
    }
    tag::Entity::insert_many(missing.into_iter().map(|name| tag::ActiveModel {
        object_id: Set(id),
        name: Set(name),
    }))
    .exec(&state.db)
    .await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/objects/{id}/tags",
    tag = "Objects",
    operation_id = "removeTags",
    summary = "Remove tags from an object",
    params(("id" = i64, Path, description = "Object ID"), TagsQuery),
    responses(
        (status = 200, description = "At least one tag removed"),
        (status = 304, description = "None of the tags was present"),
        (status = 404, description = "Not found or not writable", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query), fields(user_id = principal.user_id, object_id = id))]
pub async fn remove_tags(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppQuery(query): AppQuery<TagsQuery>,
) -> Result<StatusCode, AppError> {
    let tags = split_list(&query.tags);
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, true).await?;
    if tags.is_empty() {
        return Ok(StatusCode::NOT_MODIFIED);
    }
    let result = tag::Entity::delete_many()
        .filter(tag::Column::ObjectId.eq(id))
        .filter(tag::Column::Name.is_in(tags))
        .exec(&state.db)
        .await?;
    Ok(modified(result.rows_affected > 0))
}

#[utoipa::path(
    get,
    path = "/objects/{id}/objectGroups",
    tag = "Objects",
    operation_id = "getObjectGroupsOfObject",
    summary = "List the object groups an object belongs to",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Object groups", body = [ObjectGroupResponse]),
        (status = 404, description = "Not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn object_groups_of_object(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ObjectGroupResponse>>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;

    let containing = SeaQuery::select()
        .column(object_group_member::Column::OgrpId)
        .from(object_group_member::Entity)
        .and_where(object_group_member::Column::ObjectId.eq(id))
        .to_owned();
    let groups = object_group::Entity::find()
        .filter(object_group::Column::Id.in_subquery(containing))
        .order_by_asc(object_group::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(groups.into_iter().map(ObjectGroupResponse::from).collect()))
}
