use std::collections::HashSet;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use bbdata_common::{dates, months::month_key};
use chrono::{DateTime, Duration, Utc};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::raw_value;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::ingest::{MeasureMeta, load_meta};
use crate::models::input::{
    AugmentedValue, CacheEvictQuery, MAX_FUTURE_MS, NewValues, SimulateQuery, validate_new_value,
    value_text,
};
use crate::state::AppState;
use crate::stats::StatsTask;

async fn lookup(state: &AppState, object_id: i64, token: &str) -> Result<Option<MeasureMeta>, DbErr> {
    match &state.meta_cache {
        Some(cache) => cache.get_or_load(&state.db, object_id, token).await,
        None => load_meta(&state.db, object_id, token).await,
    }
}

/// Validate every value of the request; nothing is stored unless all pass.
async fn augment(
    state: &AppState,
    values: NewValues,
    now: DateTime<Utc>,
) -> Result<Vec<AugmentedValue>, AppError> {
    let max_ts = now + Duration::milliseconds(MAX_FUTURE_MS);
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();

    for req in values.into_vec() {
        validate_new_value(&req)?;
        let id = req.object_id;
        let raw = value_text(id, &req.value)?;

        let timestamp = match req.timestamp.as_deref() {
            Some(ts) => {
                let ts = state.dates.parse(ts)?;
                if ts > max_ts {
                    return Err(AppError::WrongParams(format!(
                        "objectId {id}: date should be in the past. input='{}', now='{}'",
                        dates::format(&ts),
                        dates::format(&now)
                    )));
                }
                ts
            }
            None => now,
        };

        let meta = lookup(state, id, &req.token).await?.ok_or_else(|| {
            info!(object_id = id, "Rejected value: unknown token");
            AppError::ItemNotFound(format!(
                "objectId {id}: the pair <objectId, token> does not exist"
            ))
        })?;
        if meta.disabled {
            info!(object_id = id, "Rejected value: object disabled");
            return Err(AppError::Forbidden(format!("objectId {id} is disabled.")));
        }
        let value = meta.value_type.normalize(&raw).map_err(|_| {
            AppError::WrongParams(format!(
                "objectId {id}: the value '{raw}' does not match the unit {} ({}) declared in the object definition.",
                meta.unit_symbol, meta.value_type
            ))
        })?;

        if !seen.insert((id, timestamp)) {
            return Err(AppError::WrongParams(format!(
                "objectId {id}: two or more values with the same timestamp"
            )));
        }
        let stored = raw_value::Entity::find_by_id((id, month_key(&timestamp), timestamp))
            .one(&state.db)
            .await?;
        if stored.is_some() {
            return Err(AppError::WrongParams(format!(
                "objectId {id}: a value with the same timestamp ({}) already exists for this object.",
                dates::format(&timestamp)
            )));
        }

        let comment = req.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        accepted.push(AugmentedValue::new(&meta, timestamp, value, comment));
    }
    Ok(accepted)
}

#[utoipa::path(
    post,
    path = "/objects/values",
    tag = "Input",
    operation_id = "submitValues",
    summary = "Submit new values",
    description = "Each value is authenticated by its object's token. A missing timestamp means now. \
        Every `(objectId, timestamp)` pair must be new, in the body and in storage. \
        The request is atomic: either all values are saved or none. With `simulate=true`, nothing is saved.",
    params(SimulateQuery),
    request_body = NewValues,
    responses(
        (status = 200, description = "Accepted values", body = [AugmentedValue]),
        (status = 400, description = "Invalid value, timestamp or duplicate", body = ErrorBody),
        (status = 403, description = "Object disabled", body = ErrorBody),
        (status = 404, description = "Unknown objectId/token pair", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query, payload), fields(simulate = query.simulate))]
pub async fn submit_values(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SimulateQuery>,
    AppJson(payload): AppJson<NewValues>,
) -> Result<Json<Vec<AugmentedValue>>, AppError> {
    let accepted = augment(&state, payload, dates::now()).await?;
    if query.simulate || accepted.is_empty() {
        return Ok(Json(accepted));
    }

    let rows = accepted.iter().map(|v| raw_value::ActiveModel {
        object_id: Set(v.object_id),
        month: Set(month_key(&v.timestamp)),
        timestamp: Set(v.timestamp),
        value: Set(v.value.clone()),
        comment: Set(v.comment.clone()),
    });
    let txn = state.db.begin().await?;
    raw_value::Entity::insert_many(rows).exec(&txn).await?;
    txn.commit().await?;

    let writes = accepted.iter().map(|v| (v.object_id, v.timestamp)).collect();
    state.stats.submit(StatsTask::Writes(writes)).await?;
    state.sink.publish(&accepted).await;

    info!(count = accepted.len(), "Stored values");
    Ok(Json(accepted))
}

#[utoipa::path(
    get,
    path = "/cache-evict",
    tag = "Input",
    operation_id = "evictMetadataCache",
    summary = "Clear the ingestion metadata cache",
    params(CacheEvictQuery),
    responses(
        (status = 200, description = "Cache cleared"),
        (status = 403, description = "Wrong key, or the endpoint is disabled", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn cache_evict(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CacheEvictQuery>,
) -> Result<StatusCode, AppError> {
    let expected = state.config.input.admin_secret.as_deref();
    match (expected, query.key.as_deref()) {
        (Some(expected), Some(key)) if expected == key => {}
        _ => {
            return Err(AppError::Forbidden("This endpoint is not available.".into()));
        }
    }
    if let Some(cache) = &state.meta_cache {
        cache.clear();
    }
    Ok(StatusCode::OK)
}
