use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::models::stats::{CountersResponse, StatsResponse};
use crate::state::AppState;
use crate::utils::access::Access;

#[utoipa::path(
    get,
    path = "/objects/{id}/stats",
    tag = "Stats",
    operation_id = "getObjectStats",
    summary = "Usage statistics of an object",
    description = "`avgSamplePeriod` is the mean time between two values, in milliseconds.",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn get_stats(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StatsResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;
    let stats = state.stats.engine().get_stats(id).await?;
    Ok(Json(StatsResponse::from(stats)))
}

#[utoipa::path(
    get,
    path = "/objects/{id}/stats/counters",
    tag = "Stats",
    operation_id = "getObjectCounters",
    summary = "Read and write counters of an object",
    params(("id" = i64, Path, description = "Object ID")),
    responses(
        (status = 200, description = "Counters", body = CountersResponse),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id, object_id = id))]
pub async fn get_counters(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CountersResponse>, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;
    let stats = state.stats.engine().get_stats(id).await?;
    Ok(Json(CountersResponse::from(stats)))
}
