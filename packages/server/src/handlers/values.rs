use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use bbdata_common::{
    Granularity,
    dates::{self, check_order},
};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::query::AppQuery;
use crate::models::shared::parse_ids;
use crate::models::values::{
    AggregatedQuery, AggregationRow, LatestQuery, MultiLatestQuery, MultiRangeQuery, RangeQuery,
    RawValueRow,
};
use crate::state::AppState;
use crate::stats::StatsTask;
use crate::timeseries::{Format, Series, stream_values};
use crate::utils::access::Access;

/// `from` is mandatory, `to` defaults to now.
fn range(
    state: &AppState,
    from: &str,
    to: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let from = state.dates.parse(from)?;
    let to = state.dates.parse_opt(to)?.unwrap_or_else(dates::now);
    check_order(from, to)?;
    Ok((from, to))
}

fn latest(state: &AppState, before: Option<&str>) -> Result<Series, AppError> {
    let before = state.dates.parse_opt(before)?.unwrap_or_else(dates::now);
    Ok(Series::Latest {
        before,
        depth: state.config.query.max_latest_months,
    })
}

/// Stream one object's series after checking it is readable and counting the read.
async fn single(
    state: &AppState,
    principal: &Principal,
    id: i64,
    series: Series,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let access = Access::load(&state.db, principal.user_id).await?;
    access.object(&state.db, id, false).await?;
    state.stats.submit(StatsTask::Read(id)).await?;
    stream_values(
        state.db.clone(),
        access,
        vec![id],
        series,
        Format::negotiate(headers),
    )
}

async fn multi(
    state: &AppState,
    principal: &Principal,
    ids: &str,
    series: Series,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let ids = parse_ids(ids)?;
    let access = Access::load(&state.db, principal.user_id).await?;
    stream_values(
        state.db.clone(),
        access,
        ids,
        series,
        Format::negotiate(headers),
    )
}

#[utoipa::path(
    get,
    path = "/objects/{id}/values",
    tag = "Values",
    operation_id = "getObjectValues",
    summary = "Raw values of an object in a time range",
    description = "Answers CSV when `Accept` (or `Content-Type`) contains `text`, JSON otherwise. `to` defaults to now.",
    params(("id" = i64, Path, description = "Object ID"), RangeQuery),
    responses(
        (status = 200, description = "Values, grouped per object", body = [RawValueRow]),
        (status = 400, description = "Invalid dates", body = ErrorBody),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, object_id = id))]
pub async fn object_values(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<RangeQuery>,
) -> Result<Response, AppError> {
    let (from, to) = range(&state, &query.from, query.to.as_deref())?;
    single(&state, &principal, id, Series::Raw { from, to }, &headers).await
}

#[utoipa::path(
    get,
    path = "/objects/{id}/values/latest",
    tag = "Values",
    operation_id = "getObjectLatestValue",
    summary = "Most recent value of an object",
    description = "The latest value at or before `before` (default now), searched within a bounded number of months.",
    params(("id" = i64, Path, description = "Object ID"), LatestQuery),
    responses(
        (status = 200, description = "At most one value", body = [RawValueRow]),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, object_id = id))]
pub async fn object_latest(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<LatestQuery>,
) -> Result<Response, AppError> {
    let series = latest(&state, query.before.as_deref())?;
    single(&state, &principal, id, series, &headers).await
}

#[utoipa::path(
    get,
    path = "/objects/{id}/values/aggregated",
    tag = "Values",
    operation_id = "getObjectAggregations",
    summary = "Aggregated values of an object",
    description = "`granularity` is `quarters` (15 min) or `hours` (60 min, default).",
    params(("id" = i64, Path, description = "Object ID"), AggregatedQuery),
    responses(
        (status = 200, description = "Aggregations, grouped per object", body = [AggregationRow]),
        (status = 400, description = "Invalid dates or granularity", body = ErrorBody),
        (status = 404, description = "Object not found or not accessible", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, object_id = id))]
pub async fn object_aggregated(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<AggregatedQuery>,
) -> Result<Response, AppError> {
    let granularity = match query.granularity.as_deref() {
        Some(raw) => raw.parse::<Granularity>()?,
        None => Granularity::default(),
    };
    let (from, to) = range(&state, &query.from, query.to.as_deref())?;
    let series = Series::Aggregated {
        minutes: granularity.minutes(),
        from,
        to,
    };
    single(&state, &principal, id, series, &headers).await
}

#[utoipa::path(
    get,
    path = "/values",
    tag = "Values",
    operation_id = "getValues",
    summary = "Raw values of several objects",
    description = "Objects that cannot be read are reported inline in JSON and skipped in CSV.",
    params(MultiRangeQuery),
    responses(
        (status = 200, description = "Values, grouped per object", body = [RawValueRow]),
        (status = 400, description = "Invalid ids or dates", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, ids = %query.ids))]
pub async fn values(
    principal: Principal,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<MultiRangeQuery>,
) -> Result<Response, AppError> {
    let (from, to) = range(&state, &query.from, query.to.as_deref())?;
    multi(&state, &principal, &query.ids, Series::Raw { from, to }, &headers).await
}

#[utoipa::path(
    get,
    path = "/values/latest",
    tag = "Values",
    operation_id = "getLatestValues",
    summary = "Most recent value of several objects",
    params(MultiLatestQuery),
    responses(
        (status = 200, description = "At most one value per object", body = [RawValueRow]),
        (status = 400, description = "Invalid ids or date", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, ids = %query.ids))]
pub async fn latest_values(
    principal: Principal,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<MultiLatestQuery>,
) -> Result<Response, AppError> {
    let series = latest(&state, query.before.as_deref())?;
    multi(&state, &principal, &query.ids, series, &headers).await
}

async fn aggregated(
    state: &AppState,
    principal: &Principal,
    query: &MultiRangeQuery,
    granularity: Granularity,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let (from, to) = range(state, &query.from, query.to.as_deref())?;
    let series = Series::Aggregated {
        minutes: granularity.minutes(),
        from,
        to,
    };
    multi(state, principal, &query.ids, series, headers).await
}

#[utoipa::path(
    get,
    path = "/values/hours",
    tag = "Values",
    operation_id = "getHourlyValues",
    summary = "Hourly aggregations of several objects",
    params(MultiRangeQuery),
    responses(
        (status = 200, description = "Aggregations, grouped per object", body = [AggregationRow]),
        (status = 400, description = "Invalid ids or dates", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, ids = %query.ids))]
pub async fn hours(
    principal: Principal,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<MultiRangeQuery>,
) -> Result<Response, AppError> {
    aggregated(&state, &principal, &query, Granularity::Hours, &headers).await
}

#[utoipa::path(
    get,
    path = "/values/quarters",
    tag = "Values",
    operation_id = "getQuarterValues",
    summary = "Quarter-hour aggregations of several objects",
    params(MultiRangeQuery),
    responses(
        (status = 200, description = "Aggregations, grouped per object", body = [AggregationRow]),
        (status = 400, description = "Invalid ids or dates", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, query, headers), fields(user_id = principal.user_id, ids = %query.ids))]
pub async fn quarters(
    principal: Principal,
    State(state): State<AppState>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<MultiRangeQuery>,
) -> Result<Response, AppError> {
    aggregated(&state, &principal, &query, Granularity::Quarters, &headers).await
}
