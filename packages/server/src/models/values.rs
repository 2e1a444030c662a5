use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    #[param(example = "2020-01-01T00:00:00.000Z")]
    pub from: String,
    /// Defaults to now.
    pub to: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AggregatedQuery {
    pub from: String,
    pub to: Option<String>,
    /// `quarters` or `hours` (default), case-insensitive.
    pub granularity: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct LatestQuery {
    /// Defaults to now.
    pub before: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MultiRangeQuery {
    /// Comma-separated object ids.
    #[param(example = "1,2")]
    pub ids: String,
    pub from: String,
    pub to: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MultiLatestQuery {
    pub ids: String,
    pub before: Option<String>,
}

/// One raw value as streamed in JSON.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct RawValueRow {
    #[schema(example = "2020-01-01T12:00:00.000Z")]
    pub timestamp: String,
    #[schema(example = "3.14")]
    pub value: String,
    pub comment: Option<String>,
}

/// One aggregation bucket as streamed in JSON.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRow {
    #[schema(example = "2020-01-01T12:00:00.000Z")]
    pub timestamp: String,
    pub last: Option<f64>,
    pub last_timestamp: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
    /// Rounded to 5 decimals.
    pub mean: Option<f64>,
    /// `null` when undefined.
    pub std: Option<f64>,
    pub count: i32,
    pub comment: Option<String>,
}
