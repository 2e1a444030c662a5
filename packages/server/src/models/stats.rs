use serde::Serialize;
use utoipa::ToSchema;

use crate::stats::ObjectStats;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[schema(example = 42)]
    pub object_id: i64,
    pub n_reads: i64,
    pub n_writes: i64,
    #[schema(example = "2020-01-01T12:00:00.000Z")]
    pub last_ts: Option<String>,
    /// Mean time between two values, in milliseconds.
    #[schema(example = 60000.0)]
    pub avg_sample_period: f64,
}

impl From<ObjectStats> for StatsResponse {
    fn from(s: ObjectStats) -> Self {
        Self {
            object_id: s.object_id,
            n_reads: s.n_reads,
            n_writes: s.n_writes,
            last_ts: s.last_ts.as_ref().map(bbdata_common::dates::format),
            avg_sample_period: s.avg_sample_period,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountersResponse {
    pub object_id: i64,
    pub n_reads: i64,
    pub n_values: i64,
}

impl From<ObjectStats> for CountersResponse {
    fn from(s: ObjectStats) -> Self {
        Self {
            object_id: s.object_id,
            n_reads: s.n_reads,
            n_values: s.n_writes,
        }
    }
}
