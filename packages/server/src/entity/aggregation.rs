use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Precomputed rollup over a `minutes`-wide bucket. Written by the external
/// aggregation job, only read here.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "aggregations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub minutes: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub object_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,

    pub last: Option<f64>,
    /// Epoch millis of the last raw value folded into the bucket.
    pub last_ts: Option<i64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub count: i32,
    pub comment: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
