use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Usage counters and sample-period average of one object.
///
/// Rows are created lazily on the first read or write; an absent row means
/// all-zero stats.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "objects_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub object_id: i64,

    pub n_reads: i64,
    pub n_writes: i64,
    pub last_ts: Option<DateTimeUtc>,
    /// Milliseconds.
    pub avg_sample_period: f64,
}

impl ActiveModelBehavior for ActiveModel {}
