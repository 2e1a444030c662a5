use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict};
use sea_orm::*;

use super::{ObjectStats, RunningAverage, StatsEngine, group_by_object, increment_reads, load};
use crate::entity::object_stats;

/// Counters are bumped server-side with `n = n + k`; no row is ever locked.
///
/// The average is computed from an unlocked snapshot, so two writers racing on
/// the same object may both fold their delta into the same old value. Counts
/// stay exact.
pub struct CounterStats {
    db: DatabaseConnection,
}

impl CounterStats {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn apply(&self, object_id: i64, timestamps: &[DateTime<Utc>]) -> Result<(), DbErr> {
        let current = load(&self.db, object_id).await?;
        let mut running =
            RunningAverage::new(current.n_writes, current.last_ts, current.avg_sample_period);
        for ts in timestamps {
            running.push(*ts);
        }
        let added = timestamps.len() as i64;

        let row = object_stats::ActiveModel {
            object_id: Set(object_id),
            n_reads: Set(0),
            n_writes: Set(added),
            last_ts: Set(running.last_ts),
            avg_sample_period: Set(running.avg),
        };
        object_stats::Entity::insert(row)
            .on_conflict(
                OnConflict::column(object_stats::Column::ObjectId)
                    .value(
                        object_stats::Column::NWrites,
                        Expr::col((object_stats::Entity, object_stats::Column::NWrites)).add(added),
                    )
                    .update_columns([
                        object_stats::Column::LastTs,
                        object_stats::Column::AvgSamplePeriod,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StatsEngine for CounterStats {
    async fn record_write_batch(&self, values: &[(i64, DateTime<Utc>)]) -> Result<(), DbErr> {
        for (object_id, timestamps) in group_by_object(values) {
            self.apply(object_id, &timestamps).await?;
        }
        Ok(())
    }

    async fn record_read(&self, object_id: i64) -> Result<(), DbErr> {
        increment_reads(&self.db, object_id).await
    }

    async fn get_stats(&self, object_id: i64) -> Result<ObjectStats, DbErr> {
        load(&self.db, object_id).await
    }
}
