use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::*;

use super::{ObjectStats, RunningAverage, StatsEngine, group_by_object, increment_reads, load};
use crate::entity::object_stats;

/// Read-modify-write under `SELECT ... FOR UPDATE`.
///
/// A batch locks each touched row once, folds all of its values in memory and
/// writes the result back in the same transaction. Rows are locked in object
/// id order so concurrent batches cannot deadlock.
pub struct LockingStats {
    db: DatabaseConnection,
}

impl LockingStats {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn ensure_row<C: ConnectionTrait>(db: &C, object_id: i64) -> Result<(), DbErr> {
    let row = object_stats::ActiveModel {
        object_id: Set(object_id),
        n_reads: Set(0),
        n_writes: Set(0),
        last_ts: Set(None),
        avg_sample_period: Set(0.0),
    };
    let result = object_stats::Entity::insert(row)
        .on_conflict(
            OnConflict::column(object_stats::Column::ObjectId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;
    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl StatsEngine for LockingStats {
    async fn record_write_batch(&self, values: &[(i64, DateTime<Utc>)]) -> Result<(), DbErr> {
        let groups = group_by_object(values);
        if groups.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        for (object_id, timestamps) in groups {
            ensure_row(&txn, object_id).await?;
            let current = object_stats::Entity::find_by_id(object_id)
                .lock(LockType::Update)
                .one(&txn)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("objects_stats({object_id})")))?;

            let mut running =
                RunningAverage::new(current.n_writes, current.last_ts, current.avg_sample_period);
            for ts in &timestamps {
                running.push(*ts);
            }

            let mut active: object_stats::ActiveModel = current.into();
            active.n_writes = Set(running.n_writes);
            active.last_ts = Set(running.last_ts);
            active.avg_sample_period = Set(running.avg);
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn record_read(&self, object_id: i64) -> Result<(), DbErr> {
        increment_reads(&self.db, object_id).await
    }

    async fn get_stats(&self, object_id: i64) -> Result<ObjectStats, DbErr> {
        load(&self.db, object_id).await
    }
}
