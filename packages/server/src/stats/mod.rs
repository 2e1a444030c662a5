//! Per-object usage statistics.
//!
//! Two interchangeable backends implement [`StatsEngine`]; [`build`] picks one
//! from configuration. Ingestion reaches them through the [`StatsDispatcher`].

mod counters;
mod dispatch;
mod locking;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict};
use sea_orm::*;

use crate::config::StatsBackend;
use crate::entity::object_stats;

pub use counters::CounterStats;
pub use dispatch::{StatsDispatcher, StatsTask};
pub use locking::LockingStats;

/// Snapshot of an object's statistics. Zeroed when nothing was recorded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStats {
    pub object_id: i64,
    pub n_reads: i64,
    pub n_writes: i64,
    pub last_ts: Option<DateTime<Utc>>,
    pub avg_sample_period: f64,
}

impl ObjectStats {
    pub fn empty(object_id: i64) -> Self {
        Self {
            object_id,
            n_reads: 0,
            n_writes: 0,
            last_ts: None,
            avg_sample_period: 0.0,
        }
    }
}

impl From<object_stats::Model> for ObjectStats {
    fn from(m: object_stats::Model) -> Self {
        Self {
            object_id: m.object_id,
            n_reads: m.n_reads,
            n_writes: m.n_writes,
            last_ts: m.last_ts,
            avg_sample_period: m.avg_sample_period,
        }
    }
}

#[async_trait]
pub trait StatsEngine: Send + Sync {
    /// Account for one accepted value.
    async fn record_write(&self, object_id: i64, timestamp: DateTime<Utc>) -> Result<(), DbErr> {
        self.record_write_batch(&[(object_id, timestamp)]).await
    }

    /// Account for every value of an ingestion request at once.
    async fn record_write_batch(&self, values: &[(i64, DateTime<Utc>)]) -> Result<(), DbErr>;

    async fn record_read(&self, object_id: i64) -> Result<(), DbErr>;

    async fn get_stats(&self, object_id: i64) -> Result<ObjectStats, DbErr>;
}

pub fn build(backend: StatsBackend, db: DatabaseConnection) -> Arc<dyn StatsEngine> {
    match backend {
        StatsBackend::Counters => Arc::new(CounterStats::new(db)),
        StatsBackend::Locking => Arc::new(LockingStats::new(db)),
    }
}

/// Write count, last timestamp and mean inter-arrival time of one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningAverage {
    pub n_writes: i64,
    pub last_ts: Option<DateTime<Utc>>,
    pub avg: f64,
}

impl RunningAverage {
    pub fn new(n_writes: i64, last_ts: Option<DateTime<Utc>>, avg: f64) -> Self {
        Self { n_writes, last_ts, avg }
    }

    /// Fold one write into the state.
    ///
    /// The first write contributes no delta. Afterwards the average is the
    /// mean of the deltas seen so far, so it equals `t2 - t1` after two writes.
    /// Values older than `last_ts` are counted but leave the average alone.
    pub fn push(&mut self, timestamp: DateTime<Utc>) {
        let prior = self.n_writes;
        self.n_writes += 1;
        match self.last_ts {
            Some(last) if timestamp <= last => {}
            Some(last) => {
                let delta = (timestamp - last).num_milliseconds() as f64;
                self.avg = if prior <= 1 {
                    delta
                } else {
                    (self.avg * (prior - 1) as f64 + delta) / prior as f64
                };
                self.last_ts = Some(timestamp);
            }
            None => {
                self.avg = 0.0;
                self.last_ts = Some(timestamp);
            }
        }
    }
}

/// Group `(object, timestamp)` pairs per object, timestamps ascending.
pub(crate) fn group_by_object(values: &[(i64, DateTime<Utc>)]) -> Vec<(i64, Vec<DateTime<Utc>>)> {
    let mut sorted = values.to_vec();
    sorted.sort();
    let mut groups: Vec<(i64, Vec<DateTime<Utc>>)> = Vec::new();
    for (object_id, ts) in sorted {
        match groups.last_mut() {
            Some((id, list)) if *id == object_id => list.push(ts),
            _ => groups.push((object_id, vec![ts])),
        }
    }
    groups
}

/// Atomic `n_reads + 1`, creating the row on first use.
pub(crate) async fn increment_reads<C: ConnectionTrait>(db: &C, object_id: i64) -> Result<(), DbErr> {
    let row = object_stats::ActiveModel {
        object_id: Set(object_id),
        n_reads: Set(1),
        n_writes: Set(0),
        last_ts: Set(None),
        avg_sample_period: Set(0.0),
    };
    object_stats::Entity::insert(row)
        .on_conflict(
            OnConflict::column(object_stats::Column::ObjectId)
                .value(
                    object_stats::Column::NReads,
                    Expr::col((object_stats::Entity, object_stats::Column::NReads)).add(1),
                )
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub(crate) async fn load<C: ConnectionTrait>(db: &C, object_id: i64) -> Result<ObjectStats, DbErr> {
    Ok(object_stats::Entity::find_by_id(object_id)
        .one(db)
        .await?
        .map(ObjectStats::from)
        .unwrap_or_else(|| ObjectStats::empty(object_id)))
}
