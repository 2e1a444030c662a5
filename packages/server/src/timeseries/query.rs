use bbdata_common::months::{months_back, months_between};
use chrono::{DateTime, Utc};
use sea_orm::*;

use crate::entity::{aggregation, raw_value};

/// Partitions covering `[from, to]`, oldest first so that concatenating
/// per-partition scans yields ascending timestamps.
pub fn scan_order(from: &DateTime<Utc>, to: &DateTime<Utc>) -> Vec<String> {
    let mut months = months_between(from, to);
    months.reverse();
    months
}

pub async fn raw_partition<C: ConnectionTrait>(
    db: &C,
    object_id: i64,
    month: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<raw_value::Model>, DbErr> {
    raw_value::Entity::find()
        .filter(raw_value::Column::ObjectId.eq(object_id))
        .filter(raw_value::Column::Month.eq(month))
        .filter(raw_value::Column::Timestamp.between(from, to))
        .order_by_asc(raw_value::Column::Timestamp)
        .all(db)
        .await
}

pub async fn aggregation_partition<C: ConnectionTrait>(
    db: &C,
    minutes: i32,
    object_id: i64,
    month: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<aggregation::Model>, DbErr> {
    aggregation::Entity::find()
        .filter(aggregation::Column::Minutes.eq(minutes))
        .filter(aggregation::Column::ObjectId.eq(object_id))
        .filter(aggregation::Column::Month.eq(month))
        .filter(aggregation::Column::Timestamp.between(from, to))
        .order_by_asc(aggregation::Column::Timestamp)
        .all(db)
        .await
}

/// Most recent value at or before `before`, looking back at most `depth`
/// months and never before the month of `floor`.
///
/// Stops at the first partition holding a match.
pub async fn latest_value<C: ConnectionTrait>(
    db: &C,
    object_id: i64,
    before: DateTime<Utc>,
    depth: usize,
    floor: Option<&DateTime<Utc>>,
) -> Result<Option<raw_value::Model>, DbErr> {
    for month in months_back(&before, depth, floor) {
        let found = raw_value::Entity::find()
            .filter(raw_value::Column::ObjectId.eq(object_id))
            .filter(raw_value::Column::Month.eq(month.as_str()))
            .filter(raw_value::Column::Timestamp.lte(before))
            .order_by_desc(raw_value::Column::Timestamp)
            .one(db)
            .await?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Whether any raw value was ever stored for the object.
pub async fn has_values<C: ConnectionTrait>(db: &C, object_id: i64) -> Result<bool, DbErr> {
    let any = raw_value::Entity::find()
        .filter(raw_value::Column::ObjectId.eq(object_id))
        .one(db)
        .await?;
    Ok(any.is_some())
}
