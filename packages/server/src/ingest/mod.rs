//! Support for value ingestion: metadata lookup by `(objectId, token)` and
//! the downstream sink accepted values are handed to.

mod cache;
mod sink;

use bbdata_common::ValueType;
use sea_orm::*;

pub use cache::MetadataCache;
pub use sink::{LogSink, ValueSink};

use crate::entity::{object, token, unit};

/// What ingestion needs to know about an object, resolved from its token.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureMeta {
    pub object_id: i64,
    pub owner: i32,
    pub disabled: bool,
    pub unit_symbol: String,
    pub unit_name: String,
    pub value_type: ValueType,
}

/// `None` when the token does not belong to the object.
pub async fn load_meta<C: ConnectionTrait>(
    db: &C,
    object_id: i64,
    secret: &str,
) -> Result<Option<MeasureMeta>, DbErr> {
    let found = token::Entity::find()
        .filter(token::Column::ObjectId.eq(object_id))
        .filter(token::Column::Token.eq(secret))
        .one(db)
        .await?;
    if found.is_none() {
        return Ok(None);
    }

    let Some(obj) = object::Entity::find_by_id(object_id).one(db).await? else {
        return Ok(None);
    };
    let unit = unit::Entity::find_by_id(obj.unit_symbol.clone())
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("unit {}", obj.unit_symbol)))?;
    let value_type = unit
        .value_type
        .parse::<ValueType>()
        .map_err(|e| DbErr::Custom(e.to_string()))?;

    Ok(Some(MeasureMeta {
        object_id,
        owner: obj.ugrp_id,
        disabled: obj.disabled,
        unit_symbol: unit.symbol,
        unit_name: unit.name,
        value_type,
    }))
}
