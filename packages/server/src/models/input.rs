use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::ingest::MeasureMeta;
use crate::utils::secret::SECRET_LEN;

pub const COMMENT_MAX: usize = 1024;
/// Clock skew tolerated on submitted timestamps.
pub const MAX_FUTURE_MS: i64 = 2000;

#[derive(Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewValueRequest {
    #[schema(example = 42)]
    pub object_id: i64,
    #[schema(example = "0d9e4f52c3b1a7e68f2d0c5b9a4e1f37")]
    pub token: String,
    /// Defaults to the reception time.
    #[schema(example = "2020-01-01T12:00:00.000Z")]
    pub timestamp: Option<String>,
    /// String, number or boolean; checked against the unit's type.
    #[schema(value_type = String, example = "3.14")]
    pub value: serde_json::Value,
    pub comment: Option<String>,
}

/// Ingestion body: a single value or an array of values.
#[derive(Deserialize, ToSchema, Debug)]
#[serde(untagged)]
pub enum NewValues {
    Many(Vec<NewValueRequest>),
    One(NewValueRequest),
}

impl NewValues {
    pub fn into_vec(self) -> Vec<NewValueRequest> {
        match self {
            NewValues::Many(values) => values,
            NewValues::One(value) => vec![value],
        }
    }
}

/// An accepted value with the metadata of its object.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AugmentedValue {
    #[schema(example = 42)]
    pub object_id: i64,
    #[serde(with = "bbdata_common::dates::iso_millis")]
    #[schema(value_type = String, example = "2020-01-01T12:00:00.000Z")]
    pub timestamp: DateTime<Utc>,
    #[schema(example = "3.14")]
    pub value: String,
    pub comment: Option<String>,
    #[schema(example = "volt")]
    pub unit_name: String,
    #[schema(example = "V")]
    pub unit_symbol: String,
    #[serde(rename = "type")]
    #[schema(example = "float")]
    pub value_type: String,
    #[schema(example = 2)]
    pub owner: i32,
}

impl AugmentedValue {
    pub fn new(
        meta: &MeasureMeta,
        timestamp: DateTime<Utc>,
        value: String,
        comment: Option<String>,
    ) -> Self {
        Self {
            object_id: meta.object_id,
            timestamp,
            value,
            comment,
            unit_name: meta.unit_name.clone(),
            unit_symbol: meta.unit_symbol.clone(),
            value_type: meta.value_type.as_str().to_string(),
            owner: meta.owner,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct SimulateQuery {
    /// Validate and echo the values without storing them.
    #[serde(default)]
    pub simulate: bool,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct CacheEvictQuery {
    pub key: Option<String>,
}

/// Raw textual form of a submitted value. Numbers and booleans are accepted
/// as-is; objects and arrays are not values.
pub fn value_text(object_id: i64, value: &serde_json::Value) -> Result<String, AppError> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(AppError::WrongParams(format!(
            "objectId {object_id}: value must be a non-empty string, number or boolean"
        )));
    }
    Ok(text)
}

/// Field checks that need no database access.
pub fn validate_new_value(req: &NewValueRequest) -> Result<(), AppError> {
    let id = req.object_id;
    if id < 0 {
        return Err(AppError::field("objectId", "must be greater than or equal to 0"));
    }
    if req.token.chars().count() != SECRET_LEN {
        return Err(AppError::WrongParams(format!(
            "objectId {id}: token size must be {SECRET_LEN}"
        )));
    }
    if let Some(comment) = &req.comment
        && comment.chars().count() > COMMENT_MAX
    {
        return Err(AppError::WrongParams(format!(
            "objectId {id}: comment size must be at most {COMMENT_MAX}"
        )));
    }
    Ok(())
}
