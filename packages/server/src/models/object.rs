use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shared::{non_blank, split_list, validate_len, validate_max_len};
use crate::entity::object;
use crate::error::AppError;

pub const NAME_MIN: usize = 1;
pub const NAME_MAX: usize = 60;
pub const DESCRIPTION_MAX: usize = 255;
pub const TAG_MAX: usize = 25;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResponse {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "living-room temperature")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "°C")]
    pub unit_symbol: String,
    /// Owning user group id.
    #[schema(example = 2)]
    pub owner: i32,
    pub disabled: bool,
    #[serde(with = "bbdata_common::dates::iso_millis")]
    #[schema(value_type = String, example = "2020-01-01T12:00:00.000Z")]
    pub creationdate: DateTime<Utc>,
    #[schema(example = json!(["home", "sensor"]))]
    pub tags: Vec<String>,
}

impl ObjectResponse {
    pub fn new(m: object::Model, tags: Vec<String>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            unit_symbol: m.unit_symbol,
            owner: m.ugrp_id,
            disabled: m.disabled,
            creationdate: m.creationdate,
            tags,
        }
    }
}

#[derive(Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateObjectRequest {
    #[schema(example = "living-room temperature")]
    pub name: String,
    pub description: Option<String>,
    /// User group that will own the object. The caller must administer it.
    #[schema(example = 2)]
    pub owner: i32,
    #[schema(example = "°C")]
    pub unit_symbol: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct EditObjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListObjectsQuery {
    /// Only objects the caller may modify.
    #[serde(default)]
    pub writable: bool,
    /// Comma-separated; objects must carry at least one of them.
    pub tags: Option<String>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagsQuery {
    /// Comma-separated tags.
    pub tags: String,
}

pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().flat_map(|t| split_list(t)) {
        validate_len("tags", &tag, 1, TAG_MAX)?;
        if !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    Ok(cleaned)
}

pub fn validate_create_object(req: &mut CreateObjectRequest) -> Result<(), AppError> {
    req.name = req.name.trim().to_string();
    validate_len("name", &req.name, NAME_MIN, NAME_MAX)?;
    req.description = non_blank(req.description.take());
    validate_max_len("description", req.description.as_deref(), DESCRIPTION_MAX)?;
    req.unit_symbol = req.unit_symbol.trim().to_string();
    if req.unit_symbol.is_empty() {
        return Err(AppError::field("unitSymbol", "must not be empty"));
    }
    req.tags = validate_tags(&req.tags)?;
    Ok(())
}

pub fn validate_edit_object(req: &mut EditObjectRequest) -> Result<(), AppError> {
    if let Some(name) = &mut req.name {
        *name = name.trim().to_string();
        validate_len("name", name, NAME_MIN, NAME_MAX)?;
    }
    validate_max_len("description", req.description.as_deref(), DESCRIPTION_MAX)
}
