use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::object::ObjectResponse;
use super::shared::{non_blank, validate_len, validate_max_len};
use crate::entity::object_group;
use crate::error::AppError;

pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 45;
pub const DESCRIPTION_MAX: usize = 255;

#[derive(Serialize, ToSchema)]
pub struct ObjectGroupResponse {
    #[schema(example = 5)]
    pub id: i32,
    #[schema(example = "building A")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 2)]
    pub owner: i32,
    /// Present only when requested with `withObjects=true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ObjectResponse>>,
}

impl From<object_group::Model> for ObjectGroupResponse {
    fn from(m: object_group::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            owner: m.ugrp_id,
            objects: None,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateObjectGroupRequest {
    #[schema(example = "building A")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 2)]
    pub owner: i32,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct EditObjectGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListObjectGroupsQuery {
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub with_objects: bool,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WithObjectsQuery {
    #[serde(default)]
    pub with_objects: bool,
}

pub fn validate_create_object_group(req: &mut CreateObjectGroupRequest) -> Result<(), AppError> {
    req.name = req.name.trim().to_string();
    validate_len("name", &req.name, NAME_MIN, NAME_MAX)?;
    req.description = non_blank(req.description.take());
    validate_max_len("description", req.description.as_deref(), DESCRIPTION_MAX)
}

pub fn validate_edit_object_group(req: &mut EditObjectGroupRequest) -> Result<(), AppError> {
    if let Some(name) = &mut req.name {
        *name = name.trim().to_string();
        validate_len("name", name, NAME_MIN, NAME_MAX)?;
    }
    validate_max_len("description", req.description.as_deref(), DESCRIPTION_MAX)
}
