use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shared::validate_len;
use crate::entity::user_group;
use crate::error::AppError;

pub const NAME_MIN: usize = 1;
pub const NAME_MAX: usize = 45;

#[derive(Serialize, ToSchema)]
pub struct UserGroupResponse {
    #[schema(example = 2)]
    pub id: i32,
    #[schema(example = "smartbuilding")]
    pub name: String,
}

impl From<user_group::Model> for UserGroupResponse {
    fn from(m: user_group::Model) -> Self {
        Self { id: m.id, name: m.name }
    }
}

/// A group seen from one of its members.
#[derive(Serialize, ToSchema)]
pub struct MembershipResponse {
    pub id: i32,
    pub name: String,
    pub admin: bool,
}

/// A member seen from the group.
#[derive(Serialize, ToSchema)]
pub struct MemberResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "alice")]
    pub name: String,
    pub admin: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserGroupRequest {
    #[schema(example = "smartbuilding")]
    pub name: String,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct AdminQuery {
    /// Only groups the caller administers, or grant admin rights.
    #[serde(default)]
    pub admin: bool,
}

pub fn validate_create_user_group(req: &mut CreateUserGroupRequest) -> Result<(), AppError> {
    req.name = req.name.trim().to_string();
    validate_len("name", &req.name, NAME_MIN, NAME_MAX)
}
