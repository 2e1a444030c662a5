use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shared::{non_blank, validate_len};
use crate::entity::user;
use crate::error::AppError;

pub const NAME_MIN: usize = 1;
pub const NAME_MAX: usize = 45;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 45;
pub const EMAIL_MAX: usize = 45;

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 2)]
    pub id: i32,
    #[schema(example = "alice")]
    pub name: String,
    pub email: Option<String>,
    #[serde(with = "bbdata_common::dates::iso_millis")]
    #[schema(value_type = String, example = "2020-01-01T12:00:00.000Z")]
    pub creationdate: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            creationdate: m.creationdate,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "alice")]
    pub name: String,
    #[schema(example = "s3cret!")]
    pub password: String,
    pub email: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CreateUserQuery {
    /// Group the new user joins. The caller must administer it.
    pub user_group_id: i32,
    /// Whether the user becomes admin of that group.
    #[serde(default)]
    pub admin: bool,
}

pub fn validate_create_user(req: &mut CreateUserRequest) -> Result<(), AppError> {
    req.name = req.name.trim().to_string();
    validate_len("name", &req.name, NAME_MIN, NAME_MAX)?;
    validate_len("password", &req.password, PASSWORD_MIN, PASSWORD_MAX)?;
    req.email = non_blank(req.email.take());
    if let Some(email) = &req.email {
        validate_len("email", email, 1, EMAIL_MAX)?;
        if !email.contains('@') {
            return Err(AppError::field("email", "must be a well-formed email address"));
        }
    }
    Ok(())
}
