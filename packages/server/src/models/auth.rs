use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::apikey;
use crate::error::AppError;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// User name, or numeric user id.
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "testtest")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApikeyResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = 1)]
    pub user_id: i32,
    #[schema(example = "5b2c6f1e9a0d4e8bb1f2a3c4d5e6f708")]
    pub secret: String,
    pub read_only: bool,
    #[serde(with = "bbdata_common::dates::iso_millis::option")]
    #[schema(value_type = Option<String>, example = "2020-01-01T12:00:00.000Z")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl From<apikey::Model> for ApikeyResponse {
    fn from(m: apikey::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            secret: m.secret,
            read_only: m.readonly,
            expiration_date: m.expirationdate,
            description: m.description,
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
pub struct CreateApikeyRequest {
    pub description: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CreateApikeyQuery {
    /// Read-write key when true.
    #[serde(default)]
    pub writable: bool,
    /// ISO date or duration such as `1d-3h`. Absent or `null`: never expires.
    pub expiration_date: Option<String>,
}

/// Every field is optional: absent fields are left untouched.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct EditApikeyRequest {
    pub read_only: Option<bool>,
    /// ISO date or duration; `"null"` removes the expiration.
    pub expiration_date: Option<String>,
    pub description: Option<String>,
}

pub const DESCRIPTION_MAX: usize = 65535;

pub fn validate_login_request(req: &LoginRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::field("username", "must not be empty"));
    }
    if req.password.is_empty() {
        return Err(AppError::field("password", "must not be empty"));
    }
    Ok(())
}
