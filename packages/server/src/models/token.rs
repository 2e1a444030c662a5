use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shared::validate_max_len;
use crate::entity::token;
use crate::error::AppError;

pub const DESCRIPTION_MAX: usize = 65535;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = 42)]
    pub object_id: i64,
    #[schema(example = "0d9e4f52c3b1a7e68f2d0c5b9a4e1f37")]
    pub token: String,
    pub description: Option<String>,
}

impl From<token::Model> for TokenResponse {
    fn from(m: token::Model) -> Self {
        Self {
            id: m.id,
            object_id: m.object_id,
            token: m.token,
            description: m.description,
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
pub struct TokenDescription {
    pub description: Option<String>,
}

pub fn validate_description(req: &TokenDescription) -> Result<(), AppError> {
    validate_max_len("description", req.description.as_deref(), DESCRIPTION_MAX)
}
