use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shared::validate_len;
use crate::entity::unit;
use crate::error::AppError;

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
pub struct UnitResponse {
    #[schema(example = "V")]
    pub symbol: String,
    #[schema(example = "volt")]
    pub name: String,
    #[serde(rename = "type")]
    #[schema(example = "float")]
    pub value_type: String,
}

impl From<unit::Model> for UnitResponse {
    fn from(m: unit::Model) -> Self {
        Self {
            symbol: m.symbol,
            name: m.name,
            value_type: m.value_type,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUnitRequest {
    #[schema(example = "Pa")]
    pub symbol: String,
    #[schema(example = "pascal")]
    pub name: String,
    #[serde(rename = "type")]
    #[schema(example = "float")]
    pub value_type: String,
}

pub fn validate_create_unit(req: &mut CreateUnitRequest) -> Result<(), AppError> {
    req.symbol = req.symbol.trim().to_string();
    req.name = req.name.trim().to_string();
    validate_len("symbol", &req.symbol, 1, 10)?;
    validate_len("name", &req.name, 1, 20)?;
    req.value_type
        .parse::<bbdata_common::ValueType>()
        .map_err(|e| AppError::field("type", e.to_string()))?;
    Ok(())
}
