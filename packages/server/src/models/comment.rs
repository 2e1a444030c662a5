use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::comment;
use crate::error::AppError;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = 42)]
    pub object_id: i64,
    #[serde(with = "bbdata_common::dates::iso_millis")]
    #[schema(value_type = String, example = "2020-01-01T00:00:00.000Z")]
    pub from: DateTime<Utc>,
    #[serde(with = "bbdata_common::dates::iso_millis")]
    #[schema(value_type = String, example = "2020-01-02T00:00:00.000Z")]
    pub to: DateTime<Utc>,
    #[schema(example = "sensor replaced")]
    pub comment: String,
}

impl From<comment::Model> for CommentResponse {
    fn from(m: comment::Model) -> Self {
        Self {
            id: m.id,
            object_id: m.object_id,
            from: m.dfrom,
            to: m.dto,
            comment: m.comment,
        }
    }
}

/// Dates are kept as text so they go through the configured date window.
#[derive(Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "2020-01-01T00:00:00.000Z")]
    pub from: String,
    #[schema(example = "2020-01-02T00:00:00.000Z")]
    pub to: String,
    #[schema(example = "sensor replaced")]
    pub comment: String,
}

#[derive(Deserialize, utoipa::IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CommentsQuery {
    /// Only comments whose period covers this date.
    pub for_date: Option<String>,
}

pub fn validate_comment_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::field("comment", "must not be empty"));
    }
    Ok(())
}
