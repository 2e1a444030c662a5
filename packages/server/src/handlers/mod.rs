pub mod apikeys;
pub mod auth;
pub mod comments;
pub mod input;
pub mod object_groups;
pub mod objects;
pub mod stats;
pub mod tokens;
pub mod units;
pub mod user_groups;
pub mod users;
pub mod values;

use axum::http::StatusCode;

/// `200` when something changed, `304` otherwise.
pub(crate) fn modified(changed: bool) -> StatusCode {
    if changed {
        StatusCode::OK
    } else {
        StatusCode::NOT_MODIFIED
    }
}
