use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Permission level of an apikey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    Read,
    Write,
}

/// Caller resolved by the auth gate for the current request.
///
/// Add this as a handler parameter on protected routes. Requests that did not
/// go through the gate are rejected with `401`.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i32,
    pub scope: Scope,
    /// Key used for the request. `None` in unsecured mode.
    pub apikey_id: Option<i32>,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
