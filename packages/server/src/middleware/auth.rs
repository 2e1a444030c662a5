use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use chrono::Utc;
use sea_orm::*;
use tracing::debug;

use crate::entity::apikey;
use crate::error::AppError;
use crate::extractors::auth::{Principal, Scope};
use crate::routes::scopes;
use crate::state::AppState;

/// Resolve the caller of a protected route from its apikey.
///
/// Routes absent from the scope table and CORS preflights pass through
/// untouched. Otherwise the `(user, apikey)` pair must match a non-expired
/// key, and read-only keys are refused on routes needing write scope.
pub async fn apikey_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.method() == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }

    let required = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| scopes::required_scope(request.method(), path.as_str()));
    let Some(required) = required else {
        return Ok(next.run(request).await);
    };

    let (user, token) = credentials(request.headers());
    if user.is_empty() || token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let user_id = user
        .parse::<i32>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| {
            AppError::BadApikey(format!("Wrong header bbuser={user}. Should be an integer"))
        })?;

    let key = apikey::Entity::find()
        .filter(apikey::Column::UserId.eq(user_id))
        .filter(apikey::Column::Secret.eq(token.as_str()))
        .filter(
            Condition::any()
                .add(apikey::Column::Expirationdate.is_null())
                .add(apikey::Column::Expirationdate.gt(Utc::now())),
        )
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadApikey(format!("Access denied for user {user_id} : bad apikey")))?;

    if key.readonly && required == Scope::Write {
        return Err(AppError::Forbidden(format!(
            "Access denied for user {user_id} : this apikey is read-only"
        )));
    }

    debug!(user_id, apikey_id = key.id, "Authenticated request");
    request.extensions_mut().insert(Principal {
        user_id,
        scope: if key.readonly { Scope::Read } else { Scope::Write },
        apikey_id: Some(key.id),
    });
    Ok(next.run(request).await)
}

/// Stand-in for [`apikey_gate`] when `auth.unsecured` is set: every request
/// runs as the configured user with write scope.
pub async fn unsecured_gate(
    State(user_id): State<i32>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    request.extensions_mut().insert(Principal {
        user_id,
        scope: Scope::Write,
        apikey_id: None,
    });
    next.run(request).await
}

/// `(user, token)` from HTTP Basic when it splits in exactly two parts, from
/// the `bbuser`/`bbtoken` headers otherwise. Missing values are empty.
fn credentials(headers: &HeaderMap) -> (String, String) {
    if let Some(Authorization(basic)) = headers.typed_get::<Authorization<Basic>>()
        && !basic.password().contains(':')
    {
        return (basic.username().to_string(), basic.password().to_string());
    }
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim()
            .to_string()
    };
    (header("bbuser"), header("bbtoken"))
}
