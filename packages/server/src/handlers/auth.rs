use axum::{Json, extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use sea_orm::*;
use tracing::{info, instrument};

use super::apikeys::insert_apikey;
use crate::entity::{apikey, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::AppJson;
use crate::models::auth::{ApikeyResponse, LoginRequest, validate_login_request};
use crate::state::AppState;
use crate::utils::hash;

pub const AUTO_LOGIN_DESCRIPTION: &str = "auto_login";

#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    operation_id = "login",
    summary = "Log in with a username and password",
    description = "Creates a writable apikey expiring after `auth.login_validity_hours`. Use the returned `userId` and `secret` as `bbuser`/`bbtoken` on protected endpoints.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "New apikey", body = ApikeyResponse),
        (status = 400, description = "Malformed body (WrongParamsException)", body = ErrorBody),
        (status = 403, description = "Wrong credentials (ForbiddenException)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<ApikeyResponse>, AppError> {
    validate_login_request(&payload)?;
    let username = payload.username.trim();
    let wrong_credentials = || AppError::Forbidden("Wrong username or password.".into());

    let mut by_name_or_id = Condition::any().add(user::Column::Name.eq(username));
    if let Ok(id) = username.parse::<i32>() {
        by_name_or_id = by_name_or_id.add(user::Column::Id.eq(id));
    }
    let user = user::Entity::find()
        .filter(by_name_or_id)
        .order_by_asc(user::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(wrong_credentials)?;

    let valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;
    if !valid {
        info!(user_id = user.id, "Rejected login");
        return Err(wrong_credentials());
    }

    let expires = Utc::now() + Duration::hours(state.config.auth.login_validity_hours);
    let key = insert_apikey(
        &state.db,
        user.id,
        false,
        Some(expires),
        Some(AUTO_LOGIN_DESCRIPTION.to_string()),
    )
    .await?;
    Ok(Json(ApikeyResponse::from(key)))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Authentication",
    operation_id = "logout",
    summary = "Delete the apikey used for this request",
    responses(
        (status = 200, description = "Apikey deleted"),
        (status = 401, description = "Missing credentials (UnauthorizedException)", body = ErrorBody),
        (status = 403, description = "Invalid apikey (BadApikeyException)", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal), fields(user_id = principal.user_id))]
pub async fn logout(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if let Some(id) = principal.apikey_id {
        apikey::Entity::delete_many()
            .filter(apikey::Column::Id.eq(id))
            .filter(apikey::Column::UserId.eq(principal.user_id))
            .exec(&state.db)
            .await?;
    }
    Ok(StatusCode::OK)
}
