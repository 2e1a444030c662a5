use axum::{Json, extract::State};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{unit, value_type};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::Principal;
use crate::extractors::json::AppJson;
use crate::models::unit::{CreateUnitRequest, UnitResponse, validate_create_unit};
use crate::state::AppState;
use crate::utils::access::is_superadmin;

#[utoipa::path(
    get,
    path = "/types",
    tag = "Types",
    operation_id = "getTypes",
    summary = "List the base value types",
    responses(
        (status = 200, description = "Type names", body = [String], example = json!(["bool", "float", "int", "string"])),
    ),
)]
#[instrument(skip(state))]
pub async fn list_types(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let types = value_type::Entity::find()
        .order_by_asc(value_type::Column::Name)
        .all(&state.db)
        .await?;
    Ok(Json(types.into_iter().map(|t| t.name).collect()))
}

#[utoipa::path(
    get,
    path = "/units",
    tag = "Types",
    operation_id = "getUnits",
    summary = "List the units objects can use",
    responses(
        (status = 200, description = "Units", body = [UnitResponse]),
    ),
)]
#[instrument(skip(state))]
pub async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<UnitResponse>>, AppError> {
    let units = unit::Entity::find()
        .order_by_asc(unit::Column::Symbol)
        .all(&state.db)
        .await?;
    Ok(Json(units.into_iter().map(UnitResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/units",
    tag = "Types",
    operation_id = "createUnit",
    summary = "Add a unit",
    description = "Restricted to superadmins.",
    request_body = CreateUnitRequest,
    responses(
        (status = 200, description = "New unit", body = UnitResponse),
        (status = 400, description = "Invalid fields or duplicate symbol", body = ErrorBody),
        (status = 403, description = "Caller is not a superadmin", body = ErrorBody),
    ),
    security(("bbuser" = [], "bbtoken" = [])),
)]
#[instrument(skip(state, principal, payload), fields(user_id = principal.user_id, symbol = %payload.symbol))]
pub async fn create_unit(
    principal: Principal,
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<CreateUnitRequest>,
) -> Result<Json<UnitResponse>, AppError> {
    if !is_superadmin(&state.db, principal.user_id).await? {
        return Err(AppError::Forbidden("Only superadmins can create units.".into()));
    }
    validate_create_unit(&mut payload)?;

    let created = unit::ActiveModel {
        symbol: Set(payload.symbol),
        name: Set(payload.name),
        value_type: Set(payload.value_type.trim().to_lowercase()),
    }
    .insert(&state.db)
    .await?;
    info!("Created unit");
    Ok(Json(UnitResponse::from(created)))
}
