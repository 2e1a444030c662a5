pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod stats;
pub mod timeseries;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::handlers::{
    apikeys, auth, comments, input, object_groups, objects, tokens, units, user_groups,
    users, values,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BBData API",
        version = "1.0.0",
        description = "Time-series storage and querying for building sensors"
    ),
    paths(
        auth::login,
        auth::logout,
        apikeys::list_apikeys,
        apikeys::create_apikey,
        apikeys::edit_apikey,
        apikeys::delete_apikey,
        users::me,
        users::my_user_groups,
        users::list_users,
        users::create_user,
        users::get_user,
        user_groups::list_user_groups,
        user_groups::create_user_group,
        user_groups::get_user_group,
        user_groups::delete_user_group,
        user_groups::list_members,
        user_groups::get_member,
        user_groups::put_member,
        user_groups::delete_member,
        object_groups::list_object_groups,
        object_groups::create_object_group,
        object_groups::get_object_group,
        object_groups::edit_object_group,
        object_groups::delete_object_group,
        object_groups::list_group_objects,
        object_groups::add_group_object,
        object_groups::remove_group_object,
        object_groups::list_permissions,
        object_groups::grant_permission,
        object_groups::revoke_permission,
        objects::list_objects,
        objects::create_object,
        objects::create_objects_bulk,
        objects::get_object,
        objects::edit_object,
        objects::delete_object,
        objects::enable_object,
        objects::disable_object,
        objects::add_tags,
        objects::remove_tags,
        objects::object_groups_of_object,
        tokens::list_tokens,
        tokens::create_token,
        tokens::get_token,
        tokens::edit_token,
        tokens::delete_token,
        comments::list_comments,
        comments::create_comment,
        comments::get_comment,
        comments::delete_comment,
        handlers::stats::get_stats,
        handlers::stats::get_counters,
        values::object_values,
        values::object_latest,
        values::object_aggregated,
        values::values,
        values::latest_values,
        values::hours,
        values::quarters,
        input::submit_values,
        input::cache_evict,
        units::list_types,
        units::list_units,
        units::create_unit,
    ),
    tags(
        (name = "Authentication", description = "Login, logout and apikeys"),
        (name = "Users", description = "User accounts"),
        (name = "UserGroups", description = "User groups and their members"),
        (name = "ObjectGroups", description = "Object groups and their permissions"),
        (name = "Objects", description = "Object CRUD, tags and enabling"),
        (name = "Object tokens", description = "Write tokens of an object"),
        (name = "Object comments", description = "Time-ranged comments on an object"),
        (name = "Values", description = "Raw and aggregated time series"),
        (name = "Stats", description = "Per-object usage statistics"),
        (name = "Input", description = "Measure ingestion"),
        (name = "Types", description = "Value types and units"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        for header in ["bbuser", "bbtoken"] {
            components.add_security_scheme(
                header,
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(header))),
            );
        }
    }
}

/// The generated OpenAPI document.
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = openapi();
    let cors = cors_layer(&state.config.server.cors);

    let routes = routes::routes();
    let routes = if state.config.auth.unsecured {
        warn!(
            user_id = state.config.auth.unsecured_user,
            "Authentication disabled, every request runs as the unsecured user"
        );
        routes.layer(axum::middleware::from_fn_with_state(
            state.config.auth.unsecured_user,
            middleware::unsecured_gate,
        ))
    } else {
        routes.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::apikey_gate,
        ))
    };

    routes
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Any origin when none is configured, the listed ones otherwise.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));
    if config.allow_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
