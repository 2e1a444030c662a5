pub mod scopes;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers::{
    apikeys, auth, comments, input, object_groups, objects, stats, tokens, units, user_groups,
    users, values,
};
use crate::state::AppState;

/// Every API route, mounted at the root. Protection is applied by the gate
/// layer from [`scopes::PROTECTED`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(user_group_routes())
        .merge(object_group_routes())
        .merge(object_routes())
        .merge(value_routes())
        .merge(input_routes())
        .route("/types", get(units::list_types))
        .route("/units", get(units::list_units).post(units::create_unit))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/apikeys",
            get(apikeys::list_apikeys).put(apikeys::create_apikey),
        )
        .route(
            "/apikeys/{id}",
            post(apikeys::edit_apikey).delete(apikeys::delete_apikey),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/me/userGroups", get(users::my_user_groups))
        .route("/users", get(users::list_users).put(users::create_user))
        .route("/users/{id}", get(users::get_user))
}

fn user_group_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/userGroups",
            get(user_groups::list_user_groups).put(user_groups::create_user_group),
        )
        .route(
            "/userGroups/{id}",
            get(user_groups::get_user_group).delete(user_groups::delete_user_group),
        )
        .route("/userGroups/{id}/users", get(user_groups::list_members))
        .route(
            "/userGroups/{id}/users/{userId}",
            get(user_groups::get_member)
                .put(user_groups::put_member)
                .delete(user_groups::delete_member),
        )
}

fn object_group_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/objectGroups",
            get(object_groups::list_object_groups).put(object_groups::create_object_group),
        )
        .route(
            "/objectGroups/{id}",
            get(object_groups::get_object_group)
                .post(object_groups::edit_object_group)
                .delete(object_groups::delete_object_group),
        )
        .route(
            "/objectGroups/{id}/objects",
            get(object_groups::list_group_objects),
        )
        .route(
            "/objectGroups/{id}/objects/{objectId}",
            put(object_groups::add_group_object).delete(object_groups::remove_group_object),
        )
        .route(
            "/objectGroups/{id}/userGroups",
            get(object_groups::list_permissions),
        )
        .route(
            "/objectGroups/{id}/userGroups/{userGroupId}",
            put(object_groups::grant_permission).delete(object_groups::revoke_permission),
        )
}

fn object_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/objects",
            get(objects::list_objects).put(objects::create_object),
        )
        .route("/objects/bulk", put(objects::create_objects_bulk))
        .route(
            "/objects/{id}",
            get(objects::get_object)
                .post(objects::edit_object)
                .delete(objects::delete_object),
        )
        .route("/objects/{id}/enable", post(objects::enable_object))
        .route("/objects/{id}/disable", post(objects::disable_object))
        .route(
            "/objects/{id}/tags",
            put(objects::add_tags).delete(objects::remove_tags),
        )
        .route(
            "/objects/{id}/objectGroups",
            get(objects::object_groups_of_object),
        )
        .route(
            "/objects/{id}/tokens",
            get(tokens::list_tokens).put(tokens::create_token),
        )
        .route(
            "/objects/{id}/tokens/{tokenId}",
            get(tokens::get_token)
                .post(tokens::edit_token)
                .delete(tokens::delete_token),
        )
        .route(
            "/objects/{id}/comments",
            get(comments::list_comments).put(comments::create_comment),
        )
        .route(
            "/objects/{id}/comments/{commentId}",
            get(comments::get_comment).delete(comments::delete_comment),
        )
        .route("/objects/{id}/stats", get(stats::get_stats))
        .route("/objects/{id}/stats/counters", get(stats::get_counters))
}

fn value_routes() -> Router<AppState> {
    Router::new()
        .route("/objects/{id}/values", get(values::object_values))
        .route("/objects/{id}/values/latest", get(values::object_latest))
        .route(
            "/objects/{id}/values/aggregated",
            get(values::object_aggregated),
        )
        .route("/values", get(values::values))
        .route("/values/latest", get(values::latest_values))
        .route("/values/hours", get(values::hours))
        .route("/values/quarters", get(values::quarters))
}

fn input_routes() -> Router<AppState> {
    Router::new()
        .route("/objects/values", post(input::submit_values))
        .route("/measures", post(input::submit_values))
        .route("/input/measures", post(input::submit_values))
        .route("/cache-evict", get(input::cache_evict))
}
