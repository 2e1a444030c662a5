//! Scope required by every protected route. Routes missing from
//! [`PROTECTED`] are public.

use axum::http::Method;

use crate::extractors::auth::Scope;

use Scope::{Read, Write};

/// `(method, path template, scope)`. Templates match axum's `MatchedPath`.
pub const PROTECTED: &[(&str, &str, Scope)] = &[
    ("POST", "/logout", Read),
    // apikeys
    ("GET", "/apikeys", Write),
    ("PUT", "/apikeys", Write),
    ("POST", "/apikeys/{id}", Write),
    ("DELETE", "/apikeys/{id}", Write),
    // users
    ("GET", "/me", Read),
    ("GET", "/me/userGroups", Read),
    ("GET", "/users", Read),
    ("PUT", "/users", Write),
    ("GET", "/users/{id}", Read),
    // user groups
    ("GET", "/userGroups", Read),
    ("PUT", "/userGroups", Write),
    ("GET", "/userGroups/{id}", Read),
    ("DELETE", "/userGroups/{id}", Write),
    ("GET", "/userGroups/{id}/users", Read),
    ("GET", "/userGroups/{id}/users/{userId}", Read),
    ("PUT", "/userGroups/{id}/users/{userId}", Write),
    ("DELETE", "/userGroups/{id}/users/{userId}", Write),
    // object groups
    ("GET", "/objectGroups", Read),
    ("PUT", "/objectGroups", Write),
    ("GET", "/objectGroups/{id}", Read),
    ("POST", "/objectGroups/{id}", Write),
    ("DELETE", "/objectGroups/{id}", Write),
    ("GET", "/objectGroups/{id}/objects", Read),
    ("PUT", "/objectGroups/{id}/objects/{objectId}", Write),
    ("DELETE", "/objectGroups/{id}/objects/{objectId}", Write),
    ("GET", "/objectGroups/{id}/userGroups", Read),
    ("PUT", "/objectGroups/{id}/userGroups/{userGroupId}", Write),
    ("DELETE", "/objectGroups/{id}/userGroups/{userGroupId}", Write),
    // objects
    ("GET", "/objects", Read),
    ("PUT", "/objects", Write),
    ("PUT", "/objects/bulk", Write),
    ("GET", "/objects/{id}", Read),
    ("POST", "/objects/{id}", Write),
    ("DELETE", "/objects/{id}", Write),
    ("POST", "/objects/{id}/enable", Write),
    ("POST", "/objects/{id}/disable", Write),
    ("PUT", "/objects/{id}/tags", Write),
    ("DELETE", "/objects/{id}/tags", Write),
    ("GET", "/objects/{id}/objectGroups", Read),
    // tokens are secrets: even listing them needs write scope
    ("GET", "/objects/{id}/tokens", Write),
    ("PUT", "/objects/{id}/tokens", Write),
    ("GET", "/objects/{id}/tokens/{tokenId}", Write),
    ("POST", "/objects/{id}/tokens/{tokenId}", Write),
    ("DELETE", "/objects/{id}/tokens/{tokenId}", Write),
    // comments
    ("GET", "/objects/{id}/comments", Read),
    ("PUT", "/objects/{id}/comments", Write),
    ("GET", "/objects/{id}/comments/{commentId}", Read),
    ("DELETE", "/objects/{id}/comments/{commentId}", Write),
    // values and stats
    ("GET", "/objects/{id}/values", Read),
    ("GET", "/objects/{id}/values/latest", Read),
    ("GET", "/objects/{id}/values/aggregated", Read),
    ("GET", "/objects/{id}/stats", Read),
    ("GET", "/objects/{id}/stats/counters", Read),
    ("GET", "/values", Read),
    ("GET", "/values/latest", Read),
    ("GET", "/values/hours", Read),
    ("GET", "/values/quarters", Read),
    // units
    ("POST", "/units", Write),
];

pub fn required_scope(method: &Method, path: &str) -> Option<Scope> {
    PROTECTED
        .iter()
        .find(|(m, p, _)| *m == method.as_str() && *p == path)
        .map(|(_, _, scope)| *scope)
}
