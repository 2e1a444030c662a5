mod common;

mod auth;
mod object_groups;
mod objects;
mod user_groups;
mod values;
