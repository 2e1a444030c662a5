pub mod auth;
pub mod comment;
pub mod input;
pub mod object;
pub mod object_group;
pub mod shared;
pub mod stats;
pub mod token;
pub mod unit;
pub mod user;
pub mod user_group;
pub mod values;
