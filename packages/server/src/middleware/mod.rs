pub mod auth;

pub use auth::{apikey_gate, unsecured_gate};
