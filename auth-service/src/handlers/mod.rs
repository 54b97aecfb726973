//! HTTP handlers.

pub mod auth;

pub use auth::*;
