//! HTTP API

pub mod routes;

pub use routes::{router, AppState};
