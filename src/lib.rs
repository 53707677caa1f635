//! Media and advertisement backend for the portfolio site.
//!
//! Uploads land in named buckets under generated keys, public objects are
//! served back over HTTP, and each placement slot shows its most recently
//! created active advertisement.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::AppState;

/// Router with state attached, ready to serve.
pub fn app(state: AppState) -> Router {
    routes::routes::routes().with_state(state)
}
