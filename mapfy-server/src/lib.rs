//! # MapFy Server Library
//!
//! Shared state, routes and auth for the MapFy REST service. This library
//! is used by both the binary and the integration tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]

use axum::routing::{get, post};
use axum::Router;

pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod routes;
pub mod store;
pub mod users;
pub mod validation;

pub use auth::TokenService;
pub use config::ServerConfig;
pub use store::MapStore;
pub use users::UserStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Persisted map documents.
    pub maps: MapStore,
    /// User accounts.
    pub users: UserStore,
    /// Bearer token signing/verification.
    pub tokens: TokenService,
}

/// Build the API router over the given state.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/google", post(auth::google))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/maps",
            get(routes::list_maps).post(routes::create_map),
        )
        .route(
            "/api/maps/{id}",
            get(routes::get_map)
                .put(routes::update_map)
                .delete(routes::delete_map),
        )
        .with_state(state)
}
