//! Interfaces to the external CRUD and auth APIs.
//!
//! The persistence coordinator consumes these traits; the HTTP client
//! crate implements them over the wire, and tests substitute in-memory
//! fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{MapDocument, MapPayload, MapSummary};
use crate::error::MapResult;
use crate::session::{Session, UserIdentity};

/// The map CRUD API.
#[async_trait]
pub trait MapsApi: Send + Sync {
    /// List the current user's maps, most recently updated first.
    async fn list(&self, session: &Session) -> MapResult<Vec<MapSummary>>;

    /// Fetch one map by ID.
    async fn fetch(&self, session: &Session, id: &str) -> MapResult<MapDocument>;

    /// Create a new map.
    async fn create(&self, session: &Session, payload: MapPayload) -> MapResult<MapDocument>;

    /// Update an existing map. Absent payload fields keep their stored
    /// values.
    async fn update(
        &self,
        session: &Session,
        id: &str,
        payload: MapPayload,
    ) -> MapResult<MapDocument>;

    /// Delete a map. Ownership is enforced server-side.
    async fn delete(&self, session: &Session, id: &str) -> MapResult<()>;
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Email address (unique).
    pub email: String,
    /// Plain password; hashed server-side.
    pub password: String,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Plain password.
    pub password: String,
}

/// Google sign-in request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    /// Google account ID.
    pub google_id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A successful authentication: the bearer token plus the user it
/// identifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    /// Bearer token to attach to subsequent calls.
    pub token: String,
    /// The authenticated user.
    pub user: UserIdentity,
}

/// The auth API. The editor core only ever consumes "current user or
/// none"; issuance and verification live behind this boundary.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Register a new account.
    async fn register(&self, request: &RegisterRequest) -> MapResult<AuthSuccess>;

    /// Sign in with email and password.
    async fn login(&self, request: &LoginRequest) -> MapResult<AuthSuccess>;

    /// Sign in or sign up through Google.
    async fn google(&self, request: &GoogleAuthRequest) -> MapResult<AuthSuccess>;

    /// Fetch the user the session's token identifies.
    async fn me(&self, session: &Session) -> MapResult<UserIdentity>;
}
