//! # MapFy API Client
//!
//! Bearer-token authenticated HTTP client for the MapFy CRUD and auth
//! APIs, implementing the [`MapsApi`] and [`AuthApi`] traits consumed by
//! the editor core.
//!
//! Every transport or server failure is translated into the core error
//! taxonomy at this boundary; no raw HTTP error escapes. The bearer
//! credential always comes from the explicit [`Session`] — the client
//! keeps no ambient auth state of its own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use mapfy_core::{
    AuthApi, AuthSuccess, GoogleAuthRequest, LoginRequest, MapDocument, MapError, MapPayload,
    MapResult, MapSummary, MapsApi, RegisterRequest, Session, UserIdentity,
};

/// Client crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error envelope the server uses for failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Success envelope for auth endpoints.
#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    token: String,
    data: AuthData,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    user: UserIdentity,
}

#[derive(Debug, Deserialize)]
struct MeEnvelope {
    data: AuthData,
}

/// HTTP client for the MapFy API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the given API base URL (e.g.
    /// `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Validation`] for a malformed base URL.
    pub fn new(base_url: impl AsRef<str>) -> MapResult<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| MapError::Validation(format!("invalid API base URL: {e}")))?;

        let http = Client::builder()
            .user_agent(format!("mapfy-client/{VERSION}"))
            .build()
            .map_err(|e| MapError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(InnerClient { http, base_url }),
        })
    }

    fn endpoint(&self, path: &str) -> MapResult<Url> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| MapError::Validation(format!("invalid API path {path:?}: {e}")))
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Execute a request and translate failures into the core taxonomy.
    async fn execute(&self, request: RequestBuilder) -> MapResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| MapError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(%status, "API rejected credentials: {message}");
            return Err(MapError::Unauthorized(message));
        }

        tracing::warn!(%status, "API request failed: {message}");
        Err(MapError::http(status.as_u16(), message))
    }

    async fn json<T: serde::de::DeserializeOwned>(&self, response: Response) -> MapResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| MapError::network(format!("unparseable API response: {e}")))
    }
}

#[async_trait]
impl MapsApi for ApiClient {
    async fn list(&self, session: &Session) -> MapResult<Vec<MapSummary>> {
        let url = self.endpoint("/api/maps")?;
        let response = self
            .execute(self.authorized(self.inner.http.get(url), session))
            .await?;
        self.json(response).await
    }

    async fn fetch(&self, session: &Session, id: &str) -> MapResult<MapDocument> {
        let url = self.endpoint(&format!("/api/maps/{id}"))?;
        let response = self
            .execute(self.authorized(self.inner.http.get(url), session))
            .await?;
        self.json(response).await
    }

    async fn create(&self, session: &Session, payload: MapPayload) -> MapResult<MapDocument> {
        let url = self.endpoint("/api/maps")?;
        let response = self
            .execute(self.authorized(self.inner.http.post(url).json(&payload), session))
            .await?;
        self.json(response).await
    }

    async fn update(
        &self,
        session: &Session,
        id: &str,
        payload: MapPayload,
    ) -> MapResult<MapDocument> {
        let url = self.endpoint(&format!("/api/maps/{id}"))?;
        let response = self
            .execute(self.authorized(self.inner.http.put(url).json(&payload), session))
            .await?;
        self.json(response).await
    }

    async fn delete(&self, session: &Session, id: &str) -> MapResult<()> {
        let url = self.endpoint(&format!("/api/maps/{id}"))?;
        self.execute(self.authorized(self.inner.http.delete(url), session))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> MapResult<AuthSuccess> {
        let url = self.endpoint("/api/auth/register")?;
        let response = self.execute(self.inner.http.post(url).json(request)).await?;
        let envelope: AuthEnvelope = self.json(response).await?;
        Ok(AuthSuccess {
            token: envelope.token,
            user: envelope.data.user,
        })
    }

    async fn login(&self, request: &LoginRequest) -> MapResult<AuthSuccess> {
        let url = self.endpoint("/api/auth/login")?;
        let response = self.execute(self.inner.http.post(url).json(request)).await?;
        let envelope: AuthEnvelope = self.json(response).await?;
        Ok(AuthSuccess {
            token: envelope.token,
            user: envelope.data.user,
        })
    }

    async fn google(&self, request: &GoogleAuthRequest) -> MapResult<AuthSuccess> {
        let url = self.endpoint("/api/auth/google")?;
        let response = self.execute(self.inner.http.post(url).json(request)).await?;
        let envelope: AuthEnvelope = self.json(response).await?;
        Ok(AuthSuccess {
            token: envelope.token,
            user: envelope.data.user,
        })
    }

    async fn me(&self, session: &Session) -> MapResult<UserIdentity> {
        let url = self.endpoint("/api/auth/me")?;
        let response = self
            .execute(self.authorized(self.inner.http.get(url), session))
            .await?;
        let envelope: MeEnvelope = self.json(response).await?;
        Ok(envelope.data.user)
    }
}
