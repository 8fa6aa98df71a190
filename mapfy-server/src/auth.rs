//! Bearer-token authentication: JWT issuance, password hashing and the
//! request extractor that resolves the current user.

use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use mapfy_core::{GoogleAuthRequest, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::users::UserRecord;
use crate::AppState;

/// bcrypt work factor for password hashes.
const BCRYPT_COST: u32 = 12;
/// Minimum password length accepted at registration.
const MIN_PASSWORD_LEN: usize = 8;

/// JWT claims carried by the bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The user ID the token identifies.
    sub: String,
    /// Issued-at, seconds since epoch.
    iat: i64,
    /// Expiry, seconds since epoch.
    exp: i64,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl TokenService {
    /// Create a token service from the signing secret and token lifetime.
    #[must_use]
    pub fn new(secret: &str, expires_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expires_hours),
        }
    }

    /// Issue a token for a user ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn sign(&self, user_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify a token and return the user ID it identifies.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for expired or tampered tokens.
    pub fn verify(&self, token: &str) -> Result<String, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("Not authorized, token failed".into()))
    }
}

/// The authenticated user resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(
    /// The resolved account record.
    pub UserRecord,
);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".into()))?;

        let user_id = state.tokens.verify(token)?;
        let record = state
            .users
            .get(&user_id)
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, user no longer exists".into()))?;
        Ok(Self(record))
    }
}

fn auth_envelope(token: &str, user: &UserRecord) -> Value {
    json!({
        "status": "success",
        "token": token,
        "data": { "user": user.identity() },
    })
}

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))
}

/// `POST /api/auth/register` — create an account and issue a token.
#[tracing::instrument(name = "auth_register", skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Please provide your name".into()));
    }
    if request.email.trim().is_empty() {
        return Err(ApiError::Validation("Please provide your email".into()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hash = hash_password(request.password).await?;
    let record = state
        .users
        .register(&request.name, &request.email, hash)?;
    let token = state.tokens.sign(&record.id)?;

    tracing::info!(user = %record.id, "user registered");
    Ok((StatusCode::CREATED, Json(auth_envelope(&token, &record))))
}

/// `POST /api/auth/login` — verify credentials and issue a token.
#[tracing::instrument(name = "auth_login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide email and password".into(),
        ));
    }

    let record = state.users.find_by_email(&request.email);
    // Verify against a real hash when the account exists; otherwise fail
    // uniformly so the response does not reveal which emails are taken.
    let ok = match &record {
        Some(record) => {
            verify_password(request.password, record.password_hash.clone()).await?
        }
        None => false,
    };

    let Some(record) = record.filter(|_| ok) else {
        return Err(ApiError::Unauthorized("Incorrect email or password".into()));
    };

    let token = state.tokens.sign(&record.id)?;
    Ok(Json(auth_envelope(&token, &record)))
}

/// `POST /api/auth/google` — sign in (or up) through a Google identity.
#[tracing::instrument(name = "auth_google", skip(state, request))]
pub async fn google(
    State(state): State<AppState>,
    Json(request): Json<GoogleAuthRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.email.trim().is_empty() || request.google_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "Please provide a Google account id and email".into(),
        ));
    }

    // New Google-only accounts get an unguessable placeholder password.
    let placeholder = hash_password(Uuid::new_v4().to_string()).await?;
    let record = state.users.upsert_google(
        &request.google_id,
        &request.name,
        &request.email,
        request.avatar.clone(),
        placeholder,
    );

    let token = state.tokens.sign(&record.id)?;
    Ok(Json(auth_envelope(&token, &record)))
}

/// `GET /api/auth/me` — the user the bearer token identifies.
#[tracing::instrument(name = "auth_me", skip_all)]
pub async fn me(AuthUser(record): AuthUser) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": { "user": record.identity() },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let tokens = TokenService::new("test-secret", 1);
        let token = tokens.sign("u-1").expect("sign");
        assert_eq!(tokens.verify(&token).expect("verify"), "u-1");
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let tokens = TokenService::new("test-secret", 1);
        let other = TokenService::new("different-secret", 1);
        let token = other.sign("u-1").expect("sign");
        assert!(matches!(
            tokens.verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new("test-secret", -1);
        let token = tokens.sign("u-1").expect("sign");
        assert!(matches!(
            tokens.verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let tokens = TokenService::new("test-secret", 1);
        assert!(matches!(
            tokens.verify("not-a-jwt"),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
