//! Server configuration from flags and environment.

use std::path::PathBuf;

use clap::Parser;

/// MapFy REST service configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "mapfy-server", version, about)]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "MAPFY_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory for JSON document persistence. Omit for in-memory
    /// storage (development only; nothing survives a restart).
    #[arg(long, env = "MAPFY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Secret used to sign bearer tokens.
    #[arg(long, env = "MAPFY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Bearer token lifetime in hours.
    #[arg(long, env = "MAPFY_JWT_EXPIRES_HOURS", default_value_t = 720)]
    pub jwt_expires_hours: i64,

    /// Origin allowed by CORS (e.g. the web client's URL). Omit to allow
    /// localhost development origins only.
    #[arg(long, env = "MAPFY_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::try_parse_from(["mapfy-server", "--jwt-secret", "s3cret"]).expect("parse");
        assert_eq!(config.port, 5000);
        assert_eq!(config.jwt_expires_hours, 720);
        assert!(config.data_dir.is_none());
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn test_secret_is_required() {
        // Without the env var set, the secret must come from the flag.
        assert!(ServerConfig::try_parse_from(["mapfy-server"]).is_err());
    }

    #[test]
    fn test_flag_overrides() {
        let config = ServerConfig::try_parse_from([
            "mapfy-server",
            "--jwt-secret",
            "s3cret",
            "--port",
            "8080",
            "--data-dir",
            "/var/lib/mapfy",
        ])
        .expect("parse");
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.data_dir.as_deref(),
            Some(std::path::Path::new("/var/lib/mapfy"))
        );
    }
}
