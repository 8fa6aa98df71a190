//! # MapFy Server
//!
//! REST service for the MapFy editor: bearer-token authenticated map CRUD
//! plus the auth endpoints that issue those tokens.

use std::net::SocketAddr;

use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mapfy_server::{AppState, MapStore, ServerConfig, TokenService, UserStore};

/// Build a CORS layer for the configured origin, falling back to common
/// development origins.
fn build_cors_layer(configured_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = match configured_origin {
        Some(origin) => origin.parse().into_iter().collect(),
        None => [
            "http://localhost:3000",
            "http://localhost:5173",
            "http://127.0.0.1:3000",
            "http://127.0.0.1:5173",
        ]
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect(),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default:
/// info,mapfy_server=debug,tower_http=debug). Set `RUST_LOG_FORMAT=json`
/// for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mapfy_server=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = ServerConfig::parse();

    let (maps, users) = match &config.data_dir {
        Some(data_dir) => {
            let maps = MapStore::with_data_dir(data_dir.join("maps"))?;
            let users = UserStore::with_data_file(data_dir.join("users.json"))?;
            tracing::info!(data_dir = %data_dir.display(), "document persistence enabled");
            (maps, users)
        }
        None => {
            tracing::warn!("no data directory configured, documents are in-memory only");
            (MapStore::new(), UserStore::new())
        }
    };

    let state = AppState {
        maps,
        users,
        tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_hours),
    };

    let app = mapfy_server::router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(build_cors_layer(config.cors_origin.as_deref()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MapFy server listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
