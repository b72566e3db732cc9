use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use domain::provider::ProviderRegistry;
use log::*;
use service::config::Config;
use time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub(crate) mod controller;
pub mod router;
pub mod session;

// Web-level state passed into the Router. Needs to implement Clone to be
// able to be passed into Router as State.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    pub fn new(config: Config, providers: Arc<ProviderRegistry>) -> Self {
        Self { config, providers }
    }
}

/// Binds the listener and serves the auth routes until the process exits.
///
/// Sessions are cookie-backed through tower-sessions; the in-memory store
/// suffices because a login attempt and its callback land on the same
/// process.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = app_state.config.port;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            app_state.config.session_expiry_seconds as i64,
        )));

    let cors_layer = build_cors_layer(&app_state.config);

    let router = router::define_routes(app_state)
        .layer(session_layer)
        .layer(cors_layer);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Listening for requests on {host}:{port}");
    axum::serve(listener, router).await
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}
