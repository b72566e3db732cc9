use crate::controller::{callback_controller, health_check_controller};
use crate::AppState;
use axum::{routing::get, Router};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
    info(title = "Login Gateway API"),
    paths(
        callback_controller::callback,
        health_check_controller::health_check,
    ),
    tags(
        (name = "login_gateway", description = "Multi-provider OAuth2 login callback API")
    )
)]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// The callback route carries no auth middleware: the user arrives on it via
/// the provider's browser redirect, which cannot present credentials.
fn auth_routes(app_state: AppState) -> Router {
    let base_path = app_state.config.base_path().to_string();
    Router::new().nest(
        &base_path,
        Router::new()
            .route("/callback", get(callback_controller::callback))
            .with_state(app_state),
    )
}
