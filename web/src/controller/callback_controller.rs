//! Controller for the OAuth2 authorization-code callback.
//!
//! Note: this endpoint is reached via a browser redirect from the identity
//! provider, so it carries no authentication of its own — the state token
//! check against the session is what ties the request to a known login
//! attempt.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use domain::callback::{self, CallbackParams};
use domain::error::{AuthErrorKind, DomainErrorKind, Error};
use log::*;
use serde::Deserialize;
use tower_sessions::Session;

use crate::session::WebSession;
use crate::AppState;

/// Query parameters for the OAuth callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET {base_path}/callback
///
/// Handles the redirect back from an identity provider after user consent.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code issued by the provider"),
        ("state" = Option<String>, Query, description = "State token issued when login was initiated"),
    ),
    responses(
        (status = 303, description = "Redirect to the resumed destination, or to the error page on failure"),
        (status = 400, description = "State token names an unregistered provider"),
        (status = 401, description = "State token does not match the stored login attempt"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let params = CallbackParams {
        code: query.code,
        state: query.state,
    };
    let web_session = WebSession(session);

    match callback::handle_callback(
        &app_state.config,
        &app_state.providers,
        &web_session,
        &params,
    )
    .await
    {
        Ok(target) => Redirect::to(&target).into_response(),
        Err(err) => error_response(&app_state, err),
    }
}

/// Maps failure kinds onto the callback response contract: only the two
/// validation failures produce protocol status codes, everything else sends
/// the browser to the configured error page. Failure detail stays in the
/// server logs.
fn error_response(app_state: &AppState, err: Error) -> Response {
    match err.error_kind {
        DomainErrorKind::Auth(AuthErrorKind::UnknownProvider) => {
            StatusCode::BAD_REQUEST.into_response()
        }
        DomainErrorKind::Auth(AuthErrorKind::StateMismatch) => {
            StatusCode::UNAUTHORIZED.into_response()
        }
        DomainErrorKind::Auth(AuthErrorKind::MissingParams) => {
            debug!("Callback carried no code or state, nothing to resume");
            Redirect::to(app_state.config.error_redirect()).into_response()
        }
        ref kind => {
            warn!("Callback failed ({kind:?}), redirecting to the error page");
            Redirect::to(app_state.config.error_redirect()).into_response()
        }
    }
}
