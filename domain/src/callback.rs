//! OAuth2 authorization-code callback orchestration.
//!
//! Sequences the stages of the return trip from an identity provider:
//! validate the state token against the session-stored login attempt,
//! exchange the authorization code for an access token, fetch the user's
//! profile (and optionally their permissions), run the provider's
//! auth-success hooks, and resolve the destination to resume. Every stage
//! failure is terminal for the request; nothing is retried.

use log::*;
use serde_json::Value;
use service::config::Config;

use crate::error::{AuthErrorKind, Error};
use crate::gateway::oauth_api::OAuthApiClient;
use crate::hooks::run_auth_success_hooks;
use crate::provider::{provider_key, ProviderRegistry};
use crate::session::{self, Session};

/// Query parameters delivered by the provider redirect.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Handles one callback end to end.
///
/// On success the session holds `user`, `token` and
/// `currentServiceProvider`, all mutations are persisted, and the returned
/// string is the location to redirect the user to: the session's `fromUrl`
/// when one was stored, `/` otherwise. `fromUrl` is consumed so a later
/// login cannot resume a stale destination.
///
/// No session mutation and no network call happens before the state token
/// has been validated against the stored login attempt.
pub async fn handle_callback(
    config: &Config,
    registry: &ProviderRegistry,
    session: &dyn Session,
    params: &CallbackParams,
) -> Result<String, Error> {
    let (key, code) = validate_attempt(registry, session, params).await?;
    let provider = registry
        .get(&key)
        .ok_or_else(|| Error::auth(AuthErrorKind::UnknownProvider))?;

    let client = OAuthApiClient::new(config)?;
    let tokens = client.exchange_code(provider, &code).await?;
    let mut profile = client.get_user_profile(provider, &tokens.access_token).await?;

    if provider.fetch_permissions {
        let permissions = client.get_permissions(&tokens.access_token).await?;
        attach_permissions(&key, &mut profile, permissions);
    }

    session.insert(session::USER_KEY, profile).await?;
    session
        .insert(session::TOKEN_KEY, serde_json::to_value(&tokens)?)
        .await?;
    session
        .insert(
            session::CURRENT_SERVICE_PROVIDER_KEY,
            Value::String(key.clone()),
        )
        .await?;
    // The identity must be committed before any hook observes the session.
    session.save().await?;

    run_auth_success_hooks(&key, provider, session).await?;

    let from_url = session.remove(session::FROM_URL_KEY).await?;
    if from_url.is_some() {
        session.save().await?;
    }
    let target = from_url
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or("/")
        .to_string();

    info!("Login via provider {key} complete, resuming at {target}");
    Ok(target)
}

/// Confirms the callback corresponds to a login attempt this server
/// initiated. Pure read: no side effects on the session.
///
/// The provider key is the prefix of `state` before the first `_`; it must
/// resolve to a registered provider, and the full `state` string must
/// exactly equal the attempt value stored under `<providerKey>_key`.
async fn validate_attempt(
    registry: &ProviderRegistry,
    session: &dyn Session,
    params: &CallbackParams,
) -> Result<(String, String), Error> {
    let code = match params.code.as_deref() {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => return Err(Error::auth(AuthErrorKind::MissingParams)),
    };
    let state = match params.state.as_deref() {
        Some(state) if !state.is_empty() => state.to_string(),
        _ => return Err(Error::auth(AuthErrorKind::MissingParams)),
    };

    let key = provider_key(&state).to_string();
    if registry.get(&key).is_none() {
        warn!("Callback carried state for unregistered provider {key}");
        return Err(Error::auth(AuthErrorKind::UnknownProvider));
    }

    let stored = session.get(&session::attempt_key(&key)).await;
    match stored.as_ref().and_then(Value::as_str) {
        Some(attempt) if attempt == state => Ok((key, code)),
        Some(_) => {
            warn!("Callback state does not match the stored attempt for provider {key}");
            Err(Error::auth(AuthErrorKind::StateMismatch))
        }
        None => {
            warn!("Callback for provider {key} without a stored login attempt");
            Err(Error::auth(AuthErrorKind::StateMismatch))
        }
    }
}

/// Merges fetched permissions into the profile record under `permissions`.
fn attach_permissions(key: &str, profile: &mut Value, permissions: Value) {
    match profile {
        Value::Object(map) => {
            map.insert("permissions".to_string(), permissions);
        }
        _ => warn!("Profile for provider {key} is not an object, dropping fetched permissions"),
    }
}
