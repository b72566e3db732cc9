//! HTTP client for the provider OAuth and profile APIs.
//!
//! This module covers the three outbound calls the callback makes: the
//! code-for-token exchange against the provider's token endpoint, the
//! profile fetch against the provider's API, and the optional permission
//! fetch against the permission service. Failures are never retried; each
//! call maps its own failures onto the matching callback failure kind.

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::config::Config;

use crate::error::{AuthErrorKind, Error};
use crate::provider::ServiceProvider;

/// Token endpoint response. Opaque to the rest of the pipeline beyond
/// being stored in the session; only `access_token` is consumed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Request to exchange an authorization code for tokens
#[derive(Debug, Serialize)]
struct TokenExchangeRequest {
    code: String,
    client_id: String,
    client_secret: String,
    grant_type: String,
}

/// Client for a deployment's OAuth and API hosts, shared by all providers.
pub struct OAuthApiClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    oauth_host: String,
    api_host: String,
    api_key: Option<String>,
    application_name: Option<String>,
}

impl OAuthApiClient {
    /// Builds a client from the validated configuration.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client_id = config.auth_client_id().ok_or_else(Error::config)?;
        let client_secret = config.auth_client_secret().ok_or_else(Error::config)?;
        let oauth_host = config.oauth_host().ok_or_else(Error::config)?;
        let api_host = config.api_host().ok_or_else(Error::config)?;

        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            oauth_host,
            api_host,
            api_key: config.auth_api_key(),
            application_name: config.application_name(),
        })
    }

    /// Exchange an authorization code for an access token at the provider's
    /// token endpoint.
    pub async fn exchange_code(
        &self,
        provider: &ServiceProvider,
        code: &str,
    ) -> Result<TokenResponse, Error> {
        let url = format!("{}{}", self.oauth_host, provider.token_endpoint);
        let request = TokenExchangeRequest {
            code: code.to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            grant_type: "authorization_code".to_string(),
        };

        debug!("Exchanging authorization code at {url}");

        let response = self
            .client
            .post(&url)
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach token endpoint {url}: {e:?}");
                Error::auth_with_source(AuthErrorKind::TokenExchangeFailed, Box::new(e))
            })?;

        if response.status().is_success() {
            let tokens: TokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse token endpoint response: {e:?}");
                Error::auth_with_source(AuthErrorKind::TokenExchangeFailed, Box::new(e))
            })?;
            info!("Exchanged authorization code for an access token");
            Ok(tokens)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Token endpoint returned {status}: {error_text}");
            Err(Error::auth(AuthErrorKind::TokenExchangeFailed))
        }
    }

    /// Retrieve the authenticated user's profile from the provider API.
    pub async fn get_user_profile(
        &self,
        provider: &ServiceProvider,
        access_token: &str,
    ) -> Result<Value, Error> {
        let url = format!("{}/{}/me", self.api_host, provider.identifier);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach profile API {url}: {e:?}");
                Error::auth_with_source(AuthErrorKind::ProfileFetchFailed, Box::new(e))
            })?;

        if response.status().is_success() {
            let profile: Value = response.json().await.map_err(|e| {
                warn!("Failed to parse profile response: {e:?}");
                Error::auth_with_source(AuthErrorKind::ProfileFetchFailed, Box::new(e))
            })?;
            Ok(profile)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Profile API returned {status}: {error_text}");
            Err(Error::auth(AuthErrorKind::ProfileFetchFailed))
        }
    }

    /// Retrieve the user's permissions for this application from the
    /// permission service. Requires the permission credential bundle, which
    /// startup validation guarantees when any provider enables fetching.
    pub async fn get_permissions(&self, access_token: &str) -> Result<Value, Error> {
        let api_key = self.api_key.as_ref().ok_or_else(Error::config)?;
        let application_name = self.application_name.as_ref().ok_or_else(Error::config)?;
        let url = format!("{}/authz/v1/permissions", self.api_host);

        let response = self
            .client
            .get(&url)
            .query(&[("applicationName", application_name)])
            .header("apikey", api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach permission service {url}: {e:?}");
                Error::auth_with_source(AuthErrorKind::PermissionFetchFailed, Box::new(e))
            })?;

        if response.status().is_success() {
            let permissions: Value = response.json().await.map_err(|e| {
                warn!("Failed to parse permission response: {e:?}");
                Error::auth_with_source(AuthErrorKind::PermissionFetchFailed, Box::new(e))
            })?;
            Ok(permissions)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Permission service returned {status}: {error_text}");
            Err(Error::auth(AuthErrorKind::PermissionFetchFailed))
        }
    }
}
