//! Service provider configuration and lookup.
//!
//! The set of service providers is configuration-driven: providers are
//! described in JSON (camelCase keys, matching the configuration format the
//! deployments already use), registered once at startup, and resolved per
//! request by the provider key embedded in the state token. Validation runs
//! in one pass at load time, never per request.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

use log::*;
use serde::Deserialize;
use service::config::Config;

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::hooks::AuthSuccessHook;

/// Static configuration for one identity provider.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceProvider {
    /// Scopes requested when login is initiated. Unused by the callback
    /// itself but part of the provider record.
    pub scopes: String,
    /// Provider identifier, also the path segment of its profile API.
    pub identifier: String,
    /// Token endpoint path, resolved against the configured OAuth host.
    pub token_endpoint: String,
    /// When true, permissions are fetched from the permission service and
    /// merged into the profile record after authentication.
    pub fetch_permissions: bool,
    /// Ordered post-authentication extensions. Not part of the serialized
    /// form; attached programmatically by the embedding application.
    #[serde(skip)]
    pub auth_success_hooks: Vec<Arc<dyn AuthSuccessHook>>,
}

impl ServiceProvider {
    /// Appends a hook to the end of the auth-success chain.
    pub fn with_auth_success_hook(mut self, hook: Arc<dyn AuthSuccessHook>) -> Self {
        self.auth_success_hooks.push(hook);
        self
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("scopes", &self.scopes)
            .field("identifier", &self.identifier)
            .field("token_endpoint", &self.token_endpoint)
            .field("fetch_permissions", &self.fetch_permissions)
            .field("auth_success_hooks", &self.auth_success_hooks.len())
            .finish()
    }
}

/// Lookup table from provider key to provider configuration. Immutable once
/// the process is wired up.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ServiceProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, provider: ServiceProvider) {
        let key = key.into();
        debug!(
            "Registered service provider {} (identifier {}, fetch_permissions {})",
            key, provider.identifier, provider.fetch_permissions
        );
        self.providers.insert(key, provider);
    }

    pub fn get(&self, key: &str) -> Option<&ServiceProvider> {
        self.providers.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// True when any registered provider wants permissions fetched.
    pub fn fetch_permissions_enabled(&self) -> bool {
        self.providers.values().any(|p| p.fetch_permissions)
    }

    /// Builds a registry from the JSON provider map format.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let providers: HashMap<String, ServiceProvider> =
            serde_json::from_str(json).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            })?;

        let mut registry = Self::new();
        for (key, provider) in providers {
            registry.register(key, provider);
        }
        Ok(registry)
    }

    pub fn from_json_file(path: &str) -> Result<Self, Error> {
        let json = fs::read_to_string(path).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })?;
        Self::from_json(&json)
    }

    /// One-pass startup validation of the configuration surface.
    ///
    /// The OAuth host, API host and client credentials are always required.
    /// The permission service credentials (API key and application name) are
    /// required only when some provider enables permission fetching.
    pub fn validate(&self, config: &Config) -> Result<(), Error> {
        let required = [
            ("oauth_host", config.oauth_host()),
            ("api_host", config.api_host()),
            ("auth_client_id", config.auth_client_id()),
            ("auth_client_secret", config.auth_client_secret()),
        ];
        for (name, value) in required {
            if value.as_deref().map_or(true, str::is_empty) {
                error!("Missing required configuration property {name}");
                return Err(Error::config());
            }
        }

        if !self.fetch_permissions_enabled() {
            return Ok(());
        }

        let required_for_permissions = [
            ("auth_api_key", config.auth_api_key()),
            ("application_name", config.application_name()),
        ];
        for (name, value) in required_for_permissions {
            if value.as_deref().map_or(true, str::is_empty) {
                error!(
                    "Missing configuration property {name}, required when a \
                     provider enables permission fetching"
                );
                return Err(Error::config());
            }
        }

        Ok(())
    }
}

/// Provider key segment of a state token: everything before the first `_`.
pub fn provider_key(state: &str) -> &str {
    match state.split_once('_') {
        Some((key, _)) => key,
        None => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
            .set_oauth_host("https://oauth.example.test".to_string())
            .set_api_host("https://api.example.test".to_string())
            .set_auth_client_id("client-id".to_string())
            .set_auth_client_secret("client-secret".to_string())
    }

    const PROVIDERS_JSON: &str = r#"{
        "aprofiel": {
            "scopes": "",
            "identifier": "astad.aprofiel.v1",
            "tokenEndpoint": "/astad/aprofiel/v1/oauth2/token"
        },
        "mprofiel": {
            "identifier": "astad.mprofiel.v1",
            "tokenEndpoint": "/astad/mprofiel/v1/oauth2/token",
            "fetchPermissions": true
        }
    }"#;

    #[test]
    fn test_provider_key_parsing() {
        assert_eq!(provider_key("aprofiel_1234"), "aprofiel");
        assert_eq!(provider_key("aprofiel_12_34"), "aprofiel");
        assert_eq!(provider_key("nounderscore"), "nounderscore");
    }

    #[test]
    fn test_from_json_parses_camel_case() {
        let registry = ProviderRegistry::from_json(PROVIDERS_JSON).unwrap();

        let aprofiel = registry.get("aprofiel").unwrap();
        assert_eq!(aprofiel.identifier, "astad.aprofiel.v1");
        assert_eq!(aprofiel.token_endpoint, "/astad/aprofiel/v1/oauth2/token");
        assert!(!aprofiel.fetch_permissions);

        let mprofiel = registry.get("mprofiel").unwrap();
        assert!(mprofiel.fetch_permissions);
        assert!(registry.fetch_permissions_enabled());
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let err = ProviderRegistry::from_json("not json").unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let registry = ProviderRegistry::new();
        assert!(registry.validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required_property() {
        let registry = ProviderRegistry::new();
        let config = Config::default()
            .set_oauth_host("https://oauth.example.test".to_string())
            .set_api_host("https://api.example.test".to_string());

        let err = registry.validate(&config).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[test]
    fn test_validate_requires_permission_bundle_when_enabled() {
        let registry = ProviderRegistry::from_json(PROVIDERS_JSON).unwrap();

        // mprofiel enables permission fetching, so the API key and
        // application name become required.
        assert!(registry.validate(&valid_config()).is_err());

        let config = valid_config()
            .set_auth_api_key("permission-api-key".to_string())
            .set_application_name("my-app".to_string());
        assert!(registry.validate(&config).is_ok());
    }
}
