use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Path prefix the auth routes are mounted under when not overridden.
pub const DEFAULT_BASE_PATH: &str = "/auth";

/// Where the browser is sent when a callback cannot be completed.
pub const DEFAULT_ERROR_REDIRECT: &str = "/";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The base URL of the OAuth2 authorization server that hosts the
    /// per-provider token endpoints.
    #[arg(long, env)]
    oauth_host: Option<String>,

    /// The base URL of the provider profile and permission APIs.
    /// Override in tests to point at a mock server.
    #[arg(long, env)]
    api_host: Option<String>,

    /// The OAuth2 client id issued to this application.
    #[arg(long, env)]
    auth_client_id: Option<String>,

    /// The OAuth2 client secret issued to this application.
    #[arg(long, env)]
    auth_client_secret: Option<String>,

    /// The API key used when calling the permission service. Only required
    /// when a registered service provider enables permission fetching.
    #[arg(long, env)]
    auth_api_key: Option<String>,

    /// The application name used to scope permission lookups.
    #[arg(long, env)]
    application_name: Option<String>,

    /// Where the browser is redirected when a callback cannot be completed.
    #[arg(long, env, default_value = DEFAULT_ERROR_REDIRECT)]
    error_redirect: String,

    /// The path prefix the auth routes are registered under.
    #[arg(long, env, default_value = DEFAULT_BASE_PATH)]
    base_path: String,

    /// Path to a JSON file describing the service providers to register at startup.
    #[arg(long, env)]
    service_providers_file: Option<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub session_expiry_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the OAuth2 authorization server base URL, if configured.
    pub fn oauth_host(&self) -> Option<String> {
        self.oauth_host.clone()
    }

    pub fn set_oauth_host(mut self, oauth_host: String) -> Self {
        self.oauth_host = Some(oauth_host);
        self
    }

    /// Returns the provider API base URL, if configured.
    pub fn api_host(&self) -> Option<String> {
        self.api_host.clone()
    }

    pub fn set_api_host(mut self, api_host: String) -> Self {
        self.api_host = Some(api_host);
        self
    }

    /// Returns the OAuth2 client id, if configured.
    pub fn auth_client_id(&self) -> Option<String> {
        self.auth_client_id.clone()
    }

    pub fn set_auth_client_id(mut self, client_id: String) -> Self {
        self.auth_client_id = Some(client_id);
        self
    }

    /// Returns the OAuth2 client secret, if configured.
    pub fn auth_client_secret(&self) -> Option<String> {
        self.auth_client_secret.clone()
    }

    pub fn set_auth_client_secret(mut self, client_secret: String) -> Self {
        self.auth_client_secret = Some(client_secret);
        self
    }

    /// Returns the permission service API key, if configured.
    pub fn auth_api_key(&self) -> Option<String> {
        self.auth_api_key.clone()
    }

    pub fn set_auth_api_key(mut self, api_key: String) -> Self {
        self.auth_api_key = Some(api_key);
        self
    }

    /// Returns the application name used for permission lookups, if configured.
    pub fn application_name(&self) -> Option<String> {
        self.application_name.clone()
    }

    pub fn set_application_name(mut self, application_name: String) -> Self {
        self.application_name = Some(application_name);
        self
    }

    /// Returns the redirect target used when a callback fails.
    pub fn error_redirect(&self) -> &str {
        &self.error_redirect
    }

    pub fn set_error_redirect(mut self, error_redirect: String) -> Self {
        self.error_redirect = error_redirect;
        self
    }

    /// Returns the path prefix the auth routes are registered under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn set_base_path(mut self, base_path: String) -> Self {
        self.base_path = base_path;
        self
    }

    /// Returns the path of the service provider definition file, if configured.
    pub fn service_providers_file(&self) -> Option<&str> {
        self.service_providers_file.as_deref()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        // This could check an environment variable, or a config field
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert_eq!(config.base_path(), DEFAULT_BASE_PATH);
        assert_eq!(config.error_redirect(), DEFAULT_ERROR_REDIRECT);
    }

    #[test]
    fn test_setters_override_values() {
        let config = Config::default()
            .set_oauth_host("https://oauth.example.test".to_string())
            .set_api_host("https://api.example.test".to_string())
            .set_error_redirect("/error".to_string());

        assert_eq!(
            config.oauth_host().as_deref(),
            Some("https://oauth.example.test")
        );
        assert_eq!(
            config.api_host().as_deref(),
            Some("https://api.example.test")
        );
        assert_eq!(config.error_redirect(), "/error");
    }

    #[test]
    fn test_rust_env_parsing() {
        assert_eq!("production".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("STAGING".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("bogus".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
