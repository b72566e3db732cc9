//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree structure with
/// `domain::error::Error` as the root type holding an `error_kind` tree that
/// represents the kinds of errors that can occur while handling a callback.
/// The `source` field holds the original error that caused the domain error,
/// so failure detail stays available for server-side logs without ever being
/// exposed to the client. The `web` layer reduces the various `error_kind`s
/// to the response the callback contract prescribes (status code or redirect).
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Auth(AuthErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// The failure taxonomy of the callback pipeline. The first three are
/// detected synchronously from request and session data, the rest originate
/// from downstream I/O or from an auth-success hook signaling failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No `code` or no `state` in the callback query: nothing to resume.
    MissingParams,
    /// The state token's provider key matches no registered service provider.
    UnknownProvider,
    /// The state token does not match the attempt stored in the session.
    StateMismatch,
    TokenExchangeFailed,
    ProfileFetchFailed,
    PermissionFetchFailed,
    HookFailed,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Session,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl Error {
    /// Shorthand for a callback failure of the given kind with no underlying cause.
    pub fn auth(kind: AuthErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Auth(kind),
        }
    }

    /// A callback failure of the given kind caused by `source`.
    pub fn auth_with_source(
        kind: AuthErrorKind,
        source: Box<dyn StdError + Send + Sync>,
    ) -> Self {
        Error {
            source: Some(source),
            error_kind: DomainErrorKind::Auth(kind),
        }
    }

    /// A configuration error; surfaces as an internal failure, never to the client.
    pub fn config() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JSON serialization related error".to_string(),
            )),
        }
    }
}
