//! Post-authentication hook pipeline.
//!
//! Providers may configure an ordered list of hooks that run after the
//! session has been populated with `user`, `token` and
//! `currentServiceProvider`. Hooks run strictly in configuration order: hook
//! `i + 1` never starts before hook `i` has completed and its session
//! mutations have been committed. The first failing hook aborts the chain;
//! mutations made by earlier hooks are not rolled back.

use async_trait::async_trait;
use log::*;

use crate::error::{AuthErrorKind, Error};
use crate::provider::ServiceProvider;
use crate::session::Session;

/// A provider-configured extension invoked after successful authentication,
/// before the user is redirected back to their original destination.
///
/// Returning `Ok(())` continues the chain. Returning any error aborts it;
/// the error value itself is only recorded as the cause of a
/// [`AuthErrorKind::HookFailed`] failure, its kind is never inspected.
#[async_trait]
pub trait AuthSuccessHook: Send + Sync {
    async fn call(&self, session: &dyn Session) -> Result<(), Error>;
}

/// Drives the provider's auth-success chain. A no-op when no hooks are
/// configured.
pub(crate) async fn run_auth_success_hooks(
    provider_key: &str,
    provider: &ServiceProvider,
    session: &dyn Session,
) -> Result<(), Error> {
    for (index, hook) in provider.auth_success_hooks.iter().enumerate() {
        if let Err(e) = hook.call(session).await {
            warn!("Auth success hook {index} for provider {provider_key} failed: {e:?}");
            return Err(Error::auth_with_source(
                AuthErrorKind::HookFailed,
                Box::new(e),
            ));
        }
        // Commit this hook's mutations before the next hook starts.
        session.save().await?;
        trace!("Auth success hook {index} for provider {provider_key} completed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use crate::session::MemorySession;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct RecordingHook {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl AuthSuccessHook for RecordingHook {
        async fn call(&self, session: &dyn Session) -> Result<(), Error> {
            session.insert(self.name, json!(true)).await?;
            self.order.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    struct FailingHook;

    #[async_trait]
    impl AuthSuccessHook for FailingHook {
        async fn call(&self, _session: &dyn Session) -> Result<(), Error> {
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(
                    crate::error::InternalErrorKind::Other("hook rejected".to_string()),
                ),
            })
        }
    }

    fn provider_with_hooks(hooks: Vec<Arc<dyn AuthSuccessHook>>) -> ServiceProvider {
        ServiceProvider {
            auth_success_hooks: hooks,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_configuration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let provider = provider_with_hooks(vec![
            Arc::new(RecordingHook {
                name: "first",
                order: Arc::clone(&order),
            }),
            Arc::new(RecordingHook {
                name: "second",
                order: Arc::clone(&order),
            }),
        ]);
        let session = MemorySession::new();

        run_auth_success_hooks("aprofiel", &provider, &session)
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(session.get("first").await, Some(json!(true)));
        assert_eq!(session.get("second").await, Some(json!(true)));
        // One commit per completed hook.
        assert_eq!(session.save_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_hook_aborts_chain_without_rollback() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let provider = provider_with_hooks(vec![
            Arc::new(RecordingHook {
                name: "first",
                order: Arc::clone(&order),
            }),
            Arc::new(FailingHook),
            Arc::new(RecordingHook {
                name: "never",
                order: Arc::clone(&order),
            }),
        ]);
        let session = MemorySession::new();

        let err = run_auth_success_hooks("aprofiel", &provider, &session)
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Auth(AuthErrorKind::HookFailed)
        );
        // The first hook's mutation survives, the third hook never ran.
        assert_eq!(session.get("first").await, Some(json!(true)));
        assert_eq!(session.get("never").await, None);
        assert_eq!(*order.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_no_hooks_is_a_no_op() {
        let provider = provider_with_hooks(vec![]);
        let session = MemorySession::new();

        run_auth_success_hooks("aprofiel", &provider, &session)
            .await
            .unwrap();
        assert_eq!(session.save_count(), 0);
    }
}
