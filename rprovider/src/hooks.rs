//! Operational hook contracts for provider calls.
//!
//! ```rust
//! use rprovider::{NoopOperationHooks, ProviderOperationHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ProviderOperationHooks) {}
//!
//! assert_hooks_trait(&NoopOperationHooks);
//! ```

use std::future::Future;
use std::time::{Duration, Instant};

use crate::{ProviderError, ProviderId};

pub trait ProviderOperationHooks: Send + Sync {
    fn on_request_start(&self, _provider: ProviderId, _operation: &str) {}

    fn on_success(&self, _provider: ProviderId, _operation: &str, _elapsed: Duration) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Runs `operation` once, reporting its outcome to `hooks`. Failures are never retried.
pub async fn observe_operation<T, F>(
    hooks: &dyn ProviderOperationHooks,
    provider: ProviderId,
    operation_name: &str,
    operation: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    hooks.on_request_start(provider, operation_name);
    let started = Instant::now();

    match operation.await {
        Ok(value) => {
            hooks.on_success(provider, operation_name, started.elapsed());
            Ok(value)
        }
        Err(error) => {
            hooks.on_failure(provider, operation_name, &error, started.elapsed());
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl ProviderOperationHooks for RecordingHooks {
        fn on_request_start(&self, provider: ProviderId, operation: &str) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("start:{provider}:{operation}"));
        }

        fn on_success(&self, _provider: ProviderId, operation: &str, _elapsed: Duration) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("success:{operation}"));
        }

        fn on_failure(
            &self,
            _provider: ProviderId,
            operation: &str,
            error: &ProviderError,
            _elapsed: Duration,
        ) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("failure:{operation}:{:?}", error.kind));
        }
    }

    #[tokio::test]
    async fn observe_operation_reports_success() {
        let hooks = RecordingHooks::default();
        let value = observe_operation(&hooks, ProviderId::OpenAi, "chat", async { Ok(7) })
            .await
            .expect("operation should succeed");

        assert_eq!(value, 7);
        assert_eq!(
            *hooks.events.lock().expect("events lock"),
            vec!["start:openai:chat", "success:chat"]
        );
    }

    #[tokio::test]
    async fn observe_operation_reports_failure_once() {
        let hooks = RecordingHooks::default();
        let error = observe_operation::<(), _>(&hooks, ProviderId::Cohere, "chat", async {
            Err(ProviderError::rate_limited("slow down"))
        })
        .await
        .expect_err("operation should fail");

        assert_eq!(error.kind, crate::ProviderErrorKind::RateLimited);
        assert_eq!(
            *hooks.events.lock().expect("events lock"),
            vec!["start:cohere:chat", "failure:chat:RateLimited"]
        );
    }
}
