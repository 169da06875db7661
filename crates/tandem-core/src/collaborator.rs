//! Completion collaborator port.
//!
//! The collaborator is the external AI service that produces automated
//! session turns and sub-agent replies. `BoxCompletionCollaborator` follows
//! the blanket-impl pattern used for every RPITIT port in this crate:
//! 1. An object-safe `CompletionCollaboratorDyn` trait with boxed futures
//! 2. A blanket impl of it for every `T: CompletionCollaborator`
//! 3. `BoxCompletionCollaborator` wraps `Box<dyn CompletionCollaboratorDyn>`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tandem_types::collaborator::{Completion, CompletionRequest};
use tandem_types::error::CollaboratorError;

/// Produces a completion for a prompt plus opaque continuation state.
pub trait CompletionCollaborator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Completion, CollaboratorError>> + Send;
}

/// Object-safe version of [`CompletionCollaborator`].
pub trait CompletionCollaboratorDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, CollaboratorError>> + Send + 'a>>;
}

impl<T: CompletionCollaborator> CompletionCollaboratorDyn for T {
    fn name(&self) -> &str {
        CompletionCollaborator::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Completion, CollaboratorError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }
}

/// Type-erased collaborator, selected at startup from configuration.
pub struct BoxCompletionCollaborator {
    inner: Box<dyn CompletionCollaboratorDyn>,
}

impl BoxCompletionCollaborator {
    pub fn new<T: CompletionCollaborator + 'static>(collaborator: T) -> Self {
        Self {
            inner: Box::new(collaborator),
        }
    }
}

impl CompletionCollaborator for BoxCompletionCollaborator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        self.inner.complete_boxed(request).await
    }
}

impl<T: CompletionCollaborator> CompletionCollaborator for Arc<T> {
    fn name(&self) -> &str {
        T::name(self)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        T::complete(self, request).await
    }
}

/// Stand-in used when no collaborator endpoint is configured.
///
/// Every call fails with [`CollaboratorError::NotConfigured`], so automated
/// turns surface a `CollaboratorFailure` instead of silently doing nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredCollaborator;

impl CompletionCollaborator for UnconfiguredCollaborator {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        Err(CollaboratorError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl CompletionCollaborator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<Completion, CollaboratorError> {
            Ok(Completion {
                text: request.prompt.clone(),
                context: request.context.clone(),
            })
        }
    }

    #[tokio::test]
    async fn boxed_delegates() {
        let boxed = BoxCompletionCollaborator::new(Echo);
        assert_eq!(CompletionCollaborator::name(&boxed), "echo");

        let request = CompletionRequest::new("hola").with_context(Some("ctx-1".into()));
        let completion = boxed.complete(&request).await.unwrap();
        assert_eq!(completion.text, "hola");
        assert_eq!(completion.context.as_deref(), Some("ctx-1"));
    }

    #[tokio::test]
    async fn unconfigured_fails() {
        let err = UnconfiguredCollaborator
            .complete(&CompletionRequest::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err, CollaboratorError::NotConfigured);
    }
}
