//! HttpCompletionCollaborator -- [`CompletionCollaborator`] over JSON/HTTP.
//!
//! POSTs the [`CompletionRequest`] as JSON to the configured endpoint and
//! expects a [`Completion`] (`{"text": .., "context": ..}`) back. The bearer
//! token is held in a [`SecretString`] and only exposed when building the
//! request header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tandem_core::collaborator::CompletionCollaborator;
use tandem_types::collaborator::{Completion, CompletionRequest};
use tandem_types::config::CollaboratorConfig;
use tandem_types::error::CollaboratorError;
use tracing::debug;

pub struct HttpCompletionCollaborator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpCompletionCollaborator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build from `[collaborator]` configuration.
    ///
    /// Returns `Ok(None)` when no endpoint is configured. The API key is read
    /// from the environment variable named by `api_key_env`, if set.
    pub fn from_config(config: &CollaboratorConfig) -> Result<Option<Self>, CollaboratorError> {
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .map(SecretString::from);
        Self::new(endpoint, api_key, config.timeout()).map(Some)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionCollaborator for HttpCompletionCollaborator {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CollaboratorError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CollaboratorError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Request(format!("HTTP {status}: {error_body}")));
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(format!("failed to parse response: {e}")))?;
        debug!(endpoint = %self.endpoint, chars = completion.text.len(), "completion received");
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/complete")
    }

    async fn echo(headers: HeaderMap, Json(req): Json<CompletionRequest>) -> Json<Completion> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        Json(Completion {
            text: format!("{} [{auth}]", req.prompt),
            context: req.context.map(|c| format!("{c}+1")),
        })
    }

    #[tokio::test]
    async fn test_complete_round_trip_with_bearer() {
        let url = spawn(Router::new().route("/complete", post(echo))).await;
        let collaborator = HttpCompletionCollaborator::new(
            url,
            Some(SecretString::from("s3cret".to_string())),
            Duration::from_secs(5),
        )
        .unwrap();

        let completion = collaborator
            .complete(&CompletionRequest::new("hola").with_context(Some("ctx".into())))
            .await
            .unwrap();
        assert_eq!(completion.text, "hola [Bearer s3cret]");
        assert_eq!(completion.context.as_deref(), Some("ctx+1"));
    }

    #[tokio::test]
    async fn test_http_error_maps_to_request_error() {
        let url = spawn(Router::new().route(
            "/complete",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        ))
        .await;
        let collaborator = HttpCompletionCollaborator::new(url, None, Duration::from_secs(5)).unwrap();

        let err = collaborator
            .complete(&CompletionRequest::new("hola"))
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Request(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let url = spawn(Router::new().route("/complete", post(|| async { "not json" }))).await;
        let collaborator = HttpCompletionCollaborator::new(url, None, Duration::from_secs(5)).unwrap();

        let err = collaborator
            .complete(&CompletionRequest::new("hola"))
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }

    #[test]
    fn test_from_config_without_endpoint() {
        let config = CollaboratorConfig::default();
        assert!(HttpCompletionCollaborator::from_config(&config).unwrap().is_none());

        let config = CollaboratorConfig {
            endpoint: Some("http://localhost:8088/v1/complete".into()),
            ..CollaboratorConfig::default()
        };
        let collaborator = HttpCompletionCollaborator::from_config(&config).unwrap().unwrap();
        assert_eq!(collaborator.endpoint(), "http://localhost:8088/v1/complete");
    }
}
