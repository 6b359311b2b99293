//! Core `ResponseService` trait and `HttpResponseService` implementation.
//!
//! `HttpResponseService` POSTs the transcript to the configured interpret
//! endpoint and normalises whatever JSON comes back.  All connection details
//! come from [`ServiceConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::service::reply::ServerReply;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors that can occur while interpreting a transcript.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("interpret request timed out")]
    Timeout,

    /// The server answered a non-success HTTP status.
    #[error("server answered HTTP {0}")]
    Status(u16),

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse server reply: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else {
            ServiceError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseService trait
// ---------------------------------------------------------------------------

/// Async trait for turning a transcript into an assistant reply.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (e.g. wrapped in `Arc<dyn ResponseService>`).
///
/// # Arguments
/// * `transcript` – The recognised (or typed) user command.
#[async_trait]
pub trait ResponseService: Send + Sync {
    async fn interpret(&self, transcript: &str) -> Result<ServerReply, ServiceError>;
}

// ---------------------------------------------------------------------------
// HttpResponseService
// ---------------------------------------------------------------------------

/// Calls the interpret endpoint over HTTP.
///
/// Sends `{"text": "<transcript>"}` and normalises the JSON reply through
/// [`ServerReply::from_wire`].
///
/// # No hardcoded URLs
/// The endpoint is built once from the [`ServiceConfig`] passed to
/// [`HttpResponseService::from_config`].
pub struct HttpResponseService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResponseService {
    /// Build an `HttpResponseService` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &ServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: config.endpoint(),
        }
    }
}

#[async_trait]
impl ResponseService for HttpResponseService {
    /// POST `transcript` to the interpret endpoint and normalise the reply.
    ///
    /// Any non-success HTTP status is a connection failure; the body is not
    /// consulted, even when the server wrapped its error in JSON.
    async fn interpret(&self, transcript: &str) -> Result<ServerReply, ServiceError> {
        let body = serde_json::json!({ "text": transcript });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        ServerReply::from_wire(&value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP exchange on a fresh local port: read the whole
    /// request, answer with `status_line` and a JSON `body`, close.  Returns
    /// the base URL to point a [`ServiceConfig`] at.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read until the headers and the declared body are in, so the
            // client is never cut off mid-send.
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request_complete(&request) {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len(),
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        format!("http://{addr}/")
    }

    /// True once `request` holds complete headers plus as many body bytes as
    /// its `Content-Length` header declares.
    fn request_complete(request: &[u8]) -> bool {
        let split = match request.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(pos) => pos,
            None => return false,
        };
        let head = String::from_utf8_lossy(&request[..split]);
        let declared = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() - (split + 4) >= declared
    }

    #[test]
    fn from_config_builds_without_panic() {
        let config = ServiceConfig::default();
        let _service = HttpResponseService::from_config(&config);
    }

    #[test]
    fn from_config_uses_configured_endpoint() {
        let mut config = ServiceConfig::default();
        config.base_url = "http://assistant.local:8080/".into();
        config.endpoint_path = "process_audio".into();

        let service = HttpResponseService::from_config(&config);
        assert_eq!(service.endpoint, "http://assistant.local:8080/process_audio");
    }

    /// Verify that `HttpResponseService` is object-safe (usable as
    /// `dyn ResponseService`).
    #[test]
    fn service_is_object_safe() {
        let config = ServiceConfig::default();
        let service: Box<dyn ResponseService> =
            Box::new(HttpResponseService::from_config(&config));
        drop(service);
    }

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(
            ServiceError::Timeout.to_string(),
            "interpret request timed out"
        );
        assert_eq!(
            ServiceError::Status(502).to_string(),
            "server answered HTTP 502"
        );
        assert!(ServiceError::Request("connexion refusée".into())
            .to_string()
            .contains("connexion refusée"));
    }

    #[tokio::test]
    async fn success_status_normalises_the_body() {
        let base_url = one_shot_server("HTTP/1.1 200 OK", r#"{"response": "Il est midi."}"#).await;

        let mut config = ServiceConfig::default();
        config.base_url = base_url;

        let service = HttpResponseService::from_config(&config);
        let reply = service.interpret("quelle heure est-il").await.unwrap();
        assert_eq!(reply.text, "Il est midi.");
        assert!(!reply.is_error());
    }

    /// The server wraps its errors in JSON bodies on 4xx/5xx too; those must
    /// surface as a connection failure, never as an application error.
    #[tokio::test]
    async fn non_success_status_is_a_connection_failure() {
        let base_url = one_shot_server(
            "HTTP/1.1 500 Internal Server Error",
            r#"{"error": "Internal Server Error", "message": "Une erreur interne est survenue"}"#,
        )
        .await;

        let mut config = ServiceConfig::default();
        config.base_url = base_url;

        let service = HttpResponseService::from_config(&config);
        let result = service.interpret("allume la lumière").await;
        assert!(matches!(result, Err(ServiceError::Status(500))));
    }
}
