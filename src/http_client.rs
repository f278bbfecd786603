use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Body, Client, StatusCode};
use serde_json::Value;

use crate::error::{ResponseBody, ResponseDetails, Result, ValidationError};
use crate::request::{RequestBody, ValidationRequest};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Overall request timeout; `None` leaves requests unbounded
    pub timeout: Option<Duration>,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            pool_idle_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
        }
    }
}

/// What came back from the validator, before any interpretation
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub trailers: HeaderMap,
}

/// Sends one request and collects the response
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ValidationRequest) -> Result<TransportResponse>;
}

/// Production transport on top of reqwest
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ValidationError::from)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ValidationRequest) -> Result<TransportResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers.iter() {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    ValidationError::InvalidHeader {
                        name: name.to_string(),
                        reason: e.to_string(),
                    }
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ValidationError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        // The first body read failure, if any, is the one reported.
        let body_error: Arc<OnceLock<std::io::Error>> = Arc::new(OnceLock::new());
        let body = match request.body {
            RequestBody::Bytes(bytes) => Body::from(bytes),
            RequestBody::Stream(stream) => {
                let latch = Arc::clone(&body_error);
                Body::wrap_stream(stream.map(move |chunk| {
                    chunk.map_err(|e| {
                        let copy = std::io::Error::new(e.kind(), e.to_string());
                        let _ = latch.set(e);
                        copy
                    })
                }))
            }
        };

        let sent = self
            .client
            .request(request.method, request.url)
            .headers(headers)
            .body(body)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => return Err(latched_or(&body_error, e)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| latched_or(&body_error, e))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
            trailers: HeaderMap::new(),
        })
    }
}

fn latched_or(latch: &Arc<OnceLock<std::io::Error>>, error: reqwest::Error) -> ValidationError {
    match latch.get() {
        Some(body_error) => ValidationError::BodyStream(std::io::Error::new(
            body_error.kind(),
            body_error.to_string(),
        )),
        None => ValidationError::Http(error),
    }
}

/// Parsed JSON returned by the validator for a 2xx response
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult(pub Value);

impl ValidationResult {
    /// `messages` followed by `schemaValidationMessages` as `<level>: <message>`
    pub fn messages(&self) -> Vec<String> {
        let plain = self
            .0
            .get("messages")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(display_value);

        let schema = self
            .0
            .get("schemaValidationMessages")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|entry| {
                let level = entry.get("level").map(display_value).unwrap_or_default();
                let message = entry.get("message").map(display_value).unwrap_or_default();
                format!("{level}: {message}")
            });

        plain.chain(schema).collect()
    }

    /// No diagnostic messages at all
    pub fn is_valid(&self) -> bool {
        self.messages().is_empty()
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Executes validation requests and classifies the responses
#[derive(Clone)]
pub struct ValidationClient {
    transport: Arc<dyn Transport>,
}

impl ValidationClient {
    /// Client on the default reqwest transport
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(config)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send exactly one request; no retries
    pub async fn execute(&self, request: ValidationRequest) -> Result<ValidationResult> {
        let scheme = request.url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ValidationError::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        }

        tracing::debug!(url = %request.url, "sending validation request");
        let response = self.transport.send(request).await?;
        tracing::debug!(status = %response.status, "validator responded");

        classify(response)
    }
}

fn classify(response: TransportResponse) -> Result<ValidationResult> {
    let details = |body: ResponseBody| ResponseDetails {
        status: response.status,
        status_message: response.status.canonical_reason().map(str::to_string),
        headers: response.headers.clone(),
        body,
        trailers: response.trailers.clone(),
    };

    if response.status.as_u16() >= 300 {
        let body = ResponseBody::from_bytes(response.body.clone());
        return Err(ValidationError::HttpStatus(Box::new(details(body))));
    }

    match serde_json::from_slice(&response.body) {
        Ok(value) => Ok(ValidationResult(value)),
        Err(source) => Err(ValidationError::InvalidJson {
            source,
            response: Box::new(details(ResponseBody::Raw(response.body.clone()))),
        }),
    }
}
