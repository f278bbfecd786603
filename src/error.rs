use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use thiserror::Error;

/// Main library error type covering every way a single validation can fail
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("cannot read file: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("standard input is not available")]
    StdinUnavailable,

    #[error("invalid validator URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported protocol \"{scheme}:\"")]
    UnsupportedScheme { scheme: String },

    #[error("invalid request header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("error reading request body: {0}")]
    BodyStream(#[source] std::io::Error),

    #[error("{}", .0.status_line())]
    HttpStatus(Box<ResponseDetails>),

    #[error("unable to parse response body as JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        response: Box<ResponseDetails>,
    },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl ValidationError {
    /// The HTTP response behind this error, when the server answered at all
    pub fn response(&self) -> Option<&ResponseDetails> {
        match self {
            ValidationError::HttpStatus(response) => Some(response),
            ValidationError::InvalidJson { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status code of the response behind this error
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|response| response.status)
    }
}

/// Body of a validator response attached to an error
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Raw(Bytes),
}

impl ResponseBody {
    /// Parse as JSON when possible, otherwise keep the raw bytes
    pub fn from_bytes(body: Bytes) -> Self {
        match serde_json::from_slice(&body) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw(body),
        }
    }
}

/// Everything the validator sent back for a failed exchange
#[derive(Debug, Clone)]
pub struct ResponseDetails {
    pub status: StatusCode,
    pub status_message: Option<String>,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    pub trailers: HeaderMap,
}

impl ResponseDetails {
    /// `HTTP <status>[: <statusMessage>][: <Location>]`
    pub fn status_line(&self) -> String {
        let mut line = format!("HTTP {}", self.status.as_u16());
        if let Some(message) = self.status_message.as_deref().filter(|m| !m.is_empty()) {
            line.push_str(": ");
            line.push_str(message);
        }
        if let Some(location) = self.headers.get(LOCATION) {
            line.push_str(": ");
            line.push_str(&String::from_utf8_lossy(location.as_bytes()));
        }
        line
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;
