//! Outbound request description
//!
//! Merges the built-in default headers, the caller's headers and the
//! per-document content type into one POST aimed at the validator service.
//! Nothing in this module touches the network.

use std::fmt;
use std::pin::Pin;
use std::sync::LazyLock;

use bytes::Bytes;
use futures::Stream;
use reqwest::{Method, Url};

use crate::error::{Result, ValidationError};

/// Validator used when the caller does not name one
pub const DEFAULT_VALIDATOR_URL: &str = "https://validator.swagger.io/validator/debug";

/// Content type declared for JSON documents
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type declared for YAML documents
pub const YAML_CONTENT_TYPE: &str = "application/yaml";

/// Ordered header list with case-insensitive names.
///
/// Inserting a name that is already present (ignoring case) replaces both the
/// stored capitalization and the value, so the last layer applied wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Apply every header of `other` on top of this set
    pub fn merge(&mut self, other: &HeaderSet) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HeaderSet::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

static DEFAULT_HEADERS: LazyLock<HeaderSet> = LazyLock::new(|| {
    [
        ("Accept", JSON_CONTENT_TYPE.to_string()),
        ("User-Agent", user_agent()),
    ]
    .into_iter()
    .collect()
});

/// Headers sent with every request unless the caller overrides them
pub fn default_headers() -> &'static HeaderSet {
    &DEFAULT_HEADERS
}

fn user_agent() -> String {
    format!(
        "{}/{} rust ({}; {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Validator endpoint, either already parsed or as the caller typed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUrl {
    Parsed(Url),
    Literal(String),
}

impl TargetUrl {
    pub fn resolve(&self) -> Result<Url> {
        match self {
            TargetUrl::Parsed(url) => Ok(url.clone()),
            TargetUrl::Literal(text) => {
                Url::parse(text).map_err(|e| ValidationError::InvalidUrl {
                    url: text.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl From<Url> for TargetUrl {
    fn from(url: Url) -> Self {
        TargetUrl::Parsed(url)
    }
}

impl From<String> for TargetUrl {
    fn from(text: String) -> Self {
        TargetUrl::Literal(text)
    }
}

impl From<&str> for TargetUrl {
    fn from(text: &str) -> Self {
        TargetUrl::Literal(text.to_string())
    }
}

/// Chunked request body read from a document stream
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

pub enum RequestBody {
    Bytes(Bytes),
    Stream(BodyStream),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Fully specified outbound request
#[derive(Debug)]
pub struct ValidationRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderSet,
    pub body: RequestBody,
}

impl ValidationRequest {
    pub fn builder(body: RequestBody) -> ValidationRequestBuilder {
        ValidationRequestBuilder::new(body)
    }
}

pub struct ValidationRequestBuilder {
    url: Option<TargetUrl>,
    headers: HeaderSet,
    content_type: Option<String>,
    body: RequestBody,
}

impl ValidationRequestBuilder {
    pub fn new(body: RequestBody) -> Self {
        Self {
            url: None,
            headers: HeaderSet::new(),
            content_type: None,
            body,
        }
    }

    pub fn url(mut self, url: Option<TargetUrl>) -> Self {
        self.url = url;
        self
    }

    /// Caller-level headers, applied over the defaults
    pub fn headers(mut self, headers: &HeaderSet) -> Self {
        self.headers.merge(headers);
        self
    }

    /// Per-document content type, the most specific layer
    pub fn content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_string);
        self
    }

    pub fn build(self) -> Result<ValidationRequest> {
        let url = match &self.url {
            Some(url) => url.resolve()?,
            None => TargetUrl::from(DEFAULT_VALIDATOR_URL).resolve()?,
        };

        let mut headers = default_headers().clone();
        headers.merge(&self.headers);
        if let Some(content_type) = self.content_type {
            headers.insert("Content-Type", content_type);
        }

        Ok(ValidationRequest {
            method: Method::POST,
            url,
            headers,
            body: self.body,
        })
    }
}
