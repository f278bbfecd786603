//! # validate-openapi Library
//!
//! Submits OpenAPI/Swagger documents to a remote validator service and turns
//! its answers into diagnostics and a process exit code. Many documents are
//! validated concurrently; the schema checks themselves happen remotely.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod http_client;
pub mod output;
pub mod request;
pub mod validator;

pub use cli::{ARGUMENT_ERROR_EXIT, Cli};
pub use config::{Config, ConfigError, ConfigManager, FileConfig};
pub use document::{Document, InputStream, ResolvedDocument, resolve_content_type};
pub use error::{ResponseBody, ResponseDetails, ValidationError};
pub use http_client::{
    HttpClientConfig, ReqwestTransport, Transport, TransportResponse, ValidationClient,
    ValidationResult,
};
pub use output::{Output, OutputStream, Verbosity};
pub use request::{
    DEFAULT_VALIDATOR_URL, HeaderSet, RequestBody, TargetUrl, ValidationRequest,
    ValidationRequestBuilder,
};
pub use validator::{
    BatchOutcome, BatchValidator, OutcomeClass, TargetStatus, ValidationOptions,
    ValidationTarget, validate_document, validate_file,
};
