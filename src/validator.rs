//! Validation entry points and the concurrent batch validator
//!
//! - **Single documents**: [`validate_document`] and [`validate_file`] resolve a
//!   content type, build one request and hand it to the [`ValidationClient`]
//! - **Batches**: [`BatchValidator`] deduplicates targets, spawns one tokio task
//!   per target, routes each completion to the output streams as it arrives
//!   and reduces everything to a single exit code
//!
//! Completions are consumed one at a time by the task running the batch, so
//! the aggregate counters need no locking.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::document::{Document, InputStream, resolve_content_type};
use crate::error::{Result, ValidationError};
use crate::http_client::{ValidationClient, ValidationResult};
use crate::output::{Output, OutputStream, Verbosity};
use crate::request::{HeaderSet, TargetUrl, ValidationRequest};

/// Literal argument that stands for standard input
pub const STDIN_TARGET: &str = "-";

/// Everything a validation run needs besides the documents themselves
pub struct ValidationOptions {
    /// Validator endpoint; the public validator when `None`
    pub url: Option<TargetUrl>,
    /// Extra request headers, overriding the defaults case-insensitively
    pub headers: HeaderSet,
    pub verbosity: Verbosity,
    /// Consumed by the first standard-input target
    pub stdin: InputStream,
    pub stdout: OutputStream,
    pub stderr: OutputStream,
}

impl ValidationOptions {
    pub fn output(&self) -> Output {
        Output::new(self.verbosity, self.stdout.clone(), self.stderr.clone())
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            url: None,
            headers: HeaderSet::new(),
            verbosity: Verbosity::default(),
            stdin: InputStream::stdin(),
            stdout: OutputStream::stdout(),
            stderr: OutputStream::stderr(),
        }
    }
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

/// Validate one document from bytes, a string or a reader
pub async fn validate_document(
    client: &ValidationClient,
    document: impl Into<Document>,
    options: &ValidationOptions,
) -> Result<ValidationResult> {
    let output = options.output();
    let resolved = resolve_content_type(document.into(), &options.headers, &output).await?;
    let request = ValidationRequest::builder(resolved.body)
        .url(options.url.clone())
        .headers(&options.headers)
        .content_type(resolved.content_type)
        .build()?;
    client.execute(request).await
}

/// Validate the file at `path`, streaming it when its extension names a type
pub async fn validate_file(
    client: &ValidationClient,
    path: impl AsRef<Path>,
    options: &ValidationOptions,
) -> Result<ValidationResult> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| ValidationError::FileOpen {
            path: path.display().to_string(),
            source,
        })?;
    validate_document(client, Document::from_file_reader(path, file), options).await
}

/// One thing to validate: a file path as given, or standard input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationTarget {
    Path(String),
    Stdin,
}

impl ValidationTarget {
    /// `-` is standard input, anything else is a literal path
    pub fn parse(argument: &str) -> Self {
        if argument == STDIN_TARGET {
            ValidationTarget::Stdin
        } else {
            ValidationTarget::Path(argument.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ValidationTarget::Path(path) => path,
            ValidationTarget::Stdin => STDIN_TARGET,
        }
    }
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal state of one target
#[derive(Debug)]
pub enum TargetStatus {
    Succeeded(ValidationResult),
    Failed(ValidationError),
}

/// Exit code classes, most severe last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutcomeClass {
    Success,
    Invalid,
    Errored,
}

impl OutcomeClass {
    pub fn exit_code(self) -> u8 {
        match self {
            OutcomeClass::Success => 0,
            OutcomeClass::Invalid => 1,
            OutcomeClass::Errored => 2,
        }
    }
}

/// Running aggregate over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub processed: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errored: usize,
}

impl BatchOutcome {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn had_error(&self) -> bool {
        self.errored > 0
    }

    pub fn had_invalid(&self) -> bool {
        self.invalid > 0
    }

    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }

    /// Errors dominate invalid results
    pub fn class(&self) -> OutcomeClass {
        if self.had_error() {
            OutcomeClass::Errored
        } else if self.had_invalid() {
            OutcomeClass::Invalid
        } else {
            OutcomeClass::Success
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.class().exit_code()
    }
}

/// Keep the first occurrence of each literal target
pub fn dedup_targets(targets: &[ValidationTarget]) -> Vec<ValidationTarget> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|target| seen.insert(target.label().to_string()))
        .cloned()
        .collect()
}

/// Runs many validations concurrently and computes the batch exit code
pub struct BatchValidator {
    client: ValidationClient,
    options: Arc<ValidationOptions>,
}

impl BatchValidator {
    pub fn new(client: ValidationClient, options: ValidationOptions) -> Self {
        Self {
            client,
            options: Arc::new(options),
        }
    }

    /// Validate every distinct target once, all at the same time.
    ///
    /// Per-target output follows completion order. The all-valid line is
    /// written only after the last completion.
    pub async fn run(&self, targets: &[ValidationTarget]) -> BatchOutcome {
        let targets = dedup_targets(targets);
        let output = self.options.output();
        let mut outcome = BatchOutcome::new(targets.len());
        tracing::debug!(targets = targets.len(), "dispatching validations");

        let mut pending: FuturesUnordered<_> = targets
            .into_iter()
            .map(|target| {
                let client = self.client.clone();
                let options = Arc::clone(&self.options);
                let handle = tokio::spawn({
                    let target = target.clone();
                    async move { validate_target(&client, &target, &options).await }
                });
                async move {
                    let status = match handle.await {
                        Ok(Ok(result)) => TargetStatus::Succeeded(result),
                        Ok(Err(error)) => TargetStatus::Failed(error),
                        Err(e) => TargetStatus::Failed(ValidationError::Concurrency {
                            details: format!("Task join error: {e}"),
                        }),
                    };
                    (target, status)
                }
            })
            .collect();

        while let Some((target, status)) = pending.next().await {
            record(&mut outcome, &output, &target, status);
        }

        if outcome.class() == OutcomeClass::Success {
            output.report_all_valid();
        }
        outcome
    }
}

async fn validate_target(
    client: &ValidationClient,
    target: &ValidationTarget,
    options: &ValidationOptions,
) -> Result<ValidationResult> {
    match target {
        ValidationTarget::Path(path) => validate_file(client, path, options).await,
        ValidationTarget::Stdin => {
            let reader = options
                .stdin
                .take()
                .ok_or(ValidationError::StdinUnavailable)?;
            validate_document(client, Document::Reader { path: None, reader }, options).await
        }
    }
}

fn record(
    outcome: &mut BatchOutcome,
    output: &Output,
    target: &ValidationTarget,
    status: TargetStatus,
) {
    outcome.processed += 1;
    match status {
        TargetStatus::Failed(error) => {
            outcome.errored += 1;
            output.report_error(target.label(), &error);
        }
        TargetStatus::Succeeded(result) => {
            let messages = result.messages();
            if messages.is_empty() {
                outcome.valid += 1;
            } else {
                outcome.invalid += 1;
                output.report_messages(target.label(), &messages);
            }
        }
    }
    tracing::debug!(
        file = target.label(),
        processed = outcome.processed,
        total = outcome.total,
        "validation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{Transport, TransportResponse};
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Answers every request with the same JSON body and counts requests
    struct FixedTransport {
        status: u16,
        body: &'static str,
        sent: AtomicUsize,
        content_types: Mutex<Vec<Option<String>>>,
    }

    impl FixedTransport {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                sent: AtomicUsize::new(0),
                content_types: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, request: ValidationRequest) -> Result<TransportResponse> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            self.content_types
                .lock()
                .unwrap()
                .push(request.headers.get("content-type").map(str::to_string));
            Ok(TransportResponse {
                status: StatusCode::from_u16(self.status).unwrap(),
                headers: HeaderMap::new(),
                body: Bytes::from_static(self.body.as_bytes()),
                trailers: HeaderMap::new(),
            })
        }
    }

    fn options(level: i32) -> (ValidationOptions, Buffer, Buffer) {
        let out = Buffer::default();
        let err = Buffer::default();
        let options = ValidationOptions {
            url: Some("http://validator.test/validate".into()),
            headers: HeaderSet::new(),
            verbosity: Verbosity(level),
            stdin: InputStream::new(Cursor::new(b"swagger: '2.0'\n".to_vec())),
            stdout: OutputStream::new(out.clone()),
            stderr: OutputStream::new(err.clone()),
        };
        (options, out, err)
    }

    fn spec_file(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_dedup_targets_literal_only() {
        let targets = [
            ValidationTarget::parse("a.yaml"),
            ValidationTarget::parse("-"),
            ValidationTarget::parse("./a.yaml"),
            ValidationTarget::parse("a.yaml"),
            ValidationTarget::parse("-"),
        ];
        assert_eq!(
            dedup_targets(&targets),
            vec![
                ValidationTarget::Path("a.yaml".to_string()),
                ValidationTarget::Stdin,
                ValidationTarget::Path("./a.yaml".to_string()),
            ]
        );
    }

    #[test]
    fn test_outcome_exit_codes() {
        let mut outcome = BatchOutcome::new(3);
        assert_eq!(outcome.exit_code(), 0);
        outcome.invalid = 1;
        assert_eq!(outcome.exit_code(), 1);
        outcome.errored = 1;
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(outcome.class(), OutcomeClass::Errored);
    }

    #[tokio::test]
    async fn test_all_valid_batch() {
        let transport = FixedTransport::new(200, "{}");
        let client = ValidationClient::with_transport(transport.clone());
        let dir = tempfile::TempDir::new().unwrap();
        let a = spec_file(&dir, "a.json", "{}");
        let b = spec_file(&dir, "b.yaml", "swagger: '2.0'\n");
        let (options, out, err) = options(0);

        let batch = BatchValidator::new(client, options);
        let outcome = batch
            .run(&[
                ValidationTarget::parse(&a),
                ValidationTarget::parse(&b),
                ValidationTarget::parse(&a),
            ])
            .await;

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.processed, 2);
        assert!(outcome.is_complete());
        assert_eq!(transport.sent.load(Ordering::SeqCst), 2);
        assert!(out.contents().is_empty());
        assert_eq!(err.contents(), "All OpenAPI/Swagger specs are valid.\n");
    }

    #[tokio::test]
    async fn test_all_valid_quiet_has_no_confirmation() {
        let client = ValidationClient::with_transport(FixedTransport::new(200, "{}"));
        let (options, _out, err) = options(-1);

        let batch = BatchValidator::new(client, options);
        let outcome = batch.run(&[ValidationTarget::Stdin]).await;

        assert_eq!(outcome.exit_code(), 0);
        assert!(err.contents().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_stdin_is_read_once() {
        let transport = FixedTransport::new(200, "{}");
        let client = ValidationClient::with_transport(transport.clone());
        let (options, _out, _err) = options(0);

        let batch = BatchValidator::new(client, options);
        let outcome = batch
            .run(&[ValidationTarget::Stdin, ValidationTarget::Stdin])
            .await;

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(transport.sent.load(Ordering::SeqCst), 1);
        assert_eq!(
            *transport.content_types.lock().unwrap(),
            vec![Some("application/yaml".to_string())]
        );
    }

    #[tokio::test]
    async fn test_invalid_messages_go_to_stdout() {
        let client = ValidationClient::with_transport(FixedTransport::new(
            200,
            r#"{"messages": ["attribute info is missing"]}"#,
        ));
        let dir = tempfile::TempDir::new().unwrap();
        let spec = spec_file(&dir, "bad.yaml", "swagger: '2.0'\n");
        let (options, out, err) = options(0);

        let batch = BatchValidator::new(client, options);
        let outcome = batch.run(&[ValidationTarget::parse(&spec)]).await;

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(out.contents(), format!("{spec}: attribute info is missing\n"));
        assert!(err.contents().is_empty());
    }

    #[tokio::test]
    async fn test_error_dominates_invalid() {
        let client = ValidationClient::with_transport(FixedTransport::new(
            200,
            r#"{"messages": ["attribute info is missing"]}"#,
        ));
        let dir = tempfile::TempDir::new().unwrap();
        let spec = spec_file(&dir, "bad.yaml", "swagger: '2.0'\n");
        let missing = dir.path().join("missing.yaml").display().to_string();
        let (options, out, err) = options(0);

        let batch = BatchValidator::new(client, options);
        let outcome = batch
            .run(&[ValidationTarget::parse(&spec), ValidationTarget::parse(&missing)])
            .await;

        assert_eq!(outcome.exit_code(), 2);
        assert!(outcome.had_invalid());
        assert!(outcome.had_error());
        assert!(out.contents().contains("attribute info is missing"));
        assert!(err.contents().starts_with(&format!("{missing}: cannot read file")));
        assert!(!err.contents().contains("All OpenAPI/Swagger specs are valid."));
    }

    #[tokio::test]
    async fn test_stdin_unavailable() {
        let client = ValidationClient::with_transport(FixedTransport::new(200, "{}"));
        let (mut options, _out, err) = options(0);
        options.stdin = InputStream::default();

        let batch = BatchValidator::new(client, options);
        let outcome = batch.run(&[ValidationTarget::Stdin]).await;

        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(err.contents(), "-: standard input is not available\n");
    }

    #[tokio::test]
    async fn test_validate_document_declares_sniffed_type() {
        let transport = FixedTransport::new(200, "{}");
        let client = ValidationClient::with_transport(transport.clone());
        let (options, _out, _err) = options(0);

        let result = validate_document(&client, r#"{"swagger": "2.0"}"#, &options)
            .await
            .unwrap();

        assert!(result.is_valid());
        assert_eq!(
            *transport.content_types.lock().unwrap(),
            vec![Some("application/json".to_string())]
        );
    }

    #[tokio::test]
    async fn test_validate_file_missing() {
        let client = ValidationClient::with_transport(FixedTransport::new(200, "{}"));
        let (options, _out, _err) = options(0);

        let error = validate_file(&client, "/nonexistent/spec.yaml", &options)
            .await
            .unwrap_err();
        match error {
            ValidationError::FileOpen { path, source } => {
                assert_eq!(path, "/nonexistent/spec.yaml");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected FileOpen, got {other:?}"),
        }
    }
}
