//! Verbosity-gated output routing
//!
//! Per-target results go to the primary stream, errors and status lines go to
//! the status stream. Every line is gated on the signed verbosity level.

use std::error::Error;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ValidationError;

/// Signed verbosity: positive is chattier, negative is quieter, zero is normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Verbosity(pub i32);

impl Verbosity {
    /// Per-target error lines
    pub fn shows_errors(self) -> bool {
        self.0 >= -1
    }

    /// Invalid-document messages and the all-valid confirmation
    pub fn shows_results(self) -> bool {
        self.0 >= 0
    }

    /// Error detail and buffering diagnostics
    pub fn shows_details(self) -> bool {
        self.0 >= 1
    }
}

impl From<i32> for Verbosity {
    fn from(level: i32) -> Self {
        Verbosity(level)
    }
}

/// Cloneable handle to a shared writer
#[derive(Clone)]
pub struct OutputStream(Arc<Mutex<Box<dyn Write + Send>>>);

impl OutputStream {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(writer))))
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    /// Write `text` in one call and flush
    pub fn write_str(&self, text: &str) -> std::io::Result<()> {
        let mut writer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutputStream")
    }
}

/// Formatter for per-target results and batch status
#[derive(Debug, Clone)]
pub struct Output {
    verbosity: Verbosity,
    stdout: OutputStream,
    stderr: OutputStream,
}

impl Output {
    pub fn new(verbosity: Verbosity, stdout: OutputStream, stderr: OutputStream) -> Self {
        Self {
            verbosity,
            stdout,
            stderr,
        }
    }

    /// `<target>: <error>` plus, when verbose, the error detail
    pub fn report_error(&self, target: &str, error: &ValidationError) {
        if !self.verbosity.shows_errors() {
            return;
        }
        write_or_warn(&self.stderr, &format!("{target}: {error}\n"));
        if self.verbosity.shows_details() {
            write_or_warn(&self.stderr, &format_error_detail(error));
        }
    }

    /// All messages of an invalid document, each prefixed with its target
    pub fn report_messages(&self, target: &str, messages: &[String]) {
        if !self.verbosity.shows_results() || messages.is_empty() {
            return;
        }
        let mut text = messages
            .iter()
            .map(|message| format!("{target}: {message}"))
            .collect::<Vec<_>>()
            .join("\n");
        text.push('\n');
        write_or_warn(&self.stdout, &text);
    }

    pub fn report_all_valid(&self) {
        if self.verbosity.shows_results() {
            write_or_warn(&self.stderr, "All OpenAPI/Swagger specs are valid.\n");
        }
    }

    /// Noted when a stream had to be read fully to guess its content type
    pub fn report_buffering(&self, path: Option<&Path>) {
        if !self.verbosity.shows_details() {
            return;
        }
        let line = match path {
            Some(path) => format!(
                "{}: reading whole document to determine its Content-Type\n",
                path.display()
            ),
            None => "Reading whole document to determine its Content-Type\n".to_string(),
        };
        write_or_warn(&self.stderr, &line);
    }
}

fn write_or_warn(stream: &OutputStream, text: &str) {
    if let Err(e) = stream.write_str(text) {
        tracing::warn!(error = %e, "failed to write validation output");
    }
}

/// Debug representation followed by the chain of causes
fn format_error_detail(error: &ValidationError) -> String {
    let mut output = format!("{error:?}\n");
    let mut current: &dyn Error = error;
    let mut level = 0;
    while let Some(source) = current.source() {
        level += 1;
        output.push_str(&format!("  caused by {level}: {source}\n"));
        current = source;
    }
    output
}
