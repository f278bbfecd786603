#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::json;
use validate_openapi::{HeaderSet, InputStream, OutputStream, ValidationOptions, Verbosity};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const VALIDATOR_PATH: &str = "/validator/debug";

/// Message the mock validator reports for `invalid.yaml`
pub const INVALID_MESSAGE: &str = "attribute info is missing";

/// In-memory writer that can be inspected after a run
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .display()
        .to_string()
}

/// Options pointed at `url`, with captured output and the given stdin content
pub fn test_options(
    url: &str,
    verbosity: i32,
    stdin: &'static [u8],
) -> (ValidationOptions, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let options = ValidationOptions {
        url: Some(url.into()),
        headers: HeaderSet::new(),
        verbosity: Verbosity(verbosity),
        stdin: InputStream::new(std::io::Cursor::new(stdin)),
        stdout: OutputStream::new(out.clone()),
        stderr: OutputStream::new(err.clone()),
    };
    (options, out, err)
}

/// Validator that rejects bodies containing `x-marker: invalid` and accepts
/// everything else
pub async fn start_validator() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATOR_PATH))
        .and(body_string_contains("x-marker: invalid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [INVALID_MESSAGE],
            "schemaValidationMessages": [
                {"level": "error", "message": "object has missing required properties ([\"info\"])"}
            ]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(VALIDATOR_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    server
}

pub fn validator_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), VALIDATOR_PATH)
}
