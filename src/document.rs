//! Document handles and Content-Type resolution
//!
//! A document is either bytes already in memory or a reader, optionally tied
//! to the path it was opened from. The content type comes from the caller's
//! headers, then the path extension, and only as a last resort from sniffing
//! the content, which means reading a stream to the end.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Result, ValidationError};
use crate::output::Output;
use crate::request::{
    BodyStream, HeaderSet, JSON_CONTENT_TYPE, RequestBody, YAML_CONTENT_TYPE,
};

const CHUNK_SIZE: usize = 8 * 1024;

pub type DocumentReader = Box<dyn AsyncRead + Send + Unpin>;

/// Reader that can be handed out once, shared between tasks
#[derive(Default)]
pub struct InputStream(Mutex<Option<DocumentReader>>);

impl InputStream {
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self(Mutex::new(Some(Box::new(reader))))
    }

    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }

    /// The reader, unless someone already took it
    pub fn take(&self) -> Option<DocumentReader> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InputStream")
    }
}

/// An OpenAPI/Swagger document to submit
pub enum Document {
    Bytes(Bytes),
    Reader {
        path: Option<PathBuf>,
        reader: DocumentReader,
    },
}

impl Document {
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Document::Reader {
            path: None,
            reader: Box::new(reader),
        }
    }

    pub fn from_file_reader(
        path: impl Into<PathBuf>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Document::Reader {
            path: Some(path.into()),
            reader: Box::new(reader),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Document::Bytes(_) => None,
            Document::Reader { path, .. } => path.as_deref(),
        }
    }

    fn into_body(self) -> RequestBody {
        match self {
            Document::Bytes(bytes) => RequestBody::Bytes(bytes),
            Document::Reader { reader, .. } => RequestBody::Stream(reader_stream(reader)),
        }
    }
}

impl From<Bytes> for Document {
    fn from(bytes: Bytes) -> Self {
        Document::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Document::Bytes(bytes.into())
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Bytes(text.into())
    }
}

impl From<&'static str> for Document {
    fn from(text: &'static str) -> Self {
        Document::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Document::Reader { path, .. } => {
                f.debug_struct("Reader").field("path", path).finish_non_exhaustive()
            }
        }
    }
}

/// Request body plus the content type to declare, if one was decided here
#[derive(Debug)]
pub struct ResolvedDocument {
    pub body: RequestBody,
    pub content_type: Option<&'static str>,
}

/// Content type implied by a path extension, matched case-insensitively
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    if extension.eq_ignore_ascii_case("json") {
        Some(JSON_CONTENT_TYPE)
    } else if extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml") {
        Some(YAML_CONTENT_TYPE)
    } else {
        None
    }
}

/// JSON when the bytes parse as JSON, YAML otherwise
pub fn sniff_content_type(content: &[u8]) -> &'static str {
    match serde_json::from_slice::<serde::de::IgnoredAny>(content) {
        Ok(_) => JSON_CONTENT_TYPE,
        Err(_) => YAML_CONTENT_TYPE,
    }
}

/// Decide the content type for `document`, reading a stream only if sniffing
/// is unavoidable. A buffered stream is handed back as bytes.
pub async fn resolve_content_type(
    document: Document,
    headers: &HeaderSet,
    output: &Output,
) -> Result<ResolvedDocument> {
    if headers.contains("content-type") {
        return Ok(ResolvedDocument {
            body: document.into_body(),
            content_type: None,
        });
    }

    if let Some(content_type) = document.path().and_then(content_type_for_path) {
        return Ok(ResolvedDocument {
            body: document.into_body(),
            content_type: Some(content_type),
        });
    }

    let content = match document {
        Document::Bytes(bytes) => bytes,
        Document::Reader { path, mut reader } => {
            output.report_buffering(path.as_deref());
            let mut buffer = Vec::new();
            reader
                .read_to_end(&mut buffer)
                .await
                .map_err(ValidationError::BodyStream)?;
            Bytes::from(buffer)
        }
    };
    let content_type = sniff_content_type(&content);
    tracing::debug!(content_type, "sniffed document content type");

    Ok(ResolvedDocument {
        body: RequestBody::Bytes(content),
        content_type: Some(content_type),
    })
}

/// Stream a reader in chunks without collecting it
fn reader_stream(reader: DocumentReader) -> BodyStream {
    Box::pin(futures::stream::try_unfold(reader, |mut reader| async move {
        let mut chunk = BytesMut::with_capacity(CHUNK_SIZE);
        if reader.read_buf(&mut chunk).await? == 0 {
            return Ok(None);
        }
        Ok::<_, std::io::Error>(Some((chunk.freeze(), reader)))
    }))
}
