//! Multipart file upload.
//!
//! Components don't talk to the network directly. They build an
//! [`UploadForm`] and hand it to an injected [`UploadClient`];
//! [`ReqwestUploadClient`] is the real implementation.
//!
//! # Example
//!
//! ```ignore
//! use keyed::upload::{ReqwestUploadClient, SelectedFile, UploadClient, UploadForm};
//!
//! let client = ReqwestUploadClient::new()?;
//! let file = SelectedFile::new("grades.csv", b"name,grade\nada,A\n".to_vec());
//! let response = client
//!     .post_form("http://localhost:18000/form-url", UploadForm::single_file("csv", file))
//!     .await?;
//! ```

use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type for uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request never produced a response, or its body couldn't be read.
    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("upload rejected with status {status}")]
    Status { status: u16 },
    /// A file couldn't be read from disk.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

// ============================================================================
// Files and forms
// ============================================================================

/// A file picked by the user.
///
/// Every constructed `SelectedFile` is a distinct selection: two selections
/// compare unequal even if they carry the same bytes, while clones of one
/// selection compare equal. Effects keyed on the selection therefore fire
/// once per pick.
#[derive(Clone)]
pub struct SelectedFile {
    inner: Arc<FileData>,
}

struct FileData {
    name: String,
    bytes: Vec<u8>,
    mime: Option<String>,
}

impl SelectedFile {
    /// Create a selection from in-memory contents.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = guess_mime(&name).map(str::to_owned);
        Self {
            inner: Arc::new(FileData { name, bytes, mime }),
        }
    }

    /// Create a selection with an explicit MIME type.
    pub fn with_mime(name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(FileData {
                name: name.into(),
                bytes,
                mime: Some(mime.into()),
            }),
        }
    }

    /// Read a selection from disk.
    pub async fn read(path: impl AsRef<Path>) -> UploadResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    pub fn mime(&self) -> Option<&str> {
        self.inner.mime.as_deref()
    }

    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }
}

impl PartialEq for SelectedFile {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.inner.name)
            .field("len", &self.inner.bytes.len())
            .field("mime", &self.inner.mime)
            .finish()
    }
}

fn guess_mime(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "csv" => Some("text/csv"),
        "txt" => Some("text/plain"),
        "json" => Some("application/json"),
        _ => None,
    }
}

/// An ordered set of file fields sent as `multipart/form-data`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadForm {
    fields: Vec<(String, SelectedFile)>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A form with exactly one file field.
    pub fn single_file(field: impl Into<String>, file: SelectedFile) -> Self {
        Self::new().file(field, file)
    }

    /// Append a file field.
    pub fn file(mut self, field: impl Into<String>, file: SelectedFile) -> Self {
        self.fields.push((field.into(), file));
        self
    }

    /// The first file stored under `field`.
    pub fn get(&self, field: &str) -> Option<&SelectedFile> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, file)| file)
    }

    pub fn fields(&self) -> &[(String, SelectedFile)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_multipart(self) -> UploadResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (field, file) in self.fields {
            let mut part = reqwest::multipart::Part::bytes(file.bytes().to_vec())
                .file_name(file.name().to_owned());
            if let Some(mime) = file.mime() {
                part = part.mime_str(mime)?;
            }
            form = form.part(field, part);
        }
        Ok(form)
    }
}

// ============================================================================
// Clients
// ============================================================================

/// A successful upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

/// Sends upload forms somewhere.
pub trait UploadClient: 'static {
    /// POST `form` to `url`. Resolves to an error for non-success statuses.
    fn post_form(
        &self,
        url: &str,
        form: UploadForm,
    ) -> BoxFuture<'static, UploadResult<UploadResponse>>;
}

/// Settings for [`ReqwestUploadClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("keyed/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// [`UploadClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestUploadClient {
    client: reqwest::Client,
}

impl ReqwestUploadClient {
    /// Create a client with [`ClientConfig::default`].
    pub fn new() -> UploadResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    pub fn with_config(config: &ClientConfig) -> UploadResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl UploadClient for ReqwestUploadClient {
    fn post_form(
        &self,
        url: &str,
        form: UploadForm,
    ) -> BoxFuture<'static, UploadResult<UploadResponse>> {
        let client = self.client.clone();
        let url = url.to_owned();
        async move {
            let multipart = form.into_multipart()?;
            let response = client.post(&url).multipart(multipart).send().await?;
            let status = response.status();
            if !status.is_success() {
                tracing::warn!(%url, status = status.as_u16(), "upload rejected");
                return Err(UploadError::Status {
                    status: status.as_u16(),
                });
            }
            let body = response.text().await?;
            Ok(UploadResponse {
                status: status.as_u16(),
                body,
            })
        }
        .boxed()
    }
}
