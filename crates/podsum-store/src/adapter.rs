//! The blob store adapter trait (§4.A).
//!
//! Abstracts a flat key→bytes store. This is the only persistence
//! primitive the engine talks to; nothing else in the crate does I/O
//! directly.

use std::pin::Pin;

use async_trait::async_trait;
use podsum_core::Result;
use tokio::io::AsyncRead;

/// A boxed, owned async byte reader, used for streaming `get`/`put`.
pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send>>;

/// Which shape of `get` result the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetMode {
    /// Buffer the whole body as UTF-8 text.
    Text,
    /// Buffer the whole body as UTF-8 text, plus its ETag.
    TextAndMeta,
    /// Stream the body.
    Stream,
    /// Stream the body, plus its ETag.
    StreamAndMeta,
}

impl GetMode {
    /// Whether this mode requests the ETag alongside the body.
    pub fn wants_meta(self) -> bool {
        matches!(self, GetMode::TextAndMeta | GetMode::StreamAndMeta)
    }

    /// Whether this mode requests a stream instead of buffered text.
    pub fn wants_stream(self) -> bool {
        matches!(self, GetMode::Stream | GetMode::StreamAndMeta)
    }
}

/// The body of a `get` result, shaped by the requested [`GetMode`].
pub enum GetBody {
    Text(String),
    Stream(BoxAsyncRead),
}

/// The result of a successful `get`. `etag` is populated whenever the
/// adapter knows it, even if the caller didn't request `*-and-meta`.
pub struct GetOutput {
    pub body: GetBody,
    pub etag: Option<String>,
}

/// The body of a `put`.
pub enum PutBody {
    Bytes(Vec<u8>),
    Text(String),
    /// A readable stream with a caller-declared exact byte count. The
    /// adapter must reject the write if the actual byte count differs
    /// (the "fixed-length stream contract", §6).
    Stream {
        reader: BoxAsyncRead,
        content_length: u64,
    },
}

impl PutBody {
    pub fn text(s: impl Into<String>) -> Self {
        PutBody::Text(s.into())
    }
}

/// The result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutput {
    pub etag: String,
}

/// A flat key→bytes object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List every key under `key_prefix`, in a single logical result: the
    /// caller treats the returned list as complete and pagination is the
    /// adapter's concern, not the caller's.
    async fn list(&self, key_prefix: &str) -> Result<Vec<String>>;

    /// Fetch one key. Returns `Ok(None)` for a missing key.
    async fn get(&self, key: &str, mode: GetMode) -> Result<Option<GetOutput>>;

    /// Write one key, returning its new ETag.
    async fn put(&self, key: &str, body: PutBody) -> Result<PutOutput>;

    /// Classify a previously-returned error as retryable (transient
    /// storage fault: timeout, 5xx, connection reset) or durable (auth,
    /// not-found, precondition).
    fn is_retryable_error(&self, err: &podsum_core::EngineError) -> bool;
}
