//! An in-memory [`BlobStore`], used as the primary test seam for the
//! engine crate instead of constructing fixtures under a `TempDir` or
//! touching a real filesystem.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use podsum_core::{EngineError, Result};
use tokio::io::AsyncReadExt;

use crate::adapter::{BlobStore, GetBody, GetMode, GetOutput, PutBody, PutOutput};

#[derive(Clone)]
struct Entry {
    bytes: Vec<u8>,
    etag: String,
}

fn etag_for(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// An in-memory blob store backed by a `Mutex<BTreeMap>`.
///
/// Keys are listed in ascending lexicographic order, matching what a
/// real object store's `list` call returns for a flat key namespace.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key directly, bypassing `put`. Useful for test fixtures.
    pub fn seed(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        let etag = etag_for(&bytes);
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .insert(key.into(), Entry { bytes, etag });
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn list(&self, key_prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(key_prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str, mode: GetMode) -> Result<Option<GetOutput>> {
        let entry = {
            let entries = self.entries.lock().expect("memory store mutex poisoned");
            entries.get(key).cloned().map(|e| (e.bytes, e.etag))
        };
        let Some((bytes, etag)) = entry else {
            return Ok(None);
        };

        let body = if mode.wants_stream() {
            GetBody::Stream(Box::pin(std::io::Cursor::new(bytes)))
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|e| EngineError::CorruptInput(format!("{key} is not valid UTF-8: {e}")))?;
            GetBody::Text(text)
        };

        Ok(Some(GetOutput {
            body,
            etag: Some(etag),
        }))
    }

    async fn put(&self, key: &str, body: PutBody) -> Result<PutOutput> {
        let bytes = match body {
            PutBody::Bytes(b) => b,
            PutBody::Text(s) => s.into_bytes(),
            PutBody::Stream {
                mut reader,
                content_length,
            } => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                if buf.len() as u64 != content_length {
                    return Err(EngineError::CorruptInput(format!(
                        "declared content length {} but wrote {} bytes for {key}",
                        content_length,
                        buf.len()
                    )));
                }
                buf
            }
        };
        let etag = etag_for(&bytes);
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .insert(key.to_string(), Entry {
                bytes,
                etag: etag.clone(),
            });
        Ok(PutOutput { etag })
    }

    fn is_retryable_error(&self, err: &EngineError) -> bool {
        matches!(err, EngineError::TransientStorage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_text() {
        let store = MemoryStore::new();
        store
            .put("a/b", PutBody::text("hello"))
            .await
            .unwrap();
        let out = store.get("a/b", GetMode::TextAndMeta).await.unwrap().unwrap();
        match out.body {
            GetBody::Text(t) => assert_eq!(t, "hello"),
            _ => panic!("expected text body"),
        }
        assert!(out.etag.is_some());
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope", GetMode::Text).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_prefix_filtered_and_sorted() {
        let store = MemoryStore::new();
        store.seed("show-daily/u/u-2024-03-02", b"x".to_vec());
        store.seed("show-daily/u/u-2024-03-01", b"y".to_vec());
        store.seed("other/key", b"z".to_vec());
        let keys = store.list("show-daily/u/").await.unwrap();
        assert_eq!(keys, vec!["show-daily/u/u-2024-03-01", "show-daily/u/u-2024-03-02"]);
    }

    #[tokio::test]
    async fn stream_get_reads_full_body() {
        let store = MemoryStore::new();
        store.put("k", PutBody::text("line1\nline2\n")).await.unwrap();
        let out = store.get("k", GetMode::Stream).await.unwrap().unwrap();
        let GetBody::Stream(mut reader) = out.body else {
            panic!("expected stream body")
        };
        let mut buf = String::new();
        reader.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "line1\nline2\n");
    }

    #[tokio::test]
    async fn fixed_length_stream_mismatch_is_rejected() {
        let store = MemoryStore::new();
        let reader: crate::adapter::BoxAsyncRead =
            Box::pin(std::io::Cursor::new(b"short".to_vec()));
        let err = store
            .put("k", PutBody::Stream {
                reader,
                content_length: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CorruptInput(_)));
    }
}
