//! A local-filesystem-backed [`BlobStore`], used by the CLI binary for
//! local/demo invocation (§13). Keys map directly onto relative paths
//! under a root directory.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use podsum_core::{EngineError, Result};
use tokio::io::AsyncReadExt;

use crate::adapter::{BlobStore, GetBody, GetMode, GetOutput, PutBody, PutOutput};

/// A [`BlobStore`] rooted at a directory on the local filesystem.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn etag_for(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

async fn list_under(root: &Path, prefix_path: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !prefix_path.exists() {
        return Ok(());
    }
    let mut stack = vec![prefix_path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut rd = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsStore {
    async fn list(&self, key_prefix: &str) -> Result<Vec<String>> {
        // Walk from the deepest existing ancestor directory of the prefix,
        // then filter by the exact prefix string. This keeps the common
        // case (prefix is itself a directory) cheap without requiring the
        // prefix to be directory-aligned.
        let mut search_root = self.root.join(key_prefix);
        while !search_root.exists() && search_root != self.root {
            match search_root.parent() {
                Some(p) => search_root = p.to_path_buf(),
                None => break,
            }
        }

        let mut paths = Vec::new();
        list_under(&self.root, &search_root, &mut paths).await?;

        let mut keys: Vec<String> = paths
            .into_iter()
            .filter_map(|p| p.to_str().map(|s| s.replace(std::path::MAIN_SEPARATOR, "/")))
            .filter(|k| k.starts_with(key_prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str, mode: GetMode) -> Result<Option<GetOutput>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path).await?;
        let etag = etag_for(&bytes);

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

        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let etag = etag_for(&bytes);
        tokio::fs::write(&path, &bytes).await?;
        Ok(PutOutput { etag })
    }

    fn is_retryable_error(&self, err: &EngineError) -> bool {
        matches!(err, EngineError::TransientStorage(_))
            || matches!(err, EngineError::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted | std::io::ErrorKind::ConnectionReset
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        store
            .put("show-daily/u/u-2024-03-05", PutBody::text("a\tb\n"))
            .await
            .unwrap();
        let out = store
            .get("show-daily/u/u-2024-03-05", GetMode::TextAndMeta)
            .await
            .unwrap()
            .unwrap();
        match out.body {
            GetBody::Text(t) => assert_eq!(t, "a\tb\n"),
            _ => panic!("expected text"),
        }
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        assert!(store.get("nope", GetMode::Text).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        store
            .put("show-daily/u/u-2024-03-01", PutBody::text("x"))
            .await
            .unwrap();
        store
            .put("show-daily/u/u-2024-03-02", PutBody::text("y"))
            .await
            .unwrap();
        store.put("other/key", PutBody::text("z")).await.unwrap();

        let keys = store.list("show-daily/u/").await.unwrap();
        assert_eq!(
            keys,
            vec!["show-daily/u/u-2024-03-01", "show-daily/u/u-2024-03-02"]
        );
    }
}
