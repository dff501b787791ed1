//! Bounded retry for blob writes (§4.F.8, §7).
//!
//! Only the audience-blob write is retried, and only against errors the
//! adapter classifies as retryable; everything else propagates
//! immediately (§7's `TransientStorage`/`DurableStorage` policy).

use podsum_core::{EngineError, Result};
use tracing::debug;

use crate::adapter::{BlobStore, PutBody, PutOutput};

/// Retry `store.put(key, body)` up to `max_retries` additional times
/// (so `max_retries = 2` means at most 3 total attempts) whenever the
/// adapter classifies the failure as retryable. A non-retryable failure,
/// or exhausting the retry budget, propagates the last error --
/// `TransientStorage` if the final attempt was still a transient fault.
pub async fn put_with_retry(
    store: &dyn BlobStore,
    key: &str,
    mut next_body: impl FnMut() -> PutBody,
    max_retries: u32,
) -> Result<PutOutput> {
    let mut attempt = 0;
    loop {
        match store.put(key, next_body()).await {
            Ok(out) => return Ok(out),
            Err(err) => {
                let retryable = store.is_retryable_error(&err);
                if !retryable || attempt >= max_retries {
                    return Err(if retryable {
                        EngineError::TransientStorage(err.to_string())
                    } else {
                        err
                    });
                }
                attempt += 1;
                debug!(key, attempt, "retrying blob put after transient error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FaultyStore;
    use crate::MemoryStore;

    #[tokio::test]
    async fn succeeds_after_two_transient_failures() {
        let store = FaultyStore::new(MemoryStore::new(), 2, true);
        let out = put_with_retry(&store, "k", || PutBody::text("x"), 2)
            .await
            .unwrap();
        assert!(!out.etag.is_empty());
    }

    #[tokio::test]
    async fn fails_after_three_transient_failures() {
        let store = FaultyStore::new(MemoryStore::new(), 3, true);
        let err = put_with_retry(&store, "k", || PutBody::text("x"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TransientStorage(_)));
    }

    #[tokio::test]
    async fn durable_failure_is_not_retried() {
        let store = FaultyStore::new(MemoryStore::new(), 1, false);
        let err = put_with_retry(&store, "k", || PutBody::text("x"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DurableStorage(_)));
    }
}
