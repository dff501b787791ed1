//! Fault-injection decorator for exercising retry behavior (§8 property 8).
//!
//! Available to other crates' tests under the `test-support` feature,
//! gated the same way fixture-only helpers are kept out of release
//! builds elsewhere in this workspace.

use std::sync::Mutex;

use async_trait::async_trait;
use podsum_core::{EngineError, Result};

use crate::adapter::{BlobStore, GetMode, GetOutput, PutBody, PutOutput};

/// Wraps a [`BlobStore`] and fails the first `N` `put` calls before
/// delegating to the inner store.
pub struct FaultyStore<S> {
    inner: S,
    puts_remaining_to_fail: Mutex<u32>,
    retryable: bool,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S, failures: u32, retryable: bool) -> Self {
        Self {
            inner,
            puts_remaining_to_fail: Mutex::new(failures),
            retryable,
        }
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for FaultyStore<S> {
    async fn list(&self, key_prefix: &str) -> Result<Vec<String>> {
        self.inner.list(key_prefix).await
    }

    async fn get(&self, key: &str, mode: GetMode) -> Result<Option<GetOutput>> {
        self.inner.get(key, mode).await
    }

    async fn put(&self, key: &str, body: PutBody) -> Result<PutOutput> {
        let should_fail = {
            let mut remaining = self.puts_remaining_to_fail.lock().expect("mutex poisoned");
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        };
        if should_fail {
            return Err(if self.retryable {
                EngineError::TransientStorage("injected fault".to_string())
            } else {
                EngineError::DurableStorage("injected fault".to_string())
            });
        }
        self.inner.put(key, body).await
    }

    fn is_retryable_error(&self, err: &EngineError) -> bool {
        self.inner.is_retryable_error(err)
    }
}
