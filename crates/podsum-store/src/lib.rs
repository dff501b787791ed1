//! The blob store adapter (§4.A) and its implementations.

pub mod adapter;
pub mod fs;
pub mod memory;
pub mod retry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use adapter::{BlobStore, BoxAsyncRead, GetBody, GetMode, GetOutput, PutBody, PutOutput};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use retry::put_with_retry;
