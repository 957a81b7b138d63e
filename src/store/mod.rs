//! Artifact store access
//!
//! The store is addressed by build id and object name. [`HttpStore`] talks to
//! the real service; [`InMemoryStore`] keeps objects in a map for tests and
//! in-process use.

mod http;
mod memory;

pub use http::{HttpStore, StoreClientConfig};
pub use memory::InMemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Object name of the bundle uploaded by the build
pub const ARCHIVE_NAME: &str = "SD_ARTIFACT.zip";

/// Store failures after the client's own retries are exhausted.
///
/// The payload is the store's raw response body, or a generic message when
/// no body was available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Fetch(String),

    #[error("{0}")]
    Store(String),
}

impl StoreError {
    pub fn message(&self) -> &str {
        match self {
            StoreError::Fetch(msg) | StoreError::Store(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Remote operations the unzip job needs from the artifact store
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download the build's [`ARCHIVE_NAME`] bundle
    async fn fetch_archive(&self, build_id: u64, token: &str) -> Result<Bytes>;

    /// Upload one file under the build's artifact namespace
    async fn store_artifact(
        &self,
        build_id: u64,
        token: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<()>;
}
