use super::{ARCHIVE_NAME, ArtifactStore, Result, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

/// Map-backed store keyed by `(build_id, name)`.
///
/// Tokens are accepted without validation. The binary always talks to the
/// HTTP store; this one backs tests and callers embedding [`UnzipJob`]
/// in-process.
///
/// [`UnzipJob`]: crate::jobs::UnzipJob
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<(u64, String), Bytes>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, e.g. the archive of a build
    pub fn insert(&self, build_id: u64, name: &str, data: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((build_id, name.to_string()), data.into());
        }
    }

    pub fn get(&self, build_id: u64, name: &str) -> Option<Bytes> {
        self.objects
            .read()
            .ok()?
            .get(&(build_id, name.to_string()))
            .cloned()
    }

    /// Object names stored for a build, sorted
    pub fn names(&self, build_id: u64) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .read()
            .map(|objects| {
                objects
                    .keys()
                    .filter(|(id, _)| *id == build_id)
                    .map(|(_, name)| name.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn fetch_archive(&self, build_id: u64, _token: &str) -> Result<Bytes> {
        self.get(build_id, ARCHIVE_NAME)
            .ok_or_else(|| StoreError::Fetch(format!("{} not found for build {}", ARCHIVE_NAME, build_id)))
    }

    async fn store_artifact(
        &self,
        build_id: u64,
        _token: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StoreError::Store("store lock poisoned".to_string()))?;
        objects.insert((build_id, file_name.to_string()), data);
        Ok(())
    }
}
