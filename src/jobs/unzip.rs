//! Unzip job: fetch the build's artifact bundle and re-upload its files

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{Job, JobError, JobPayload};
use crate::archive;
use crate::store::ArtifactStore;

pub struct UnzipJob {
    store: Arc<dyn ArtifactStore>,
    max_concurrent_uploads: Option<usize>,
}

impl UnzipJob {
    pub const NAME: &'static str = "unzip";

    /// All uploads of a job are issued at once
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            max_concurrent_uploads: None,
        }
    }

    /// Cap in-flight uploads per job. `None` means unbounded.
    pub fn with_upload_limit(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_uploads = limit;
        self
    }

    /// Returns the number of uploaded entries
    async fn run(&self, build_id: u64, token: &str) -> Result<usize, JobError> {
        let bundle = self.store.fetch_archive(build_id, token).await?;
        let entries = tokio::task::spawn_blocking(move || archive::extract_entries(&bundle))
            .await
            .map_err(|e| JobError::Parse(format!("archive extraction task failed: {}", e)))??;

        let total = entries.len();
        info!(build_id, entries = total, "archive extracted, uploading entries");

        let store = &self.store;
        let uploads = entries.into_iter().map(|entry| async move {
            let result = store
                .store_artifact(build_id, token, &entry.name, Bytes::from(entry.data))
                .await;
            (entry.name, result)
        });

        let limit = self.max_concurrent_uploads.unwrap_or(total).max(1);
        let mut results = stream::iter(uploads).buffer_unordered(limit);

        // Every upload runs to completion; the first failure decides the result.
        let mut first_error = None;
        let mut failed = 0;
        while let Some((name, result)) = results.next().await {
            if let Err(e) = result {
                failed += 1;
                warn!(build_id, file_name = %name, error = %e, "artifact upload failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => {
                warn!(build_id, failed, total, "some artifact uploads failed");
                Err(e.into())
            }
            None => Ok(total),
        }
    }
}

#[async_trait]
impl Job for UnzipJob {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn perform(&self, payload: &JobPayload) -> Result<(), JobError> {
        let build_id = payload.build_id;
        info!(build_id, "unzip started");

        match self.run(build_id, &payload.token).await {
            Ok(uploaded) => {
                info!(build_id, uploaded, "unzip complete");
                Ok(())
            }
            Err(e) => {
                error!(build_id, kind = e.kind(), error = %e, "unzip failed");
                Err(e)
            }
        }
    }
}
