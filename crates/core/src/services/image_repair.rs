//! Historical image data repair.
//!
//! One-shot sweep over every stored post that rewrites malformed image
//! references to their canonical CDN form and migrates genuinely local
//! files to the remote provider. The sweep is best-effort: a failure on
//! one record is logged and counted, never allowed to stop the run.

use std::path::{Path, PathBuf};

use futo_common::config::StorageConfig;
use futo_common::image_ref::normalize_image_ref;
use futo_common::{AppError, AppResult, MediaStorageService};
use futo_db::{entities::post, repositories::PostRepository};
use sea_orm::Set;
use url::Url;

/// What happened to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// A local file was uploaded to the provider and the reference replaced.
    Migrated,
    /// The stored value was rewritten to its canonical form without a
    /// re-upload.
    Fixed,
    /// Nothing actionable (already canonical, empty, or unlocatable).
    Skipped,
}

/// Disjoint per-record counters; every processed record lands in exactly
/// one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub migrated: u64,
    pub fixed: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl RepairSummary {
    /// Total number of records processed.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.migrated + self.fixed + self.skipped + self.errors
    }

    const fn record(&mut self, outcome: RepairOutcome) {
        match outcome {
            RepairOutcome::Migrated => self.migrated += 1,
            RepairOutcome::Fixed => self.fixed += 1,
            RepairOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Batch repair of stored image references.
#[derive(Clone)]
pub struct ImageRepairService {
    post_repo: PostRepository,
    storage: MediaStorageService,
    cdn_host: String,
    upload_folder: String,
    media_root: PathBuf,
}

impl ImageRepairService {
    /// Create a new repair service from the storage configuration.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        storage: MediaStorageService,
        config: &StorageConfig,
    ) -> Self {
        Self {
            post_repo,
            storage,
            cdn_host: config.cdn_host.clone(),
            upload_folder: config.upload_folder.clone(),
            media_root: config.media_root.clone(),
        }
    }

    /// Sweep every post once. Re-running on an untouched corpus classifies
    /// every already-correct record as skipped.
    pub async fn run(&self) -> AppResult<RepairSummary> {
        let posts = self.post_repo.find_all().await?;
        let mut summary = RepairSummary::default();

        for post in posts {
            match self.repair_post(&post).await {
                Ok(outcome) => {
                    summary.record(outcome);
                    tracing::info!(post_id = post.id, outcome = ?outcome, "Processed post");
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::error!(post_id = post.id, error = %e, "Failed to repair post");
                }
            }
        }

        tracing::info!(
            migrated = summary.migrated,
            fixed = summary.fixed,
            skipped = summary.skipped,
            errors = summary.errors,
            "Repair sweep complete"
        );
        Ok(summary)
    }

    async fn repair_post(&self, post: &post::Model) -> AppResult<RepairOutcome> {
        let stored = post.image.as_deref().unwrap_or("").trim();
        if stored.is_empty() {
            return Ok(RepairOutcome::Skipped);
        }

        // A decodable/malformed value that already points at the CDN only
        // needs its stored form rewritten.
        if let Some(normalized) = normalize_image_ref(stored, &self.cdn_host) {
            if self.is_cdn_url(&normalized) {
                if normalized == stored {
                    return Ok(RepairOutcome::Skipped);
                }
                self.rewrite_image(post.id, &normalized).await?;
                return Ok(RepairOutcome::Fixed);
            }
        }

        // No canonical URL derivable; a file on local disk can still be
        // migrated to the provider.
        if let Some(local_path) = self.locate_local_file(stored).await {
            let data = tokio::fs::read(&local_path).await.map_err(|e| {
                AppError::Internal(format!("unreadable file {}: {e}", local_path.display()))
            })?;
            let filename = local_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image")
                .to_string();

            let remote = self
                .storage
                .upload_bytes(data, &filename, &self.upload_folder)
                .await?;
            self.rewrite_image(post.id, &remote.secure_url).await?;
            return Ok(RepairOutcome::Migrated);
        }

        Ok(RepairOutcome::Skipped)
    }

    fn is_cdn_url(&self, candidate: &str) -> bool {
        Url::parse(candidate)
            .map(|u| u.host_str() == Some(self.cdn_host.as_str()))
            .unwrap_or(false)
    }

    /// Map a stored reference to the local file it implies, if that file
    /// exists under the media root.
    async fn locate_local_file(&self, stored: &str) -> Option<PathBuf> {
        let relative = if let Some(idx) = stored.find("/media/") {
            // Absolute URL (or path) into the local media tree.
            &stored[idx + "/media/".len()..]
        } else if stored.starts_with("http://") || stored.starts_with("https://") {
            // External URL with no media segment; nothing local to find.
            return None;
        } else {
            stored
                .trim_start_matches('/')
                .trim_start_matches("media/")
        };

        if relative.is_empty() || Path::new(relative).is_absolute() {
            return None;
        }

        let path = self.media_root.join(relative);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    async fn rewrite_image(&self, post_id: i64, url: &str) -> AppResult<()> {
        let model = post::ActiveModel {
            id: Set(post_id),
            image: Set(Some(url.to_string())),
            ..Default::default()
        };
        self.post_repo.update(model).await?;
        Ok(())
    }
}
