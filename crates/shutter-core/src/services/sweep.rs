//! Garbage collection for image files no post refers to.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::DomainError;
use crate::ports::{FileArea, PostRepository, Removal};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
}

/// Removes unreferenced files once they are older than a grace period.
///
/// The grace period covers uploads that are written but whose post record is
/// not committed yet.
pub struct OrphanSweeper {
    posts: Arc<dyn PostRepository>,
    files: Arc<dyn FileArea>,
    grace: TimeDelta,
}

impl OrphanSweeper {
    pub fn new(posts: Arc<dyn PostRepository>, files: Arc<dyn FileArea>, grace: TimeDelta) -> Self {
        Self {
            posts,
            files,
            grace,
        }
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, DomainError> {
        // List files before reading references: a file that gains a
        // reference in between is still inside the grace period.
        let files = self.files.list().await?;
        let referenced = self.posts.referenced_filenames().await?;

        let mut report = SweepReport::default();
        for file in files {
            report.scanned += 1;
            if referenced.contains(&file.name) || now.signed_duration_since(file.modified) < self.grace {
                continue;
            }

            match self.files.remove(&file.name).await {
                Ok(Removal::Removed) => {
                    report.removed += 1;
                    tracing::info!(file = %file.name, "Removed orphaned image");
                }
                Ok(Removal::AlreadyAbsent) => {}
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "Could not remove orphaned image");
                }
            }
        }

        Ok(report)
    }
}
