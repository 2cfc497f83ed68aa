use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BoardError, Result};
use crate::models::{RecordFailure, WirePatch};
use crate::status::{self, Vocabulary};
use crate::store::ApplicationStore;

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub examined: usize,
    /// (id, old ordinal, new ordinal)
    pub migrated: Vec<(String, i64, i64)>,
    pub unchanged: usize,
    pub failed: Vec<RecordFailure>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrateOptions {
    pub dry_run: bool,
    /// Run even though a completion marker exists.
    pub force: bool,
}

/// Contents of a completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub base_url: String,
    pub completed_at: DateTime<Utc>,
    pub migrated: usize,
    pub failed: usize,
}

/// Records that a backend's ordinals were rewritten, so a second run cannot
/// reinterpret canonical ordinals as legacy ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationMarker {
    path: PathBuf,
    base_url: String,
}

impl MigrationMarker {
    pub fn new(path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_url: base_url.into(),
        }
    }

    /// One marker per backend, under the platform data dir.
    pub fn for_base_url(base_url: &str) -> Option<Self> {
        let dirs = directories::ProjectDirs::from("", "", "jobboard")?;
        let path = dirs.data_dir().join("migrations").join(marker_file_name(base_url));
        Some(Self::new(path, base_url))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Option<MarkerRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| BoardError::Config(format!("corrupt marker {}: {}", self.path.display(), e)))
    }

    pub fn record(&self, report: &MigrationReport) -> Result<MarkerRecord> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let record = MarkerRecord {
            base_url: self.base_url.clone(),
            completed_at: Utc::now(),
            migrated: report.migrated.len(),
            failed: report.failed.len(),
        };
        let content = toml::to_string_pretty(&record).map_err(|e| BoardError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(record)
    }
}

fn marker_file_name(base_url: &str) -> String {
    let slug: String = base_url
        .trim_end_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("v1-to-v2-{}.toml", slug)
}

impl ApplicationStore {
    /// Rewrite every record's ordinal from the four-value vocabulary to the
    /// canonical one. Refuses to run again once `marker` is recorded, unless forced.
    pub async fn migrate_legacy(
        &self,
        marker: &MigrationMarker,
        options: MigrateOptions,
    ) -> Result<MigrationReport> {
        if !options.force {
            if let Some(done) = marker.read()? {
                return Err(BoardError::AlreadyMigrated {
                    marker: marker.path().to_path_buf(),
                    completed_at: done.completed_at,
                });
            }
        }

        let report = self.rewrite_legacy_ordinals(options.dry_run).await?;
        if !options.dry_run {
            if let Err(e) = marker.record(&report) {
                tracing::error!(
                    marker = %marker.path().display(),
                    migrated = report.migrated.len(),
                    error = %e,
                    "migration finished but the marker could not be written"
                );
                return Err(e);
            }
        }
        Ok(report)
    }

    async fn rewrite_legacy_ordinals(&self, dry_run: bool) -> Result<MigrationReport> {
        let records = self.backend.list(None, None, None).await?;
        let mut report = MigrationReport::default();
        for record in records {
            report.examined += 1;
            let new = match status::migrate_ordinal(record.status, Vocabulary::V1, Vocabulary::V2) {
                Ok(n) => n,
                Err(error) => {
                    report.failed.push(RecordFailure { id: record.id, error });
                    continue;
                }
            };
            if new == record.status {
                report.unchanged += 1;
                continue;
            }
            if !dry_run {
                let patch = WirePatch {
                    status: Some(new),
                    ..WirePatch::default()
                };
                if let Err(error) = self.backend.patch(&record.id, &patch).await {
                    report.failed.push(RecordFailure { id: record.id, error });
                    continue;
                }
            }
            tracing::info!(id = %record.id, from = record.status, to = new, dry_run, "migrated status ordinal");
            report.migrated.push((record.id, record.status, new));
        }
        Ok(report)
    }
}
