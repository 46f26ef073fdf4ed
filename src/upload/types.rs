use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Pending,
    Uploading,
    Completed,
    Skipped,
    Failed,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }
}

impl Default for FileState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Transfer state of one file, as carried by `upload-progress`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub filename: String,
    #[serde(default)]
    pub bytes_uploaded: u64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub status: FileState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadStatus {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Builds an `uploading` entry, deriving the percentage from the byte counters.
    pub fn uploading(filename: impl Into<String>, bytes_uploaded: u64, total_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            bytes_uploaded,
            total_bytes,
            percentage: percentage_of(bytes_uploaded, total_bytes),
            status: FileState::Uploading,
            error: None,
        }
    }
}

pub fn percentage_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Snapshot of one upload session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub uploads: HashMap<String, UploadStatus>,
    pub skipped_count: usize,
    /// Files finished by `upload-complete` or `upload-error`.
    #[serde(skip)]
    pub(crate) settled: HashSet<String>,
}

impl UploadProgress {
    pub fn get(&self, filename: &str) -> Option<&UploadStatus> {
        self.uploads.get(filename)
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.skipped_count == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Entries ordered by filename, for display.
    pub fn sorted(&self) -> Vec<&UploadStatus> {
        let mut entries: Vec<&UploadStatus> = self.uploads.values().collect();
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        entries
    }

    pub fn count(&self, state: FileState) -> usize {
        self.uploads.values().filter(|u| u.status == state).count()
    }
}
