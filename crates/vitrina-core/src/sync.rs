use serde::{Deserialize, Serialize};

/// `sync_type` key of the product catalog row in `sync_status`.
pub const PRODUCTS_SYNC_TYPE: &str = "products";

/// How flattened rows are written into the catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// Merge by natural key; surrogate ids survive across runs.
    Upsert,
    /// Delete every row, then insert the new set in batches.
    FullReplace,
}

impl SyncStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStrategy::Upsert => "upsert",
            SyncStrategy::FullReplace => "full_replace",
        }
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(SyncStrategy::Upsert),
            "full_replace" | "full-replace" | "replace" => Ok(SyncStrategy::FullReplace),
            other => Err(format!(
                "unknown sync strategy '{other}'; expected 'upsert' or 'full_replace'"
            )),
        }
    }
}

/// Lifecycle state stored in `sync_status.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatusKind {
    Completed,
    Failed,
    InProgress,
}

impl SyncStatusKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatusKind::Completed => "completed",
            SyncStatusKind::Failed => "failed",
            SyncStatusKind::InProgress => "in_progress",
        }
    }

    /// Parses the database representation; unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(SyncStatusKind::Completed),
            "failed" => Some(SyncStatusKind::Failed),
            "in_progress" => Some(SyncStatusKind::InProgress),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
