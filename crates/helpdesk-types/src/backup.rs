use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ArticleId, Level, UserId, Visibility};

/// Marker written into every snapshot so foreign JSON is rejected early.
pub const SNAPSHOT_FORMAT: &str = "helpdesk-backup";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Self-contained article collection written by backup and read by restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub format: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub group_filter: Option<String>,
    pub articles: Vec<BackupArticle>,
}

impl BackupSnapshot {
    pub fn new(group_filter: Option<String>, articles: Vec<BackupArticle>) -> Self {
        Self {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            group_filter,
            articles,
        }
    }
}

/// One article with its group names denormalized.
///
/// `body` is carried exactly as stored, so restricted bodies stay sealed
/// inside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupArticle {
    pub id: ArticleId,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub keywords: String,
    pub body: String,
    pub reference_links: Option<String>,
    pub visibility: Visibility,
    pub groups: Vec<String>,
    pub created_by: Option<UserId>,
    pub last_modified_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
