/// Shared domain types for the help desk.
///
/// These are the shapes the core hands to its callers and the shapes that
/// travel inside backup snapshots. Storage rows live in `helpdesk-db`.
pub mod backup;
pub mod models;

pub use backup::{BackupArticle, BackupSnapshot, SNAPSHOT_FORMAT, SNAPSHOT_VERSION};
pub use models::*;
