//! Snapshot export and transactional restore.

use std::io::Write;

use helpdesk_crypto::open_body;
use helpdesk_db::models::{ArticleFields, ArticleInsert, ArticleRow};
use helpdesk_db::queries::{articles, groups};
use helpdesk_db::to_datetime;
use helpdesk_types::{
    BackupArticle, BackupSnapshot, RestoreMode, RestoreReport, SNAPSHOT_FORMAT, SNAPSHOT_VERSION,
    Visibility,
};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::HelpDesk;
use crate::error::{HelpDeskError, Result};

/// Articles inserted per logged batch during restore.
const RESTORE_BATCH: usize = 50;

impl HelpDesk {
    /// Serialize every article, or only those in `group_filter`, to a JSON
    /// snapshot. Restricted bodies stay sealed.
    pub fn backup(&self, group_filter: Option<&str>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.backup_to_writer(&mut out, group_filter)?;
        Ok(out)
    }

    /// Write a snapshot to `writer`; returns the number of articles in it.
    pub fn backup_to_writer<W: Write>(&self, writer: W, group_filter: Option<&str>) -> Result<usize> {
        let group_filter = group_filter.map(str::trim).filter(|g| !g.is_empty());
        let rows = self.db.with_conn(|conn| match group_filter {
            Some(name) => articles::list_articles_in_group(conn, name),
            None => articles::list_articles(conn),
        })?;

        let records = rows.into_iter().map(backup_record).collect::<Result<Vec<_>>>()?;
        let count = records.len();
        let snapshot = BackupSnapshot::new(group_filter.map(str::to_string), records);
        serde_json::to_writer_pretty(writer, &snapshot)
            .map_err(|e| HelpDeskError::Storage(e.into()))?;

        info!("Backup written: {} articles", count);
        Ok(count)
    }

    /// Load a snapshot in one transaction.
    ///
    /// The input is parsed and checked before the database is touched.
    /// `Replace` clears all articles and mappings first; `Merge` keeps
    /// existing articles and skips snapshot entries with a known id. Any
    /// failure rolls everything back.
    pub fn restore(&self, input: &[u8], mode: RestoreMode) -> Result<RestoreReport> {
        let snapshot = self.parse_snapshot(input)?;

        let report = self
            .db
            .with_tx_lock_wait(self.config.restore_lock_wait, |tx| {
                if mode == RestoreMode::Replace {
                    tx.pragma_update(None, "defer_foreign_keys", "ON")?;
                    let mappings = groups::delete_all_mappings(tx)?;
                    let removed = articles::delete_all_articles(tx)?;
                    debug!("Cleared {} articles and {} mappings", removed, mappings);
                }

                let mut report = RestoreReport::default();
                for (batch, chunk) in snapshot.articles.chunks(RESTORE_BATCH).enumerate() {
                    for record in chunk {
                        if restore_one(tx, record)? {
                            report.restored += 1;
                        } else {
                            report.skipped += 1;
                        }
                    }
                    debug!("Restore batch {} done ({} articles)", batch + 1, chunk.len());
                }
                Ok::<_, HelpDeskError>(report)
            })?;

        info!(
            "Restore complete ({:?}): {} restored, {} skipped",
            mode, report.restored, report.skipped
        );
        Ok(report)
    }

    fn parse_snapshot(&self, input: &[u8]) -> Result<BackupSnapshot> {
        let snapshot: BackupSnapshot =
            serde_json::from_slice(input).map_err(|e| HelpDeskError::Corrupt(e.to_string()))?;

        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(HelpDeskError::Corrupt(format!("unknown format {:?}", snapshot.format)));
        }
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(HelpDeskError::Corrupt(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }
        for record in &snapshot.articles {
            if record.title.trim().is_empty() {
                return Err(HelpDeskError::Corrupt(format!("article {} has no title", record.id)));
            }
            if let Some(name) = record.groups.iter().find(|g| g.contains(',')) {
                return Err(HelpDeskError::Corrupt(format!(
                    "article {} names group {:?}, which contains a comma",
                    record.id, name
                )));
            }
            // A body sealed under another key would restore as unreadable.
            if record.visibility.is_restricted() && open_body(&self.config.body_key, &record.body).is_err() {
                return Err(HelpDeskError::Corrupt(format!(
                    "article {} is sealed under a different key",
                    record.id
                )));
            }
        }
        Ok(snapshot)
    }
}

fn backup_record(row: ArticleRow) -> Result<BackupArticle> {
    let level = row
        .level
        .parse()
        .map_err(|e| HelpDeskError::Storage(anyhow::anyhow!("article {}: {}", row.id, e)))?;
    Ok(BackupArticle {
        id: row.id,
        title: row.title,
        description: row.description,
        level,
        keywords: row.keywords,
        body: row.body,
        reference_links: row.reference_links,
        visibility: Visibility::from_columns(row.is_restricted, row.public_title, row.public_desc),
        groups: row.groups,
        created_by: row.created_by,
        last_modified_by: row.last_modified_by,
        created_at: to_datetime(row.created_at),
        updated_at: to_datetime(row.updated_at),
    })
}

/// Insert one record and its mappings; `false` when an article with the
/// same id is already present.
fn restore_one(conn: &Connection, record: &BackupArticle) -> Result<bool> {
    let insert = ArticleInsert {
        id: record.id,
        fields: ArticleFields {
            title: &record.title,
            description: &record.description,
            level: record.level.as_str(),
            keywords: &record.keywords,
            body: &record.body,
            reference_links: record.reference_links.as_deref(),
            is_restricted: record.visibility.is_restricted(),
            public_title: record.visibility.public_title(),
            public_desc: record.visibility.public_desc(),
        },
        created_by: record.created_by,
        last_modified_by: record.last_modified_by,
        created_at: record.created_at.timestamp_millis(),
        updated_at: record.updated_at.timestamp_millis(),
    };
    if articles::insert_article_if_absent(conn, &insert)? == 0 {
        return Ok(false);
    }

    for name in record.groups.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
        let group_id = groups::ensure_group(conn, name)?;
        groups::map_article(conn, &record.id, group_id, None)?;
    }
    Ok(true)
}
