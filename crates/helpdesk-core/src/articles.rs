//! Article repository: create, update, delete, listings, and the reads
//! gated per viewer.
//!
//! Restricted bodies are sealed before they reach the database and opened
//! only on a read the caller is entitled to.

use std::fmt::Write as _;

use anyhow::anyhow;
use helpdesk_crypto::{open_body, seal_body};
use helpdesk_db::models::{ArticleFields, ArticleInsert, ArticleRow};
use helpdesk_db::queries::{access, articles, groups, roles};
use helpdesk_db::{now_millis, to_datetime};
use helpdesk_types::{
    Article, ArticleDraft, ArticleId, ArticleSummary, ArticleView, Level, Perspective, UserId,
    Visibility, parse_group_list,
};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::body_visible;
use crate::error::{HelpDeskError, Result};
use crate::{HelpDesk, required};

/// Body text shown in place of a restricted body the viewer may not read.
pub const RESTRICTED_PLACEHOLDER: &str = "[Access Restricted]";

/// A draft that passed validation, with the body in stored form.
struct PreparedDraft<'a> {
    draft: &'a ArticleDraft,
    stored_body: String,
    groups: Vec<String>,
}

impl PreparedDraft<'_> {
    fn fields(&self) -> ArticleFields<'_> {
        ArticleFields {
            title: self.draft.title.trim(),
            description: self.draft.description.trim(),
            level: self.draft.level.as_str(),
            keywords: self.draft.keywords.trim(),
            body: &self.stored_body,
            reference_links: self
                .draft
                .reference_links
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty()),
            is_restricted: self.draft.visibility.is_restricted(),
            public_title: self.draft.visibility.public_title().map(str::trim),
            public_desc: self.draft.visibility.public_desc().map(str::trim),
        }
    }
}

impl HelpDesk {
    /// Store a new article and map it to every group in its list, creating
    /// missing groups. With `grant_admins_on_create`, every admin right
    /// holder also receives a role grant on those groups.
    pub fn create_article(&self, draft: &ArticleDraft, author: &UserId) -> Result<ArticleId> {
        let prepared = self.prepare(draft)?;
        let id = Uuid::new_v4();
        let now = now_millis();

        self.db.with_tx(|tx| {
            articles::insert_article(
                tx,
                &ArticleInsert {
                    id,
                    fields: prepared.fields(),
                    created_by: Some(*author),
                    last_modified_by: Some(*author),
                    created_at: now,
                    updated_at: now,
                },
            )?;
            for name in &prepared.groups {
                let group_id = groups::ensure_group(tx, name)?;
                groups::map_article(tx, &id, group_id, None)?;
                if self.config.grant_admins_on_create {
                    let granted = access::grant_admin_holders(tx, group_id)?;
                    debug!("Group {:?}: {} new admin grants", name, granted);
                }
            }
            Ok::<_, HelpDeskError>(())
        })?;

        info!("Article {} created by {}", id, author);
        Ok(id)
    }

    /// Overwrite an article and replace its group mappings in one
    /// transaction. `NotFound` when the article no longer exists.
    pub fn update_article(&self, id: &ArticleId, draft: &ArticleDraft, editor: &UserId) -> Result<()> {
        let prepared = self.prepare(draft)?;

        self.db.with_tx(|tx| {
            if articles::update_article(tx, id, &prepared.fields(), editor, now_millis())? == 0 {
                return Err(HelpDeskError::NotFound(format!("article {}", id)));
            }
            groups::delete_article_mappings(tx, id)?;
            for name in &prepared.groups {
                let group_id = groups::ensure_group(tx, name)?;
                groups::map_article(tx, id, group_id, Some(editor))?;
            }
            if self.config.enroll_editor_on_update
                && roles::insert_admin_right(tx, editor, now_millis())? == 1
            {
                info!("Editor {} enrolled as admin right holder", editor);
            }
            Ok(())
        })?;

        info!("Article {} updated by {}", id, editor);
        Ok(())
    }

    /// Remove the article's mappings, then the article. Unknown ids are a
    /// no-op.
    pub fn delete_article(&self, id: &ArticleId) -> Result<()> {
        let removed = self.db.with_tx(|tx| {
            groups::delete_article_mappings(tx, id)?;
            articles::delete_article_row(tx, id)
        })?;
        if removed > 0 {
            info!("Article {} deleted", id);
        }
        Ok(())
    }

    /// Full article with its body opened. Not gated; use [`HelpDesk::view_for`]
    /// to serve a particular viewer.
    pub fn get_article(&self, id: &ArticleId) -> Result<Article> {
        let row = self.db.with_conn(|conn| fetch(conn, id))?;
        let body = self.open_stored_body(&row)?;
        article_from_row(row, body)
    }

    pub fn list_articles(&self) -> Result<Vec<ArticleSummary>> {
        let rows = self.db.with_conn(articles::list_articles)?;
        rows.into_iter().map(summary_from_row).collect()
    }

    pub fn list_articles_by_group(&self, group_name: &str) -> Result<Vec<ArticleSummary>> {
        let group_name = required("group name", group_name)?;
        let rows = self
            .db
            .with_conn(|conn| articles::list_articles_in_group(conn, group_name))?;
        rows.into_iter().map(summary_from_row).collect()
    }

    /// Case-insensitive substring search over title, description and
    /// keywords.
    pub fn search_articles(&self, text: &str) -> Result<Vec<ArticleSummary>> {
        let rows = self.db.with_conn(|conn| articles::search_articles(conn, text.trim()))?;
        rows.into_iter().map(summary_from_row).collect()
    }

    /// Text preview for `user`. The body appears in full when any rule that
    /// applies to the user's roles authorizes them, otherwise the
    /// placeholder replaces it.
    pub fn preview_for(&self, user: &UserId, id: &ArticleId) -> Result<String> {
        self.preview(user, id, None)
    }

    /// Like [`HelpDesk::preview_for`], evaluating only the rule of one role
    /// screen.
    pub fn preview_as(&self, user: &UserId, id: &ArticleId, perspective: Perspective) -> Result<String> {
        self.preview(user, id, Some(perspective))
    }

    /// Structured read for `user`; `body` is `None` when withheld.
    pub fn view_for(&self, user: &UserId, id: &ArticleId) -> Result<ArticleView> {
        let (row, visible) = self.db.with_conn(|conn| {
            let row = fetch(conn, id)?;
            let visible = body_visible(conn, user, &row, None)?;
            Ok::<_, HelpDeskError>((row, visible))
        })?;
        let body = if visible { Some(self.open_stored_body(&row)?) } else { None };
        let article = article_from_row(row, String::new())?;

        Ok(ArticleView {
            id: article.id,
            title: article.title,
            description: article.description,
            level: article.level,
            keywords: article.keywords,
            reference_links: article.reference_links,
            visibility: article.visibility,
            groups: article.groups,
            body,
        })
    }

    fn preview(&self, user: &UserId, id: &ArticleId, perspective: Option<Perspective>) -> Result<String> {
        let (row, visible) = self.db.with_conn(|conn| {
            let row = fetch(conn, id)?;
            let visible = body_visible(conn, user, &row, perspective)?;
            Ok::<_, HelpDeskError>((row, visible))
        })?;
        let body = if visible { Some(self.open_stored_body(&row)?) } else { None };
        let article = article_from_row(row, String::new())?;
        Ok(format_preview(&article, body.as_deref()))
    }

    fn prepare<'a>(&self, draft: &'a ArticleDraft) -> Result<PreparedDraft<'a>> {
        required("title", &draft.title)?;
        required("description", &draft.description)?;
        required("body", &draft.body)?;
        if let Visibility::Restricted { public_title, .. } = &draft.visibility {
            required("public title", public_title)?;
        }

        let stored_body = if draft.visibility.is_restricted() {
            seal_body(&self.config.body_key, &draft.body)?
        } else {
            draft.body.clone()
        };
        Ok(PreparedDraft {
            draft,
            stored_body,
            groups: parse_group_list(&draft.groups),
        })
    }

    pub(crate) fn open_stored_body(&self, row: &ArticleRow) -> Result<String> {
        if !row.is_restricted {
            return Ok(row.body.clone());
        }
        Ok(open_body(&self.config.body_key, &row.body)?)
    }
}

fn fetch(conn: &Connection, id: &ArticleId) -> Result<ArticleRow> {
    articles::get_article(conn, id)?.ok_or_else(|| HelpDeskError::NotFound(format!("article {}", id)))
}

fn stored_level(row: &ArticleRow) -> Result<Level> {
    row.level
        .parse()
        .map_err(|e| HelpDeskError::Storage(anyhow!("article {}: {}", row.id, e)))
}

fn article_from_row(row: ArticleRow, body: String) -> Result<Article> {
    let level = stored_level(&row)?;
    Ok(Article {
        id: row.id,
        title: row.title,
        description: row.description,
        level,
        keywords: row.keywords,
        body,
        reference_links: row.reference_links,
        visibility: Visibility::from_columns(row.is_restricted, row.public_title, row.public_desc),
        groups: row.groups,
        created_by: row.created_by,
        last_modified_by: row.last_modified_by,
        created_at: to_datetime(row.created_at),
        updated_at: to_datetime(row.updated_at),
    })
}

fn summary_from_row(row: ArticleRow) -> Result<ArticleSummary> {
    let level = stored_level(&row)?;
    Ok(ArticleSummary {
        id: row.id,
        title: row.title,
        description: row.description,
        level,
        groups: row.groups.join(", "),
        is_restricted: row.is_restricted,
        created_at: to_datetime(row.created_at),
        updated_at: to_datetime(row.updated_at),
    })
}

/// Render the preview block. `body` is `None` when it is withheld; there is
/// no partial redaction.
pub fn format_preview(article: &Article, body: Option<&str>) -> String {
    let mut out = String::new();
    let groups = if article.groups.is_empty() {
        "None".to_string()
    } else {
        article.groups.join(", ")
    };

    // Writing to a String cannot fail.
    let _ = write!(out, "Title: {}\n\n", article.title);
    let _ = write!(out, "Level: {}\n\n", article.level);
    let _ = write!(out, "Groups: {}\n\n", groups);
    let _ = write!(out, "Description:\n{}\n\n", article.description);
    match body {
        Some(body) => {
            let _ = write!(out, "Content:\n{}\n\n", body);
        }
        None => {
            let _ = write!(out, "Content: {}\n\n", RESTRICTED_PLACEHOLDER);
        }
    }
    if let Some(references) = article.reference_links.as_deref().filter(|r| !r.is_empty()) {
        let _ = write!(out, "References:\n{}", references);
    }
    out
}
