use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use super::{FULL_NAME_SQL, like_pattern};
use crate::models::GroupSummaryRow;

// -- Groups --

/// Find-or-create by name. The insert is a no-op when the name exists, so
/// concurrent callers converge on the single row the UNIQUE constraint
/// allows.
pub fn ensure_group(conn: &Connection, name: &str) -> Result<i64> {
    let created = conn.execute(
        "INSERT INTO help_groups (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [name],
    )?;
    let id = conn.query_row("SELECT id FROM help_groups WHERE name = ?1", [name], |row| {
        row.get(0)
    })?;
    if created == 1 {
        debug!("Created group {:?} ({})", name, id);
    }
    Ok(id)
}

pub fn find_group_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM help_groups WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?)
}

pub fn list_group_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM help_groups ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Per group: name, joined article titles, joined student member names.
/// `name_fragment` narrows to names containing it (case-insensitive).
pub fn list_group_summaries(
    conn: &Connection,
    name_fragment: Option<&str>,
) -> Result<Vec<GroupSummaryRow>> {
    let sql = format!(
        "SELECT g.name,
                (SELECT group_concat(a.title, ', ' ORDER BY a.title)
                 FROM article_groups m
                 JOIN help_articles a ON a.id = m.article_id
                 WHERE m.group_id = g.id),
                (SELECT group_concat({FULL_NAME_SQL}, ', ' ORDER BY {FULL_NAME_SQL})
                 FROM student_groups s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.group_id = g.id)
         FROM help_groups g
         WHERE ?1 IS NULL OR lower(g.name) LIKE ?1 ESCAPE '\\'
         ORDER BY g.name"
    );
    let pattern = name_fragment.map(like_pattern);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([pattern], |row| {
            Ok(GroupSummaryRow {
                name: row.get(0)?,
                article_titles: row.get(1)?,
                member_names: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_student_memberships_for_group(conn: &Connection, group_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM student_groups WHERE group_id = ?1", [group_id])?)
}

pub fn delete_article_mappings_for_group(conn: &Connection, group_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM article_groups WHERE group_id = ?1", [group_id])?)
}

/// Role grants on the group cascade with the row.
pub fn delete_group_row(conn: &Connection, group_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM help_groups WHERE id = ?1", [group_id])?)
}

// -- Article mappings --

/// Idempotent: repeating a pair inserts nothing. `granted_by` marks a
/// special-access mapping and who created it.
pub fn map_article(
    conn: &Connection,
    article_id: &Uuid,
    group_id: i64,
    granted_by: Option<&Uuid>,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO article_groups (article_id, group_id, is_special_access, granted_by)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(article_id, group_id) DO NOTHING",
    )?;
    Ok(stmt.execute(params![
        article_id.to_string(),
        group_id,
        granted_by.is_some(),
        granted_by.map(|id| id.to_string()),
    ])?)
}

pub fn delete_article_mappings(conn: &Connection, article_id: &Uuid) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM article_groups WHERE article_id = ?1",
        [article_id.to_string()],
    )?)
}

pub fn delete_all_mappings(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM article_groups", [])?)
}

// -- Student memberships --

pub fn add_student(conn: &Connection, group_id: i64, user_id: &Uuid) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO student_groups (group_id, user_id) VALUES (?1, ?2)
         ON CONFLICT(group_id, user_id) DO NOTHING",
    )?;
    Ok(stmt.execute(params![group_id, user_id.to_string()])?)
}

pub fn remove_student(conn: &Connection, group_id: i64, user_id: &Uuid) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM student_groups WHERE group_id = ?1 AND user_id = ?2",
        params![group_id, user_id.to_string()],
    )?)
}

// -- Role grants --

pub fn grant_group_role(conn: &Connection, group_id: i64, user_id: &Uuid) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO group_role_grants (group_id, user_id) VALUES (?1, ?2)
         ON CONFLICT(group_id, user_id) DO NOTHING",
    )?;
    Ok(stmt.execute(params![group_id, user_id.to_string()])?)
}

pub fn revoke_group_role(conn: &Connection, group_id: i64, user_id: &Uuid) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM group_role_grants WHERE group_id = ?1 AND user_id = ?2",
        params![group_id, user_id.to_string()],
    )?)
}
