//! Authorization lookups. Each call reads the grant tables directly; nothing
//! here is cached.

use anyhow::Result;
use rusqlite::{Connection, params};
use uuid::Uuid;

/// Staff rule: does `user_id` hold a group role grant on any group the
/// article is mapped to?
pub fn staff_authorized_for_article(
    conn: &Connection,
    user_id: &Uuid,
    article_id: &Uuid,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM article_groups m
         JOIN group_role_grants r ON r.group_id = m.group_id
         WHERE m.article_id = ?1 AND r.user_id = ?2",
        params![article_id.to_string(), user_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Student rule: is `user_id` a member of any group the article is mapped to?
pub fn student_authorized_for_article(
    conn: &Connection,
    user_id: &Uuid,
    article_id: &Uuid,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM article_groups m
         JOIN student_groups s ON s.group_id = m.group_id
         WHERE m.article_id = ?1 AND s.user_id = ?2",
        params![article_id.to_string(), user_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn has_group_grant(conn: &Connection, group_id: i64, user_id: &Uuid) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM group_role_grants WHERE group_id = ?1 AND user_id = ?2)",
        params![group_id, user_id.to_string()],
        |row| row.get(0),
    )?)
}

pub fn is_group_member(conn: &Connection, group_id: i64, user_id: &Uuid) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM student_groups WHERE group_id = ?1 AND user_id = ?2)",
        params![group_id, user_id.to_string()],
        |row| row.get(0),
    )?)
}

/// Give every current admin right holder a role grant on the group.
/// Returns the number of grants that did not exist before.
pub fn grant_admin_holders(conn: &Connection, group_id: i64) -> Result<usize> {
    // `WHERE true` keeps SQLite from reading ON CONFLICT as a join clause.
    Ok(conn.execute(
        "INSERT INTO group_role_grants (group_id, user_id)
         SELECT ?1, user_id FROM admin_rights WHERE true
         ON CONFLICT(group_id, user_id) DO NOTHING",
        [group_id],
    )?)
}
