use anyhow::Result;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::models::uuid_column;

// -- Role assignments --

pub fn role_ids_of(conn: &Connection, user_id: &Uuid) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT role_id FROM user_roles WHERE user_id = ?1 ORDER BY role_id")?;
    let ids = stmt
        .query_map([user_id.to_string()], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn has_role(conn: &Connection, user_id: &Uuid, role_id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = ?1 AND role_id = ?2)",
        params![user_id.to_string(), role_id],
        |row| row.get(0),
    )?)
}

/// Returns 0 when the user already holds the role.
pub fn add_role(conn: &Connection, user_id: &Uuid, role_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "INSERT INTO user_roles (user_id, role_id) VALUES (?1, ?2)
         ON CONFLICT(user_id, role_id) DO NOTHING",
        params![user_id.to_string(), role_id],
    )?)
}

pub fn remove_role(conn: &Connection, user_id: &Uuid, role_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
        params![user_id.to_string(), role_id],
    )?)
}

// -- Admin rights --

pub fn is_admin_right_holder(conn: &Connection, user_id: &Uuid) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM admin_rights WHERE user_id = ?1)",
        [user_id.to_string()],
        |row| row.get(0),
    )?)
}

/// Returns 0 when the user already holds the right.
pub fn insert_admin_right(conn: &Connection, user_id: &Uuid, granted_at: i64) -> Result<usize> {
    Ok(conn.execute(
        "INSERT INTO admin_rights (user_id, granted_at) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id.to_string(), granted_at],
    )?)
}

/// Insert only while nobody holds the right yet; 1 when this call won.
pub fn claim_first_admin_right(conn: &Connection, user_id: &Uuid, granted_at: i64) -> Result<usize> {
    Ok(conn.execute(
        "INSERT INTO admin_rights (user_id, granted_at)
         SELECT ?1, ?2 WHERE NOT EXISTS (SELECT 1 FROM admin_rights)",
        params![user_id.to_string(), granted_at],
    )?)
}

pub fn delete_admin_right(conn: &Connection, user_id: &Uuid) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM admin_rights WHERE user_id = ?1",
        [user_id.to_string()],
    )?)
}

/// Holders as (user id, username), ordered by username.
pub fn list_admin_rights(conn: &Connection) -> Result<Vec<(Uuid, String)>> {
    let mut stmt = conn.prepare(
        "SELECT a.user_id, u.username
         FROM admin_rights a
         JOIN users u ON u.id = a.user_id
         ORDER BY u.username",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((uuid_column(row, 0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
