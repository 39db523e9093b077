use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::FULL_NAME_SQL;
use crate::models::{UserListRow, UserRow, uuid_column};

const USER_COLUMNS: &str = "id, username, email, secret_hash, first_name, middle_name, last_name,
     preferred_first_name, is_one_time_secret, one_time_expires_at, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_column(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        secret_hash: row.get(3)?,
        first_name: row.get(4)?,
        middle_name: row.get(5)?,
        last_name: row.get(6)?,
        preferred_first_name: row.get(7)?,
        is_one_time_secret: row.get(8)?,
        one_time_expires_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Insert a user; returns 0 when the username is already taken.
pub fn insert_user(
    conn: &Connection,
    id: &Uuid,
    username: &str,
    secret_hash: &str,
    created_at: i64,
) -> Result<usize> {
    let inserted = conn.execute(
        "INSERT INTO users (id, username, secret_hash, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(username) DO NOTHING",
        params![id.to_string(), username, secret_hash, created_at],
    )?;
    Ok(inserted)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    Ok(conn.query_row(&sql, [username], user_from_row).optional()?)
}

pub fn get_user_by_id(conn: &Connection, id: &Uuid) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id.to_string()], user_from_row).optional()?)
}

pub fn user_id_by_username(conn: &Connection, username: &str) -> Result<Option<Uuid>> {
    Ok(conn
        .query_row("SELECT id FROM users WHERE username = ?1", [username], |row| {
            uuid_column(row, 0)
        })
        .optional()?)
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

/// Store a self-chosen secret and leave one-time mode.
pub fn set_secret(conn: &Connection, id: &Uuid, secret_hash: &str) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE users SET secret_hash = ?2, is_one_time_secret = 0, one_time_expires_at = NULL
         WHERE id = ?1",
        params![id.to_string(), secret_hash],
    )?)
}

pub fn set_one_time_secret(
    conn: &Connection,
    id: &Uuid,
    secret_hash: &str,
    expires_at: i64,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE users SET secret_hash = ?2, is_one_time_secret = 1, one_time_expires_at = ?3
         WHERE id = ?1",
        params![id.to_string(), secret_hash, expires_at],
    )?)
}

pub fn update_profile(
    conn: &Connection,
    id: &Uuid,
    first_name: &str,
    middle_name: Option<&str>,
    last_name: &str,
    preferred_first_name: Option<&str>,
    email: &str,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE users SET first_name = ?2, middle_name = ?3, last_name = ?4,
                          preferred_first_name = ?5, email = ?6
         WHERE id = ?1",
        params![id.to_string(), first_name, middle_name, last_name, preferred_first_name, email],
    )?)
}

/// Role rows, admin rights, grants, memberships and help messages go with
/// the user through `ON DELETE CASCADE`.
pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<usize> {
    Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?)
}

pub fn list_users(conn: &Connection) -> Result<Vec<UserListRow>> {
    let sql = format!(
        "SELECT u.id, u.username, {FULL_NAME_SQL},
                (SELECT group_concat(ur.role_id) FROM user_roles ur WHERE ur.user_id = u.id)
         FROM users u
         ORDER BY u.username"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let role_ids: Option<String> = row.get(3)?;
            Ok(UserListRow {
                id: uuid_column(row, 0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                role_ids: role_ids
                    .unwrap_or_default()
                    .split(',')
                    .filter_map(|id| id.trim().parse().ok())
                    .collect(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every user holding the Student role, as (id, full name).
pub fn list_students(conn: &Connection, student_role_id: i64) -> Result<Vec<(Uuid, String)>> {
    let sql = format!(
        "SELECT u.id, {FULL_NAME_SQL}
         FROM users u
         JOIN user_roles ur ON ur.user_id = u.id
         WHERE ur.role_id = ?1
         ORDER BY 2, u.username"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([student_role_id], |row| Ok((uuid_column(row, 0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
