use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::InvitationRow;

pub fn insert_invitation(
    conn: &Connection,
    code: &str,
    role_id: i64,
    expires_at: i64,
    created_at: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO invitation_codes (code, role_id, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![code, role_id, expires_at, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_invitation(conn: &Connection, code: &str) -> Result<Option<InvitationRow>> {
    Ok(conn
        .query_row(
            "SELECT id, code, role_id, expires_at, is_used FROM invitation_codes WHERE code = ?1",
            [code],
            |row| {
                Ok(InvitationRow {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    role_id: row.get(2)?,
                    expires_at: row.get(3)?,
                    is_used: row.get(4)?,
                })
            },
        )
        .optional()?)
}

/// Mark the code used if and only if it is unused and unexpired at `now`.
/// Exactly one concurrent caller can observe 1 here.
pub fn consume_invitation(conn: &Connection, code: &str, now: i64) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE invitation_codes SET is_used = 1
         WHERE code = ?1 AND is_used = 0 AND expires_at > ?2",
        params![code, now],
    )?)
}
