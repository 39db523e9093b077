use anyhow::Result;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::models::{HelpMessageRow, uuid_column};

/// Append a help request. There is no update or delete counterpart.
pub fn insert_help_message(
    conn: &Connection,
    user_id: &Uuid,
    message_type: &str,
    content: &str,
    created_at: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO help_messages (user_id, message_type, content, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id.to_string(), message_type, content, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A user's requests, newest first.
pub fn list_help_messages(conn: &Connection, user_id: &Uuid) -> Result<Vec<HelpMessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, message_type, content, created_at
         FROM help_messages
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(HelpMessageRow {
                id: row.get(0)?,
                user_id: uuid_column(row, 1)?,
                message_type: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::queries::users;

    #[test]
    fn history_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let user = Uuid::new_v4();
            users::insert_user(conn, &user, "sam", "hash", 0)?;
            insert_help_message(conn, &user, "general", "first", 10)?;
            insert_help_message(conn, &user, "specific", "second", 20)?;
            insert_help_message(conn, &user, "general", "same instant", 20)?;

            let contents: Vec<_> = list_help_messages(conn, &user)?
                .into_iter()
                .map(|m| m.content)
                .collect();
            assert_eq!(contents, vec!["same instant", "second", "first"]);

            assert!(insert_help_message(conn, &user, "urgent", "nope", 30).is_err());
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();
    }
}
