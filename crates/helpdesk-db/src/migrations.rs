use anyhow::{Result, anyhow};
use rusqlite::Connection;
use tracing::info;

use crate::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;
        for version in (current + 1)..=CURRENT_VERSION {
            apply(&tx, version)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }
        tx.commit()?;
        info!("Database migrated to schema v{}", CURRENT_VERSION);
    }

    Ok(())
}

fn apply(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(anyhow!("unknown migration version: {}", version)),
    }
}

fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE roles (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL UNIQUE
        );

        INSERT INTO roles (id, name) VALUES
            (1, 'Admin'),
            (2, 'Instructor'),
            (3, 'Student');

        CREATE TABLE users (
            id                      TEXT PRIMARY KEY,
            username                TEXT NOT NULL UNIQUE,
            email                   TEXT,
            secret_hash             TEXT NOT NULL,
            first_name              TEXT,
            middle_name             TEXT,
            last_name               TEXT,
            preferred_first_name    TEXT,
            is_one_time_secret      INTEGER NOT NULL DEFAULT 0,
            one_time_expires_at     INTEGER,
            created_at              INTEGER NOT NULL
        );

        CREATE TABLE user_roles (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_id     INTEGER NOT NULL REFERENCES roles(id),
            PRIMARY KEY (user_id, role_id)
        );

        CREATE TABLE invitation_codes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            code        TEXT NOT NULL UNIQUE,
            role_id     INTEGER NOT NULL REFERENCES roles(id),
            expires_at  INTEGER NOT NULL,
            is_used     INTEGER NOT NULL DEFAULT 0,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE admin_rights (
            user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            granted_at  INTEGER NOT NULL
        );

        -- Authorship columns are not foreign keys: restored articles may
        -- name authors that do not exist in this database.
        CREATE TABLE help_articles (
            id                  TEXT PRIMARY KEY,
            title               TEXT NOT NULL,
            description         TEXT NOT NULL,
            level               TEXT NOT NULL
                CHECK (level IN ('beginner', 'intermediate', 'advanced', 'expert')),
            keywords            TEXT NOT NULL DEFAULT '',
            body                TEXT NOT NULL,
            reference_links     TEXT,
            is_restricted       INTEGER NOT NULL DEFAULT 0,
            public_title        TEXT,
            public_desc         TEXT,
            created_by          TEXT,
            last_modified_by    TEXT,
            created_at          INTEGER NOT NULL,
            updated_at          INTEGER NOT NULL,
            CHECK (is_restricted = 1 OR (public_title IS NULL AND public_desc IS NULL))
        );

        CREATE TABLE help_groups (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            name    TEXT NOT NULL UNIQUE
        );

        CREATE TABLE article_groups (
            article_id          TEXT NOT NULL REFERENCES help_articles(id),
            group_id            INTEGER NOT NULL REFERENCES help_groups(id),
            is_special_access   INTEGER NOT NULL DEFAULT 0,
            granted_by          TEXT,
            PRIMARY KEY (article_id, group_id)
        );

        CREATE INDEX idx_article_groups_group ON article_groups(group_id);

        CREATE TABLE group_role_grants (
            group_id    INTEGER NOT NULL REFERENCES help_groups(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE student_groups (
            group_id    INTEGER NOT NULL REFERENCES help_groups(id),
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE help_messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            message_type    TEXT NOT NULL CHECK (message_type IN ('general', 'specific')),
            content         TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX idx_help_messages_user ON help_messages(user_id, created_at);
        ",
    )?;

    Ok(())
}
