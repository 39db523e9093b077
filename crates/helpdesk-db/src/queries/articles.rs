use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::like_pattern;
use crate::models::{
    ArticleFields, ArticleInsert, ArticleRow, json_list_column, opt_uuid_column, uuid_column,
};

/// Column list for `help_articles a`, with the article's group names
/// aggregated into a JSON array in name order.
const ARTICLE_SELECT: &str = "SELECT a.id, a.title, a.description, a.level, a.keywords, a.body,
            a.reference_links, a.is_restricted, a.public_title, a.public_desc,
            a.created_by, a.last_modified_by, a.created_at, a.updated_at,
            (SELECT json_group_array(g.name ORDER BY g.name)
             FROM article_groups m
             JOIN help_groups g ON g.id = m.group_id
             WHERE m.article_id = a.id) AS group_names
     FROM help_articles a";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleRow> {
    Ok(ArticleRow {
        id: uuid_column(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        level: row.get(3)?,
        keywords: row.get(4)?,
        body: row.get(5)?,
        reference_links: row.get(6)?,
        is_restricted: row.get(7)?,
        public_title: row.get(8)?,
        public_desc: row.get(9)?,
        created_by: opt_uuid_column(row, 10)?,
        last_modified_by: opt_uuid_column(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        groups: json_list_column(row, 14)?,
    })
}

fn collect_articles(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ArticleRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, article_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

const INSERT_ARTICLE: &str = "INSERT INTO help_articles (
        id, title, description, level, keywords, body, reference_links,
        is_restricted, public_title, public_desc,
        created_by, last_modified_by, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)";

fn run_insert(conn: &Connection, sql: &str, article: &ArticleInsert<'_>) -> Result<usize> {
    let f = &article.fields;
    let mut stmt = conn.prepare_cached(sql)?;
    Ok(stmt.execute(params![
        article.id.to_string(),
        f.title,
        f.description,
        f.level,
        f.keywords,
        f.body,
        f.reference_links,
        f.is_restricted,
        f.public_title,
        f.public_desc,
        article.created_by.map(|id| id.to_string()),
        article.last_modified_by.map(|id| id.to_string()),
        article.created_at,
        article.updated_at,
    ])?)
}

pub fn insert_article(conn: &Connection, article: &ArticleInsert<'_>) -> Result<()> {
    run_insert(conn, INSERT_ARTICLE, article)?;
    Ok(())
}

/// Insert unless an article with the same id exists; returns rows inserted.
pub fn insert_article_if_absent(conn: &Connection, article: &ArticleInsert<'_>) -> Result<usize> {
    let sql = format!("{INSERT_ARTICLE} ON CONFLICT(id) DO NOTHING");
    run_insert(conn, &sql, article)
}

/// Overwrite an article's fields and stamp the editor; returns rows affected.
pub fn update_article(
    conn: &Connection,
    id: &Uuid,
    fields: &ArticleFields<'_>,
    editor: &Uuid,
    now: i64,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE help_articles SET
            title = ?2, description = ?3, level = ?4, keywords = ?5, body = ?6,
            reference_links = ?7, is_restricted = ?8, public_title = ?9, public_desc = ?10,
            last_modified_by = ?11, updated_at = ?12
         WHERE id = ?1",
        params![
            id.to_string(),
            fields.title,
            fields.description,
            fields.level,
            fields.keywords,
            fields.body,
            fields.reference_links,
            fields.is_restricted,
            fields.public_title,
            fields.public_desc,
            editor.to_string(),
            now,
        ],
    )?)
}

pub fn delete_article_row(conn: &Connection, id: &Uuid) -> Result<usize> {
    Ok(conn.execute("DELETE FROM help_articles WHERE id = ?1", [id.to_string()])?)
}

pub fn article_exists(conn: &Connection, id: &Uuid) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM help_articles WHERE id = ?1)",
        [id.to_string()],
        |row| row.get(0),
    )?)
}

pub fn get_article(conn: &Connection, id: &Uuid) -> Result<Option<ArticleRow>> {
    let sql = format!("{ARTICLE_SELECT} WHERE a.id = ?1");
    Ok(conn
        .query_row(&sql, [id.to_string()], article_from_row)
        .optional()?)
}

pub fn list_articles(conn: &Connection) -> Result<Vec<ArticleRow>> {
    let sql = format!("{ARTICLE_SELECT} ORDER BY a.created_at, a.id");
    collect_articles(conn, &sql, [])
}

/// Articles mapped to the named group, each still annotated with all of
/// its groups.
pub fn list_articles_in_group(conn: &Connection, group_name: &str) -> Result<Vec<ArticleRow>> {
    let sql = format!(
        "{ARTICLE_SELECT}
         WHERE EXISTS (SELECT 1 FROM article_groups m
                       JOIN help_groups g ON g.id = m.group_id
                       WHERE m.article_id = a.id AND g.name = ?1)
         ORDER BY a.created_at, a.id"
    );
    collect_articles(conn, &sql, [group_name])
}

/// Case-insensitive substring match over title, description and keywords.
/// One row per article.
pub fn search_articles(conn: &Connection, text: &str) -> Result<Vec<ArticleRow>> {
    let sql = format!(
        "{ARTICLE_SELECT}
         WHERE lower(a.title) LIKE ?1 ESCAPE '\\'
            OR lower(a.description) LIKE ?1 ESCAPE '\\'
            OR lower(a.keywords) LIKE ?1 ESCAPE '\\'
         ORDER BY a.created_at, a.id"
    );
    collect_articles(conn, &sql, [like_pattern(text)])
}

pub fn delete_all_articles(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM help_articles", [])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::queries::groups;

    fn fields<'a>(title: &'a str, keywords: &'a str) -> ArticleFields<'a> {
        ArticleFields {
            title,
            description: "desc",
            level: "beginner",
            keywords,
            body: "body",
            reference_links: None,
            is_restricted: false,
            public_title: None,
            public_desc: None,
        }
    }

    fn insert(conn: &Connection, title: &str, keywords: &str, at: i64) -> Uuid {
        let id = Uuid::new_v4();
        insert_article(
            conn,
            &ArticleInsert {
                id,
                fields: fields(title, keywords),
                created_by: None,
                last_modified_by: None,
                created_at: at,
                updated_at: at,
            },
        )
        .unwrap();
        id
    }

    #[test]
    fn group_names_come_back_sorted() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let id = insert(conn, "IDE setup", "", 1);
            assert!(get_article(conn, &id)?.unwrap().groups.is_empty());

            for name in ["IntelliJ", "Eclipse"] {
                let gid = groups::ensure_group(conn, name)?;
                groups::map_article(conn, &id, gid, None)?;
            }
            let row = get_article(conn, &id)?.unwrap();
            assert_eq!(row.groups, vec!["Eclipse", "IntelliJ"]);
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();
    }

    #[test]
    fn comma_in_group_name_stays_one_group() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let id = insert(conn, "Generics", "", 1);
            let gid = groups::ensure_group(conn, "Java, Advanced")?;
            groups::map_article(conn, &id, gid, None)?;

            let row = get_article(conn, &id)?.unwrap();
            assert_eq!(row.groups, vec!["Java, Advanced"]);
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert(conn, "Installing Java", "jdk", 1);
            insert(conn, "Git basics", "vcs, JAVA tooling", 2);
            insert(conn, "100% coverage", "", 3);

            assert_eq!(search_articles(conn, "java")?.len(), 2);
            assert_eq!(search_articles(conn, "GIT")?.len(), 1);
            assert_eq!(search_articles(conn, "%")?.len(), 1);
            assert!(search_articles(conn, "python")?.is_empty());
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();
    }

    #[test]
    fn insert_if_absent_skips_existing() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let id = insert(conn, "Original", "", 1);
            let again = ArticleInsert {
                id,
                fields: fields("Incoming", ""),
                created_by: None,
                last_modified_by: None,
                created_at: 2,
                updated_at: 2,
            };
            assert_eq!(insert_article_if_absent(conn, &again)?, 0);
            assert_eq!(get_article(conn, &id)?.unwrap().title, "Original");
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();
    }
}
