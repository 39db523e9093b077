/// Database row types. These map directly to SQLite rows and stay distinct
/// from the helpdesk-types models so the storage layer has no domain logic.
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub secret_hash: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_first_name: Option<String>,
    pub is_one_time_secret: bool,
    pub one_time_expires_at: Option<i64>,
    pub created_at: i64,
}

pub struct InvitationRow {
    pub id: i64,
    pub code: String,
    pub role_id: i64,
    pub expires_at: i64,
    pub is_used: bool,
}

/// Article row, `body` exactly as stored (sealed when restricted).
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub level: String,
    pub keywords: String,
    pub body: String,
    pub reference_links: Option<String>,
    pub is_restricted: bool,
    pub public_title: Option<String>,
    pub public_desc: Option<String>,
    pub created_by: Option<Uuid>,
    pub last_modified_by: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Mapped group names in name order.
    pub groups: Vec<String>,
}

/// Article columns for insert and update. `body` must already be in its
/// stored form.
pub struct ArticleFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub level: &'a str,
    pub keywords: &'a str,
    pub body: &'a str,
    pub reference_links: Option<&'a str>,
    pub is_restricted: bool,
    pub public_title: Option<&'a str>,
    pub public_desc: Option<&'a str>,
}

pub struct ArticleInsert<'a> {
    pub id: Uuid,
    pub fields: ArticleFields<'a>,
    pub created_by: Option<Uuid>,
    pub last_modified_by: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct GroupSummaryRow {
    pub name: String,
    pub article_titles: Option<String>,
    pub member_names: Option<String>,
}

pub struct UserListRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role_ids: Vec<i64>,
}

pub struct HelpMessageRow {
    pub id: i64,
    pub user_id: Uuid,
    pub message_type: String,
    pub content: String,
    pub created_at: i64,
}

pub(crate) fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode a `json_group_array` column. Names travel as JSON so a comma
/// inside one name cannot split it.
pub(crate) fn json_list_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Uuid::parse_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
