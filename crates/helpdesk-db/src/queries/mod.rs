//! Table-level queries. Every function takes a plain `&Connection` so it
//! can run either in autocommit mode or inside a caller's transaction
//! (`Transaction` derefs to `Connection`).

pub mod access;
pub mod articles;
pub mod groups;
pub mod invitations;
pub mod messages;
pub mod roles;
pub mod users;

/// "First Last" for a `users u` alias, username when both parts are blank.
pub(crate) const FULL_NAME_SQL: &str = "COALESCE(NULLIF(TRIM(COALESCE(u.first_name, '') || ' ' || COALESCE(u.last_name, '')), ''), u.username)";

/// Escape `%`, `_` and `\` for use in a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for ch in fragment.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
