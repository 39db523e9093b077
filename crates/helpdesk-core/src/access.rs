//! Visibility of restricted content.
//!
//! Staff (Admin, Instructor) need a group role grant, students a group
//! membership, on at least one of the article's groups. Open articles are
//! visible to everyone. Every check reads the grant tables afresh.

use helpdesk_db::models::ArticleRow;
use helpdesk_db::queries::{access, articles, groups};
use helpdesk_types::{ArticleId, Perspective, Role, UserId};
use rusqlite::Connection;

use crate::error::{HelpDeskError, Result};
use crate::registry::role_set;
use crate::{HelpDesk, required};

impl HelpDesk {
    /// Staff rule for one article. Open articles always pass.
    pub fn staff_can_view(&self, user: &UserId, article: &ArticleId) -> Result<bool> {
        self.article_rule(user, article, Perspective::Staff)
    }

    /// Student rule for one article.
    pub fn student_can_view(&self, user: &UserId, article: &ArticleId) -> Result<bool> {
        self.article_rule(user, article, Perspective::Student)
    }

    /// Does the user hold a role grant on the named group? An unknown group
    /// grants nothing.
    pub fn can_manage_group(&self, user: &UserId, group_name: &str) -> Result<bool> {
        let group_name = required("group name", group_name)?;
        Ok(self.db.with_conn(|conn| match groups::find_group_id(conn, group_name)? {
            Some(group_id) => access::has_group_grant(conn, group_id, user),
            None => Ok(false),
        })?)
    }

    pub fn is_group_member(&self, user: &UserId, group_name: &str) -> Result<bool> {
        let group_name = required("group name", group_name)?;
        Ok(self.db.with_conn(|conn| match groups::find_group_id(conn, group_name)? {
            Some(group_id) => access::is_group_member(conn, group_id, user),
            None => Ok(false),
        })?)
    }

    fn article_rule(&self, user: &UserId, article: &ArticleId, perspective: Perspective) -> Result<bool> {
        self.db.with_conn(|conn| {
            let row = articles::get_article(conn, article)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("article {}", article)))?;
            body_visible(conn, user, &row, Some(perspective))
        })
    }
}

fn rule_passes(
    conn: &Connection,
    user: &UserId,
    article: &ArticleId,
    perspective: Perspective,
) -> anyhow::Result<bool> {
    match perspective {
        Perspective::Staff => access::staff_authorized_for_article(conn, user, article),
        Perspective::Student => access::student_authorized_for_article(conn, user, article),
    }
}

/// May `user` read the body of `row`?
///
/// With a perspective only that rule is evaluated. Without one, the staff
/// rule applies if the user holds a staff role and the student rule if
/// they hold the Student role; either passing is enough.
pub(crate) fn body_visible(
    conn: &Connection,
    user: &UserId,
    row: &ArticleRow,
    perspective: Option<Perspective>,
) -> Result<bool> {
    if !row.is_restricted {
        return Ok(true);
    }
    if let Some(perspective) = perspective {
        return Ok(rule_passes(conn, user, &row.id, perspective)?);
    }

    let roles = role_set(conn, user)?;
    if roles.iter().any(|r| r.is_staff()) && rule_passes(conn, user, &row.id, Perspective::Staff)? {
        return Ok(true);
    }
    if roles.contains(&Role::Student)
        && rule_passes(conn, user, &row.id, Perspective::Student)?
    {
        return Ok(true);
    }
    Ok(false)
}
