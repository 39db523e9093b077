use helpdesk_db::models::GroupSummaryRow;
use helpdesk_db::queries::{access, articles, groups, roles, users};
use helpdesk_types::{ArticleId, GroupId, GroupSummary, Role, UserId};
use tracing::{debug, info, warn};

use crate::error::{HelpDeskError, Result};
use crate::{HelpDesk, group_name, required};

impl HelpDesk {
    /// Find-or-create a group by name. Concurrent callers with the same new
    /// name all receive the one id that gets stored.
    pub fn ensure_group(&self, name: &str) -> Result<GroupId> {
        let name = group_name(name)?;
        Ok(self.db.with_conn(|conn| groups::ensure_group(conn, name))?)
    }

    /// Map an article into a group. Repeating the pair changes nothing.
    pub fn map_article(&self, article: &ArticleId, group: GroupId) -> Result<()> {
        self.db.with_tx(|tx| {
            if !articles::article_exists(tx, article)? {
                return Err(HelpDeskError::NotFound(format!("article {}", article)));
            }
            if groups::map_article(tx, article, group, None)? == 1 {
                debug!("Mapped article {} into group {}", article, group);
            }
            Ok(())
        })
    }

    /// Remove the group's student memberships, then its article mappings,
    /// then the group itself. All three commit together or not at all.
    pub fn delete_group(&self, name: &str) -> Result<()> {
        let name = required("group name", name)?;
        let (members, mappings) = self.db.with_tx(|tx| {
            let group_id = groups::find_group_id(tx, name)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("group {:?}", name)))?;
            let members = groups::delete_student_memberships_for_group(tx, group_id)?;
            let mappings = groups::delete_article_mappings_for_group(tx, group_id)?;
            groups::delete_group_row(tx, group_id)?;
            Ok::<_, HelpDeskError>((members, mappings))
        })?;

        info!(
            "Group {:?} deleted ({} memberships, {} article mappings)",
            name, members, mappings
        );
        Ok(())
    }

    /// Enrol a student, creating the group if needed. Idempotent.
    pub fn add_student_to_group(&self, student: &UserId, name: &str) -> Result<()> {
        let group_name = group_name(name)?;
        self.db.with_tx(|tx| {
            if users::get_user_by_id(tx, student)?.is_none() {
                return Err(HelpDeskError::NotFound(format!("user {}", student)));
            }
            let group_id = groups::ensure_group(tx, group_name)?;
            groups::add_student(tx, group_id, student)?;
            Ok(())
        })
    }

    pub fn remove_student_from_group(&self, student: &UserId, group_name: &str) -> Result<()> {
        let group_name = required("group name", group_name)?;
        self.db.with_tx(|tx| {
            let group_id = groups::find_group_id(tx, group_name)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("group {:?}", group_name)))?;
            if groups::remove_student(tx, group_id, student)? == 0 {
                return Err(HelpDeskError::NotFound(format!(
                    "{} is not a member of {:?}",
                    student, group_name
                )));
            }
            Ok(())
        })
    }

    /// Every group with its article titles and student member names.
    pub fn list_groups_with_summary(&self) -> Result<Vec<GroupSummary>> {
        let rows = self.db.with_conn(|conn| groups::list_group_summaries(conn, None))?;
        Ok(rows.into_iter().map(summary).collect())
    }

    /// Groups whose name contains `fragment`, case-insensitively.
    pub fn search_groups(&self, fragment: &str) -> Result<Vec<GroupSummary>> {
        let fragment = fragment.trim();
        let rows = self
            .db
            .with_conn(|conn| groups::list_group_summaries(conn, Some(fragment)))?;
        Ok(rows.into_iter().map(summary).collect())
    }

    pub fn list_group_names(&self) -> Result<Vec<String>> {
        Ok(self.db.with_conn(groups::list_group_names)?)
    }

    /// Enrol the selected students in one transaction. The requester must
    /// hold a role grant on the group; every id must be a Student-role
    /// user. Returns how many memberships are new.
    pub fn save_group_roster(
        &self,
        requester: &UserId,
        group_name: &str,
        students: &[UserId],
    ) -> Result<usize> {
        let group_name = required("group name", group_name)?;
        let added = self.db.with_tx(|tx| {
            let group_id = groups::find_group_id(tx, group_name)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("group {:?}", group_name)))?;
            if !access::has_group_grant(tx, group_id, requester)? {
                warn!("Refused roster save by {} on {:?}: no grant", requester, group_name);
                return Err(HelpDeskError::Unauthorized(format!(
                    "no access to group {:?}",
                    group_name
                )));
            }

            let mut added = 0;
            for student in students {
                if !roles::has_role(tx, student, Role::Student.id())? {
                    return Err(HelpDeskError::Validation(format!("{} is not a student", student)));
                }
                added += groups::add_student(tx, group_id, student)?;
            }
            Ok(added)
        })?;

        info!("Roster of {:?} saved: {} new members", group_name, added);
        Ok(added)
    }
}

fn summary(row: GroupSummaryRow) -> GroupSummary {
    GroupSummary {
        name: row.name,
        article_titles: row.article_titles.unwrap_or_default(),
        member_names: row.member_names.unwrap_or_default(),
    }
}
