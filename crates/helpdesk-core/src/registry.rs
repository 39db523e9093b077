//! Role assignments, admin rights, invitation redemption and group role
//! grants.

use std::collections::BTreeSet;

use helpdesk_db::now_millis;
use helpdesk_db::queries::{groups, invitations, roles, users};
use helpdesk_types::{GrantOutcome, RedeemedInvitation, RevokeOutcome, Role, UserId};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{HelpDeskError, Result};
use crate::{HelpDesk, required};

impl HelpDesk {
    /// Roles held by the user, in presentation order.
    pub fn roles_of(&self, user: &UserId) -> Result<BTreeSet<Role>> {
        self.db.with_conn(|conn| role_set(conn, user))
    }

    pub fn is_admin_right_holder(&self, user: &UserId) -> Result<bool> {
        Ok(self.db.with_conn(|conn| roles::is_admin_right_holder(conn, user))?)
    }

    pub fn grant_admin_right(&self, requester: &UserId, target_username: &str) -> Result<GrantOutcome> {
        let target_username = required("username", target_username)?;
        self.db.with_tx(|tx| {
            require_admin_right(tx, requester)?;
            let target = users::user_id_by_username(tx, target_username)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("user {:?}", target_username)))?;

            if roles::insert_admin_right(tx, &target, now_millis())? == 0 {
                return Ok(GrantOutcome::AlreadyGranted);
            }
            info!("Admin right granted to {} by {}", target, requester);
            Ok(GrantOutcome::Granted)
        })
    }

    pub fn revoke_admin_right(&self, requester: &UserId, target: &UserId) -> Result<RevokeOutcome> {
        self.db.with_tx(|tx| {
            require_admin_right(tx, requester)?;
            if roles::delete_admin_right(tx, target)? == 0 {
                return Ok(RevokeOutcome::NotHolder);
            }
            info!("Admin right revoked from {} by {}", target, requester);
            Ok(RevokeOutcome::Revoked)
        })
    }

    /// Claim the first admin right. Only succeeds while nobody holds one;
    /// returns whether this call became the holder.
    pub fn claim_initial_admin_right(&self, user: &UserId) -> Result<bool> {
        let claimed = self
            .db
            .with_conn(|conn| roles::claim_first_admin_right(conn, user, now_millis()))?
            == 1;
        if claimed {
            info!("Initial admin right claimed by {}", user);
        }
        Ok(claimed)
    }

    /// Holders as (user id, username).
    pub fn list_admin_rights(&self) -> Result<Vec<(UserId, String)>> {
        Ok(self.db.with_conn(roles::list_admin_rights)?)
    }

    /// Consume an invitation code on its own. Sign-up goes through
    /// [`HelpDesk::register_with_invitation`], which redeems inside the
    /// account-creation transaction.
    pub fn redeem_invitation(&self, code: &str) -> Result<RedeemedInvitation> {
        let code = required("invitation code", code)?;
        self.db.with_tx(|tx| redeem_in(tx, code))
    }

    /// Let `target_username` manage the restricted content of a group.
    /// The group is created if it does not exist yet.
    pub fn grant_group_access(
        &self,
        requester: &UserId,
        group_name: &str,
        target_username: &str,
    ) -> Result<GrantOutcome> {
        let group_name = crate::group_name(group_name)?;
        let target_username = required("username", target_username)?;
        self.db.with_tx(|tx| {
            require_admin_right(tx, requester)?;
            let target = users::user_id_by_username(tx, target_username)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("user {:?}", target_username)))?;
            let group_id = groups::ensure_group(tx, group_name)?;

            if groups::grant_group_role(tx, group_id, &target)? == 0 {
                return Ok(GrantOutcome::AlreadyGranted);
            }
            info!("Granted {} access to group {:?}", target_username, group_name);
            Ok(GrantOutcome::Granted)
        })
    }

    pub fn revoke_group_access(
        &self,
        requester: &UserId,
        group_name: &str,
        target_username: &str,
    ) -> Result<RevokeOutcome> {
        let group_name = required("group name", group_name)?;
        let target_username = required("username", target_username)?;
        self.db.with_tx(|tx| {
            require_admin_right(tx, requester)?;
            let target = users::user_id_by_username(tx, target_username)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("user {:?}", target_username)))?;
            let Some(group_id) = groups::find_group_id(tx, group_name)? else {
                return Ok(RevokeOutcome::NotHolder);
            };

            if groups::revoke_group_role(tx, group_id, &target)? == 0 {
                return Ok(RevokeOutcome::NotHolder);
            }
            info!("Revoked {} access to group {:?}", target_username, group_name);
            Ok(RevokeOutcome::Revoked)
        })
    }
}

pub(crate) fn role_set(conn: &Connection, user: &UserId) -> Result<BTreeSet<Role>> {
    Ok(roles::role_ids_of(conn, user)?
        .into_iter()
        .filter_map(Role::from_id)
        .collect())
}

pub(crate) fn require_role(conn: &Connection, user: &UserId, role: Role) -> Result<()> {
    if !roles::has_role(conn, user, role.id())? {
        warn!("Refused {}: missing role {}", user, role);
        return Err(HelpDeskError::Unauthorized(format!("{} role required", role)));
    }
    Ok(())
}

pub(crate) fn require_admin_right(conn: &Connection, user: &UserId) -> Result<()> {
    if !roles::is_admin_right_holder(conn, user)? {
        warn!("Refused {}: not an admin right holder", user);
        return Err(HelpDeskError::Unauthorized("admin right required".into()));
    }
    Ok(())
}

/// Check-and-mark in one conditional update. When nothing was marked the
/// row is read back only to report why.
pub(crate) fn redeem_in(conn: &Connection, code: &str) -> Result<RedeemedInvitation> {
    let consumed = invitations::consume_invitation(conn, code, now_millis())? == 1;
    let row = invitations::get_invitation(conn, code)?.ok_or(HelpDeskError::InvalidCode)?;

    if !consumed {
        return Err(if row.is_used {
            HelpDeskError::AlreadyUsed
        } else {
            HelpDeskError::Expired("invitation code")
        });
    }

    let role = Role::from_id(row.role_id)
        .ok_or_else(|| HelpDeskError::NotFound(format!("role id {}", row.role_id)))?;
    info!("Invitation {} redeemed for role {}", row.id, role);
    Ok(RedeemedInvitation { code_id: row.id, role })
}
