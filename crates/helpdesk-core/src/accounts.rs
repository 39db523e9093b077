//! Account lifecycle: bootstrap, invitations and sign-up, profiles, role
//! changes, removal.

use helpdesk_crypto::generate_code;
use helpdesk_db::queries::{invitations, roles, users};
use helpdesk_db::{now_millis, to_datetime};
use helpdesk_types::{
    Invitation, OneTimeSecret, ProfileUpdate, Role, StudentRecord, UserId, UserSummary,
};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::error::{HelpDeskError, Result};
use crate::registry::{redeem_in, require_role};
use crate::{HelpDesk, confirmed_secret, expiry_from_now, required};

const INVITATION_CODE_LEN: usize = 12;

impl HelpDesk {
    /// Create the very first account, holding the Admin role and an admin
    /// right. Fails with `Conflict` once any user exists.
    pub fn bootstrap_admin(&self, username: &str, secret: &str, confirm: &str) -> Result<UserId> {
        let username = required("username", username)?;
        let hash = self.hasher.hash(confirmed_secret(secret, confirm)?)?;
        let id = Uuid::new_v4();

        self.db.with_tx(|tx| {
            if users::count_users(tx)? > 0 {
                return Err(HelpDeskError::Conflict("accounts already exist".into()));
            }
            let now = now_millis();
            users::insert_user(tx, &id, username, &hash, now)?;
            roles::add_role(tx, &id, Role::Admin.id())?;
            roles::insert_admin_right(tx, &id, now)?;
            Ok(())
        })?;

        info!("Bootstrapped admin account {} ({})", username, id);
        Ok(id)
    }

    pub fn issue_invitation(&self, requester: &UserId, role: Role) -> Result<Invitation> {
        let code = generate_code(INVITATION_CODE_LEN);
        let expires_at = expiry_from_now(self.config.invitation_ttl);

        self.db.with_tx(|tx| {
            require_role(tx, requester, Role::Admin)?;
            invitations::insert_invitation(tx, &code, role.id(), expires_at, now_millis())?;
            Ok::<_, HelpDeskError>(())
        })?;

        info!("Invitation issued by {} for role {}", requester, role);
        Ok(Invitation {
            code,
            role,
            expires_at: to_datetime(expires_at),
        })
    }

    /// Sign up with an invitation code. The code is redeemed in the same
    /// transaction that creates the account, so a failed sign-up leaves it
    /// unused.
    pub fn register_with_invitation(
        &self,
        code: &str,
        username: &str,
        secret: &str,
        confirm: &str,
    ) -> Result<UserId> {
        let code = required("invitation code", code)?;
        let username = required("username", username)?;
        let hash = self.hasher.hash(confirmed_secret(secret, confirm)?)?;
        let id = Uuid::new_v4();

        let role = self.db.with_tx(|tx| {
            let redeemed = redeem_in(tx, code)?;
            if users::insert_user(tx, &id, username, &hash, now_millis())? == 0 {
                return Err(HelpDeskError::Conflict(format!("username {:?} is taken", username)));
            }
            roles::add_role(tx, &id, redeemed.role.id())?;
            Ok(redeemed.role)
        })?;

        info!("Registered {} ({}) as {}", username, id, role);
        Ok(id)
    }

    pub fn complete_profile(&self, user: &UserId, profile: &ProfileUpdate) -> Result<()> {
        let first = required("first name", &profile.first_name)?;
        let last = required("last name", &profile.last_name)?;
        let email = required("email", &profile.email)?;
        let middle = optional(profile.middle_name.as_deref());
        let preferred = optional(profile.preferred_first_name.as_deref());

        let updated = self.db.with_conn(|conn| {
            users::update_profile(conn, user, first, middle, last, preferred, email)
        })?;
        if updated == 0 {
            return Err(HelpDeskError::NotFound(format!("user {}", user)));
        }
        Ok(())
    }

    /// Admin-initiated password reset for `username`.
    pub fn issue_one_time_secret(&self, requester: &UserId, username: &str) -> Result<OneTimeSecret> {
        let username = required("username", username)?;
        let target = self.db.with_conn(|conn| {
            require_role(conn, requester, Role::Admin)?;
            find_user(conn, username)
        })?;
        self.issue_one_time_secret_for(&target)
    }

    /// Remove an account with its roles, admin right, grants, memberships
    /// and help requests.
    pub fn delete_user(&self, requester: &UserId, username: &str) -> Result<()> {
        let username = required("username", username)?;
        self.db.with_tx(|tx| {
            require_role(tx, requester, Role::Admin)?;
            let target = find_user(tx, username)?;
            users::delete_user(tx, &target)?;
            Ok::<_, HelpDeskError>(())
        })?;
        info!("Deleted user {} (by {})", username, requester);
        Ok(())
    }

    pub fn add_role(&self, requester: &UserId, username: &str, role: Role) -> Result<()> {
        let username = required("username", username)?;
        self.db.with_tx(|tx| {
            require_role(tx, requester, Role::Admin)?;
            let target = find_user(tx, username)?;
            if roles::add_role(tx, &target, role.id())? == 0 {
                return Err(HelpDeskError::Conflict(format!("{} already has role {}", username, role)));
            }
            Ok(())
        })?;
        info!("Added role {} to {}", role, username);
        Ok(())
    }

    pub fn remove_role(&self, requester: &UserId, username: &str, role: Role) -> Result<()> {
        let username = required("username", username)?;
        self.db.with_tx(|tx| {
            require_role(tx, requester, Role::Admin)?;
            let target = find_user(tx, username)?;
            if roles::remove_role(tx, &target, role.id())? == 0 {
                return Err(HelpDeskError::NotFound(format!("{} does not have role {}", username, role)));
            }
            Ok(())
        })?;
        info!("Removed role {} from {}", role, username);
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<UserSummary>> {
        let rows = self.db.with_conn(users::list_users)?;
        Ok(rows
            .into_iter()
            .map(|row| UserSummary {
                id: row.id,
                username: row.username,
                full_name: row.full_name,
                roles: row.role_ids.into_iter().filter_map(Role::from_id).collect(),
            })
            .collect())
    }

    /// Every Student-role user; the source for group rosters.
    pub fn list_students(&self) -> Result<Vec<StudentRecord>> {
        let rows = self
            .db
            .with_conn(|conn| users::list_students(conn, Role::Student.id()))?;
        Ok(rows
            .into_iter()
            .map(|(id, full_name)| StudentRecord { id, full_name })
            .collect())
    }
}

fn find_user(conn: &Connection, username: &str) -> Result<UserId> {
    users::user_id_by_username(conn, username)?
        .ok_or_else(|| HelpDeskError::NotFound(format!("user {:?}", username)))
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
