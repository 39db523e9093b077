use helpdesk_crypto::generate_code;
use helpdesk_db::queries::users;
use helpdesk_db::{now_millis, to_datetime};
use helpdesk_types::{LoginOutcome, OneTimeSecret, UserId};
use tracing::{info, warn};

use crate::error::{HelpDeskError, Result};
use crate::{HelpDesk, confirmed_secret, expiry_from_now};

const ONE_TIME_SECRET_LEN: usize = 12;

impl HelpDesk {
    /// Check a username/secret pair.
    ///
    /// An unknown username and a wrong secret both yield
    /// [`HelpDeskError::AuthFailure`]. A valid one-time secret logs in as
    /// [`LoginOutcome::ResetRequired`] until [`HelpDesk::complete_reset`]
    /// stores a self-chosen one.
    pub fn verify(&self, username: &str, secret: &str) -> Result<LoginOutcome> {
        let user = self
            .db
            .with_conn(|conn| users::get_user_by_username(conn, username.trim()))?;

        let Some(user) = user else {
            self.hasher.verify_decoy(secret)?;
            warn!("Login refused: unknown username");
            return Err(HelpDeskError::AuthFailure);
        };

        // Hash outside the connection lock.
        if !self.hasher.verify(secret, &user.secret_hash)? {
            warn!("Login refused for {}: wrong secret", user.id);
            return Err(HelpDeskError::AuthFailure);
        }

        if !user.is_one_time_secret {
            return Ok(LoginOutcome::Authenticated(user.id));
        }
        match user.one_time_expires_at {
            Some(expires_at) if expires_at > now_millis() => Ok(LoginOutcome::ResetRequired(user.id)),
            _ => {
                warn!("Login refused for {}: one-time secret expired", user.id);
                Err(HelpDeskError::Expired("one-time secret"))
            }
        }
    }

    /// Replace the user's secret with a random one-time secret valid for
    /// the configured reset window. The plaintext is returned once and
    /// never stored.
    pub fn issue_one_time_secret_for(&self, user: &UserId) -> Result<OneTimeSecret> {
        let secret = generate_code(ONE_TIME_SECRET_LEN);
        let hash = self.hasher.hash(&secret)?;
        let expires_at = expiry_from_now(self.config.reset_ttl);

        let updated = self
            .db
            .with_conn(|conn| users::set_one_time_secret(conn, user, &hash, expires_at))?;
        if updated == 0 {
            return Err(HelpDeskError::NotFound(format!("user {}", user)));
        }

        info!("One-time secret issued for {}", user);
        Ok(OneTimeSecret {
            secret,
            expires_at: to_datetime(expires_at),
        })
    }

    /// Leave one-time mode by choosing a new secret. Only valid while the
    /// one-time secret is still unexpired.
    pub fn complete_reset(&self, user: &UserId, new_secret: &str, confirm: &str) -> Result<()> {
        let new_secret = confirmed_secret(new_secret, confirm)?;
        let hash = self.hasher.hash(new_secret)?;

        self.db.with_tx(|tx| {
            let row = users::get_user_by_id(tx, user)?
                .ok_or_else(|| HelpDeskError::NotFound(format!("user {}", user)))?;
            if !row.is_one_time_secret {
                return Err(HelpDeskError::Validation("no reset is pending".into()));
            }
            if row.one_time_expires_at.is_none_or(|at| at <= now_millis()) {
                return Err(HelpDeskError::Expired("one-time secret"));
            }
            users::set_secret(tx, user, &hash)?;
            Ok(())
        })?;

        info!("Secret reset completed for {}", user);
        Ok(())
    }
}
