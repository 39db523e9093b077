//! Help desk core: credentials, roles and admin rights, articles and
//! groups, per-viewer access checks, backup and restore.
//!
//! Every operation is a method on [`HelpDesk`]; the method groups live in
//! one module per concern. Callers pass the id of an already authenticated
//! user; session handling is theirs.

pub mod access;
pub mod accounts;
pub mod articles;
pub mod backup;
pub mod config;
pub mod credentials;
pub mod error;
pub mod groups;
pub mod help_requests;
pub mod registry;

use std::path::Path;

use chrono::TimeDelta;
use helpdesk_crypto::SecretHasher;
use helpdesk_db::{Database, now_millis};
use tracing::info;

pub use config::HelpDeskConfig;
pub use error::{ErrorKind, HelpDeskError, Result};
pub use helpdesk_types as types;

pub struct HelpDesk {
    db: Database,
    hasher: SecretHasher,
    config: HelpDeskConfig,
}

impl HelpDesk {
    pub fn open(path: &Path, config: HelpDeskConfig) -> Result<Self> {
        let db = Database::open(path, config.lock_wait)?;
        let desk = Self::with_database(db, config)?;
        info!("Help desk ready ({})", path.display());
        Ok(desk)
    }

    pub fn open_in_memory(config: HelpDeskConfig) -> Result<Self> {
        Self::with_database(Database::open_in_memory()?, config)
    }

    fn with_database(db: Database, config: HelpDeskConfig) -> Result<Self> {
        let hasher = SecretHasher::new(config.hash_cost)?;
        Ok(Self { db, hasher, config })
    }

    pub fn config(&self) -> &HelpDeskConfig {
        &self.config
    }
}

/// Trimmed value of a required field, or a validation error naming it.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HelpDeskError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

/// A group name that can be created. Article drafts list groups separated
/// by commas, so a name containing one could never be addressed from a draft.
pub(crate) fn group_name(value: &str) -> Result<&str> {
    let name = required("group name", value)?;
    if name.contains(',') {
        return Err(HelpDeskError::Validation(format!(
            "group name {:?} may not contain a comma",
            name
        )));
    }
    Ok(name)
}

/// Secret and confirmation must be non-empty and equal.
pub(crate) fn confirmed_secret<'a>(secret: &'a str, confirm: &str) -> Result<&'a str> {
    if secret.is_empty() {
        return Err(HelpDeskError::Validation("secret is required".into()));
    }
    if secret != confirm {
        return Err(HelpDeskError::Validation("secrets do not match".into()));
    }
    Ok(secret)
}

/// `now + ttl` in storage milliseconds.
pub(crate) fn expiry_from_now(ttl: TimeDelta) -> i64 {
    now_millis().saturating_add(ttl.num_milliseconds())
}
