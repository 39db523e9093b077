use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::TimeDelta;
use helpdesk_crypto::{BodyKey, HashCost, generate_body_key, key_from_base64};
use helpdesk_db::DEFAULT_LOCK_WAIT;

/// Runtime settings for a [`HelpDesk`](crate::HelpDesk).
#[derive(Clone)]
pub struct HelpDeskConfig {
    /// AES-256-GCM key for restricted bodies. Bodies sealed under one key do
    /// not open under another.
    pub body_key: BodyKey,
    pub hash_cost: HashCost,
    pub invitation_ttl: TimeDelta,
    pub reset_ttl: TimeDelta,
    /// Give every admin right holder a role grant on a new article's groups.
    pub grant_admins_on_create: bool,
    /// Enrol whoever edits an article as an admin right holder.
    pub enroll_editor_on_update: bool,
    /// SQLite busy timeout for ordinary operations.
    pub lock_wait: Duration,
    /// Busy timeout while a restore transaction runs.
    pub restore_lock_wait: Duration,
}

impl Default for HelpDeskConfig {
    fn default() -> Self {
        Self {
            body_key: generate_body_key(),
            hash_cost: HashCost::default(),
            invitation_ttl: TimeDelta::hours(24),
            reset_ttl: TimeDelta::minutes(60),
            grant_admins_on_create: true,
            enroll_editor_on_update: false,
            lock_wait: DEFAULT_LOCK_WAIT,
            restore_lock_wait: Duration::from_secs(150),
        }
    }
}

// Keep the body key out of logs.
impl fmt::Debug for HelpDeskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelpDeskConfig")
            .field("body_key", &"<redacted>")
            .field("hash_cost", &self.hash_cost)
            .field("invitation_ttl", &self.invitation_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .field("grant_admins_on_create", &self.grant_admins_on_create)
            .field("enroll_editor_on_update", &self.enroll_editor_on_update)
            .field("lock_wait", &self.lock_wait)
            .field("restore_lock_wait", &self.restore_lock_wait)
            .finish()
    }
}

impl HelpDeskConfig {
    /// Read `HELPDESK_*` variables from the process environment.
    /// `HELPDESK_BODY_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let encoded = lookup("HELPDESK_BODY_KEY")
            .ok_or_else(|| anyhow!("HELPDESK_BODY_KEY is not set (generate one with `helpdesk keygen`)"))?;
        let body_key = key_from_base64(&encoded).context("HELPDESK_BODY_KEY is malformed")?;

        let hash_cost = HashCost {
            memory_kib: parse_var(&lookup, "HELPDESK_HASH_MEMORY_KIB", defaults.hash_cost.memory_kib)?,
            iterations: parse_var(&lookup, "HELPDESK_HASH_ITERATIONS", defaults.hash_cost.iterations)?,
        };

        Ok(Self {
            body_key,
            hash_cost,
            invitation_ttl: parse_ttl(
                &lookup,
                "HELPDESK_INVITATION_TTL_HOURS",
                defaults.invitation_ttl,
                TimeDelta::try_hours,
            )?,
            reset_ttl: parse_ttl(
                &lookup,
                "HELPDESK_RESET_TTL_MINUTES",
                defaults.reset_ttl,
                TimeDelta::try_minutes,
            )?,
            grant_admins_on_create: parse_flag(
                &lookup,
                "HELPDESK_GRANT_ADMINS_ON_CREATE",
                defaults.grant_admins_on_create,
            )?,
            enroll_editor_on_update: parse_flag(
                &lookup,
                "HELPDESK_ENROLL_EDITOR_ON_UPDATE",
                defaults.enroll_editor_on_update,
            )?,
            lock_wait: Duration::from_secs(parse_var(
                &lookup,
                "HELPDESK_LOCK_WAIT_SECS",
                defaults.lock_wait.as_secs(),
            )?),
            restore_lock_wait: Duration::from_secs(parse_var(
                &lookup,
                "HELPDESK_RESTORE_LOCK_WAIT_SECS",
                defaults.restore_lock_wait.as_secs(),
            )?),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

/// A positive whole number of `unit`s. Zero, negative and out-of-range
/// values are errors.
fn parse_ttl(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: TimeDelta,
    unit: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let count: i64 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", name, raw, e))?;
    if count <= 0 {
        return Err(anyhow!("{} must be positive, got {}", name, count));
    }
    unit(count).ok_or_else(|| anyhow!("{} is out of range: {}", name, count))
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> Result<bool> {
    match lookup(name).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("{} must be true or false, got {:?}", name, raw)),
        },
    }
}
