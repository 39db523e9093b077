use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type UserId = Uuid;
pub type ArticleId = Uuid;
pub type GroupId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

// -- Roles --

/// The fixed role set. Declaration order is the presentation order
/// (Admin, Instructor, Student); it carries no privilege meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Instructor, Role::Student];

    /// Stable row id in the `roles` table.
    pub fn id(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Instructor => 2,
            Role::Student => 3,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Instructor => "Instructor",
            Role::Student => "Student",
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Instructor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownValue { kind: "role", value: s.to_string() })
    }
}

// -- Articles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
            Level::Expert => "expert",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            "expert" => Ok(Level::Expert),
            _ => Err(UnknownValue { kind: "level", value: s.to_string() }),
        }
    }
}

/// Whether an article's body is gated behind group authorization.
///
/// A restricted article always carries a public title and description;
/// an open one never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Visibility {
    Open,
    Restricted { public_title: String, public_desc: String },
}

impl Visibility {
    pub fn restricted(public_title: impl Into<String>, public_desc: impl Into<String>) -> Self {
        Visibility::Restricted {
            public_title: public_title.into(),
            public_desc: public_desc.into(),
        }
    }

    /// Rebuild from the flat column form used in storage.
    pub fn from_columns(
        is_restricted: bool,
        public_title: Option<String>,
        public_desc: Option<String>,
    ) -> Self {
        if is_restricted {
            Visibility::Restricted {
                public_title: public_title.unwrap_or_default(),
                public_desc: public_desc.unwrap_or_default(),
            }
        } else {
            Visibility::Open
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Visibility::Restricted { .. })
    }

    pub fn public_title(&self) -> Option<&str> {
        match self {
            Visibility::Restricted { public_title, .. } => Some(public_title),
            Visibility::Open => None,
        }
    }

    pub fn public_desc(&self) -> Option<&str> {
        match self {
            Visibility::Restricted { public_desc, .. } => Some(public_desc),
            Visibility::Open => None,
        }
    }
}

/// Caller-supplied article fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub description: String,
    pub level: Level,
    pub keywords: String,
    pub body: String,
    pub reference_links: Option<String>,
    pub visibility: Visibility,
    /// Comma-separated group names, e.g. `"Eclipse, IntelliJ"`.
    pub groups: String,
}

/// A stored article with its body in cleartext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub keywords: String,
    pub body: String,
    pub reference_links: Option<String>,
    pub visibility: Visibility,
    pub groups: Vec<String>,
    pub created_by: Option<UserId>,
    pub last_modified_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List row: article metadata annotated with its comma-joined group names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: ArticleId,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub groups: String,
    pub is_restricted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An article as a specific viewer may see it. `body` is `None` when the
/// article is restricted and the viewer holds no authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub id: ArticleId,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub keywords: String,
    pub reference_links: Option<String>,
    pub visibility: Visibility,
    pub groups: Vec<String>,
    pub body: Option<String>,
}

/// Which authorization rule a role screen evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    Staff,
    Student,
}

/// Split a comma-separated group list: entries trimmed, empties dropped,
/// repeated names kept once in first-seen order.
pub fn parse_group_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

// -- Groups --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    /// Comma-joined titles of the group's articles.
    pub article_titles: String,
    /// Comma-joined full names of the group's student members.
    pub member_names: String,
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub roles: BTreeSet<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: UserId,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub preferred_first_name: Option<String>,
    pub email: String,
}

// -- Credentials --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Normal login with a self-chosen secret.
    Authenticated(UserId),
    /// A valid one-time secret was used; a new secret must be chosen
    /// before normal login is accepted again.
    ResetRequired(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeSecret {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub code: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemedInvitation {
    pub code_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyGranted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    NotHolder,
}

// -- Help requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    General,
    Specific,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::General => "general",
            MessageType::Specific => "specific",
        }
    }
}

impl FromStr for MessageType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(MessageType::General),
            "specific" => Ok(MessageType::Specific),
            _ => Err(UnknownValue { kind: "message type", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpMessage {
    pub id: i64,
    pub user_id: UserId,
    pub message_type: MessageType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Restore --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Wipe every article and mapping, then load the snapshot.
    Replace,
    /// Keep existing articles; snapshot entries with a known id are dropped.
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: usize,
}
