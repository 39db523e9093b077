#![allow(dead_code)]

use std::path::Path;

use helpdesk_core::types::{ArticleDraft, Level, Role, UserId, Visibility};
use helpdesk_core::{HelpDesk, HelpDeskConfig};
use helpdesk_crypto::HashCost;

/// Cheap hashing so tests stay fast.
pub fn config() -> HelpDeskConfig {
    HelpDeskConfig {
        hash_cost: HashCost { memory_kib: 1024, iterations: 1 },
        ..HelpDeskConfig::default()
    }
}

pub fn desk() -> HelpDesk {
    HelpDesk::open_in_memory(config()).unwrap()
}

pub fn desk_at(path: &Path, config: &HelpDeskConfig) -> HelpDesk {
    HelpDesk::open(path, config.clone()).unwrap()
}

/// Second connection to a file database, for reading or arranging rows
/// the public API does not expose.
pub fn raw(path: &Path) -> rusqlite::Connection {
    rusqlite::Connection::open(path).unwrap()
}

pub fn bootstrap(desk: &HelpDesk) -> UserId {
    desk.bootstrap_admin("admin", "admin-pw", "admin-pw").unwrap()
}

/// Register `username` through an invitation for `role`.
pub fn enroll(desk: &HelpDesk, admin: &UserId, username: &str, role: Role) -> UserId {
    let invitation = desk.issue_invitation(admin, role).unwrap();
    desk.register_with_invitation(&invitation.code, username, "pw", "pw")
        .unwrap()
}

pub fn open_draft(title: &str, groups: &str) -> ArticleDraft {
    ArticleDraft {
        title: title.to_string(),
        description: format!("About {}", title),
        level: Level::Beginner,
        keywords: String::new(),
        body: format!("Body of {}", title),
        reference_links: None,
        visibility: Visibility::Open,
        groups: groups.to_string(),
    }
}

pub fn restricted_draft(title: &str, groups: &str) -> ArticleDraft {
    ArticleDraft {
        visibility: Visibility::restricted(format!("Public {}", title), "Summary"),
        ..open_draft(title, groups)
    }
}
