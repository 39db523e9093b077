mod common;

use std::collections::BTreeSet;

use helpdesk_core::types::{BackupSnapshot, RestoreMode, RestoreReport, Role};
use helpdesk_core::{ErrorKind, HelpDesk, HelpDeskError};

use common::{bootstrap, config, desk, desk_at, enroll, open_draft, raw, restricted_draft};

/// (id, title, level, groups) for every article.
fn visible_set(desk: &HelpDesk) -> BTreeSet<(String, String, String, String)> {
    desk.list_articles()
        .unwrap()
        .into_iter()
        .map(|a| (a.id.to_string(), a.title, a.level.to_string(), a.groups))
        .collect()
}

fn seeded() -> (HelpDesk, helpdesk_core::types::UserId) {
    seed(desk())
}

fn seed(desk: HelpDesk) -> (HelpDesk, helpdesk_core::types::UserId) {
    let admin = bootstrap(&desk);
    desk.create_article(&open_draft("Git", "Tools, VCS"), &admin).unwrap();
    desk.create_article(&restricted_draft("Exam", "Staff"), &admin).unwrap();
    desk.create_article(&open_draft("Loose", ""), &admin).unwrap();
    (desk, admin)
}

#[test]
fn replace_round_trip_reproduces_articles() {
    let (desk, admin) = seeded();
    let before = visible_set(&desk);
    let snapshot = desk.backup(None).unwrap();

    desk.create_article(&open_draft("Added later", "Tools"), &admin).unwrap();
    let report = desk.restore(&snapshot, RestoreMode::Replace).unwrap();

    assert_eq!(report, RestoreReport { restored: 3, skipped: 0 });
    assert_eq!(visible_set(&desk), before);
}

#[test]
fn restored_restricted_bodies_still_open() {
    let (desk, admin) = seeded();
    let snapshot = desk.backup(Some("Staff")).unwrap();

    let parsed: BackupSnapshot = serde_json::from_slice(&snapshot).unwrap();
    assert_eq!(parsed.articles.len(), 1);
    assert_ne!(parsed.articles[0].body, "Body of Exam");

    desk.restore(&snapshot, RestoreMode::Replace).unwrap();
    let id = parsed.articles[0].id;
    assert_eq!(desk.get_article(&id).unwrap().body, "Body of Exam");
    assert_eq!(desk.view_for(&admin, &id).unwrap().body.as_deref(), Some("Body of Exam"));
}

#[test]
fn merge_keeps_existing_rows() {
    let (desk, admin) = seeded();
    let snapshot = desk.backup(None).unwrap();

    let git = desk.search_articles("git").unwrap()[0].id;
    desk.update_article(&git, &open_draft("Git (edited)", "Tools"), &admin).unwrap();
    let exam = desk.search_articles("exam").unwrap()[0].id;
    desk.delete_article(&exam).unwrap();

    let report = desk.restore(&snapshot, RestoreMode::Merge).unwrap();
    assert_eq!(report, RestoreReport { restored: 1, skipped: 2 });

    let git = desk.get_article(&git).unwrap();
    assert_eq!(git.title, "Git (edited)");
    assert_eq!(git.groups, vec!["Tools"]);
    assert_eq!(desk.get_article(&exam).unwrap().groups, vec!["Staff"]);
}

#[test]
fn corrupt_input_touches_nothing() {
    let (desk, _) = seeded();
    let before = visible_set(&desk);

    let err = desk.restore(b"{ not json", RestoreMode::Replace).unwrap_err();
    assert!(matches!(err, HelpDeskError::Corrupt(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut foreign: serde_json::Value = serde_json::from_slice(&desk.backup(None).unwrap()).unwrap();
    foreign["format"] = "something-else".into();
    let err = desk
        .restore(&serde_json::to_vec(&foreign).unwrap(), RestoreMode::Replace)
        .unwrap_err();
    assert!(matches!(err, HelpDeskError::Corrupt(_)));

    assert_eq!(visible_set(&desk), before);
}

#[test]
fn snapshot_from_another_key_is_rejected() {
    let (desk, _) = seeded();
    let snapshot = desk.backup(None).unwrap();

    // Default config generates a fresh body key.
    let other = HelpDesk::open_in_memory(config()).unwrap();
    let err = other.restore(&snapshot, RestoreMode::Replace).unwrap_err();
    assert!(matches!(err, HelpDeskError::Corrupt(_)));
    assert!(other.list_articles().unwrap().is_empty());
}

#[test]
fn restore_into_fresh_database_keeps_authorship() {
    let (desk, admin) = seeded();
    let snapshot = desk.backup(None).unwrap();

    let other = HelpDesk::open_in_memory(desk.config().clone()).unwrap();
    let reader = bootstrap(&other);
    let sam = enroll(&other, &reader, "sam", Role::Student);
    let report = other.restore(&snapshot, RestoreMode::Merge).unwrap();
    assert_eq!(report.restored, 3);

    let exam = other.search_articles("exam").unwrap()[0].id;
    assert_eq!(other.get_article(&exam).unwrap().created_by, Some(admin));
    assert_eq!(other.view_for(&sam, &exam).unwrap().body, None);
    assert_eq!(other.list_group_names().unwrap(), vec!["Staff", "Tools", "VCS"]);
}

#[test]
fn group_grants_still_apply_after_replace() {
    let (desk, admin) = seeded();
    let ines = enroll(&desk, &admin, "ines", Role::Instructor);
    let exam = desk.search_articles("exam").unwrap()[0].id;
    desk.grant_group_access(&admin, "Staff", "ines").unwrap();
    assert!(desk.staff_can_view(&ines, &exam).unwrap());

    let names = desk.list_group_names().unwrap();
    desk.restore(&desk.backup(None).unwrap(), RestoreMode::Replace).unwrap();

    assert_eq!(desk.list_group_names().unwrap(), names);
    assert_eq!(desk.get_article(&exam).unwrap().groups, vec!["Staff"]);
    assert!(desk.staff_can_view(&ines, &exam).unwrap());
}

#[test]
fn snapshot_group_with_comma_is_rejected() {
    let (desk, _) = seeded();
    let before = visible_set(&desk);

    let mut snapshot: serde_json::Value = serde_json::from_slice(&desk.backup(None).unwrap()).unwrap();
    snapshot["articles"][0]["groups"] = serde_json::json!(["Java, Advanced"]);
    let err = desk
        .restore(&serde_json::to_vec(&snapshot).unwrap(), RestoreMode::Replace)
        .unwrap_err();

    assert!(matches!(err, HelpDeskError::Corrupt(_)));
    assert_eq!(visible_set(&desk), before);
}

#[test]
fn failed_insert_rolls_back_replace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("helpdesk.db");
    let (desk, _) = seed(desk_at(&path, &config()));
    let before = visible_set(&desk);

    // Passes snapshot validation, then fails inside the restore transaction
    // after the existing articles have been deleted.
    let mut snapshot: serde_json::Value = serde_json::from_slice(&desk.backup(None).unwrap()).unwrap();
    let last = snapshot["articles"].as_array().unwrap().len() - 1;
    snapshot["articles"][last]["title"] = "Rejected".into();
    raw(&path)
        .execute_batch(
            "CREATE TRIGGER reject_title BEFORE INSERT ON help_articles
             WHEN NEW.title = 'Rejected'
             BEGIN SELECT RAISE(ABORT, 'title rejected'); END;",
        )
        .unwrap();

    let err = desk
        .restore(&serde_json::to_vec(&snapshot).unwrap(), RestoreMode::Replace)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(visible_set(&desk), before);

    // The connection is usable again once the transaction is gone.
    raw(&path).execute_batch("DROP TRIGGER reject_title").unwrap();
    let report = desk.restore(&desk.backup(None).unwrap(), RestoreMode::Replace).unwrap();
    assert_eq!(report.restored, 3);
}
