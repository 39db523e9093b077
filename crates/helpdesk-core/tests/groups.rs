mod common;

use std::sync::Barrier;
use std::thread;

use helpdesk_core::types::Role;
use helpdesk_core::{ErrorKind, HelpDeskError};

use common::{bootstrap, config, desk, desk_at, enroll, open_draft};

#[test]
fn ensure_and_map_are_idempotent() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let id = desk.create_article(&open_draft("Git", ""), &admin).unwrap();

    let group = desk.ensure_group("Tools").unwrap();
    assert_eq!(desk.ensure_group(" Tools ").unwrap(), group);

    desk.map_article(&id, group).unwrap();
    desk.map_article(&id, group).unwrap();
    assert_eq!(desk.get_article(&id).unwrap().groups, vec!["Tools"]);

    assert_eq!(desk.ensure_group("  ").unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn group_names_with_commas_are_refused() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);
    enroll(&desk, &admin, "ines", Role::Instructor);

    let refused = |result: Result<(), HelpDeskError>| result.unwrap_err().kind() == ErrorKind::Validation;
    assert!(refused(desk.ensure_group("Java, Advanced").map(|_| ())));
    assert!(refused(desk.add_student_to_group(&sam, "Java, Advanced")));
    assert!(refused(desk.grant_group_access(&admin, "Java, Advanced", "ines").map(|_| ())));
    assert!(desk.list_group_names().unwrap().is_empty());
}

#[test]
fn concurrent_ensure_yields_one_group() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("helpdesk.db");
    let config = config();
    desk_at(&path, &config);

    let barrier = Barrier::new(4);
    let ids: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let desk = desk_at(&path, &config);
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    desk.ensure_group("Race").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(desk_at(&path, &config).list_group_names().unwrap(), vec!["Race"]);
}

#[test]
fn delete_group_cascades() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);
    let id = desk.create_article(&open_draft("Git", "Tools, VCS"), &admin).unwrap();
    desk.add_student_to_group(&sam, "Tools").unwrap();

    desk.delete_group("Tools").unwrap();

    let names: Vec<_> = desk
        .list_groups_with_summary()
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["VCS"]);
    assert_eq!(desk.get_article(&id).unwrap().groups, vec!["VCS"]);
    assert!(!desk.is_group_member(&sam, "Tools").unwrap());
    assert_eq!(desk.delete_group("Tools").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn summaries_join_titles_and_members() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);
    let kim = enroll(&desk, &admin, "kim", Role::Student);
    desk.create_article(&open_draft("Installing", "Eclipse"), &admin).unwrap();
    desk.create_article(&open_draft("Debugging", "Eclipse"), &admin).unwrap();
    desk.add_student_to_group(&sam, "Eclipse").unwrap();
    desk.add_student_to_group(&kim, "Eclipse").unwrap();
    desk.ensure_group("IntelliJ").unwrap();

    let summaries = desk.list_groups_with_summary().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "Eclipse");
    assert_eq!(summaries[0].article_titles, "Debugging, Installing");
    assert_eq!(summaries[0].member_names, "kim, sam");
    assert_eq!(summaries[1].article_titles, "");

    let found = desk.search_groups("intelli").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "IntelliJ");
}

#[test]
fn membership_changes() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);

    desk.add_student_to_group(&sam, "Eclipse").unwrap();
    desk.add_student_to_group(&sam, "Eclipse").unwrap();
    assert!(desk.is_group_member(&sam, "Eclipse").unwrap());

    desk.remove_student_from_group(&sam, "Eclipse").unwrap();
    assert_eq!(
        desk.remove_student_from_group(&sam, "Eclipse").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        desk.remove_student_from_group(&sam, "Nowhere").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn roster_requires_a_grant() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let ines = enroll(&desk, &admin, "ines", Role::Instructor);
    let sam = enroll(&desk, &admin, "sam", Role::Student);
    let kim = enroll(&desk, &admin, "kim", Role::Student);
    desk.ensure_group("Eclipse").unwrap();

    let err = desk.save_group_roster(&ines, "Eclipse", &[sam, kim]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!desk.is_group_member(&sam, "Eclipse").unwrap());

    desk.grant_group_access(&admin, "Eclipse", "ines").unwrap();

    // One bad id rolls back the whole roster.
    let err = desk.save_group_roster(&ines, "Eclipse", &[sam, ines]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!desk.is_group_member(&sam, "Eclipse").unwrap());

    assert_eq!(desk.save_group_roster(&ines, "Eclipse", &[sam, kim]).unwrap(), 2);
    assert_eq!(desk.save_group_roster(&ines, "Eclipse", &[sam]).unwrap(), 0);
    assert_eq!(desk.list_groups_with_summary().unwrap()[0].member_names, "kim, sam");
}
