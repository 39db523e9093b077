//! End-to-end flows across accounts, articles, groups and access checks.

mod common;

use helpdesk_core::types::{LoginOutcome, Perspective, Role};

use common::{bootstrap, desk, enroll, restricted_draft};

#[test]
fn restricted_article_grants_every_admin_holder() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let ines = enroll(&desk, &admin, "ines", Role::Instructor);
    let omar = enroll(&desk, &admin, "omar", Role::Instructor);
    desk.grant_admin_right(&admin, "ines").unwrap();

    let a1 = desk
        .create_article(&restricted_draft("A1", "Eclipse, IntelliJ"), &omar)
        .unwrap();

    assert_eq!(desk.list_group_names().unwrap(), vec!["Eclipse", "IntelliJ"]);
    assert_eq!(desk.get_article(&a1).unwrap().groups, vec!["Eclipse", "IntelliJ"]);

    for holder in [&admin, &ines] {
        assert!(desk.can_manage_group(holder, "Eclipse").unwrap());
        assert!(desk.can_manage_group(holder, "IntelliJ").unwrap());
        assert!(desk.staff_can_view(holder, &a1).unwrap());
    }
    // The author is not a holder and gets nothing.
    assert!(!desk.can_manage_group(&omar, "Eclipse").unwrap());
    assert!(desk
        .preview_as(&omar, &a1, Perspective::Staff)
        .unwrap()
        .contains("[Access Restricted]"));
}

#[test]
fn classroom_flow() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let ines = enroll(&desk, &admin, "ines", Role::Instructor);
    let sam = enroll(&desk, &admin, "sam", Role::Student);
    desk.grant_admin_right(&admin, "ines").unwrap();

    // Instructor logs in and writes a restricted article for one section.
    assert_eq!(desk.verify("ines", "pw").unwrap(), LoginOutcome::Authenticated(ines));
    let quiz = desk
        .create_article(&restricted_draft("Quiz prep", "Section 1"), &ines)
        .unwrap();

    // Before enrolment the student only sees the public shell.
    let view = desk.view_for(&sam, &quiz).unwrap();
    assert_eq!(view.body, None);
    assert_eq!(view.visibility.public_title(), Some("Public Quiz prep"));

    desk.save_group_roster(&ines, "Section 1", &[sam]).unwrap();
    assert!(desk.preview_for(&sam, &quiz).unwrap().contains("Content:\nBody of Quiz prep"));

    desk.submit_help_request(&sam, "specific", "Question 3 is unclear").unwrap();
    assert_eq!(desk.help_history(&sam).unwrap().len(), 1);
}
