mod common;

use chrono::TimeDelta;
use helpdesk_core::types::{LoginOutcome, ProfileUpdate, Role};
use helpdesk_core::{ErrorKind, HelpDesk, HelpDeskConfig, HelpDeskError};

use common::{bootstrap, config, desk, enroll};

#[test]
fn bootstrap_only_once() {
    let desk = desk();
    let admin = bootstrap(&desk);

    assert_eq!(desk.roles_of(&admin).unwrap().into_iter().collect::<Vec<_>>(), vec![Role::Admin]);
    assert!(desk.is_admin_right_holder(&admin).unwrap());

    let again = desk.bootstrap_admin("other", "pw", "pw").unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Conflict);
}

#[test]
fn login_hides_which_part_was_wrong() {
    let desk = desk();
    let admin = bootstrap(&desk);

    assert_eq!(desk.verify("admin", "admin-pw").unwrap(), LoginOutcome::Authenticated(admin));
    assert!(matches!(desk.verify("admin", "nope"), Err(HelpDeskError::AuthFailure)));
    assert!(matches!(desk.verify("ghost", "admin-pw"), Err(HelpDeskError::AuthFailure)));
}

#[test]
fn invitation_signup_assigns_role() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let ines = enroll(&desk, &admin, "ines", Role::Instructor);

    assert!(desk.roles_of(&ines).unwrap().contains(&Role::Instructor));
    assert_eq!(desk.verify("ines", "pw").unwrap(), LoginOutcome::Authenticated(ines));
}

#[test]
fn failed_signup_leaves_code_unused() {
    let desk = desk();
    let admin = bootstrap(&desk);
    enroll(&desk, &admin, "taken", Role::Student);

    let invitation = desk.issue_invitation(&admin, Role::Student).unwrap();
    let err = desk
        .register_with_invitation(&invitation.code, "taken", "pw", "pw")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let mismatch = desk
        .register_with_invitation(&invitation.code, "fresh", "pw", "other")
        .unwrap_err();
    assert_eq!(mismatch.kind(), ErrorKind::Validation);

    desk.register_with_invitation(&invitation.code, "fresh", "pw", "pw")
        .unwrap();
}

#[test]
fn only_admins_invite() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);

    let err = desk.issue_invitation(&sam, Role::Admin).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn one_time_secret_forces_reset() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);

    let issued = desk.issue_one_time_secret(&admin, "sam").unwrap();
    assert!(matches!(desk.verify("sam", "pw"), Err(HelpDeskError::AuthFailure)));
    assert_eq!(desk.verify("sam", &issued.secret).unwrap(), LoginOutcome::ResetRequired(sam));

    desk.complete_reset(&sam, "new-pw", "new-pw").unwrap();
    assert_eq!(desk.verify("sam", "new-pw").unwrap(), LoginOutcome::Authenticated(sam));

    // Nothing pending any more.
    let err = desk.complete_reset(&sam, "x", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn expired_one_time_secret_is_refused() {
    let desk = HelpDesk::open_in_memory(HelpDeskConfig {
        reset_ttl: TimeDelta::milliseconds(-1),
        ..config()
    })
    .unwrap();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);

    let issued = desk.issue_one_time_secret(&admin, "sam").unwrap();
    assert!(matches!(desk.verify("sam", &issued.secret), Err(HelpDeskError::Expired(_))));
    assert!(matches!(desk.complete_reset(&sam, "a", "a"), Err(HelpDeskError::Expired(_))));
}

#[test]
fn role_changes() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let ines = enroll(&desk, &admin, "ines", Role::Instructor);

    desk.add_role(&admin, "ines", Role::Student).unwrap();
    assert_eq!(
        desk.roles_of(&ines).unwrap().into_iter().collect::<Vec<_>>(),
        vec![Role::Instructor, Role::Student]
    );
    assert_eq!(desk.add_role(&admin, "ines", Role::Student).unwrap_err().kind(), ErrorKind::Conflict);

    desk.remove_role(&admin, "ines", Role::Instructor).unwrap();
    assert_eq!(
        desk.remove_role(&admin, "ines", Role::Instructor).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(desk.add_role(&ines, "admin", Role::Student).unwrap_err().kind(), ErrorKind::Unauthorized);
}

#[test]
fn profiles_and_listings() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);

    let missing_email = ProfileUpdate {
        first_name: "Sam".into(),
        middle_name: None,
        last_name: "Lee".into(),
        preferred_first_name: None,
        email: " ".into(),
    };
    assert_eq!(desk.complete_profile(&sam, &missing_email).unwrap_err().kind(), ErrorKind::Validation);

    desk.complete_profile(&sam, &ProfileUpdate { email: "sam@example.edu".into(), ..missing_email })
        .unwrap();

    let students = desk.list_students().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].full_name, "Sam Lee");

    let users = desk.list_users().unwrap();
    let names: Vec<_> = users.iter().map(|u| (u.username.as_str(), u.full_name.as_str())).collect();
    assert_eq!(names, vec![("admin", "admin"), ("sam", "Sam Lee")]);
}

#[test]
fn deleting_a_user_cascades() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);
    desk.add_student_to_group(&sam, "Eclipse").unwrap();
    desk.submit_help_request(&sam, "general", "help").unwrap();

    desk.delete_user(&admin, "sam").unwrap();

    assert!(desk.list_students().unwrap().is_empty());
    assert!(!desk.is_group_member(&sam, "Eclipse").unwrap());
    assert!(desk.help_history(&sam).unwrap().is_empty());
    assert_eq!(desk.delete_user(&admin, "sam").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn help_requests_are_validated() {
    let desk = desk();
    let admin = bootstrap(&desk);
    let sam = enroll(&desk, &admin, "sam", Role::Student);

    desk.submit_help_request(&sam, "general", "Where is the syllabus?").unwrap();
    desk.submit_help_request(&sam, "Specific", "  Eclipse will not start  ").unwrap();

    assert_eq!(desk.submit_help_request(&sam, "urgent", "x").unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(desk.submit_help_request(&sam, "general", "   ").unwrap_err().kind(), ErrorKind::Validation);
    let huge = "a".repeat(65_536);
    assert_eq!(desk.submit_help_request(&sam, "general", &huge).unwrap_err().kind(), ErrorKind::Validation);

    let history = desk.help_history(&sam).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "Eclipse will not start");
}
