use super::common::*;
use crate::workflows::nomination::domain::{NominationStatus, StaffId};
use crate::workflows::nomination::lifecycle::{self, Decision, LifecycleError};

fn id(value: &str) -> StaffId {
    StaffId(value.to_string())
}

#[test]
fn only_the_creator_submits_a_draft() {
    let mut nomination = draft_nomination(&["P001"]);

    match lifecycle::submit(&mut nomination, &admin()) {
        Err(LifecycleError::Unauthorized { action, .. }) => assert_eq!(action, "submit"),
        other => panic!("expected unauthorized, got {other:?}"),
    }

    lifecycle::submit(&mut nomination, &creator()).expect("creator submits");
    assert_eq!(nomination.status, NominationStatus::Submitted);

    assert_eq!(
        lifecycle::submit(&mut nomination, &creator()),
        Err(LifecycleError::InvalidTransition {
            from: NominationStatus::Submitted,
            action: "submit",
        })
    );
}

#[test]
fn decisions_require_elevation_and_a_submitted_nomination() {
    let mut nomination = draft_nomination(&["P001"]);

    assert!(matches!(
        lifecycle::decide(&mut nomination, &admin(), Decision::Approve),
        Err(LifecycleError::InvalidTransition {
            from: NominationStatus::Draft,
            ..
        })
    ));

    lifecycle::submit(&mut nomination, &creator()).expect("submitted");
    assert!(matches!(
        lifecycle::decide(&mut nomination, &creator(), Decision::Approve),
        Err(LifecycleError::Unauthorized { .. })
    ));

    lifecycle::decide(&mut nomination, &admin_officer(), Decision::Approve).expect("approved");
    assert_eq!(nomination.status, NominationStatus::Approved);
    assert_eq!(
        nomination.approved_by.as_deref(),
        Some(admin_officer().username.as_str())
    );
    assert!(nomination.approved_at.is_some());

    assert!(matches!(
        lifecycle::decide(&mut nomination, &admin(), Decision::Reject),
        Err(LifecycleError::InvalidTransition {
            from: NominationStatus::Approved,
            ..
        })
    ));
}

#[test]
fn rejection_records_the_decider() {
    let mut nomination = draft_nomination(&[]);
    lifecycle::submit(&mut nomination, &creator()).expect("submitted");
    lifecycle::decide(&mut nomination, &admin(), Decision::Reject).expect("rejected");

    assert_eq!(nomination.status, NominationStatus::Rejected);
    assert_eq!(nomination.approved_by.as_deref(), Some("ngozi.admin"));
    assert!(nomination.approved_at.is_some());
}

#[test]
fn add_member_rejects_duplicates_and_full_nominations() {
    let program = program(2);
    let mut nomination = draft_nomination(&["P001"]);

    assert_eq!(
        lifecycle::add_member(&mut nomination, &program, &id("P001"), &creator()),
        Err(LifecycleError::AlreadyNominated(id("P001")))
    );

    lifecycle::add_member(&mut nomination, &program, &id("P002"), &creator()).expect("added");
    assert_eq!(nomination.members.len(), 2);

    assert_eq!(
        lifecycle::add_member(&mut nomination, &program, &id("P003"), &creator()),
        Err(LifecycleError::CapacityReached { capacity: 2 })
    );
    assert_eq!(nomination.members.len(), 2);
}

#[test]
fn membership_edits_need_creator_or_elevated_actor() {
    let program = program(5);
    let mut nomination = draft_nomination(&["P001"]);

    assert!(matches!(
        lifecycle::add_member(&mut nomination, &program, &id("P002"), &other_training_staff()),
        Err(LifecycleError::Unauthorized { .. })
    ));
    assert!(matches!(
        lifecycle::remove_member(&mut nomination, &id("P001"), &other_training_staff()),
        Err(LifecycleError::Unauthorized { .. })
    ));

    lifecycle::add_member(&mut nomination, &program, &id("P002"), &admin()).expect("admin adds");
    lifecycle::remove_member(&mut nomination, &id("P001"), &admin_officer())
        .expect("officer removes");
    assert_eq!(nomination.sorted_member_ids(), vec![id("P002")]);
}

#[test]
fn submitted_nominations_stay_editable() {
    let program = program(5);
    let mut nomination = draft_nomination(&["P001"]);
    lifecycle::submit(&mut nomination, &creator()).expect("submitted");

    lifecycle::add_member(&mut nomination, &program, &id("P002"), &creator()).expect("added");
    lifecycle::remove_member(&mut nomination, &id("P001"), &creator()).expect("removed");
    assert_eq!(nomination.sorted_member_ids(), vec![id("P002")]);
}

#[test]
fn terminal_nominations_are_locked_for_every_actor() {
    let program = program(5);
    let mut nomination = draft_nomination(&["P001"]);
    lifecycle::submit(&mut nomination, &creator()).expect("submitted");
    lifecycle::decide(&mut nomination, &admin(), Decision::Approve).expect("approved");

    for actor in [creator(), admin(), admin_officer()] {
        assert_eq!(
            lifecycle::add_member(&mut nomination, &program, &id("P002"), &actor),
            Err(LifecycleError::NominationLocked {
                status: NominationStatus::Approved
            })
        );
        assert_eq!(
            lifecycle::remove_member(&mut nomination, &id("P001"), &actor),
            Err(LifecycleError::NominationLocked {
                status: NominationStatus::Approved
            })
        );
    }
    assert_eq!(nomination.sorted_member_ids(), vec![id("P001")]);
}

#[test]
fn removing_a_non_member_reports_not_nominated() {
    let mut nomination = draft_nomination(&["P001"]);
    assert_eq!(
        lifecycle::remove_member(&mut nomination, &id("P404"), &creator()),
        Err(LifecycleError::NotNominated(id("P404")))
    );
}

#[test]
fn printing_requires_approval_and_ownership_for_training_staff() {
    let mut nomination = draft_nomination(&["P001"]);

    assert_eq!(
        lifecycle::ensure_printable(&nomination, &creator()),
        Err(LifecycleError::NotApproved {
            status: NominationStatus::Draft
        })
    );

    lifecycle::submit(&mut nomination, &creator()).expect("submitted");
    lifecycle::decide(&mut nomination, &admin(), Decision::Approve).expect("approved");

    lifecycle::ensure_printable(&nomination, &creator()).expect("creator prints");
    lifecycle::ensure_printable(&nomination, &admin_officer()).expect("officer prints");
    assert!(matches!(
        lifecycle::ensure_printable(&nomination, &other_training_staff()),
        Err(LifecycleError::Unauthorized { .. })
    ));
}

#[test]
fn lifecycle_errors_carry_operator_facing_messages() {
    assert_eq!(
        LifecycleError::CapacityReached { capacity: 25 }.to_string(),
        "Training capacity (25) reached"
    );
    assert_eq!(
        LifecycleError::AlreadyNominated(id("P001")).to_string(),
        "Staff P001 is already nominated"
    );
    assert_eq!(
        LifecycleError::NominationLocked {
            status: NominationStatus::Rejected
        }
        .to_string(),
        "nomination is rejected and can no longer be modified"
    );
}
