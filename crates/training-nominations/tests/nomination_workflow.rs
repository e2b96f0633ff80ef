use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use training_nominations::config::SealSecret;
use training_nominations::workflows::nomination::{
    Actor, ActorRole, CriteriaDraft, GradeLevel, IntakeGuard, IntegritySeal, LifecycleError,
    Location, MemoryAuditLog, MemoryStore, NominationId, NominationRepository,
    NominationService, NominationServiceError, NominationStatus, OrgPath, ProgramDraft,
    RepositoryError, StaffDirectory, StaffId, StaffRecord,
};

type Service = NominationService<MemoryStore, MemoryAuditLog>;

fn trainer() -> Actor {
    Actor::new("amaka.training", ActorRole::TrainingStaff)
}

fn admin() -> Actor {
    Actor::new("femi.admin", ActorRole::Admin)
}

fn staff(id: &str, grade_level: GradeLevel) -> StaffRecord {
    StaffRecord {
        staff_id: StaffId(id.to_string()),
        first_name: "Officer".to_string(),
        last_name: id.to_string(),
        grade_level,
        org: OrgPath {
            directorate: "Marine".to_string(),
            division: "Pilotage".to_string(),
            department: None,
        },
        location: Location::Hq,
        date_joined: NaiveDate::from_ymd_opt(2001, 1, 1).expect("valid join date"),
        training_count: 0,
    }
}

fn service_with_roster(ids: &[&str]) -> (Arc<Service>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    for id in ids {
        store
            .upsert_staff(staff(id, GradeLevel::Gl10))
            .expect("roster seeded");
    }
    let service = NominationService::new(
        store.clone(),
        Arc::new(MemoryAuditLog::new()),
        IntegritySeal::new(SealSecret::new("integration-salt")),
        IntakeGuard::default(),
    );
    (Arc::new(service), store)
}

fn generate(service: &Service, capacity: u32) -> NominationId {
    let program = service
        .create_program(
            ProgramDraft {
                title: "Port Security Induction".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid start"),
                end_date: NaiveDate::from_ymd_opt(2025, 9, 3).expect("valid end"),
                venue: "Training School, Apapa".to_string(),
                capacity: Some(capacity),
                coordinator: None,
                consultant: None,
                remarks: String::new(),
            },
            &trainer(),
        )
        .expect("program created");
    service
        .set_criteria(&program.id, CriteriaDraft::default(), &trainer())
        .expect("criteria stored");
    service
        .generate_nomination(&program.id, &trainer())
        .expect("nomination generated")
        .id
}

fn approve(service: &Service, id: &NominationId) {
    service.submit(id, &trainer()).expect("submitted");
    service.approve(id, &admin()).expect("approved");
}

#[test]
fn generation_fills_capacity_and_blocks_further_adds() {
    let (service, _) = service_with_roster(&["A003", "A001", "A002"]);
    let id = generate(&service, 2);

    let view = service.get(&id).expect("nomination view");
    assert_eq!(
        view.members,
        vec![StaffId("A001".to_string()), StaffId("A002".to_string())]
    );

    match service.add_member(&id, &StaffId("A003".to_string()), &trainer()) {
        Err(NominationServiceError::Lifecycle(LifecycleError::CapacityReached { capacity })) => {
            assert_eq!(capacity, 2)
        }
        other => panic!("expected capacity error, got {other:?}"),
    }
}

#[test]
fn concurrent_adds_never_exceed_capacity() {
    let ids: Vec<String> = (1..=10).map(|n| format!("C{n:03}")).collect();
    let (service, store) = service_with_roster(&["C001", "C002"]);
    let id = generate(&service, 3);
    for extra in &ids[2..] {
        store
            .upsert_staff(staff(extra, GradeLevel::Gl08))
            .expect("late staff added");
    }

    let successes = thread::scope(|scope| {
        let handles: Vec<_> = ids[2..]
            .iter()
            .map(|staff_id| {
                let (service, id) = (&service, &id);
                scope.spawn(move || {
                    service
                        .add_member(id, &StaffId(staff_id.clone()), &trainer())
                        .is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker finished"))
            .filter(|added| *added)
            .count()
    });

    assert_eq!(successes, 1);
    assert_eq!(service.get(&id).expect("view").members.len(), 3);
}

#[test]
fn concurrent_duplicate_adds_admit_one() {
    let (service, store) = service_with_roster(&["D001"]);
    let id = generate(&service, 10);
    store
        .upsert_staff(staff("D002", GradeLevel::Gl12))
        .expect("late staff added");

    let outcomes: Vec<Result<_, NominationServiceError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (service, id) = (&service, &id);
                scope.spawn(move || service.add_member(id, &StaffId("D002".to_string()), &trainer()))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker finished"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().filter(|outcome| outcome.is_err()).all(|outcome| matches!(
        outcome,
        Err(NominationServiceError::Lifecycle(LifecycleError::AlreadyNominated(_)))
    )));
    assert_eq!(service.get(&id).expect("view").members.len(), 2);
}

#[test]
fn adds_racing_a_reset_land_first_or_find_no_staff() {
    let late: Vec<String> = (1..=12).map(|n| format!("R{n:03}")).collect();
    let (service, store) = service_with_roster(&["R000"]);
    let id = generate(&service, 50);
    for staff_id in &late {
        store
            .upsert_staff(staff(staff_id, GradeLevel::Gl09))
            .expect("late staff added");
    }

    let (outcomes, summary) = thread::scope(|scope| {
        let adders: Vec<_> = late
            .iter()
            .map(|staff_id| {
                let (service, id) = (&service, &id);
                scope.spawn(move || service.add_member(id, &StaffId(staff_id.clone()), &trainer()))
            })
            .collect();
        let reset = scope.spawn(|| service.reset_roster(false, &admin()));

        let outcomes: Vec<_> = adders
            .into_iter()
            .map(|handle| handle.join().expect("adder finished"))
            .collect();
        (outcomes, reset.join().expect("reset finished").expect("reset"))
    });

    assert_eq!(summary.deleted, late.len() + 1);
    assert!(store.roster().expect("roster").is_empty());

    let added = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert!(outcomes.iter().all(|outcome| matches!(
        outcome,
        Ok(_) | Err(NominationServiceError::Repository(RepositoryError::NotFound))
    )));
    assert_eq!(service.get(&id).expect("view").members.len(), 1 + added);

    match service.add_member(&id, &StaffId(late[0].clone()), &trainer()) {
        Err(NominationServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected missing staff, got {other:?}"),
    }
}

#[test]
fn out_of_band_membership_change_is_reported_as_tampering() {
    let (service, store) = service_with_roster(&["E001", "E002"]);
    let id = generate(&service, 5);
    approve(&service, &id);

    let first = service.seal_on_first_print(&id, &trainer()).expect("first print");
    assert!(first.first_print);
    assert!(!first.tampered);
    assert!(service.verify(&id).expect("verified").valid);

    store
        .update_with(&id, |nomination, _program| -> Result<(), RepositoryError> {
            nomination
                .members
                .retain(|member| member.staff_id.0 != "E002");
            Ok(())
        })
        .expect("direct edit");

    let verification = service.verify(&id).expect("verified");
    assert!(verification.sealed);
    assert!(!verification.valid);

    let reprint = service.seal_on_first_print(&id, &admin()).expect("reprint");
    assert!(!reprint.first_print);
    assert!(reprint.tampered);
    assert_eq!(reprint.digest, first.digest);
}

#[test]
fn roster_reset_preserves_staff_on_approved_nominations() {
    let (service, _) = service_with_roster(&["F001", "F002"]);
    let approved = generate(&service, 1);
    approve(&service, &approved);
    let draft = generate(&service, 5);

    let summary = service.reset_roster(false, &admin()).expect("reset");
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.preserved, 1);

    let history = service
        .training_history(&StaffId("F001".to_string()))
        .expect("preserved staff history");
    assert_eq!(history.counts.approved, 1);
    assert_eq!(history.counts.draft, 1);

    assert_eq!(
        service
            .list_nominations(NominationStatus::Draft)
            .expect("drafts")
            .into_iter()
            .map(|nomination| nomination.id)
            .collect::<Vec<_>>(),
        vec![draft]
    );

    match service.reset_roster(true, &trainer()) {
        Err(NominationServiceError::Lifecycle(LifecycleError::Unauthorized { .. })) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[test]
fn approved_nominations_lock_members_and_protect_staff() {
    let (service, store) = service_with_roster(&["H001"]);
    let id = generate(&service, 5);
    approve(&service, &id);
    store
        .upsert_staff(staff("H002", GradeLevel::Gl14))
        .expect("late staff");

    match service.add_member(&id, &StaffId("H002".to_string()), &admin()) {
        Err(NominationServiceError::Lifecycle(LifecycleError::NominationLocked { status })) => {
            assert_eq!(status, NominationStatus::Approved)
        }
        other => panic!("expected locked nomination, got {other:?}"),
    }

    let protected = StaffId("H001".to_string());
    match service.remove_staff(&protected, false, &admin()) {
        Err(NominationServiceError::Repository(RepositoryError::StaffProtected(staff_id))) => {
            assert_eq!(staff_id, protected)
        }
        other => panic!("expected protected staff, got {other:?}"),
    }

    service
        .remove_staff(&protected, true, &admin())
        .expect("forced delete");
    assert!(store.staff(&protected).expect("lookup").is_none());
    assert_eq!(service.get(&id).expect("view").members, vec![protected]);
}
