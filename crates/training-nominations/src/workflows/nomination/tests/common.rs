use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::config::SealSecret;
use crate::workflows::nomination::domain::{
    Actor, ActorRole, AuditLogEntry, CriteriaDraft, CriteriaId, GradeLevel, Location, Nomination,
    NominationId, NominationMembership, NominationStatus, OrgPath, ProgramDraft, ProgramId,
    RosterUpload, SelectionCriteria, StaffId, StaffRecord, TrainingProgram,
};
use crate::workflows::nomination::intake::IntakeGuard;
use crate::workflows::nomination::repository::{
    AuditLog, NominationRepository, ProgramCatalog, RepositoryError, RosterResetPreview,
    RosterResetSummary, StaffDirectory, UpsertOutcome,
};
use crate::workflows::nomination::seal::IntegritySeal;
use crate::workflows::nomination::store::{MemoryAuditLog, MemoryStore};
use crate::workflows::nomination::{nomination_router, NominationService};

pub(super) type MemoryService = NominationService<MemoryStore, MemoryAuditLog>;

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn creator() -> Actor {
    Actor::new("tola.training", ActorRole::TrainingStaff)
}

pub(super) fn other_training_staff() -> Actor {
    Actor::new("musa.training", ActorRole::TrainingStaff)
}

pub(super) fn admin() -> Actor {
    Actor::new("ngozi.admin", ActorRole::Admin)
}

pub(super) fn admin_officer() -> Actor {
    Actor::new("ibrahim.officer", ActorRole::AdminOfficer)
}

pub(super) fn staff(id: &str) -> StaffRecord {
    StaffRecord {
        staff_id: StaffId(id.to_string()),
        first_name: "Staff".to_string(),
        last_name: id.to_string(),
        grade_level: GradeLevel::Gl10,
        org: OrgPath {
            directorate: "Marine & Operations".to_string(),
            division: "Pilotage".to_string(),
            department: Some("Berthing".to_string()),
        },
        location: Location::Hq,
        date_joined: NaiveDate::from_ymd_opt(2005, 1, 1).expect("valid date"),
        training_count: 0,
    }
}

pub(super) fn program(capacity: u32) -> TrainingProgram {
    TrainingProgram {
        id: ProgramId("trn-fixture".to_string()),
        title: "Marine Safety Refresher".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 7, 7).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2025, 7, 11).expect("valid date"),
        venue: "Apapa Training School".to_string(),
        capacity,
        coordinator: None,
        consultant: None,
        remarks: String::new(),
        created_by: creator().username,
        created_at: Utc::now(),
    }
}

/// Criteria that admit everyone who joined before the `as_of` year.
pub(super) fn open_criteria() -> SelectionCriteria {
    SelectionCriteria {
        id: CriteriaId("crt-fixture".to_string()),
        program_id: ProgramId("trn-fixture".to_string()),
        grade_levels: BTreeSet::new(),
        locations: BTreeSet::from([Location::All]),
        directorates: BTreeSet::new(),
        divisions: BTreeSet::new(),
        departments: BTreeSet::new(),
        max_previous_trainings: 3,
        min_years_of_service: 0,
        max_years_of_service: 1,
        created_at: Utc::now(),
        is_active: true,
    }
}

pub(super) fn draft_nomination(members: &[&str]) -> Nomination {
    Nomination {
        id: NominationId("nom-fixture".to_string()),
        program_id: ProgramId("trn-fixture".to_string()),
        criteria_id: CriteriaId("crt-fixture".to_string()),
        status: NominationStatus::Draft,
        members: members
            .iter()
            .map(|id| NominationMembership {
                staff_id: StaffId(id.to_string()),
                selected_at: Utc::now(),
            })
            .collect(),
        created_by: creator().username,
        created_at: Utc::now(),
        approved_by: None,
        approved_at: None,
        printed_at: None,
        printed_by: None,
        seal: None,
    }
}

pub(super) fn integrity_seal() -> IntegritySeal {
    IntegritySeal::new(SealSecret::new("test-salt"))
}

pub(super) fn program_draft(capacity: u32) -> ProgramDraft {
    ProgramDraft {
        title: "Marine Safety Refresher".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 7, 7).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2025, 7, 11).expect("valid date"),
        venue: "Apapa Training School".to_string(),
        capacity: Some(capacity),
        coordinator: Some("Training Unit".to_string()),
        consultant: None,
        remarks: String::new(),
    }
}

/// Everyone with fewer than 34 years left, which is every fixture staff record.
pub(super) fn criteria_draft() -> CriteriaDraft {
    CriteriaDraft::default()
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryStore>, Arc<MemoryAuditLog>) {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let service = NominationService::new(
        store.clone(),
        audit.clone(),
        integrity_seal(),
        IntakeGuard::default(),
    );
    (service, store, audit)
}

pub(super) fn seed_staff(store: &MemoryStore, ids: &[&str]) {
    for id in ids {
        store.upsert_staff(staff(id)).expect("seed staff");
    }
}

/// Program with criteria and a generated draft nomination owned by `creator()`.
pub(super) fn drafted(service: &MemoryService, capacity: u32) -> (ProgramId, Nomination) {
    let program = service
        .create_program(program_draft(capacity), &creator())
        .expect("program created");
    service
        .set_criteria(&program.id, criteria_draft(), &creator())
        .expect("criteria stored");
    let nomination = service
        .generate_nomination_as_of(&program.id, &creator(), as_of())
        .expect("nomination generated");
    (program.id, nomination)
}

pub(super) fn approved(service: &MemoryService, capacity: u32) -> (ProgramId, NominationId) {
    let (program_id, nomination) = drafted(service, capacity);
    service
        .submit(&nomination.id, &creator())
        .expect("submitted");
    service.approve(&nomination.id, &admin()).expect("approved");
    (program_id, nomination.id)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    nomination_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableStore;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl StaffDirectory for UnavailableStore {
    fn upsert_staff(&self, _record: StaffRecord) -> Result<UpsertOutcome, RepositoryError> {
        Err(offline())
    }

    fn staff(&self, _id: &StaffId) -> Result<Option<StaffRecord>, RepositoryError> {
        Err(offline())
    }

    fn roster(&self) -> Result<Vec<StaffRecord>, RepositoryError> {
        Err(offline())
    }

    fn remove_staff(&self, _id: &StaffId, _force: bool) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn reset_roster(&self, _force: bool) -> Result<RosterResetSummary, RepositoryError> {
        Err(offline())
    }

    fn reset_preview(&self) -> Result<RosterResetPreview, RepositoryError> {
        Err(offline())
    }

    fn record_upload(&self, _upload: RosterUpload) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn recent_uploads(&self, _limit: usize) -> Result<Vec<RosterUpload>, RepositoryError> {
        Err(offline())
    }
}

impl ProgramCatalog for UnavailableStore {
    fn insert_program(&self, _program: TrainingProgram) -> Result<TrainingProgram, RepositoryError> {
        Err(offline())
    }

    fn program(&self, _id: &ProgramId) -> Result<Option<TrainingProgram>, RepositoryError> {
        Err(offline())
    }

    fn update_program(&self, _program: TrainingProgram) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn insert_criteria(
        &self,
        _criteria: SelectionCriteria,
    ) -> Result<SelectionCriteria, RepositoryError> {
        Err(offline())
    }

    fn active_criteria(
        &self,
        _program_id: &ProgramId,
    ) -> Result<Option<SelectionCriteria>, RepositoryError> {
        Err(offline())
    }
}

impl NominationRepository for UnavailableStore {
    fn insert_nomination(&self, _nomination: Nomination) -> Result<Nomination, RepositoryError> {
        Err(offline())
    }

    fn nomination(&self, _id: &NominationId) -> Result<Option<Nomination>, RepositoryError> {
        Err(offline())
    }

    fn update_with<T, E, F>(&self, _id: &NominationId, _change: F) -> Result<T, E>
    where
        F: FnOnce(&mut Nomination, &TrainingProgram) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(offline().into())
    }

    fn update_with_staff<T, E, F>(
        &self,
        _id: &NominationId,
        _staff_id: &StaffId,
        _change: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Nomination, &TrainingProgram, &StaffRecord) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(offline().into())
    }

    fn nominations_with(&self, _staff_id: &StaffId) -> Result<Vec<Nomination>, RepositoryError> {
        Err(offline())
    }

    fn by_status(&self, _status: NominationStatus) -> Result<Vec<Nomination>, RepositoryError> {
        Err(offline())
    }
}

pub(super) fn unavailable_service() -> NominationService<UnavailableStore, MemoryAuditLog> {
    NominationService::new(
        Arc::new(UnavailableStore),
        Arc::new(MemoryAuditLog::new()),
        integrity_seal(),
        IntakeGuard::default(),
    )
}

/// Audit log whose writes always fail.
pub(super) struct FailingAuditLog;

impl AuditLog for FailingAuditLog {
    fn append(&self, _entry: AuditLogEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit disk full".to_string()))
    }

    fn entries_for(&self, _id: &NominationId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) fn service_with_failing_audit(
    store: Arc<MemoryStore>,
) -> NominationService<MemoryStore, FailingAuditLog> {
    NominationService::new(
        store,
        Arc::new(FailingAuditLog),
        integrity_seal(),
        IntakeGuard::default(),
    )
}

pub(super) fn audit_descriptions(audit: &MemoryAuditLog, id: &NominationId) -> Vec<String> {
    audit
        .entries_for(id)
        .expect("audit entries")
        .into_iter()
        .map(|entry| entry.description)
        .collect()
}
