use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AuditLogEntry, Nomination, NominationId, NominationStatus, ProgramId, RosterUpload,
    SelectionCriteria, StaffId, StaffRecord, TrainingProgram,
};
use super::seal::SealStatus;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("staff {0} belongs to an approved nomination")]
    StaffProtected(StaffId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RosterResetSummary {
    pub deleted: usize,
    /// Staff records kept because an approved nomination references them.
    pub preserved: usize,
    pub uploads_cleared: usize,
}

/// What a non-forced reset would do, computed without deleting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RosterResetPreview {
    pub total_staff: usize,
    pub protected: usize,
    pub to_delete: usize,
    pub uploads: usize,
}

/// Staff directory keyed by personal number.
pub trait StaffDirectory: Send + Sync {
    fn upsert_staff(&self, record: StaffRecord) -> Result<UpsertOutcome, RepositoryError>;
    fn staff(&self, id: &StaffId) -> Result<Option<StaffRecord>, RepositoryError>;
    fn roster(&self) -> Result<Vec<StaffRecord>, RepositoryError>;
    /// Delete one record. Without `force`, members of approved nominations are refused.
    fn remove_staff(&self, id: &StaffId, force: bool) -> Result<(), RepositoryError>;
    /// Delete every unprotected record (or all of them with `force`) and the upload history
    /// under one lock.
    fn reset_roster(&self, force: bool) -> Result<RosterResetSummary, RepositoryError>;
    fn reset_preview(&self) -> Result<RosterResetPreview, RepositoryError>;
    fn record_upload(&self, upload: RosterUpload) -> Result<(), RepositoryError>;
    /// Most recent uploads first.
    fn recent_uploads(&self, limit: usize) -> Result<Vec<RosterUpload>, RepositoryError>;
}

pub trait ProgramCatalog: Send + Sync {
    fn insert_program(&self, program: TrainingProgram) -> Result<TrainingProgram, RepositoryError>;
    fn program(&self, id: &ProgramId) -> Result<Option<TrainingProgram>, RepositoryError>;
    fn update_program(&self, program: TrainingProgram) -> Result<(), RepositoryError>;
    /// Store criteria and mark earlier records for the same program inactive.
    fn insert_criteria(
        &self,
        criteria: SelectionCriteria,
    ) -> Result<SelectionCriteria, RepositoryError>;
    fn active_criteria(
        &self,
        program_id: &ProgramId,
    ) -> Result<Option<SelectionCriteria>, RepositoryError>;
}

pub trait NominationRepository: Send + Sync {
    fn insert_nomination(&self, nomination: Nomination) -> Result<Nomination, RepositoryError>;
    fn nomination(&self, id: &NominationId) -> Result<Option<Nomination>, RepositoryError>;

    /// Apply `change` to the stored nomination while holding the store lock. The program is
    /// read under the same lock. Nothing is persisted unless `change` returns `Ok`.
    fn update_with<T, E, F>(&self, id: &NominationId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut Nomination, &TrainingProgram) -> Result<T, E>,
        E: From<RepositoryError>;

    /// `update_with` that also resolves `staff_id` in the directory under the same lock.
    /// A missing staff record is `NotFound` and `change` is never called.
    fn update_with_staff<T, E, F>(
        &self,
        id: &NominationId,
        staff_id: &StaffId,
        change: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Nomination, &TrainingProgram, &StaffRecord) -> Result<T, E>,
        E: From<RepositoryError>;

    fn nominations_with(&self, staff_id: &StaffId) -> Result<Vec<Nomination>, RepositoryError>;
    fn by_status(&self, status: NominationStatus) -> Result<Vec<Nomination>, RepositoryError>;
}

/// Append-only audit trail. There is no update or delete.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError>;
    fn entries_for(&self, id: &NominationId) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}

/// Everything the nomination service persists, behind one lock domain.
pub trait TrainingStore: StaffDirectory + ProgramCatalog + NominationRepository {}

impl<T> TrainingStore for T where T: StaffDirectory + ProgramCatalog + NominationRepository {}

/// Sanitized representation of a nomination for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct NominationView {
    pub nomination_id: NominationId,
    pub program_id: ProgramId,
    pub program_title: String,
    pub status: &'static str,
    pub capacity: u32,
    pub members: Vec<StaffId>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_at: Option<DateTime<Utc>>,
    pub seal: SealStatus,
}

impl NominationView {
    pub fn new(nomination: &Nomination, program: &TrainingProgram, seal: SealStatus) -> Self {
        Self {
            nomination_id: nomination.id.clone(),
            program_id: program.id.clone(),
            program_title: program.title.clone(),
            status: nomination.status.label(),
            capacity: program.capacity,
            members: nomination.sorted_member_ids(),
            created_by: nomination.created_by.clone(),
            approved_by: nomination.approved_by.clone(),
            approved_at: nomination.approved_at,
            printed_at: nomination.printed_at,
            seal,
        }
    }
}
