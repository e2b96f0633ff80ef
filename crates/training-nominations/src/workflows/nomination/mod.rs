//! Training nomination desk: eligibility filtering, the draft/submitted/approved lifecycle,
//! and the integrity seal taken when an approved nomination is first printed.

pub mod domain;
pub mod eligibility;
pub mod intake;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod seal;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorRole, AuditAction, AuditLogEntry, CriteriaDraft, CriteriaId, GradeLevel,
    Location, Nomination, NominationId, NominationMembership, NominationStatus, OrgPath,
    ProgramDraft, ProgramId, RosterUpload, SelectionCriteria, StaffId, StaffRecord,
    TrainingProgram,
};
pub use eligibility::{EligibilityFilter, FilterDimension, GenerationOutcome, NominationGenerator};
pub use intake::{IntakeGuard, IntakeViolation};
pub use lifecycle::{Decision, LifecycleError};
pub use repository::{
    AuditLog, NominationRepository, NominationView, ProgramCatalog, RepositoryError,
    RosterResetPreview, RosterResetSummary, StaffDirectory, TrainingStore, UpsertOutcome,
};
pub use router::nomination_router;
pub use seal::{IntegritySeal, SealDigest, SealStatus, SealVerification};
pub use service::{
    HistoryEntry, NominationService, NominationServiceError, OrgHierarchy, PrintedMember,
    PrintedNomination, StatusCounts, TrainingHistory,
};
pub use store::{MemoryAuditLog, MemoryStore};
