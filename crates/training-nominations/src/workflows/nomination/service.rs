use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::config::AppConfig;
use crate::workflows::roster::{ImportSummary, RosterImportError, RosterImporter};

use super::domain::{
    Actor, AuditAction, AuditLogEntry, CriteriaDraft, CriteriaId, GradeLevel, Location,
    Nomination, NominationId, NominationMembership, NominationStatus, ProgramDraft, ProgramId,
    RosterUpload, SelectionCriteria, StaffId, StaffRecord, TrainingProgram,
};
use super::eligibility::NominationGenerator;
use super::intake::{IntakeGuard, IntakeViolation};
use super::lifecycle::{self, Decision, LifecycleError};
use super::repository::{
    AuditLog, NominationView, RepositoryError, RosterResetPreview, RosterResetSummary,
    TrainingStore,
};
use super::seal::{IntegritySeal, SealDigest, SealStatus, SealVerification};

const MIN_QUERY_LENGTH: usize = 2;
const MAX_CANDIDATES: usize = 10;
const UPLOAD_HISTORY_LIMIT: usize = 10;

/// Service composing the intake guard, store, audit log, and integrity seal.
pub struct NominationService<S, L> {
    store: Arc<S>,
    audit: Arc<L>,
    seal: Arc<IntegritySeal>,
    guard: IntakeGuard,
}

static PROGRAM_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CRITERIA_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static NOMINATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_program_id() -> ProgramId {
    let id = PROGRAM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProgramId(format!("trn-{id:06}"))
}

fn next_criteria_id() -> CriteriaId {
    let id = CRITERIA_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CriteriaId(format!("crt-{id:06}"))
}

fn next_nomination_id() -> NominationId {
    let id = NOMINATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    NominationId(format!("nom-{id:06}"))
}

/// One line of a printed nomination sheet.
#[derive(Debug, Clone, Serialize)]
pub struct PrintedMember {
    pub staff_id: StaffId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<GradeLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directorate: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintedNomination {
    pub nomination_id: NominationId,
    pub program: TrainingProgram,
    pub members: Vec<PrintedMember>,
    pub digest: SealDigest,
    pub first_print: bool,
    pub tampered: bool,
    pub printed_by: Option<String>,
    pub printed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub draft: usize,
    pub submitted: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    fn record(&mut self, status: NominationStatus) {
        self.total += 1;
        match status {
            NominationStatus::Draft => self.draft += 1,
            NominationStatus::Submitted => self.submitted += 1,
            NominationStatus::Approved => self.approved += 1,
            NominationStatus::Rejected => self.rejected += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub nomination_id: NominationId,
    pub program_title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub status: NominationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingHistory {
    pub staff: StaffRecord,
    pub entries: Vec<HistoryEntry>,
    pub counts: StatusCounts,
}

/// Directorate to division to departments, as currently present on the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrgHierarchy {
    pub directorates: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl<S, L> NominationService<S, L>
where
    S: TrainingStore + 'static,
    L: AuditLog + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<L>, seal: IntegritySeal, guard: IntakeGuard) -> Self {
        Self {
            store,
            audit,
            seal: Arc::new(seal),
            guard,
        }
    }

    pub fn from_config(store: Arc<S>, audit: Arc<L>, config: &AppConfig) -> Self {
        Self::new(
            store,
            audit,
            IntegritySeal::from_config(&config.seal),
            IntakeGuard::from(&config.roster),
        )
    }

    pub fn create_program(
        &self,
        draft: ProgramDraft,
        actor: &Actor,
    ) -> Result<TrainingProgram, NominationServiceError> {
        let program = self
            .guard
            .program_from_draft(next_program_id(), draft, &actor.username)?;
        let stored = self.store.insert_program(program)?;
        tracing::info!(program_id = %stored.id, actor = %actor.username, "training program created");
        Ok(stored)
    }

    /// Move a program's dates. Sealed nominations against it will report tampering.
    pub fn reschedule_program(
        &self,
        program_id: &ProgramId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        actor: &Actor,
    ) -> Result<TrainingProgram, NominationServiceError> {
        let mut program = self.program(program_id)?;
        if !actor.is_elevated() && program.created_by != actor.username {
            return Err(LifecycleError::Unauthorized {
                actor: actor.username.clone(),
                action: "reschedule",
            }
            .into());
        }
        if end_date < start_date {
            return Err(IntakeViolation::EndsBeforeStart {
                start: start_date,
                end: end_date,
            }
            .into());
        }

        program.start_date = start_date;
        program.end_date = end_date;
        self.store.update_program(program.clone())?;
        tracing::info!(program_id = %program.id, %start_date, %end_date, "training program rescheduled");
        Ok(program)
    }

    /// Store new criteria for a program, superseding any earlier record.
    pub fn set_criteria(
        &self,
        program_id: &ProgramId,
        draft: CriteriaDraft,
        actor: &Actor,
    ) -> Result<SelectionCriteria, NominationServiceError> {
        let program = self.program(program_id)?;
        let criteria =
            self.guard
                .criteria_from_draft(next_criteria_id(), program.id.clone(), draft)?;
        let stored = self.store.insert_criteria(criteria)?;
        tracing::info!(
            program_id = %program.id,
            criteria_id = %stored.id.0,
            actor = %actor.username,
            "selection criteria stored"
        );
        Ok(stored)
    }

    pub fn generate_nomination(
        &self,
        program_id: &ProgramId,
        actor: &Actor,
    ) -> Result<Nomination, NominationServiceError> {
        self.generate_nomination_as_of(program_id, actor, Utc::now().date_naive())
    }

    pub(crate) fn generate_nomination_as_of(
        &self,
        program_id: &ProgramId,
        actor: &Actor,
        as_of: NaiveDate,
    ) -> Result<Nomination, NominationServiceError> {
        let program = self.program(program_id)?;
        let criteria = self
            .store
            .active_criteria(program_id)?
            .ok_or_else(|| NominationServiceError::MissingCriteria(program_id.clone()))?;

        let outcome =
            NominationGenerator::generate(&program, &criteria, self.store.roster()?, as_of);

        let created_at = Utc::now();
        let nomination = Nomination {
            id: next_nomination_id(),
            program_id: program.id.clone(),
            criteria_id: criteria.id.clone(),
            status: NominationStatus::Draft,
            members: outcome
                .selected
                .iter()
                .map(|staff| NominationMembership {
                    staff_id: staff.staff_id.clone(),
                    selected_at: created_at,
                })
                .collect(),
            created_by: actor.username.clone(),
            created_at,
            approved_by: None,
            approved_at: None,
            printed_at: None,
            printed_by: None,
            seal: None,
        };

        let stored = self.store.insert_nomination(nomination)?;
        self.append_audit(AuditLogEntry::record(
            &stored.id,
            AuditAction::Created,
            actor,
            format!(
                "Nomination generated with {} staff members ({} eligible)",
                stored.members.len(),
                outcome.eligible
            ),
        ))?;

        tracing::info!(
            nomination_id = %stored.id,
            program_id = %program.id,
            selected = stored.members.len(),
            eligible = outcome.eligible,
            excluded_by_capacity = outcome.excluded_by_capacity,
            "nomination generated"
        );
        Ok(stored)
    }

    pub fn add_member(
        &self,
        nomination_id: &NominationId,
        staff_id: &StaffId,
        actor: &Actor,
    ) -> Result<Nomination, NominationServiceError> {
        let (nomination, staff_name) = self.store.update_with_staff(
            nomination_id,
            staff_id,
            |nomination, program, staff| -> Result<_, NominationServiceError> {
                lifecycle::add_member(nomination, program, staff_id, actor)?;
                Ok((nomination.clone(), staff.full_name()))
            },
        )?;

        self.append_audit(AuditLogEntry::record(
            nomination_id,
            AuditAction::StaffAdded,
            actor,
            format!("Added staff {staff_id} - {staff_name}"),
        ))?;
        tracing::info!(%nomination_id, %staff_id, actor = %actor.username, "staff added to nomination");
        Ok(nomination)
    }

    pub fn remove_member(
        &self,
        nomination_id: &NominationId,
        staff_id: &StaffId,
        actor: &Actor,
    ) -> Result<Nomination, NominationServiceError> {
        let nomination = self.store.update_with(
            nomination_id,
            |nomination, _| -> Result<Nomination, NominationServiceError> {
                lifecycle::remove_member(nomination, staff_id, actor)?;
                Ok(nomination.clone())
            },
        )?;

        let description = match self.store.staff(staff_id)? {
            Some(staff) => format!("Removed staff {} - {}", staff.staff_id, staff.full_name()),
            None => format!("Removed staff {staff_id}"),
        };
        self.append_audit(AuditLogEntry::record(
            nomination_id,
            AuditAction::StaffRemoved,
            actor,
            description,
        ))?;
        tracing::info!(%nomination_id, %staff_id, actor = %actor.username, "staff removed from nomination");
        Ok(nomination)
    }

    pub fn submit(
        &self,
        nomination_id: &NominationId,
        actor: &Actor,
    ) -> Result<Nomination, NominationServiceError> {
        let nomination = self.store.update_with(
            nomination_id,
            |nomination, _| -> Result<Nomination, NominationServiceError> {
                lifecycle::submit(nomination, actor)?;
                Ok(nomination.clone())
            },
        )?;

        self.append_audit(AuditLogEntry::record(
            nomination_id,
            AuditAction::Updated,
            actor,
            "Nomination submitted for approval",
        ))?;
        tracing::info!(%nomination_id, actor = %actor.username, "nomination submitted");
        Ok(nomination)
    }

    pub fn approve(
        &self,
        nomination_id: &NominationId,
        actor: &Actor,
    ) -> Result<Nomination, NominationServiceError> {
        self.decide(nomination_id, actor, Decision::Approve)
    }

    pub fn reject(
        &self,
        nomination_id: &NominationId,
        actor: &Actor,
    ) -> Result<Nomination, NominationServiceError> {
        self.decide(nomination_id, actor, Decision::Reject)
    }

    fn decide(
        &self,
        nomination_id: &NominationId,
        actor: &Actor,
        decision: Decision,
    ) -> Result<Nomination, NominationServiceError> {
        let nomination = self.store.update_with(
            nomination_id,
            |nomination, _| -> Result<Nomination, NominationServiceError> {
                lifecycle::decide(nomination, actor, decision)?;
                Ok(nomination.clone())
            },
        )?;

        let (action, description) = match decision {
            Decision::Approve => (AuditAction::Approved, "Nomination approved by admin"),
            Decision::Reject => (AuditAction::Rejected, "Nomination rejected by admin"),
        };
        self.append_audit(AuditLogEntry::record(
            nomination_id,
            action,
            actor,
            description,
        ))?;
        tracing::info!(%nomination_id, actor = %actor.username, decision = action.label(), "nomination decided");
        Ok(nomination)
    }

    /// Print an approved nomination. The first print stores the seal; later prints
    /// compare against it.
    pub fn seal_on_first_print(
        &self,
        nomination_id: &NominationId,
        actor: &Actor,
    ) -> Result<PrintedNomination, NominationServiceError> {
        let seal = Arc::clone(&self.seal);
        let (nomination, program, first_print, status) = self.store.update_with(
            nomination_id,
            |nomination, program| -> Result<_, NominationServiceError> {
                lifecycle::ensure_printable(nomination, actor)?;

                let first_print = nomination.seal.is_none();
                if first_print {
                    nomination.seal = Some(seal.seal(nomination, program));
                    nomination.printed_at = Some(Utc::now());
                    nomination.printed_by = Some(actor.username.clone());
                }
                let status = seal.verify(nomination, program);

                Ok((nomination.clone(), program.clone(), first_print, status))
            },
        )?;

        let description = if first_print {
            "Nomination printed for the first time"
        } else {
            "Nomination re-printed"
        };
        self.append_audit(AuditLogEntry::record(
            nomination_id,
            AuditAction::Printed,
            actor,
            description,
        ))?;

        let tampered = status == SealStatus::Tampered;
        if tampered {
            tracing::warn!(%nomination_id, actor = %actor.username, "nomination seal mismatch on print");
        } else {
            tracing::info!(%nomination_id, first_print, "nomination printed");
        }

        let digest = nomination
            .seal
            .clone()
            .ok_or_else(|| RepositoryError::Unavailable("seal missing after print".to_string()))?;

        Ok(PrintedNomination {
            nomination_id: nomination.id.clone(),
            members: self.printed_members(&nomination)?,
            program,
            digest,
            first_print,
            tampered,
            printed_by: nomination.printed_by,
            printed_at: nomination.printed_at,
        })
    }

    fn printed_members(
        &self,
        nomination: &Nomination,
    ) -> Result<Vec<PrintedMember>, NominationServiceError> {
        let mut members = Vec::with_capacity(nomination.members.len());
        for staff_id in nomination.sorted_member_ids() {
            let member = match self.store.staff(&staff_id)? {
                Some(staff) => PrintedMember {
                    name: staff.full_name(),
                    grade_level: Some(staff.grade_level),
                    location: Some(staff.location),
                    directorate: Some(staff.org.directorate),
                    staff_id,
                },
                None => PrintedMember {
                    name: String::new(),
                    grade_level: None,
                    location: None,
                    directorate: None,
                    staff_id,
                },
            };
            members.push(member);
        }

        members.sort_by(|left, right| {
            Reverse(left.grade_level.map(GradeLevel::rank))
                .cmp(&Reverse(right.grade_level.map(GradeLevel::rank)))
                .then_with(|| left.staff_id.cmp(&right.staff_id))
        });
        Ok(members)
    }

    /// Recompute the seal from current state, read under the store lock.
    pub fn verify(
        &self,
        nomination_id: &NominationId,
    ) -> Result<SealVerification, NominationServiceError> {
        let seal = Arc::clone(&self.seal);
        let status = self.store.update_with(
            nomination_id,
            |nomination, program| -> Result<SealStatus, NominationServiceError> {
                Ok(seal.verify(nomination, program))
            },
        )?;

        if status == SealStatus::Tampered {
            tracing::warn!(%nomination_id, "nomination seal mismatch");
        }
        Ok(status.verification())
    }

    pub fn get(&self, nomination_id: &NominationId) -> Result<NominationView, NominationServiceError> {
        let nomination = self.nomination(nomination_id)?;
        let program = self.program(&nomination.program_id)?;
        let status = self.seal.verify(&nomination, &program);
        Ok(NominationView::new(&nomination, &program, status))
    }

    pub fn list_nominations(
        &self,
        status: NominationStatus,
    ) -> Result<Vec<Nomination>, NominationServiceError> {
        Ok(self.store.by_status(status)?)
    }

    /// Audit entries, newest first.
    pub fn audit_trail(
        &self,
        nomination_id: &NominationId,
    ) -> Result<Vec<AuditLogEntry>, NominationServiceError> {
        self.nomination(nomination_id)?;
        let mut entries = self.audit.entries_for(nomination_id)?;
        entries.reverse();
        Ok(entries)
    }

    /// Staff matching `query` by id or name who are not yet on the nomination.
    pub fn search_candidates(
        &self,
        nomination_id: &NominationId,
        query: &str,
    ) -> Result<Vec<StaffRecord>, NominationServiceError> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LENGTH {
            return Err(NominationServiceError::QueryTooShort(MIN_QUERY_LENGTH));
        }

        let nomination = self.nomination(nomination_id)?;
        let matches = |value: &str| value.to_lowercase().contains(&query);

        Ok(self
            .store
            .roster()?
            .into_iter()
            .filter(|staff| !nomination.contains(&staff.staff_id))
            .filter(|staff| {
                matches(&staff.staff_id.0) || matches(&staff.first_name) || matches(&staff.last_name)
            })
            .take(MAX_CANDIDATES)
            .collect())
    }

    pub fn training_history(
        &self,
        staff_id: &StaffId,
    ) -> Result<TrainingHistory, NominationServiceError> {
        let staff = self
            .store
            .staff(staff_id)?
            .ok_or(RepositoryError::NotFound)?;

        let mut counts = StatusCounts::default();
        let mut entries = Vec::new();
        for nomination in self.store.nominations_with(staff_id)? {
            let Some(program) = self.store.program(&nomination.program_id)? else {
                continue;
            };
            counts.record(nomination.status);
            entries.push(HistoryEntry {
                nomination_id: nomination.id,
                duration_days: program.duration_days(),
                program_title: program.title,
                start_date: program.start_date,
                end_date: program.end_date,
                status: nomination.status,
            });
        }

        Ok(TrainingHistory {
            staff,
            entries,
            counts,
        })
    }

    pub fn remove_staff(
        &self,
        staff_id: &StaffId,
        force: bool,
        actor: &Actor,
    ) -> Result<(), NominationServiceError> {
        ensure_elevated(actor, "delete staff")?;
        self.store.remove_staff(staff_id, force)?;
        tracing::info!(%staff_id, force, actor = %actor.username, "staff record deleted");
        Ok(())
    }

    pub fn reset_roster(
        &self,
        force: bool,
        actor: &Actor,
    ) -> Result<RosterResetSummary, NominationServiceError> {
        ensure_elevated(actor, "reset the roster")?;
        let summary = self.store.reset_roster(force)?;
        tracing::info!(
            deleted = summary.deleted,
            preserved = summary.preserved,
            uploads_cleared = summary.uploads_cleared,
            force,
            actor = %actor.username,
            "nominal roll reset"
        );
        Ok(summary)
    }

    /// Import a nominal roll and keep a record of the upload.
    pub fn import_roster<R: Read>(
        &self,
        reader: R,
        file_name: &str,
        actor: &Actor,
    ) -> Result<ImportSummary, NominationServiceError> {
        ensure_elevated(actor, "import the roster")?;
        let importer = RosterImporter::new(
            self.guard.retirement_service_years(),
            Utc::now().year(),
        );
        let summary = importer.import(reader, self.store.as_ref())?;

        self.store.record_upload(RosterUpload {
            uploaded_by: actor.username.clone(),
            uploaded_at: Utc::now(),
            file_name: file_name.trim().to_string(),
            processed: summary.processed,
            created: summary.created,
            updated: summary.updated,
            errors: summary.errors,
        })?;
        tracing::info!(file_name, actor = %actor.username, "nominal roll upload recorded");
        Ok(summary)
    }

    /// The last ten uploads, newest first.
    pub fn upload_history(&self, actor: &Actor) -> Result<Vec<RosterUpload>, NominationServiceError> {
        ensure_elevated(actor, "view roster uploads")?;
        Ok(self.store.recent_uploads(UPLOAD_HISTORY_LIMIT)?)
    }

    pub fn reset_preview(&self, actor: &Actor) -> Result<RosterResetPreview, NominationServiceError> {
        ensure_elevated(actor, "reset the roster")?;
        Ok(self.store.reset_preview()?)
    }

    pub fn org_hierarchy(&self) -> Result<OrgHierarchy, NominationServiceError> {
        let mut hierarchy = OrgHierarchy::default();
        for staff in self.store.roster()? {
            let departments = hierarchy
                .directorates
                .entry(staff.org.directorate)
                .or_default()
                .entry(staff.org.division)
                .or_default();
            if let Some(department) = staff.org.department {
                departments.insert(department);
            }
        }
        Ok(hierarchy)
    }

    /// Append the audit entry for a change that has already been committed.
    fn append_audit(&self, entry: AuditLogEntry) -> Result<(), NominationServiceError> {
        let nomination_id = entry.nomination_id.clone();
        let action = entry.action;
        self.audit.append(entry).map_err(|err| {
            tracing::error!(
                %nomination_id,
                action = action.label(),
                error = %err,
                "audit entry lost for committed change"
            );
            NominationServiceError::from(err)
        })
    }

    fn program(&self, program_id: &ProgramId) -> Result<TrainingProgram, NominationServiceError> {
        Ok(self
            .store
            .program(program_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn nomination(&self, nomination_id: &NominationId) -> Result<Nomination, NominationServiceError> {
        Ok(self
            .store
            .nomination(nomination_id)?
            .ok_or(RepositoryError::NotFound)?)
    }
}

fn ensure_elevated(actor: &Actor, action: &'static str) -> Result<(), LifecycleError> {
    if actor.is_elevated() {
        Ok(())
    } else {
        Err(LifecycleError::Unauthorized {
            actor: actor.username.clone(),
            action,
        })
    }
}

/// Error raised by the nomination service.
#[derive(Debug, thiserror::Error)]
pub enum NominationServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Import(#[from] RosterImportError),
    #[error("program {0} has no active selection criteria")]
    MissingCriteria(ProgramId),
    #[error("search query must be at least {0} characters")]
    QueryTooShort(usize),
}
