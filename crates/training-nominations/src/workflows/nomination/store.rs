use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::domain::{
    AuditLogEntry, Nomination, NominationId, NominationStatus, ProgramId, RosterUpload,
    SelectionCriteria, StaffId, StaffRecord, TrainingProgram,
};
use super::repository::{
    AuditLog, NominationRepository, ProgramCatalog, RepositoryError, RosterResetPreview,
    RosterResetSummary, StaffDirectory, UpsertOutcome,
};

#[derive(Debug, Default)]
struct StoreState {
    staff: BTreeMap<StaffId, StaffRecord>,
    programs: HashMap<ProgramId, TrainingProgram>,
    criteria: Vec<SelectionCriteria>,
    nominations: HashMap<NominationId, Nomination>,
    uploads: Vec<RosterUpload>,
}

impl StoreState {
    /// Stored staff referenced by any approved nomination. Memberships left behind by a
    /// forced delete are not counted.
    fn protected_staff(&self) -> BTreeSet<StaffId> {
        self.nominations
            .values()
            .filter(|nomination| nomination.status == NominationStatus::Approved)
            .flat_map(|nomination| nomination.members.iter())
            .filter(|member| self.staff.contains_key(&member.staff_id))
            .map(|member| member.staff_id.clone())
            .collect()
    }
}

/// Process-local store. One mutex covers staff, uploads, programs and nominations so that
/// membership edits, sealing, approvals and roster deletion serialize against each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl StaffDirectory for MemoryStore {
    fn upsert_staff(&self, record: StaffRecord) -> Result<UpsertOutcome, RepositoryError> {
        let mut state = self.lock()?;
        match state.staff.insert(record.staff_id.clone(), record) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Created),
        }
    }

    fn staff(&self, id: &StaffId) -> Result<Option<StaffRecord>, RepositoryError> {
        Ok(self.lock()?.staff.get(id).cloned())
    }

    fn roster(&self) -> Result<Vec<StaffRecord>, RepositoryError> {
        Ok(self.lock()?.staff.values().cloned().collect())
    }

    fn remove_staff(&self, id: &StaffId, force: bool) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if !state.staff.contains_key(id) {
            return Err(RepositoryError::NotFound);
        }
        if !force && state.protected_staff().contains(id) {
            return Err(RepositoryError::StaffProtected(id.clone()));
        }
        state.staff.remove(id);
        Ok(())
    }

    fn reset_roster(&self, force: bool) -> Result<RosterResetSummary, RepositoryError> {
        let mut state = self.lock()?;
        let uploads_cleared = state.uploads.len();
        state.uploads.clear();

        let before = state.staff.len();
        if force {
            state.staff.clear();
        } else {
            let protected = state.protected_staff();
            state.staff.retain(|id, _| protected.contains(id));
        }

        Ok(RosterResetSummary {
            deleted: before - state.staff.len(),
            preserved: state.staff.len(),
            uploads_cleared,
        })
    }

    fn reset_preview(&self) -> Result<RosterResetPreview, RepositoryError> {
        let state = self.lock()?;
        let protected = state.protected_staff().len();
        Ok(RosterResetPreview {
            total_staff: state.staff.len(),
            protected,
            to_delete: state.staff.len() - protected,
            uploads: state.uploads.len(),
        })
    }

    fn record_upload(&self, upload: RosterUpload) -> Result<(), RepositoryError> {
        self.lock()?.uploads.push(upload);
        Ok(())
    }

    fn recent_uploads(&self, limit: usize) -> Result<Vec<RosterUpload>, RepositoryError> {
        Ok(self
            .lock()?
            .uploads
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

impl ProgramCatalog for MemoryStore {
    fn insert_program(&self, program: TrainingProgram) -> Result<TrainingProgram, RepositoryError> {
        let mut state = self.lock()?;
        if state.programs.contains_key(&program.id) {
            return Err(RepositoryError::Conflict);
        }
        state.programs.insert(program.id.clone(), program.clone());
        Ok(program)
    }

    fn program(&self, id: &ProgramId) -> Result<Option<TrainingProgram>, RepositoryError> {
        Ok(self.lock()?.programs.get(id).cloned())
    }

    fn update_program(&self, program: TrainingProgram) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        match state.programs.get_mut(&program.id) {
            Some(existing) => {
                *existing = program;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_criteria(
        &self,
        criteria: SelectionCriteria,
    ) -> Result<SelectionCriteria, RepositoryError> {
        let mut state = self.lock()?;
        if !state.programs.contains_key(&criteria.program_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.criteria.iter().any(|stored| stored.id == criteria.id) {
            return Err(RepositoryError::Conflict);
        }

        for stored in state
            .criteria
            .iter_mut()
            .filter(|stored| stored.program_id == criteria.program_id)
        {
            stored.is_active = false;
        }
        state.criteria.push(criteria.clone());
        Ok(criteria)
    }

    fn active_criteria(
        &self,
        program_id: &ProgramId,
    ) -> Result<Option<SelectionCriteria>, RepositoryError> {
        Ok(self
            .lock()?
            .criteria
            .iter()
            .rev()
            .find(|stored| &stored.program_id == program_id && stored.is_active)
            .cloned())
    }
}

impl NominationRepository for MemoryStore {
    fn insert_nomination(&self, nomination: Nomination) -> Result<Nomination, RepositoryError> {
        let mut state = self.lock()?;
        if state.nominations.contains_key(&nomination.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .nominations
            .insert(nomination.id.clone(), nomination.clone());
        Ok(nomination)
    }

    fn nomination(&self, id: &NominationId) -> Result<Option<Nomination>, RepositoryError> {
        Ok(self.lock()?.nominations.get(id).cloned())
    }

    fn update_with<T, E, F>(&self, id: &NominationId, change: F) -> Result<T, E>
    where
        F: FnOnce(&mut Nomination, &TrainingProgram) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut state = self.lock()?;
        let state = &mut *state;

        let stored = state
            .nominations
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let program = state
            .programs
            .get(&stored.program_id)
            .ok_or(RepositoryError::NotFound)?;

        let mut working = stored.clone();
        let value = change(&mut working, program)?;
        *stored = working;
        Ok(value)
    }

    fn update_with_staff<T, E, F>(
        &self,
        id: &NominationId,
        staff_id: &StaffId,
        change: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Nomination, &TrainingProgram, &StaffRecord) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut state = self.lock()?;
        let state = &mut *state;

        let stored = state
            .nominations
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let program = state
            .programs
            .get(&stored.program_id)
            .ok_or(RepositoryError::NotFound)?;
        let staff = state.staff.get(staff_id).ok_or(RepositoryError::NotFound)?;

        let mut working = stored.clone();
        let value = change(&mut working, program, staff)?;
        *stored = working;
        Ok(value)
    }

    fn nominations_with(&self, staff_id: &StaffId) -> Result<Vec<Nomination>, RepositoryError> {
        let state = self.lock()?;
        let mut found: Vec<Nomination> = state
            .nominations
            .values()
            .filter(|nomination| nomination.contains(staff_id))
            .cloned()
            .collect();
        found.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(found)
    }

    fn by_status(&self, status: NominationStatus) -> Result<Vec<Nomination>, RepositoryError> {
        let state = self.lock()?;
        let mut found: Vec<Nomination> = state
            .nominations
            .values()
            .filter(|nomination| nomination.status == status)
            .cloned()
            .collect();
        found.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(found)
    }
}

/// Audit entries in insertion order.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .map_err(|_| RepositoryError::Unavailable("audit mutex poisoned".to_string()))?
            .push(entry);
        Ok(())
    }

    fn entries_for(&self, id: &NominationId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RepositoryError::Unavailable("audit mutex poisoned".to_string()))?;
        Ok(entries
            .iter()
            .filter(|entry| &entry.nomination_id == id)
            .cloned()
            .collect())
    }
}
