use std::collections::BTreeSet;

use chrono::Utc;

use crate::config::{RosterConfig, DEFAULT_RETIREMENT_SERVICE_YEARS};

use super::domain::{
    CriteriaDraft, CriteriaId, GradeLevel, ProgramDraft, ProgramId, SelectionCriteria,
    TrainingProgram,
};

const DEFAULT_CAPACITY: u32 = 25;

/// Validation errors raised while accepting programs and criteria.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("program title is required")]
    MissingTitle,
    #[error("program ends ({end}) before it starts ({start})")]
    EndsBeforeStart {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("program capacity must be at least 1")]
    ZeroCapacity,
    #[error("'Grade Level From' ({from}) cannot be higher than 'Grade Level To' ({to})")]
    InvertedGradeRange { from: GradeLevel, to: GradeLevel },
    #[error("years of service left must be between 0 and {max} (found {found})")]
    ServiceYearsOutOfRange { max: u32, found: u32 },
}

/// Guard turning form drafts into stored programs and criteria.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    retirement_service_years: u32,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_RETIREMENT_SERVICE_YEARS)
    }
}

impl From<&RosterConfig> for IntakeGuard {
    fn from(config: &RosterConfig) -> Self {
        Self::new(config.retirement_service_years)
    }
}

impl IntakeGuard {
    pub fn new(retirement_service_years: u32) -> Self {
        let retirement_service_years = if retirement_service_years == 0 {
            DEFAULT_RETIREMENT_SERVICE_YEARS
        } else {
            retirement_service_years
        };

        Self {
            retirement_service_years,
        }
    }

    pub fn retirement_service_years(&self) -> u32 {
        self.retirement_service_years
    }

    pub fn program_from_draft(
        &self,
        id: ProgramId,
        draft: ProgramDraft,
        created_by: &str,
    ) -> Result<TrainingProgram, IntakeViolation> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(IntakeViolation::MissingTitle);
        }

        if draft.end_date < draft.start_date {
            return Err(IntakeViolation::EndsBeforeStart {
                start: draft.start_date,
                end: draft.end_date,
            });
        }

        let capacity = draft.capacity.unwrap_or(DEFAULT_CAPACITY);
        if capacity == 0 {
            return Err(IntakeViolation::ZeroCapacity);
        }

        Ok(TrainingProgram {
            id,
            title,
            start_date: draft.start_date,
            end_date: draft.end_date,
            venue: draft.venue.trim().to_string(),
            capacity,
            coordinator: non_blank(draft.coordinator),
            consultant: non_blank(draft.consultant),
            remarks: draft.remarks,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Convert form input into criteria. A single grade bound is treated as open-ended.
    pub fn criteria_from_draft(
        &self,
        id: CriteriaId,
        program_id: ProgramId,
        draft: CriteriaDraft,
    ) -> Result<SelectionCriteria, IntakeViolation> {
        let grade_levels = match (draft.grade_level_from, draft.grade_level_to) {
            (Some(from), Some(to)) if from > to => {
                return Err(IntakeViolation::InvertedGradeRange { from, to })
            }
            (Some(from), Some(to)) => GradeLevel::range(from, to),
            (Some(from), None) => GradeLevel::range(from, GradeLevel::Gl16),
            (None, Some(to)) => GradeLevel::range(GradeLevel::Gl04, to),
            (None, None) => BTreeSet::new(),
        };

        if draft.max_years_service_left > self.retirement_service_years {
            return Err(IntakeViolation::ServiceYearsOutOfRange {
                max: self.retirement_service_years,
                found: draft.max_years_service_left,
            });
        }

        let max_years_of_service = self.retirement_service_years - draft.max_years_service_left;

        Ok(SelectionCriteria {
            id,
            program_id,
            grade_levels,
            locations: draft.locations.into_iter().collect(),
            directorates: trimmed_set(draft.directorates),
            divisions: trimmed_set(draft.divisions),
            departments: trimmed_set(draft.departments),
            max_previous_trainings: draft.max_previous_trainings,
            min_years_of_service: 0,
            max_years_of_service,
            created_at: Utc::now(),
            is_active: true,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn trimmed_set(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
