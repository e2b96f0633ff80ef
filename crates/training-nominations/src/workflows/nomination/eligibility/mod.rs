mod rules;

pub use rules::{FilterDimension, StaffPredicate};

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{SelectionCriteria, StaffRecord, TrainingProgram};

/// Conjunction of the predicates derived from one criteria record.
pub struct EligibilityFilter {
    predicates: Vec<Box<dyn StaffPredicate>>,
}

impl EligibilityFilter {
    pub fn from_criteria(criteria: &SelectionCriteria, as_of: NaiveDate) -> Self {
        Self {
            predicates: rules::predicates_for(criteria, as_of),
        }
    }

    /// Dimensions actively filtering, in evaluation order.
    pub fn dimensions(&self) -> Vec<FilterDimension> {
        self.predicates
            .iter()
            .map(|predicate| predicate.dimension())
            .collect()
    }

    pub fn admits(&self, staff: &StaffRecord) -> bool {
        self.first_failure(staff).is_none()
    }

    /// First dimension that rejects `staff`, if any.
    pub fn first_failure(&self, staff: &StaffRecord) -> Option<FilterDimension> {
        self.predicates
            .iter()
            .find(|predicate| !predicate.admits(staff))
            .map(|predicate| predicate.dimension())
    }
}

/// Result of a single generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub selected: Vec<StaffRecord>,
    pub eligible: usize,
    pub excluded_by_capacity: usize,
}

/// Stateless selector applying criteria to a roster snapshot.
pub struct NominationGenerator;

impl NominationGenerator {
    /// Filter `roster`, order survivors by ascending staff id, and keep the first
    /// `program.capacity` of them.
    pub fn generate(
        program: &TrainingProgram,
        criteria: &SelectionCriteria,
        roster: Vec<StaffRecord>,
        as_of: NaiveDate,
    ) -> GenerationOutcome {
        let filter = EligibilityFilter::from_criteria(criteria, as_of);

        let mut eligible: Vec<StaffRecord> = roster
            .into_iter()
            .filter(|staff| filter.admits(staff))
            .collect();
        eligible.sort_by(|left, right| left.staff_id.cmp(&right.staff_id));

        let eligible_count = eligible.len();
        let capacity = usize::try_from(program.capacity).unwrap_or(usize::MAX);
        eligible.truncate(capacity);

        GenerationOutcome {
            excluded_by_capacity: eligible_count - eligible.len(),
            eligible: eligible_count,
            selected: eligible,
        }
    }
}
