use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::super::domain::{GradeLevel, Location, SelectionCriteria, StaffRecord};

/// Criterion dimension a predicate enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    GradeLevel,
    Location,
    Directorate,
    Division,
    Department,
    PreviousTrainings,
    ServiceYears,
}

/// A single eligibility test over one staff record.
pub trait StaffPredicate: Send + Sync {
    fn dimension(&self) -> FilterDimension;
    fn admits(&self, staff: &StaffRecord) -> bool;
}

struct GradeLevelIn(BTreeSet<GradeLevel>);

impl StaffPredicate for GradeLevelIn {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::GradeLevel
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        self.0.contains(&staff.grade_level)
    }
}

struct LocationIn(BTreeSet<Location>);

impl StaffPredicate for LocationIn {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::Location
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        self.0.contains(&staff.location)
    }
}

struct DirectorateIn(BTreeSet<String>);

impl StaffPredicate for DirectorateIn {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::Directorate
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        self.0.contains(&staff.org.directorate)
    }
}

struct DivisionIn(BTreeSet<String>);

impl StaffPredicate for DivisionIn {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::Division
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        self.0.contains(&staff.org.division)
    }
}

/// Staff without a department never match a department restriction.
struct DepartmentIn(BTreeSet<String>);

impl StaffPredicate for DepartmentIn {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::Department
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        staff
            .org
            .department
            .as_ref()
            .map(|department| self.0.contains(department))
            .unwrap_or(false)
    }
}

struct PreviousTrainingsAtMost(u32);

impl StaffPredicate for PreviousTrainingsAtMost {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::PreviousTrainings
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        staff.training_count <= self.0
    }
}

/// Service boundary expressed as a join-year cutoff.
struct JoinedBy {
    cutoff_year: i32,
}

impl StaffPredicate for JoinedBy {
    fn dimension(&self) -> FilterDimension {
        FilterDimension::ServiceYears
    }

    fn admits(&self, staff: &StaffRecord) -> bool {
        staff.date_joined.year() <= self.cutoff_year
    }
}

/// Build the ordered conjunction for `criteria`. Unset dimensions contribute nothing.
pub(crate) fn predicates_for(
    criteria: &SelectionCriteria,
    as_of: NaiveDate,
) -> Vec<Box<dyn StaffPredicate>> {
    let mut predicates: Vec<Box<dyn StaffPredicate>> = Vec::new();

    if !criteria.grade_levels.is_empty() {
        predicates.push(Box::new(GradeLevelIn(criteria.grade_levels.clone())));
    }

    if !criteria.location_unrestricted() {
        predicates.push(Box::new(LocationIn(criteria.locations.clone())));
    }

    if !criteria.directorates.is_empty() {
        predicates.push(Box::new(DirectorateIn(criteria.directorates.clone())));
    }

    if !criteria.divisions.is_empty() {
        predicates.push(Box::new(DivisionIn(criteria.divisions.clone())));
    }

    if !criteria.departments.is_empty() {
        predicates.push(Box::new(DepartmentIn(criteria.departments.clone())));
    }

    predicates.push(Box::new(PreviousTrainingsAtMost(
        criteria.max_previous_trainings,
    )));

    let max_years = i32::try_from(criteria.max_years_of_service).unwrap_or(i32::MAX);
    predicates.push(Box::new(JoinedBy {
        cutoff_year: as_of.year().saturating_sub(max_years),
    }));

    predicates
}
