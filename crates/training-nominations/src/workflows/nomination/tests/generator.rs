use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::common::*;
use crate::workflows::nomination::domain::{GradeLevel, Location, StaffRecord};
use crate::workflows::nomination::eligibility::{
    EligibilityFilter, FilterDimension, NominationGenerator,
};

fn ids(selected: &[StaffRecord]) -> Vec<&str> {
    selected.iter().map(|staff| staff.staff_id.0.as_str()).collect()
}

fn mixed_roster() -> Vec<StaffRecord> {
    let mut finance = staff("P003");
    finance.org.directorate = "Finance".to_string();
    finance.org.division = "Treasury".to_string();
    finance.org.department = None;
    finance.location = Location::Lpc;

    let mut engineering = staff("P002");
    engineering.org.directorate = "Engineering".to_string();
    engineering.org.division = "Dredging".to_string();
    engineering.location = Location::Onne;

    vec![finance, engineering, staff("P001")]
}

#[test]
fn empty_org_dimensions_do_not_filter() {
    let outcome =
        NominationGenerator::generate(&program(10), &open_criteria(), mixed_roster(), as_of());

    assert_eq!(ids(&outcome.selected), vec!["P001", "P002", "P003"]);
    assert_eq!(outcome.eligible, 3);
    assert_eq!(outcome.excluded_by_capacity, 0);
}

#[test]
fn location_wildcard_overrides_other_entries() {
    let mut criteria = open_criteria();
    criteria.locations = BTreeSet::from([Location::All, Location::Lpc]);

    let outcome = NominationGenerator::generate(&program(10), &criteria, mixed_roster(), as_of());
    assert_eq!(outcome.selected.len(), 3);

    criteria.locations = BTreeSet::from([Location::Lpc, Location::Onne]);
    let outcome = NominationGenerator::generate(&program(10), &criteria, mixed_roster(), as_of());
    assert_eq!(ids(&outcome.selected), vec!["P002", "P003"]);
}

#[test]
fn department_restriction_excludes_staff_without_department() {
    let mut criteria = open_criteria();
    criteria.departments = BTreeSet::from(["Berthing".to_string()]);

    let outcome = NominationGenerator::generate(&program(10), &criteria, mixed_roster(), as_of());
    assert_eq!(ids(&outcome.selected), vec!["P001", "P002"]);
}

#[test]
fn directorate_and_division_filters_combine_conjunctively() {
    let mut criteria = open_criteria();
    criteria.directorates = BTreeSet::from(["Finance".to_string(), "Engineering".to_string()]);
    criteria.divisions = BTreeSet::from(["Dredging".to_string()]);

    let outcome = NominationGenerator::generate(&program(10), &criteria, mixed_roster(), as_of());
    assert_eq!(ids(&outcome.selected), vec!["P002"]);
}

#[test]
fn capacity_truncates_in_ascending_staff_id_order() {
    let roster: Vec<StaffRecord> = ["P005", "P003", "P001", "P004", "P002"]
        .into_iter()
        .map(staff)
        .collect();

    let outcome = NominationGenerator::generate(&program(2), &open_criteria(), roster, as_of());

    assert_eq!(ids(&outcome.selected), vec!["P001", "P002"]);
    assert_eq!(outcome.eligible, 5);
    assert_eq!(outcome.excluded_by_capacity, 3);
}

#[test]
fn previous_training_threshold_is_inclusive() {
    let mut at_limit = staff("P001");
    at_limit.training_count = 3;
    let mut over_limit = staff("P002");
    over_limit.training_count = 4;

    let outcome = NominationGenerator::generate(
        &program(10),
        &open_criteria(),
        vec![at_limit, over_limit],
        as_of(),
    );
    assert_eq!(ids(&outcome.selected), vec!["P001"]);
}

#[test]
fn service_boundary_uses_join_year_cutoff() {
    let mut criteria = open_criteria();
    criteria.max_years_of_service = 10;

    let mut boundary = staff("P001");
    boundary.date_joined = NaiveDate::from_ymd_opt(2015, 12, 31).expect("valid date");
    let mut too_recent = staff("P002");
    too_recent.date_joined = NaiveDate::from_ymd_opt(2016, 1, 1).expect("valid date");

    let outcome =
        NominationGenerator::generate(&program(10), &criteria, vec![boundary, too_recent], as_of());
    assert_eq!(ids(&outcome.selected), vec!["P001"]);
}

#[test]
fn minimum_service_years_are_carried_but_not_applied() {
    let mut criteria = open_criteria();
    criteria.min_years_of_service = 50;

    let outcome =
        NominationGenerator::generate(&program(10), &criteria, vec![staff("P001")], as_of());
    assert_eq!(outcome.selected.len(), 1);
}

#[test]
fn empty_result_is_not_an_error() {
    let mut criteria = open_criteria();
    criteria.grade_levels = BTreeSet::from([GradeLevel::Gl16]);

    let outcome = NominationGenerator::generate(&program(2), &criteria, mixed_roster(), as_of());
    assert!(outcome.selected.is_empty());
    assert_eq!(outcome.eligible, 0);
}

#[test]
fn filter_lists_active_dimensions_in_order() {
    let filter = EligibilityFilter::from_criteria(&open_criteria(), as_of());
    assert_eq!(
        filter.dimensions(),
        vec![FilterDimension::PreviousTrainings, FilterDimension::ServiceYears]
    );

    let mut criteria = open_criteria();
    criteria.grade_levels = GradeLevel::range(GradeLevel::Gl12, GradeLevel::Gl16);
    criteria.locations = BTreeSet::from([Location::Hq]);
    let filter = EligibilityFilter::from_criteria(&criteria, as_of());
    assert_eq!(
        filter.dimensions(),
        vec![
            FilterDimension::GradeLevel,
            FilterDimension::Location,
            FilterDimension::PreviousTrainings,
            FilterDimension::ServiceYears,
        ]
    );

    let junior = staff("P009");
    assert_eq!(
        filter.first_failure(&junior),
        Some(FilterDimension::GradeLevel)
    );
}
