mod normalizer;
mod parser;

use crate::config::RosterConfig;
use crate::workflows::nomination::domain::{
    GradeLevel, Location, OrgPath, StaffId, StaffRecord,
};
use crate::workflows::nomination::repository::{RepositoryError, StaffDirectory, UpsertOutcome};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

use parser::{ParseFailure, RosterRow};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumns(Vec<String>),
    Repository(RepositoryError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read nominal roll: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid nominal roll CSV data: {}", err),
            RosterImportError::MissingColumns(columns) => {
                write!(f, "Missing required columns: {}", columns.join(", "))
            }
            RosterImportError::Repository(err) => {
                write!(f, "could not store nominal roll: {}", err)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::MissingColumns(_) => None,
            RosterImportError::Repository(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for RosterImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

impl From<ParseFailure> for RosterImportError {
    fn from(failure: ParseFailure) -> Self {
        match failure {
            ParseFailure::Csv(err) => Self::Csv(err),
            ParseFailure::MissingColumns(columns) => Self::MissingColumns(columns),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub row: usize,
    pub reason: String,
}

/// Per-import counters. Rejected rows never abort the import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub rejected_rows: Vec<RowRejection>,
}

impl ImportSummary {
    fn reject(&mut self, row: usize, reason: impl Into<String>) {
        self.errors += 1;
        self.rejected_rows.push(RowRejection {
            row,
            reason: reason.into(),
        });
    }
}

/// Bulk upsert of nominal-roll rows into a staff directory.
#[derive(Debug, Clone, Copy)]
pub struct RosterImporter {
    retirement_service_years: u32,
    current_year: i32,
}

impl RosterImporter {
    pub fn new(retirement_service_years: u32, current_year: i32) -> Self {
        Self {
            retirement_service_years,
            current_year,
        }
    }

    pub fn from_config(config: &RosterConfig) -> Self {
        Self::new(config.retirement_service_years, Utc::now().year())
    }

    pub fn from_path<P, D>(
        &self,
        path: P,
        directory: &D,
    ) -> Result<ImportSummary, RosterImportError>
    where
        P: AsRef<Path>,
        D: StaffDirectory + ?Sized,
    {
        let file = std::fs::File::open(path)?;
        self.import(file, directory)
    }

    pub fn import<R, D>(&self, reader: R, directory: &D) -> Result<ImportSummary, RosterImportError>
    where
        R: Read,
        D: StaffDirectory + ?Sized,
    {
        let mut summary = ImportSummary::default();

        for parsed in parser::parse_rows(reader)? {
            summary.processed += 1;

            let record = match parsed
                .outcome
                .and_then(|row| self.staff_from_row(row))
            {
                Ok(record) => record,
                Err(reason) => {
                    tracing::debug!(row = parsed.row, %reason, "nominal roll row rejected");
                    summary.reject(parsed.row, reason);
                    continue;
                }
            };

            match directory.upsert_staff(record)? {
                UpsertOutcome::Created => summary.created += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            }
        }

        tracing::info!(
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            errors = summary.errors,
            "nominal roll imported"
        );

        Ok(summary)
    }

    fn staff_from_row(&self, row: RosterRow) -> Result<StaffRecord, String> {
        let staff_id = row
            .personal_number
            .ok_or_else(|| "Personal Number is required".to_string())?;
        let name = row.name.ok_or_else(|| "Name is required".to_string())?;
        let (first_name, last_name) = normalizer::split_name(&name)
            .ok_or_else(|| format!("Name '{name}' must include first and last name"))?;

        let grade_level = row
            .grade
            .ok_or_else(|| "GL Range is required".to_string())?
            .parse::<GradeLevel>()
            .map_err(|err| err.to_string())?;

        let directorate = row
            .directorate
            .ok_or_else(|| "Directorate is required".to_string())?;
        let division = row
            .division
            .ok_or_else(|| "Division is required".to_string())?;

        let location = row
            .location
            .and_then(|raw| raw.parse::<Location>().ok())
            .filter(|location| *location != Location::All)
            .unwrap_or(Location::Hq);

        let raw_years = row
            .years_left
            .ok_or_else(|| "Years of Service Left is required".to_string())?;
        let years_left = normalizer::parse_years(&raw_years)
            .and_then(|years| u32::try_from(years).ok())
            .filter(|years| *years <= self.retirement_service_years)
            .ok_or_else(|| {
                format!(
                    "Years of Service Left must be a number between 0-{} (found '{raw_years}')",
                    self.retirement_service_years
                )
            })?;
        let date_joined =
            normalizer::joined_on(self.current_year, self.retirement_service_years, years_left)
                .ok_or_else(|| format!("cannot derive join date from '{raw_years}'"))?;

        Ok(StaffRecord {
            staff_id: StaffId(staff_id),
            first_name,
            last_name,
            grade_level,
            org: OrgPath {
                directorate,
                division,
                department: row.department,
            },
            location,
            date_joined,
            training_count: 0,
        })
    }
}
