use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::seal::SealDigest;

/// Personal number identifying a staff member across roster imports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for training programs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

/// Identifier wrapper for stored selection criteria.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CriteriaId(pub String);

/// Identifier wrapper for nominations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NominationId(pub String);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CriteriaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for NominationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised when parsing roster codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeParseError {
    #[error("unknown grade level '{0}'")]
    GradeLevel(String),
    #[error("unknown location '{0}'")]
    Location(String),
    #[error("unknown role '{0}'")]
    Role(String),
}

/// Salary grade levels in ascending seniority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "GL_04")]
    Gl04,
    #[serde(rename = "GL_06")]
    Gl06,
    #[serde(rename = "GL_07")]
    Gl07,
    #[serde(rename = "GL_08")]
    Gl08,
    #[serde(rename = "GL_09")]
    Gl09,
    #[serde(rename = "GL_10")]
    Gl10,
    #[serde(rename = "GL_12")]
    Gl12,
    #[serde(rename = "GL_13")]
    Gl13,
    #[serde(rename = "GL_14")]
    Gl14,
    #[serde(rename = "GL_15")]
    Gl15,
    #[serde(rename = "GL_16")]
    Gl16,
}

impl GradeLevel {
    pub const ALL: [GradeLevel; 11] = [
        GradeLevel::Gl04,
        GradeLevel::Gl06,
        GradeLevel::Gl07,
        GradeLevel::Gl08,
        GradeLevel::Gl09,
        GradeLevel::Gl10,
        GradeLevel::Gl12,
        GradeLevel::Gl13,
        GradeLevel::Gl14,
        GradeLevel::Gl15,
        GradeLevel::Gl16,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            GradeLevel::Gl04 => "GL_04",
            GradeLevel::Gl06 => "GL_06",
            GradeLevel::Gl07 => "GL_07",
            GradeLevel::Gl08 => "GL_08",
            GradeLevel::Gl09 => "GL_09",
            GradeLevel::Gl10 => "GL_10",
            GradeLevel::Gl12 => "GL_12",
            GradeLevel::Gl13 => "GL_13",
            GradeLevel::Gl14 => "GL_14",
            GradeLevel::Gl15 => "GL_15",
            GradeLevel::Gl16 => "GL_16",
        }
    }

    /// Numeric grade, used to order printed lists.
    pub const fn rank(self) -> u8 {
        match self {
            GradeLevel::Gl04 => 4,
            GradeLevel::Gl06 => 6,
            GradeLevel::Gl07 => 7,
            GradeLevel::Gl08 => 8,
            GradeLevel::Gl09 => 9,
            GradeLevel::Gl10 => 10,
            GradeLevel::Gl12 => 12,
            GradeLevel::Gl13 => 13,
            GradeLevel::Gl14 => 14,
            GradeLevel::Gl15 => 15,
            GradeLevel::Gl16 => 16,
        }
    }

    /// Every grade between `from` and `to` inclusive, in seniority order.
    pub fn range(from: GradeLevel, to: GradeLevel) -> BTreeSet<GradeLevel> {
        GradeLevel::ALL
            .iter()
            .copied()
            .filter(|grade| *grade >= from && *grade <= to)
            .collect()
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GL {:02}", self.rank())
    }
}

impl FromStr for GradeLevel {
    type Err = CodeParseError;

    /// Accepts the spellings found in nominal rolls: `GL_04`, `GL04`, `gl 04`, `04`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut normalized = raw.trim().to_ascii_uppercase().replace(' ', "_");
        if !normalized.starts_with("GL_") {
            normalized = match normalized.strip_prefix("GL") {
                Some(rest) => format!("GL_{rest}"),
                None => format!("GL_{normalized}"),
            };
        }

        GradeLevel::ALL
            .iter()
            .copied()
            .find(|grade| grade.code() == normalized)
            .ok_or_else(|| CodeParseError::GradeLevel(raw.trim().to_string()))
    }
}

/// Duty station. `All` is the unrestricted wildcard when used in criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Location {
    All,
    Lpc,
    Tcipc,
    Rp,
    Cal,
    Hq,
    Dp,
    Onne,
    Abj,
}

impl Location {
    pub const fn code(self) -> &'static str {
        match self {
            Location::All => "ALL",
            Location::Lpc => "LPC",
            Location::Tcipc => "TCIPC",
            Location::Rp => "RP",
            Location::Cal => "CAL",
            Location::Hq => "HQ",
            Location::Dp => "DP",
            Location::Onne => "ONNE",
            Location::Abj => "ABJ",
        }
    }
}

impl FromStr for Location {
    type Err = CodeParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Location::All),
            "LPC" => Ok(Location::Lpc),
            "TCIPC" => Ok(Location::Tcipc),
            "RP" => Ok(Location::Rp),
            "CAL" => Ok(Location::Cal),
            "HQ" => Ok(Location::Hq),
            "DP" => Ok(Location::Dp),
            "ONNE" => Ok(Location::Onne),
            "ABJ" => Ok(Location::Abj),
            _ => Err(CodeParseError::Location(raw.trim().to_string())),
        }
    }
}

/// Position of a staff member in the organisational hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgPath {
    pub directorate: String,
    pub division: String,
    pub department: Option<String>,
}

/// One row of the staff directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub staff_id: StaffId,
    pub first_name: String,
    pub last_name: String,
    pub grade_level: GradeLevel,
    pub org: OrgPath,
    pub location: Location,
    pub date_joined: NaiveDate,
    pub training_count: u32,
}

impl StaffRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whole calendar years between joining and `as_of`; month and day are ignored.
    pub fn years_of_service(&self, as_of: NaiveDate) -> i32 {
        as_of.year() - self.date_joined.year()
    }
}

/// A scheduled training program nominations are raised against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingProgram {
    pub id: ProgramId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    pub capacity: u32,
    pub coordinator: Option<String>,
    pub consultant: Option<String>,
    pub remarks: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TrainingProgram {
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Inbound program definition prior to validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDraft {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub coordinator: Option<String>,
    #[serde(default)]
    pub consultant: Option<String>,
    #[serde(default)]
    pub remarks: String,
}

/// Stored eligibility rules for one program. Never edited after creation; a newer record
/// supersedes it and flips `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub id: CriteriaId,
    pub program_id: ProgramId,
    pub grade_levels: BTreeSet<GradeLevel>,
    pub locations: BTreeSet<Location>,
    pub directorates: BTreeSet<String>,
    pub divisions: BTreeSet<String>,
    pub departments: BTreeSet<String>,
    pub max_previous_trainings: u32,
    /// Carried for schema stability; the generator does not apply it.
    pub min_years_of_service: u32,
    pub max_years_of_service: u32,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl SelectionCriteria {
    pub fn location_unrestricted(&self) -> bool {
        self.locations.is_empty() || self.locations.contains(&Location::All)
    }
}

fn default_max_previous_trainings() -> u32 {
    3
}

fn default_max_years_service_left() -> u32 {
    34
}

/// Form-level criteria as entered by training staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaDraft {
    #[serde(default)]
    pub grade_level_from: Option<GradeLevel>,
    #[serde(default)]
    pub grade_level_to: Option<GradeLevel>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub directorates: Vec<String>,
    #[serde(default)]
    pub divisions: Vec<String>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default = "default_max_previous_trainings")]
    pub max_previous_trainings: u32,
    #[serde(default = "default_max_years_service_left")]
    pub max_years_service_left: u32,
}

impl Default for CriteriaDraft {
    fn default() -> Self {
        Self {
            grade_level_from: None,
            grade_level_to: None,
            locations: vec![Location::All],
            directorates: Vec::new(),
            divisions: Vec::new(),
            departments: Vec::new(),
            max_previous_trainings: default_max_previous_trainings(),
            max_years_service_left: default_max_years_service_left(),
        }
    }
}

/// Status tracked throughout the nomination lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NominationStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl NominationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            NominationStatus::Draft => "draft",
            NominationStatus::Submitted => "submitted",
            NominationStatus::Approved => "approved",
            NominationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, NominationStatus::Approved | NominationStatus::Rejected)
    }
}

/// Join entry linking a nomination to one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominationMembership {
    pub staff_id: StaffId,
    pub selected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nomination {
    pub id: NominationId,
    pub program_id: ProgramId,
    pub criteria_id: CriteriaId,
    pub status: NominationStatus,
    pub members: Vec<NominationMembership>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub printed_at: Option<DateTime<Utc>>,
    pub printed_by: Option<String>,
    pub seal: Option<SealDigest>,
}

impl Nomination {
    pub fn contains(&self, staff_id: &StaffId) -> bool {
        self.members.iter().any(|member| &member.staff_id == staff_id)
    }

    /// Member identifiers in ascending order, independent of insertion order.
    pub fn sorted_member_ids(&self) -> Vec<StaffId> {
        let mut ids: Vec<StaffId> = self
            .members
            .iter()
            .map(|member| member.staff_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Role granted by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    TrainingStaff,
    AdminOfficer,
    Admin,
}

impl ActorRole {
    pub const fn is_elevated(self) -> bool {
        matches!(self, ActorRole::AdminOfficer | ActorRole::Admin)
    }
}

impl FromStr for ActorRole {
    type Err = CodeParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "training_staff" => Ok(ActorRole::TrainingStaff),
            "admin_officer" => Ok(ActorRole::AdminOfficer),
            "admin" => Ok(ActorRole::Admin),
            _ => Err(CodeParseError::Role(raw.trim().to_string())),
        }
    }
}

/// Authenticated caller plus the network address the request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub role: ActorRole,
    pub origin: Option<IpAddr>,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: ActorRole) -> Self {
        Self {
            username: username.into(),
            role,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: Option<IpAddr>) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    StaffAdded,
    StaffRemoved,
    Approved,
    Rejected,
    Printed,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::StaffAdded => "staff_added",
            AuditAction::StaffRemoved => "staff_removed",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
            AuditAction::Printed => "printed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub nomination_id: NominationId,
    pub action: AuditAction,
    pub actor: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub origin: Option<IpAddr>,
}

impl AuditLogEntry {
    pub fn record(
        nomination_id: &NominationId,
        action: AuditAction,
        actor: &Actor,
        description: impl Into<String>,
    ) -> Self {
        Self {
            nomination_id: nomination_id.clone(),
            action,
            actor: actor.username.clone(),
            description: description.into(),
            timestamp: Utc::now(),
            origin: actor.origin,
        }
    }
}

/// Record of one nominal-roll upload. Kept until the roster is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUpload {
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_name: String,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}
