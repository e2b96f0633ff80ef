use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{SealConfig, SealSecret};

use super::domain::{Nomination, TrainingProgram};

/// Lowercase hex SHA-256 digest stored on a nomination at first print.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealDigest(String);

impl fmt::Display for SealDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of recomputing a seal against current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SealStatus {
    Unsealed,
    Intact,
    Tampered,
}

impl SealStatus {
    pub fn verification(self) -> SealVerification {
        SealVerification {
            sealed: !matches!(self, SealStatus::Unsealed),
            valid: matches!(self, SealStatus::Intact),
        }
    }
}

/// Wire shape of a verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SealVerification {
    pub sealed: bool,
    pub valid: bool,
}

/// Computes and checks nomination seals with a server-side salt.
#[derive(Clone)]
pub struct IntegritySeal {
    secret: SealSecret,
}

impl fmt::Debug for IntegritySeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegritySeal").finish_non_exhaustive()
    }
}

impl IntegritySeal {
    pub fn new(secret: SealSecret) -> Self {
        Self { secret }
    }

    pub fn from_config(config: &SealConfig) -> Self {
        Self::new(config.secret.clone())
    }

    pub fn seal(&self, nomination: &Nomination, program: &TrainingProgram) -> SealDigest {
        let mut hasher = Sha256::new();
        hasher.update(canonical_payload(nomination, program).as_bytes());
        hasher.update(b"\n");
        hasher.update(self.secret.expose());
        SealDigest(hex::encode(hasher.finalize()))
    }

    /// Compare the stored digest with one recomputed from current state.
    pub fn verify(&self, nomination: &Nomination, program: &TrainingProgram) -> SealStatus {
        match &nomination.seal {
            None => SealStatus::Unsealed,
            Some(stored) if *stored == self.seal(nomination, program) => SealStatus::Intact,
            Some(_) => SealStatus::Tampered,
        }
    }
}

/// Fields covered by the seal, salt excluded. Each field is written as `<byte length>:<value>`
/// on its own line, members last after their count, so no value can spill into its neighbour.
pub(crate) fn canonical_payload(nomination: &Nomination, program: &TrainingProgram) -> String {
    let approved_at = nomination
        .approved_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "none".to_string());
    let members = nomination.sorted_member_ids();
    let start = program.start_date.to_string();
    let end = program.end_date.to_string();
    let member_count = members.len().to_string();

    [
        nomination.id.0.as_str(),
        program.title.as_str(),
        start.as_str(),
        end.as_str(),
        nomination.status.label(),
        approved_at.as_str(),
        member_count.as_str(),
    ]
    .into_iter()
    .chain(members.iter().map(|id| id.0.as_str()))
    .map(|field| format!("{}:{field}", field.len()))
    .collect::<Vec<_>>()
    .join("\n")
}
