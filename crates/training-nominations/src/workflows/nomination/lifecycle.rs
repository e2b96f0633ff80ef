use chrono::Utc;

use super::domain::{
    Actor, ActorRole, Nomination, NominationMembership, NominationStatus, StaffId,
    TrainingProgram,
};

/// Errors raised by lifecycle transitions and membership edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("{actor} is not allowed to {action} this nomination")]
    Unauthorized { actor: String, action: &'static str },
    #[error("nomination is {} and can no longer be modified", .status.label())]
    NominationLocked { status: NominationStatus },
    #[error("Staff {0} is already nominated")]
    AlreadyNominated(StaffId),
    #[error("Training capacity ({capacity}) reached")]
    CapacityReached { capacity: u32 },
    #[error("Staff {0} is not part of this nomination")]
    NotNominated(StaffId),
    #[error("cannot {action} a {} nomination", .from.label())]
    InvalidTransition {
        from: NominationStatus,
        action: &'static str,
    },
    #[error("only approved nominations can be printed (status: {})", .status.label())]
    NotApproved { status: NominationStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    const fn action(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    const fn outcome(self) -> NominationStatus {
        match self {
            Decision::Approve => NominationStatus::Approved,
            Decision::Reject => NominationStatus::Rejected,
        }
    }
}

fn unauthorized(actor: &Actor, action: &'static str) -> LifecycleError {
    LifecycleError::Unauthorized {
        actor: actor.username.clone(),
        action,
    }
}

pub(crate) fn ensure_owner_or_elevated(
    nomination: &Nomination,
    actor: &Actor,
    action: &'static str,
) -> Result<(), LifecycleError> {
    if actor.is_elevated() || nomination.created_by == actor.username {
        Ok(())
    } else {
        Err(unauthorized(actor, action))
    }
}

fn ensure_editable(nomination: &Nomination) -> Result<(), LifecycleError> {
    if nomination.status.is_terminal() {
        return Err(LifecycleError::NominationLocked {
            status: nomination.status,
        });
    }
    Ok(())
}

/// `draft -> submitted`, creator only.
pub fn submit(nomination: &mut Nomination, actor: &Actor) -> Result<(), LifecycleError> {
    if nomination.created_by != actor.username {
        return Err(unauthorized(actor, "submit"));
    }
    if nomination.status != NominationStatus::Draft {
        return Err(LifecycleError::InvalidTransition {
            from: nomination.status,
            action: "submit",
        });
    }

    nomination.status = NominationStatus::Submitted;
    Ok(())
}

/// `submitted -> approved | rejected`, elevated actors only. Both outcomes record the decider.
pub fn decide(
    nomination: &mut Nomination,
    actor: &Actor,
    decision: Decision,
) -> Result<(), LifecycleError> {
    if !actor.is_elevated() {
        return Err(unauthorized(actor, decision.action()));
    }
    if nomination.status != NominationStatus::Submitted {
        return Err(LifecycleError::InvalidTransition {
            from: nomination.status,
            action: decision.action(),
        });
    }

    nomination.status = decision.outcome();
    nomination.approved_by = Some(actor.username.clone());
    nomination.approved_at = Some(Utc::now());
    Ok(())
}

/// Check-count-then-insert. Callers must hold the nomination for the whole call.
pub fn add_member(
    nomination: &mut Nomination,
    program: &TrainingProgram,
    staff_id: &StaffId,
    actor: &Actor,
) -> Result<(), LifecycleError> {
    ensure_owner_or_elevated(nomination, actor, "add staff to")?;
    ensure_editable(nomination)?;

    if nomination.contains(staff_id) {
        return Err(LifecycleError::AlreadyNominated(staff_id.clone()));
    }
    if nomination.members.len() >= program.capacity as usize {
        return Err(LifecycleError::CapacityReached {
            capacity: program.capacity,
        });
    }

    nomination.members.push(NominationMembership {
        staff_id: staff_id.clone(),
        selected_at: Utc::now(),
    });
    Ok(())
}

pub fn remove_member(
    nomination: &mut Nomination,
    staff_id: &StaffId,
    actor: &Actor,
) -> Result<(), LifecycleError> {
    ensure_owner_or_elevated(nomination, actor, "remove staff from")?;
    ensure_editable(nomination)?;

    let before = nomination.members.len();
    nomination
        .members
        .retain(|member| &member.staff_id != staff_id);
    if nomination.members.len() == before {
        return Err(LifecycleError::NotNominated(staff_id.clone()));
    }
    Ok(())
}

/// Approved nominations only; training staff may print just their own.
pub fn ensure_printable(nomination: &Nomination, actor: &Actor) -> Result<(), LifecycleError> {
    if actor.role == ActorRole::TrainingStaff && nomination.created_by != actor.username {
        return Err(unauthorized(actor, "print"));
    }
    if nomination.status != NominationStatus::Approved {
        return Err(LifecycleError::NotApproved {
            status: nomination.status,
        });
    }
    Ok(())
}
