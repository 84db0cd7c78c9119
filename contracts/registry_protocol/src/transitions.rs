//! # Transition table
//!
//! The one place that decides which status changes are legal, and who may
//! request them. The REST layer, the in-memory [`crate::Registry`] and the
//! tests all consult these tables; nothing re-implements the rules.
//!
//! Each rule reads: *from any of `from`, action `action` by an actor holding
//! `role` (or a role that satisfies it) moves to `to`.*

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{ApprovalState, MrvStatus, ParseEnumError, ProjectStatus, Role};

/// Why the table refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The actor's role does not satisfy the rule's role.
    Forbidden { required: Role, actual: Role },
    /// No rule leaves `from` via the requested action.
    Invalid { from: &'static str, attempted: &'static str },
}

pub struct Rule<S: 'static, A> {
    pub action: A,
    pub from: &'static [S],
    pub to: S,
    pub role: Role,
}

/// Look up `action` from `current` for `role`.
///
/// The role check precedes the reachability check, so an unauthorised actor
/// learns nothing about the record's state.
fn apply<S, A>(
    rules: &'static [Rule<S, A>],
    current: S,
    action: A,
    role: Role,
    attempted: &'static str,
    current_name: &'static str,
) -> Result<S, TransitionError>
where
    S: Copy + PartialEq + 'static,
    A: Copy + PartialEq + 'static,
{
    let mut candidates = rules.iter().filter(|r| r.action == action).peekable();
    let Some(first) = candidates.peek() else {
        return Err(TransitionError::Invalid {
            from: current_name,
            attempted,
        });
    };
    if !role.satisfies(first.role) {
        return Err(TransitionError::Forbidden {
            required: first.role,
            actual: role,
        });
    }
    candidates
        .find(|r| r.from.contains(&current))
        .map(|r| r.to)
        .ok_or(TransitionError::Invalid {
            from: current_name,
            attempted,
        })
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectAction {
    Approve,
    Verify,
    Suspend,
    Reject,
}

impl ProjectAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Verify => "verify",
            Self::Suspend => "suspend",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "verify" => Ok(Self::Verify),
            "suspend" => Ok(Self::Suspend),
            "reject" => Ok(Self::Reject),
            other => Err(ParseEnumError {
                kind: "project action",
                value: other.to_string(),
            }),
        }
    }
}

use crate::types::ProjectStatus as P;

pub static PROJECT_RULES: &[Rule<ProjectStatus, ProjectAction>] = &[
    Rule {
        action: ProjectAction::Approve,
        from: &[P::Pending, P::Suspended],
        to: P::Active,
        role: Role::Admin,
    },
    Rule {
        action: ProjectAction::Verify,
        from: &[P::Pending, P::Active],
        to: P::Verified,
        role: Role::Verifier,
    },
    Rule {
        action: ProjectAction::Suspend,
        from: &[P::Pending, P::Active, P::Verified],
        to: P::Suspended,
        role: Role::Admin,
    },
    Rule {
        action: ProjectAction::Reject,
        from: &[P::Pending, P::Active, P::Verified, P::Suspended],
        to: P::Rejected,
        role: Role::Admin,
    },
];

pub fn next_project_status(
    current: ProjectStatus,
    action: ProjectAction,
    role: Role,
) -> Result<ProjectStatus, TransitionError> {
    use crate::types::ClosedEnum;
    apply(
        PROJECT_RULES,
        current,
        action,
        role,
        action.as_str(),
        current.as_str(),
    )
}

// ─────────────────────────────────────────────────────────
// MRV data
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MrvAction {
    Review,
    Verify,
    Reject,
    RequestUpdate,
}

impl MrvAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Verify => "verify",
            Self::Reject => "reject",
            Self::RequestUpdate => "requestUpdate",
        }
    }

    /// The action that leads to `target`, if any does.
    pub fn for_target(target: MrvStatus) -> Option<Self> {
        MRV_RULES.iter().find(|r| r.to == target).map(|r| r.action)
    }
}

impl fmt::Display for MrvAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use crate::types::MrvStatus as M;

/// Role every MRV review action requires.
pub const MRV_REVIEWER: Role = Role::Verifier;

pub static MRV_RULES: &[Rule<MrvStatus, MrvAction>] = &[
    Rule {
        action: MrvAction::Review,
        from: &[M::Submitted],
        to: M::UnderReview,
        role: MRV_REVIEWER,
    },
    Rule {
        action: MrvAction::Verify,
        from: &[M::Submitted, M::UnderReview],
        to: M::Verified,
        role: MRV_REVIEWER,
    },
    Rule {
        action: MrvAction::Reject,
        from: &[M::Submitted, M::UnderReview],
        to: M::Rejected,
        role: MRV_REVIEWER,
    },
    Rule {
        action: MrvAction::RequestUpdate,
        from: &[M::Submitted, M::UnderReview],
        to: M::RequiresUpdate,
        role: MRV_REVIEWER,
    },
];

pub fn next_mrv_status(
    current: MrvStatus,
    action: MrvAction,
    role: Role,
) -> Result<MrvStatus, TransitionError> {
    use crate::types::ClosedEnum;
    apply(
        MRV_RULES,
        current,
        action,
        role,
        action.as_str(),
        current.as_str(),
    )
}

// ─────────────────────────────────────────────────────────
// Stakeholders
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StakeholderAction {
    Approve,
}

impl StakeholderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
        }
    }
}

impl FromStr for StakeholderAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            other => Err(ParseEnumError {
                kind: "stakeholder action",
                value: other.to_string(),
            }),
        }
    }
}

pub static STAKEHOLDER_RULES: &[Rule<ApprovalState, StakeholderAction>] = &[Rule {
    action: StakeholderAction::Approve,
    from: &[ApprovalState::Unapproved],
    to: ApprovalState::Approved,
    role: Role::Admin,
}];

pub fn next_approval_state(
    current: ApprovalState,
    action: StakeholderAction,
    role: Role,
) -> Result<ApprovalState, TransitionError> {
    apply(
        STAKEHOLDER_RULES,
        current,
        action,
        role,
        action.as_str(),
        current.as_str(),
    )
}
