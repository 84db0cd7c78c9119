//! # Blue-Carbon Registry Protocol
//!
//! Record-keeping rules for the coastal restoration registry. The crate
//! owns the full project lifecycle:
//!
//! | Phase        | Operation(s)                                        |
//! |--------------|-----------------------------------------------------|
//! | Registration | [`Registry::register_project`], [`Registry::register_stakeholder`] |
//! | Approval     | [`Registry::transition_project`], [`Registry::approve_stakeholder`] |
//! | MRV          | [`Registry::submit_mrv`], [`Registry::review_mrv`]  |
//! | Queries      | [`Registry::statistics`], [`Registry::overview`]    |
//!
//! ## Architecture
//!
//! Legality of every status change is delegated to [`transitions`]. Input
//! checks are delegated to [`validation`]. Aggregates are delegated to
//! [`stats`]. This file holds the [`Registry`] itself, which applies a
//! transition and all of its side effects to in-memory collections and
//! records which collections changed. Nothing here performs I/O: a caller
//! loads the collections, runs one operation and persists
//! [`Registry::take_dirty`] only when the operation succeeded.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

pub mod stats;
pub mod storage;
pub mod transitions;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_lifecycle;
#[cfg(test)]
mod test_statistics;

pub use stats::{Overview, RegistryStatistics};
pub use storage::{Collection, DirtySet};
pub use transitions::{MrvAction, ProjectAction, StakeholderAction, TransitionError};
pub use types::*;
pub use validation::FieldError;

use transitions::{next_approval_state, next_mrv_status, next_project_status, MRV_REVIEWER};

/// Reputation every stakeholder starts with.
pub const INITIAL_REPUTATION: u32 = 100;
/// Upper bound of the reputation score.
pub const MAX_REPUTATION: u32 = 1_000;
/// Added to a collector's reputation when their MRV data is verified.
pub const REPUTATION_REWARD: u32 = 10;
/// Subtracted from a collector's reputation when their MRV data is rejected.
pub const REPUTATION_PENALTY: u32 = 20;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("cannot {attempted} {entity} '{id}' in state '{from}'")]
    InvalidTransition {
        entity: EntityKind,
        id: String,
        from: String,
        attempted: String,
    },
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl RegistryError {
    fn not_found(entity: EntityKind, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    fn from_transition(entity: EntityKind, id: &str, err: TransitionError) -> Self {
        match err {
            TransitionError::Forbidden { required, actual } => {
                Self::Forbidden(format!("{required} role required, caller is {actual}"))
            }
            TransitionError::Invalid { from, attempted } => Self::InvalidTransition {
                entity,
                id: id.to_string(),
                from: from.to_string(),
                attempted: attempted.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Clamp-adjust a reputation score.
pub fn adjust_reputation(score: u32, verified: bool) -> u32 {
    if verified {
        score.saturating_add(REPUTATION_REWARD).min(MAX_REPUTATION)
    } else {
        score.saturating_sub(REPUTATION_PENALTY).min(MAX_REPUTATION)
    }
}

/// All registry collections, held in memory for the duration of one operation.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub projects: Vec<Project>,
    pub stakeholders: Vec<Stakeholder>,
    pub mrv_data: Vec<MrvData>,
    pub credits: Vec<CreditBatch>,
    pub transactions: Vec<TransitionRecord>,
    pub notifications: Vec<Notification>,
    dirty: DirtySet,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collections modified since the last call, in a stable order.
    pub fn take_dirty(&mut self) -> Vec<Collection> {
        self.dirty.take()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    // ─────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────

    pub fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Project, id))
    }

    pub fn mrv(&self, id: &str) -> Result<&MrvData> {
        self.mrv_data
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::MrvData, id))
    }

    /// Find a stakeholder by id or wallet address.
    pub fn stakeholder(&self, key: &str) -> Result<&Stakeholder> {
        self.stakeholder_index(key)
            .map(|i| &self.stakeholders[i])
            .ok_or_else(|| RegistryError::not_found(EntityKind::Stakeholder, key))
    }

    fn project_index(&self, id: &str) -> Result<usize> {
        self.projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Project, id))
    }

    fn mrv_index(&self, id: &str) -> Result<usize> {
        self.mrv_data
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| RegistryError::not_found(EntityKind::MrvData, id))
    }

    /// Wallet addresses (and the ids derived from them) match case-insensitively.
    fn stakeholder_index(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        self.stakeholders.iter().position(|s| {
            s.id.eq_ignore_ascii_case(key)
                || (!s.address.is_empty() && s.address.eq_ignore_ascii_case(key))
        })
    }

    // ─────────────────────────────────────────────────────────
    // Projects
    // ─────────────────────────────────────────────────────────

    /// Register a new project in `pending` status.
    pub fn register_project(&mut self, input: NewProject) -> Result<Project> {
        validation::validate_project(&input).map_err(RegistryError::Validation)?;

        let now = Utc::now();
        let project = Project {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description,
            location: input.location.trim().to_string(),
            coordinates: input.coordinates,
            area: input.area,
            ecosystem_type: input.ecosystem_type,
            status: ProjectStatus::Pending,
            owner: input.owner,
            estimated_credits: input.estimated_credits,
            actual_credits: 0.0,
            documents: input.documents,
            status_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.projects.push(project.clone());
        self.dirty.mark(Collection::Projects);
        Ok(project)
    }

    /// Apply `action` to a project on behalf of `actor`.
    pub fn transition_project(
        &mut self,
        id: &str,
        action: ProjectAction,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Project> {
        let idx = self.project_index(id)?;
        let current = self.projects[idx].status;
        let next = next_project_status(current, action, actor.role)
            .map_err(|e| RegistryError::from_transition(EntityKind::Project, id, e))?;

        let now = Utc::now();
        let project = &mut self.projects[idx];
        project.status = next;
        project.status_reason = reason.clone();
        project.updated_at = now;
        let project = project.clone();
        self.dirty.mark(Collection::Projects);

        self.record_transition(
            EntityKind::Project,
            id,
            current.as_str(),
            next.as_str(),
            actor,
            reason.clone(),
        );
        let mut message = format!("Project '{}' is now {}", project.name, next);
        if let Some(reason) = &reason {
            message.push_str(&format!(": {reason}"));
        }
        self.notify(&project.owner, message, id);

        Ok(project)
    }

    // ─────────────────────────────────────────────────────────
    // Stakeholders
    // ─────────────────────────────────────────────────────────

    /// Register a stakeholder awaiting approval.
    pub fn register_stakeholder(&mut self, input: NewStakeholder) -> Result<Stakeholder> {
        validation::validate_stakeholder(&input).map_err(RegistryError::Validation)?;

        let address = input
            .address
            .map(|a| a.trim().to_string())
            .unwrap_or_default();
        if !address.is_empty() && self.stakeholder_index(&address).is_some() {
            return Err(RegistryError::Validation(vec![FieldError::new(
                "address",
                "is already registered",
            )]));
        }

        let now = Utc::now();
        let id = if address.is_empty() {
            new_id()
        } else {
            address.clone()
        };
        let stakeholder = Stakeholder {
            id,
            address,
            name: input.name.trim().to_string(),
            organization: input.organization.trim().to_string(),
            stakeholder_type: input.stakeholder_type,
            approved: false,
            reputation_score: INITIAL_REPUTATION,
            approved_by: None,
            created_at: now,
            updated_at: now,
        };

        self.stakeholders.push(stakeholder.clone());
        self.dirty.mark(Collection::Stakeholders);
        Ok(stakeholder)
    }

    /// One-way approval by an admin.
    pub fn approve_stakeholder(&mut self, key: &str, actor: &Actor) -> Result<Stakeholder> {
        let idx = self
            .stakeholder_index(key)
            .ok_or_else(|| RegistryError::not_found(EntityKind::Stakeholder, key))?;
        let current = ApprovalState::of(self.stakeholders[idx].approved);
        let next = next_approval_state(current, StakeholderAction::Approve, actor.role)
            .map_err(|e| RegistryError::from_transition(EntityKind::Stakeholder, key, e))?;

        let stakeholder = &mut self.stakeholders[idx];
        stakeholder.approved = next == ApprovalState::Approved;
        stakeholder.approved_by = Some(actor.address.clone());
        stakeholder.updated_at = Utc::now();
        let stakeholder = stakeholder.clone();
        self.dirty.mark(Collection::Stakeholders);

        self.record_transition(
            EntityKind::Stakeholder,
            &stakeholder.id,
            current.as_str(),
            next.as_str(),
            actor,
            None,
        );
        if !stakeholder.address.is_empty() {
            self.notify(
                &stakeholder.address,
                "Your stakeholder registration was approved".to_string(),
                &stakeholder.id,
            );
        }

        Ok(stakeholder)
    }

    // ─────────────────────────────────────────────────────────
    // MRV data
    // ─────────────────────────────────────────────────────────

    /// Submit field data for an active or verified project.
    ///
    /// When `supersedes` is set, the named record must be a `requiresUpdate`
    /// record of the same project that no other submission has replaced yet.
    pub fn submit_mrv(&mut self, input: NewMrvData) -> Result<MrvData> {
        validation::validate_mrv(&input).map_err(RegistryError::Validation)?;

        let project_idx = self.project_index(&input.project_id)?;

        match self.stakeholder_index(&input.collector) {
            Some(i) if self.stakeholders[i].approved => {}
            Some(_) => {
                return Err(RegistryError::Forbidden(format!(
                    "collector '{}' is not approved",
                    input.collector
                )))
            }
            None => {
                return Err(RegistryError::Forbidden(format!(
                    "collector '{}' is not a registered stakeholder",
                    input.collector
                )))
            }
        }

        let project = &self.projects[project_idx];
        if !project.status.accepts_mrv() {
            return Err(RegistryError::InvalidTransition {
                entity: EntityKind::Project,
                id: project.id.clone(),
                from: project.status.as_str().to_string(),
                attempted: "submit MRV data for".to_string(),
            });
        }
        let owner = project.owner.clone();

        let superseded_idx = match &input.supersedes {
            Some(old_id) => {
                let idx = self.mrv_index(old_id)?;
                let old = &self.mrv_data[idx];
                if old.project_id != input.project_id {
                    return Err(RegistryError::Validation(vec![FieldError::new(
                        "supersedes",
                        "belongs to a different project",
                    )]));
                }
                if old.status != MrvStatus::RequiresUpdate || old.superseded_by.is_some() {
                    let from = if old.superseded_by.is_some() {
                        "superseded"
                    } else {
                        old.status.as_str()
                    };
                    return Err(RegistryError::InvalidTransition {
                        entity: EntityKind::MrvData,
                        id: old.id.clone(),
                        from: from.to_string(),
                        attempted: "resubmit".to_string(),
                    });
                }
                Some(idx)
            }
            None => None,
        };

        let now = Utc::now();
        let record = MrvData {
            id: new_id(),
            project_id: input.project_id,
            collector: input.collector,
            carbon_sequestration: input.carbon_sequestration,
            coordinates: input.coordinates,
            measurement_date: input.measurement_date,
            evidence: input.evidence,
            notes: input.notes,
            status: MrvStatus::Submitted,
            verifier: None,
            comments: None,
            supersedes: input.supersedes,
            superseded_by: None,
            submitted_at: now,
            updated_at: now,
        };

        if let Some(idx) = superseded_idx {
            let old = &mut self.mrv_data[idx];
            old.superseded_by = Some(record.id.clone());
            old.updated_at = now;
        }
        self.mrv_data.push(record.clone());
        self.dirty.mark(Collection::MrvData);

        self.notify(
            &owner,
            format!(
                "New MRV data submitted: {} tCO2e",
                record.carbon_sequestration
            ),
            &record.project_id,
        );

        Ok(record)
    }

    /// Move an MRV record to `target` on behalf of a verifier.
    ///
    /// Entering `verified` credits the project with the record's
    /// sequestration, issues a credit batch and rewards the collector;
    /// entering `rejected` penalises the collector. All effects land in the
    /// same in-memory state as the status change.
    pub fn review_mrv(
        &mut self,
        id: &str,
        target: MrvStatus,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<MrvData> {
        let idx = self.mrv_index(id)?;
        let current = self.mrv_data[idx].status;
        let action = match MrvAction::for_target(target) {
            Some(action) => action,
            None if !actor.role.satisfies(MRV_REVIEWER) => {
                let err = TransitionError::Forbidden {
                    required: MRV_REVIEWER,
                    actual: actor.role,
                };
                return Err(RegistryError::from_transition(EntityKind::MrvData, id, err));
            }
            None => {
                return Err(RegistryError::InvalidTransition {
                    entity: EntityKind::MrvData,
                    id: id.to_string(),
                    from: current.as_str().to_string(),
                    attempted: format!("move to {target}"),
                })
            }
        };
        let next = next_mrv_status(current, action, actor.role)
            .map_err(|e| RegistryError::from_transition(EntityKind::MrvData, id, e))?;

        let project_idx = if next == MrvStatus::Verified {
            Some(self.project_index(&self.mrv_data[idx].project_id)?)
        } else {
            None
        };

        let now = Utc::now();
        let record = &mut self.mrv_data[idx];
        record.status = next;
        record.verifier = Some(actor.address.clone());
        record.comments = comments.clone();
        record.updated_at = now;
        let record = record.clone();
        self.dirty.mark(Collection::MrvData);

        if let Some(pidx) = project_idx {
            let project = &mut self.projects[pidx];
            project.actual_credits += record.carbon_sequestration;
            project.updated_at = now;
            let batch = CreditBatch {
                id: new_id(),
                project_id: project.id.clone(),
                mrv_data_id: record.id.clone(),
                amount: record.carbon_sequestration,
                owner: project.owner.clone(),
                issued_at: now,
            };
            self.credits.push(batch);
            self.dirty.mark(Collection::Projects);
            self.dirty.mark(Collection::Credits);
        }

        if matches!(next, MrvStatus::Verified | MrvStatus::Rejected) {
            if let Some(sidx) = self.stakeholder_index(&record.collector) {
                let stakeholder = &mut self.stakeholders[sidx];
                stakeholder.reputation_score =
                    adjust_reputation(stakeholder.reputation_score, next == MrvStatus::Verified);
                stakeholder.updated_at = now;
                self.dirty.mark(Collection::Stakeholders);
            }
        }

        self.record_transition(
            EntityKind::MrvData,
            id,
            current.as_str(),
            next.as_str(),
            actor,
            comments,
        );
        self.notify(
            &record.collector,
            format!("Your MRV submission is now {next}"),
            id,
        );

        Ok(record)
    }

    // ─────────────────────────────────────────────────────────
    // Aggregates
    // ─────────────────────────────────────────────────────────

    pub fn statistics(&self) -> RegistryStatistics {
        RegistryStatistics::compute(&self.projects, &self.stakeholders, &self.mrv_data)
    }

    pub fn overview(&self) -> Overview {
        Overview::compute(
            &self.projects,
            &self.stakeholders,
            &self.mrv_data,
            &self.credits,
        )
    }

    // ─────────────────────────────────────────────────────────
    // Side-effect records
    // ─────────────────────────────────────────────────────────

    fn record_transition(
        &mut self,
        entity: EntityKind,
        entity_id: &str,
        from: &str,
        to: &str,
        actor: &Actor,
        reason: Option<String>,
    ) {
        self.transactions.push(TransitionRecord {
            id: new_id(),
            entity,
            entity_id: entity_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            actor: actor.address.clone(),
            reason,
            timestamp: Utc::now(),
        });
        self.dirty.mark(Collection::Transactions);
    }

    fn notify(&mut self, recipient: &str, message: String, entity_id: &str) {
        self.notifications.push(Notification {
            id: new_id(),
            recipient: recipient.to_string(),
            message,
            entity_id: entity_id.to_string(),
            read: false,
            created_at: Utc::now(),
        });
        self.dirty.mark(Collection::Notifications);
    }
}
