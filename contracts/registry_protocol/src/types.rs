//! # Types
//!
//! Shared data structures used across all modules of the registry protocol.
//!
//! ## Closed enums
//!
//! Every string-valued category (ecosystem, stakeholder type, statuses) is a
//! closed enum implementing [`ClosedEnum`]. The `ALL` table is the single
//! source of truth for both directions of the mapping:
//!
//! ```text
//! index ◄──► variant ◄──► wire name
//! ```
//!
//! The serde names are identical to [`ClosedEnum::as_str`], so JSON files,
//! request bodies and query strings all speak the same vocabulary.
//!
//! ## Status as a Finite-State Machine
//!
//! ```text
//! Project:      Pending ──► Active ──► Verified
//!                  └─────────────────►┘
//!               {Pending, Active, Verified} ──► Suspended ──► Active
//!               any non-rejected ──► Rejected (terminal)
//!
//! MRV data:     Submitted ──► UnderReview ──► {Verified, Rejected, RequiresUpdate}
//!                   └──────────────────────►┘
//! ```
//!
//! The allowed edges live in [`crate::transitions`]; nothing else decides them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when a wire name or index does not belong to a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// A fixed set of named variants with a stable index.
pub trait ClosedEnum: Copy + PartialEq + 'static {
    /// Human-readable name of the category, used in error messages.
    const KIND: &'static str;
    /// Every variant, in index order.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn index(&self) -> u8 {
        Self::ALL
            .iter()
            .position(|v| v == self)
            .map(|i| i as u8)
            .unwrap_or(u8::MAX)
    }

    fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    fn parse_name(name: &str) -> Result<Self, ParseEnumError> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == name)
            .ok_or_else(|| ParseEnumError {
                kind: Self::KIND,
                value: name.to_string(),
            })
    }
}

macro_rules! impl_text {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as ClosedEnum>::parse_name(s)
            }
        }
    };
}

// ─────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────

/// Coastal ecosystem a restoration project targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcosystemType {
    #[serde(rename = "mangrove")]
    Mangrove,
    #[serde(rename = "seagrass")]
    Seagrass,
    #[serde(rename = "saltmarsh")]
    Saltmarsh,
    #[serde(rename = "tidalmarsh")]
    Tidalmarsh,
    #[serde(rename = "coastalWetland")]
    CoastalWetland,
}

impl ClosedEnum for EcosystemType {
    const KIND: &'static str = "ecosystem type";
    const ALL: &'static [Self] = &[
        Self::Mangrove,
        Self::Seagrass,
        Self::Saltmarsh,
        Self::Tidalmarsh,
        Self::CoastalWetland,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Mangrove => "mangrove",
            Self::Seagrass => "seagrass",
            Self::Saltmarsh => "saltmarsh",
            Self::Tidalmarsh => "tidalmarsh",
            Self::CoastalWetland => "coastalWetland",
        }
    }
}

impl_text!(EcosystemType);

/// Kind of organisation a stakeholder represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StakeholderType {
    #[serde(rename = "NGO")]
    Ngo,
    Community,
    Panchayat,
    Researcher,
    Government,
    Private,
}

impl ClosedEnum for StakeholderType {
    const KIND: &'static str = "stakeholder type";
    const ALL: &'static [Self] = &[
        Self::Ngo,
        Self::Community,
        Self::Panchayat,
        Self::Researcher,
        Self::Government,
        Self::Private,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Ngo => "NGO",
            Self::Community => "Community",
            Self::Panchayat => "Panchayat",
            Self::Researcher => "Researcher",
            Self::Government => "Government",
            Self::Private => "Private",
        }
    }
}

impl_text!(StakeholderType);

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    /// Registered, awaiting admin approval.
    Pending,
    /// Approved; accepts MRV submissions.
    Active,
    /// Verified by a verifier; still accepts MRV submissions.
    Verified,
    /// Deactivated by an admin; can be reinstated.
    Suspended,
    /// Rejected by an admin. Terminal.
    Rejected,
}

impl ClosedEnum for ProjectStatus {
    const KIND: &'static str = "project status";
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Active,
        Self::Verified,
        Self::Suspended,
        Self::Rejected,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Verified => "verified",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }
}

impl_text!(ProjectStatus);

impl ProjectStatus {
    /// Whether MRV data may be submitted against a project in this status.
    pub fn accepts_mrv(&self) -> bool {
        matches!(self, Self::Active | Self::Verified)
    }

    /// Whether the project's area counts as "under restoration".
    pub fn is_restoring(&self) -> bool {
        matches!(self, Self::Active | Self::Verified)
    }
}

/// Review status of an MRV submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MrvStatus {
    Submitted,
    UnderReview,
    Verified,
    Rejected,
    RequiresUpdate,
}

impl ClosedEnum for MrvStatus {
    const KIND: &'static str = "MRV status";
    const ALL: &'static [Self] = &[
        Self::Submitted,
        Self::UnderReview,
        Self::Verified,
        Self::Rejected,
        Self::RequiresUpdate,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "underReview",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::RequiresUpdate => "requiresUpdate",
        }
    }
}

impl_text!(MrvStatus);

/// Approval state of a stakeholder, derived from the `approved` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Unapproved,
    Approved,
}

impl ApprovalState {
    pub fn of(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Unapproved
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unapproved => "unapproved",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────
// Actors
// ─────────────────────────────────────────────────────────

/// Role an actor holds when requesting a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Verifier,
    Stakeholder,
}

impl Role {
    /// Admins satisfy every verifier requirement.
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::Admin => *self == Role::Admin,
            Role::Verifier => matches!(self, Role::Admin | Role::Verifier),
            Role::Stakeholder => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Verifier => "verifier",
            Self::Stakeholder => "stakeholder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of a transition: an opaque wallet address plus its resolved role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub address: String,
    pub role: Role,
}

impl Actor {
    pub fn new(address: impl Into<String>, role: Role) -> Self {
        Self {
            address: address.into(),
            role,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A registered restoration project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Hectares.
    pub area: f64,
    pub ecosystem_type: EcosystemType,
    pub status: ProjectStatus,
    /// Owner wallet address.
    pub owner: String,
    pub estimated_credits: f64,
    /// Sum of verified MRV sequestration. Never decreases.
    pub actual_credits: f64,
    /// Upload ids from the file-upload subsystem.
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An organisation or individual taking part in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    pub id: String,
    pub address: String,
    pub name: String,
    pub organization: String,
    #[serde(rename = "type")]
    pub stakeholder_type: StakeholderType,
    pub approved: bool,
    pub reputation_score: u32,
    #[serde(default)]
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A field-data submission for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrvData {
    pub id: String,
    pub project_id: String,
    /// Collector wallet address.
    pub collector: String,
    /// Tonnes of CO₂-equivalent.
    pub carbon_sequestration: f64,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub measurement_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub status: MrvStatus,
    #[serde(default)]
    pub verifier: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    /// Earlier `requiresUpdate` record this submission replaces.
    #[serde(default)]
    pub supersedes: Option<String>,
    #[serde(default)]
    pub superseded_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credits issued for one verified MRV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBatch {
    pub id: String,
    pub project_id: String,
    pub mrv_data_id: String,
    pub amount: f64,
    /// Project owner at issuance time.
    pub owner: String,
    pub issued_at: DateTime<Utc>,
}

/// Which kind of record a [`TransitionRecord`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Project,
    Stakeholder,
    MrvData,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Stakeholder => "stakeholder",
            Self::MrvData => "mrvData",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry appended for every applied transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub id: String,
    pub entity: EntityKind,
    pub entity_id: String,
    pub from: String,
    pub to: String,
    pub actor: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub message: String,
    pub entity_id: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────

/// Registration payload for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    pub area: f64,
    pub ecosystem_type: EcosystemType,
    pub owner: String,
    #[serde(default)]
    pub estimated_credits: f64,
    #[serde(default)]
    pub documents: Vec<String>,
}

/// Self-registration payload for a stakeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStakeholder {
    /// Wallet address; becomes the id when present.
    #[serde(default)]
    pub address: Option<String>,
    pub name: String,
    pub organization: String,
    #[serde(rename = "type")]
    pub stakeholder_type: StakeholderType,
}

/// Submission payload for MRV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMrvData {
    pub project_id: String,
    pub collector: String,
    pub carbon_sequestration: f64,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub measurement_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub supersedes: Option<String>,
}
