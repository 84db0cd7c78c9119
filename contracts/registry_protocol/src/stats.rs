//! # Registry statistics
//!
//! Aggregates are recomputed from the collections on every call. There are
//! no stored counters, so a redundant transition can never make a total
//! drift from the records it summarises.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ClosedEnum, CreditBatch, EcosystemType, MrvData, MrvStatus, Project, ProjectStatus,
    Stakeholder,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatistics {
    pub total_projects: usize,
    pub total_verified_projects: usize,
    pub total_stakeholders: usize,
    /// Sum of sequestration over verified MRV records.
    pub total_carbon_sequestered: f64,
    /// Sum of area over active and verified projects.
    pub total_area_under_restoration: f64,
}

impl RegistryStatistics {
    pub fn compute(projects: &[Project], stakeholders: &[Stakeholder], mrv: &[MrvData]) -> Self {
        Self {
            total_projects: projects.len(),
            total_verified_projects: projects
                .iter()
                .filter(|p| p.status == ProjectStatus::Verified)
                .count(),
            total_stakeholders: stakeholders.len(),
            total_carbon_sequestered: mrv
                .iter()
                .filter(|m| m.status == MrvStatus::Verified)
                .map(|m| m.carbon_sequestration)
                .sum(),
            total_area_under_restoration: projects
                .iter()
                .filter(|p| p.status.is_restoring())
                .map(|p| p.area)
                .sum(),
        }
    }
}

/// Statistics plus per-category breakdowns for the analytics dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub statistics: RegistryStatistics,
    pub projects_by_status: BTreeMap<String, usize>,
    pub projects_by_ecosystem: BTreeMap<String, usize>,
    pub mrv_by_status: BTreeMap<String, usize>,
    pub pending_stakeholders: usize,
    pub credits_issued: f64,
}

impl Overview {
    pub fn compute(
        projects: &[Project],
        stakeholders: &[Stakeholder],
        mrv: &[MrvData],
        credits: &[CreditBatch],
    ) -> Self {
        Self {
            statistics: RegistryStatistics::compute(projects, stakeholders, mrv),
            projects_by_status: tally(ProjectStatus::ALL, projects.iter().map(|p| p.status)),
            projects_by_ecosystem: tally(
                EcosystemType::ALL,
                projects.iter().map(|p| p.ecosystem_type),
            ),
            mrv_by_status: tally(MrvStatus::ALL, mrv.iter().map(|m| m.status)),
            pending_stakeholders: stakeholders.iter().filter(|s| !s.approved).count(),
            credits_issued: credits.iter().map(|c| c.amount).sum(),
        }
    }
}

/// Count occurrences; every variant appears, zero or not.
fn tally<T: ClosedEnum>(all: &[T], values: impl Iterator<Item = T>) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> =
        all.iter().map(|v| (v.as_str().to_string(), 0)).collect();
    for v in values {
        *counts.entry(v.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}
