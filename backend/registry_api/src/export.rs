//! CSV / JSON export of whole collections.

use std::str::FromStr;

use registry_protocol::{ClosedEnum, Project, Stakeholder};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ServiceError::BadRequest(format!(
                "unsupported export format '{other}' (expected csv or json)"
            ))),
        }
    }
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row(out: &mut String, fields: &[String]) {
    let row: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

pub fn projects_csv(projects: &[Project]) -> String {
    let mut out = String::new();
    write_row(
        &mut out,
        &[
            "id",
            "name",
            "location",
            "area",
            "ecosystemType",
            "status",
            "owner",
            "estimatedCredits",
            "actualCredits",
            "createdAt",
        ]
        .map(String::from),
    );
    for p in projects {
        write_row(
            &mut out,
            &[
                p.id.clone(),
                p.name.clone(),
                p.location.clone(),
                p.area.to_string(),
                p.ecosystem_type.as_str().to_string(),
                p.status.as_str().to_string(),
                p.owner.clone(),
                p.estimated_credits.to_string(),
                p.actual_credits.to_string(),
                p.created_at.to_rfc3339(),
            ],
        );
    }
    out
}

pub fn stakeholders_csv(stakeholders: &[Stakeholder]) -> String {
    let mut out = String::new();
    write_row(
        &mut out,
        &[
            "id",
            "address",
            "name",
            "organization",
            "type",
            "approved",
            "reputationScore",
            "createdAt",
        ]
        .map(String::from),
    );
    for s in stakeholders {
        write_row(
            &mut out,
            &[
                s.id.clone(),
                s.address.clone(),
                s.name.clone(),
                s.organization.clone(),
                s.stakeholder_type.as_str().to_string(),
                s.approved.to_string(),
                s.reputation_score.to_string(),
                s.created_at.to_rfc3339(),
            ],
        );
    }
    out
}
