//! Field-level input checks applied before any record is created.
//!
//! Every check runs, so a single response can list every bad field.

use serde::{Deserialize, Serialize};

use crate::types::{Coordinates, NewMrvData, NewProject, NewStakeholder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn require(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
    }

    fn non_empty(&mut self, value: &str, field: &str) {
        self.require(!value.trim().is_empty(), field, "must not be empty");
    }

    fn finite_non_negative(&mut self, value: f64, field: &str) {
        self.require(
            value.is_finite() && value >= 0.0,
            field,
            "must be a non-negative number",
        );
    }

    fn coordinates(&mut self, c: &Coordinates, field: &str) {
        self.require(
            c.latitude.is_finite() && (-90.0..=90.0).contains(&c.latitude),
            &format!("{field}.latitude"),
            "must be between -90 and 90",
        );
        self.require(
            c.longitude.is_finite() && (-180.0..=180.0).contains(&c.longitude),
            &format!("{field}.longitude"),
            "must be between -180 and 180",
        );
    }

    fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

pub fn validate_project(input: &NewProject) -> Result<(), Vec<FieldError>> {
    let mut c = Checker::default();
    c.non_empty(&input.name, "name");
    c.non_empty(&input.location, "location");
    c.non_empty(&input.owner, "owner");
    c.require(
        input.area.is_finite() && input.area > 0.0,
        "area",
        "must be greater than zero",
    );
    c.finite_non_negative(input.estimated_credits, "estimatedCredits");
    if let Some(coords) = &input.coordinates {
        c.coordinates(coords, "coordinates");
    }
    c.finish()
}

pub fn validate_stakeholder(input: &NewStakeholder) -> Result<(), Vec<FieldError>> {
    let mut c = Checker::default();
    c.non_empty(&input.name, "name");
    c.non_empty(&input.organization, "organization");
    if let Some(address) = &input.address {
        c.non_empty(address, "address");
    }
    c.finish()
}

pub fn validate_mrv(input: &NewMrvData) -> Result<(), Vec<FieldError>> {
    let mut c = Checker::default();
    c.non_empty(&input.project_id, "projectId");
    c.non_empty(&input.collector, "collector");
    c.finite_non_negative(input.carbon_sequestration, "carbonSequestration");
    c.coordinates(&input.coordinates, "coordinates");
    c.finish()
}
