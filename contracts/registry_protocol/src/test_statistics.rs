use crate::invariants::assert_statistics_consistent;
use crate::{
    Actor, Coordinates, EcosystemType, MrvStatus, NewMrvData, NewProject, NewStakeholder,
    ProjectAction, ProjectStatus, Registry, RegistryError, RegistryStatistics, Role,
    StakeholderType,
};

fn admin() -> Actor {
    Actor::new("0xadmin", Role::Admin)
}

fn verifier() -> Actor {
    Actor::new("0xverifier", Role::Verifier)
}

fn register(registry: &mut Registry, name: &str, area: f64, ecosystem: EcosystemType) -> String {
    registry
        .register_project(NewProject {
            name: name.to_string(),
            description: String::new(),
            location: "Kerala".to_string(),
            coordinates: None,
            area,
            ecosystem_type: ecosystem,
            owner: "0xowner".to_string(),
            estimated_credits: 0.0,
            documents: vec![],
        })
        .unwrap()
        .id
}

fn mrv(project_id: &str, tonnes: f64) -> NewMrvData {
    NewMrvData {
        project_id: project_id.to_string(),
        collector: "0xcollector".to_string(),
        carbon_sequestration: tonnes,
        coordinates: Coordinates {
            latitude: 9.9,
            longitude: 76.2,
        },
        measurement_date: None,
        evidence: vec![],
        notes: String::new(),
        supersedes: None,
    }
}

fn with_collector() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_stakeholder(NewStakeholder {
            address: Some("0xcollector".to_string()),
            name: "Collector".to_string(),
            organization: "Kerala Forest Dept".to_string(),
            stakeholder_type: StakeholderType::Government,
        })
        .unwrap();
    registry.approve_stakeholder("0xcollector", &admin()).unwrap();
    registry
}

#[test]
fn test_empty_registry_statistics() {
    assert_eq!(Registry::new().statistics(), RegistryStatistics::default());
}

#[test]
fn test_verified_count_has_no_drift() {
    let mut registry = with_collector();
    let a = register(&mut registry, "A", 10.0, EcosystemType::Mangrove);
    let b = register(&mut registry, "B", 20.0, EcosystemType::Seagrass);

    // A redundant verify must not double count.
    registry
        .transition_project(&a, ProjectAction::Verify, &verifier(), None)
        .unwrap();
    assert!(matches!(
        registry.transition_project(&a, ProjectAction::Verify, &verifier(), None),
        Err(RegistryError::InvalidTransition { .. })
    ));
    assert_statistics_consistent(&registry);
    assert_eq!(registry.statistics().total_verified_projects, 1);

    registry
        .transition_project(&b, ProjectAction::Approve, &admin(), None)
        .unwrap();
    registry
        .transition_project(&b, ProjectAction::Verify, &admin(), None)
        .unwrap();
    assert_eq!(registry.statistics().total_verified_projects, 2);

    registry
        .transition_project(&a, ProjectAction::Suspend, &admin(), None)
        .unwrap();
    assert!(matches!(
        registry.transition_project(&a, ProjectAction::Suspend, &admin(), None),
        Err(RegistryError::InvalidTransition { .. })
    ));
    assert_statistics_consistent(&registry);
    assert_eq!(registry.statistics().total_verified_projects, 1);

    registry
        .transition_project(&a, ProjectAction::Reject, &admin(), None)
        .unwrap();
    assert_statistics_consistent(&registry);
}

#[test]
fn test_rejected_mrv_does_not_count_toward_sequestration() {
    let mut registry = with_collector();
    let p = register(&mut registry, "Vembanad", 15.0, EcosystemType::Tidalmarsh);
    registry
        .transition_project(&p, ProjectAction::Approve, &admin(), None)
        .unwrap();
    let before = registry.statistics().total_carbon_sequestered;

    let good = registry.submit_mrv(mrv(&p, 5.0)).unwrap();
    let bad = registry.submit_mrv(mrv(&p, 11.0)).unwrap();
    registry
        .review_mrv(&good.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();
    registry
        .review_mrv(&bad.id, MrvStatus::Rejected, &verifier(), None)
        .unwrap();

    assert_eq!(registry.project(&p).unwrap().actual_credits, 5.0);
    assert_eq!(registry.statistics().total_carbon_sequestered - before, 5.0);
}

#[test]
fn test_area_counts_only_restoring_projects() {
    let mut registry = with_collector();
    let pending = register(&mut registry, "Pending", 100.0, EcosystemType::Saltmarsh);
    let active = register(&mut registry, "Active", 30.0, EcosystemType::Saltmarsh);
    let verified = register(&mut registry, "Verified", 12.5, EcosystemType::CoastalWetland);
    let suspended = register(&mut registry, "Suspended", 7.0, EcosystemType::Mangrove);

    registry
        .transition_project(&active, ProjectAction::Approve, &admin(), None)
        .unwrap();
    registry
        .transition_project(&verified, ProjectAction::Verify, &verifier(), None)
        .unwrap();
    registry
        .transition_project(&suspended, ProjectAction::Suspend, &admin(), None)
        .unwrap();

    let stats = registry.statistics();
    assert_eq!(stats.total_projects, 4);
    assert_eq!(stats.total_area_under_restoration, 42.5);
    assert_eq!(stats.total_stakeholders, 1);
    assert_eq!(
        registry.project(&pending).unwrap().status,
        ProjectStatus::Pending
    );
}

#[test]
fn test_overview_breakdowns_list_every_category() {
    let mut registry = with_collector();
    let p = register(&mut registry, "Seagrass Bed", 3.0, EcosystemType::Seagrass);
    registry
        .transition_project(&p, ProjectAction::Approve, &admin(), None)
        .unwrap();
    let record = registry.submit_mrv(mrv(&p, 2.5)).unwrap();
    registry
        .review_mrv(&record.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();
    registry
        .register_stakeholder(NewStakeholder {
            address: None,
            name: "Pending org".to_string(),
            organization: "Org".to_string(),
            stakeholder_type: StakeholderType::Ngo,
        })
        .unwrap();

    let overview = registry.overview();
    assert_eq!(overview.projects_by_status.len(), 5);
    assert_eq!(overview.projects_by_status["active"], 1);
    assert_eq!(overview.projects_by_status["rejected"], 0);
    assert_eq!(overview.projects_by_ecosystem["seagrass"], 1);
    assert_eq!(overview.projects_by_ecosystem["coastalWetland"], 0);
    assert_eq!(overview.mrv_by_status["verified"], 1);
    assert_eq!(overview.pending_stakeholders, 1);
    assert_eq!(overview.credits_issued, 2.5);
    assert_eq!(overview.statistics.total_carbon_sequestered, 2.5);
}
