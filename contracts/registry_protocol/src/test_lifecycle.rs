use crate::invariants::{assert_all_invariants, assert_credits_monotonic};
use crate::{
    Actor, Collection, Coordinates, EcosystemType, EntityKind, MrvStatus, NewMrvData, NewProject,
    NewStakeholder, ProjectAction, ProjectStatus, Registry, RegistryError, Role, StakeholderType,
    INITIAL_REPUTATION, REPUTATION_PENALTY, REPUTATION_REWARD,
};

const COLLECTOR: &str = "0xcollector";

fn admin() -> Actor {
    Actor::new("0xadmin", Role::Admin)
}

fn verifier() -> Actor {
    Actor::new("0xverifier", Role::Verifier)
}

fn new_project(name: &str, area: f64) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: "Replanting degraded mudflats".to_string(),
        location: "Pichavaram".to_string(),
        coordinates: Some(Coordinates {
            latitude: 11.43,
            longitude: 79.78,
        }),
        area,
        ecosystem_type: EcosystemType::Mangrove,
        owner: "0xowner".to_string(),
        estimated_credits: 250.0,
        documents: vec!["upload-1".to_string()],
    }
}

fn new_mrv(project_id: &str, tonnes: f64) -> NewMrvData {
    NewMrvData {
        project_id: project_id.to_string(),
        collector: COLLECTOR.to_string(),
        carbon_sequestration: tonnes,
        coordinates: Coordinates {
            latitude: 11.43,
            longitude: 79.78,
        },
        measurement_date: None,
        evidence: vec![],
        notes: String::new(),
        supersedes: None,
    }
}

/// Registry with an approved collector and one active project.
fn setup_active() -> (Registry, String) {
    let mut registry = Registry::new();
    registry
        .register_stakeholder(NewStakeholder {
            address: Some(COLLECTOR.to_string()),
            name: "Coastal Watch".to_string(),
            organization: "Coastal Watch Trust".to_string(),
            stakeholder_type: StakeholderType::Ngo,
        })
        .unwrap();
    registry.approve_stakeholder(COLLECTOR, &admin()).unwrap();
    let project = registry
        .register_project(new_project("Pichavaram Restoration", 40.0))
        .unwrap();
    registry
        .transition_project(&project.id, ProjectAction::Approve, &admin(), None)
        .unwrap();
    registry.take_dirty();
    (registry, project.id)
}

#[test]
fn test_registered_project_starts_pending() {
    let mut registry = Registry::new();
    let project = registry
        .register_project(new_project("Gulf of Mannar Seagrass", 12.0))
        .unwrap();
    assert_eq!(project.status, ProjectStatus::Pending);
    assert_eq!(project.actual_credits, 0.0);
    assert_eq!(registry.take_dirty(), vec![Collection::Projects]);
}

#[test]
fn test_invalid_project_is_not_persisted() {
    let mut registry = Registry::new();
    let cases = [
        ("", "Goa", 1.0),
        ("A", "", 1.0),
        ("A", "Goa", 0.0),
        ("A", "Goa", -3.0),
    ];
    for (name, location, area) in cases {
        let mut input = new_project(name, area);
        input.location = location.to_string();
        let err = registry.register_project(input).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }
    assert!(registry.projects.is_empty());
    assert!(!registry.is_dirty());
}

#[test]
fn test_verifier_cannot_approve_project() {
    let mut registry = Registry::new();
    let project = registry
        .register_project(new_project("Chilika Saltmarsh", 8.0))
        .unwrap();
    registry.take_dirty();

    let err = registry
        .transition_project(&project.id, ProjectAction::Approve, &verifier(), None)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Forbidden(_)));
    assert_eq!(registry.project(&project.id).unwrap().status, ProjectStatus::Pending);
    assert!(!registry.is_dirty());
}

#[test]
fn test_unknown_project_is_not_found() {
    let mut registry = Registry::new();
    let err = registry
        .transition_project("missing", ProjectAction::Suspend, &admin(), None)
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::NotFound {
            entity: EntityKind::Project,
            id: "missing".to_string()
        }
    );
}

#[test]
fn test_verifying_verified_project_fails() {
    let (mut registry, project_id) = setup_active();
    registry
        .transition_project(&project_id, ProjectAction::Verify, &verifier(), None)
        .unwrap();
    let err = registry
        .transition_project(&project_id, ProjectAction::Verify, &verifier(), None)
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::InvalidTransition {
            entity: EntityKind::Project,
            id: project_id.clone(),
            from: "verified".to_string(),
            attempted: "verify".to_string(),
        }
    );
    assert_eq!(registry.statistics().total_verified_projects, 1);
}

#[test]
fn test_transition_records_audit_and_notification() {
    let (mut registry, project_id) = setup_active();
    registry
        .transition_project(
            &project_id,
            ProjectAction::Suspend,
            &admin(),
            Some("boundary dispute".to_string()),
        )
        .unwrap();

    let audit = registry.transactions.last().unwrap();
    assert_eq!(audit.entity_id, project_id);
    assert_eq!(audit.from, "active");
    assert_eq!(audit.to, "suspended");
    assert_eq!(audit.reason.as_deref(), Some("boundary dispute"));

    let note = registry.notifications.last().unwrap();
    assert_eq!(note.recipient, "0xowner");
    assert!(note.message.contains("boundary dispute"));

    assert_eq!(
        registry.take_dirty(),
        vec![
            Collection::Projects,
            Collection::Transactions,
            Collection::Notifications
        ]
    );
}

#[test]
fn test_mrv_requires_active_or_verified_project() {
    let mut registry = Registry::new();
    registry
        .register_stakeholder(NewStakeholder {
            address: Some(COLLECTOR.to_string()),
            name: "Coastal Watch".to_string(),
            organization: "Coastal Watch Trust".to_string(),
            stakeholder_type: StakeholderType::Community,
        })
        .unwrap();
    registry.approve_stakeholder(COLLECTOR, &admin()).unwrap();
    let project = registry
        .register_project(new_project("Pending Project", 5.0))
        .unwrap();

    let err = registry.submit_mrv(new_mrv(&project.id, 1.0)).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidTransition { ref from, .. } if from == "pending"
    ));
    assert!(registry.mrv_data.is_empty());
}

#[test]
fn test_unapproved_collector_is_forbidden() {
    let (mut registry, project_id) = setup_active();
    registry
        .register_stakeholder(NewStakeholder {
            address: Some("0xnewcomer".to_string()),
            name: "Newcomer".to_string(),
            organization: "Village Panchayat".to_string(),
            stakeholder_type: StakeholderType::Panchayat,
        })
        .unwrap();

    let mut input = new_mrv(&project_id, 2.0);
    input.collector = "0xnewcomer".to_string();
    assert!(matches!(
        registry.submit_mrv(input),
        Err(RegistryError::Forbidden(_))
    ));
}

#[test]
fn test_verified_mrv_credits_project_and_rewards_collector() {
    let (mut registry, project_id) = setup_active();
    let record = registry.submit_mrv(new_mrv(&project_id, 12.5)).unwrap();
    assert_eq!(record.status, MrvStatus::Submitted);

    let reviewed = registry
        .review_mrv(&record.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();
    assert_eq!(reviewed.status, MrvStatus::Verified);
    assert_eq!(reviewed.verifier.as_deref(), Some("0xverifier"));

    assert_eq!(registry.project(&project_id).unwrap().actual_credits, 12.5);
    assert_eq!(
        registry.stakeholder(COLLECTOR).unwrap().reputation_score,
        INITIAL_REPUTATION + REPUTATION_REWARD
    );
    assert_eq!(registry.credits.len(), 1);
    assert_eq!(registry.credits[0].amount, 12.5);
    assert_all_invariants(&registry);
}

#[test]
fn test_terminal_mrv_states_are_idempotent() {
    let (mut registry, project_id) = setup_active();
    let a = registry.submit_mrv(new_mrv(&project_id, 3.0)).unwrap();
    let b = registry.submit_mrv(new_mrv(&project_id, 4.0)).unwrap();
    registry
        .review_mrv(&a.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();
    registry
        .review_mrv(&b.id, MrvStatus::Rejected, &verifier(), None)
        .unwrap();
    registry.take_dirty();

    for id in [&a.id, &b.id] {
        let before = registry.mrv(id).unwrap().clone();
        let err = registry
            .review_mrv(id, MrvStatus::Verified, &verifier(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
        assert_eq!(registry.mrv(id).unwrap(), &before);
    }
    assert_eq!(registry.project(&project_id).unwrap().actual_credits, 3.0);
    assert!(!registry.is_dirty());
}

#[test]
fn test_rejection_penalty_exceeds_reward() {
    let (mut registry, project_id) = setup_active();
    let good = registry.submit_mrv(new_mrv(&project_id, 5.0)).unwrap();
    let bad = registry.submit_mrv(new_mrv(&project_id, 9.0)).unwrap();
    registry
        .review_mrv(&good.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();
    registry
        .review_mrv(&bad.id, MrvStatus::Rejected, &verifier(), Some("blurry photos".into()))
        .unwrap();

    assert_eq!(
        registry.stakeholder(COLLECTOR).unwrap().reputation_score,
        INITIAL_REPUTATION + REPUTATION_REWARD - REPUTATION_PENALTY
    );
    assert_eq!(registry.project(&project_id).unwrap().actual_credits, 5.0);
}

#[test]
fn test_actual_credits_never_decrease() {
    let (mut registry, project_id) = setup_active();
    let mut last = 0.0;
    for (i, tonnes) in [1.5, 0.0, 7.25, 2.0].into_iter().enumerate() {
        let record = registry.submit_mrv(new_mrv(&project_id, tonnes)).unwrap();
        let target = if i % 2 == 0 {
            MrvStatus::Verified
        } else {
            MrvStatus::Rejected
        };
        registry
            .review_mrv(&record.id, target, &verifier(), None)
            .unwrap();
        let now = registry.project(&project_id).unwrap().actual_credits;
        assert_credits_monotonic(last, now);
        last = now;
    }
    assert_eq!(last, 1.5 + 7.25);
    assert_all_invariants(&registry);
}

#[test]
fn test_requires_update_allows_one_resubmission() {
    let (mut registry, project_id) = setup_active();
    let first = registry.submit_mrv(new_mrv(&project_id, 6.0)).unwrap();
    registry
        .review_mrv(&first.id, MrvStatus::UnderReview, &verifier(), None)
        .unwrap();
    registry
        .review_mrv(
            &first.id,
            MrvStatus::RequiresUpdate,
            &verifier(),
            Some("missing soil cores".into()),
        )
        .unwrap();

    let mut resubmission = new_mrv(&project_id, 5.5);
    resubmission.supersedes = Some(first.id.clone());
    let second = registry.submit_mrv(resubmission.clone()).unwrap();
    assert_eq!(second.supersedes.as_deref(), Some(first.id.as_str()));
    assert_eq!(
        registry.mrv(&first.id).unwrap().superseded_by.as_deref(),
        Some(second.id.as_str())
    );
    assert_eq!(registry.mrv(&first.id).unwrap().status, MrvStatus::RequiresUpdate);

    let err = registry.submit_mrv(resubmission).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidTransition { ref from, .. } if from == "superseded"
    ));
}

#[test]
fn test_cannot_supersede_verified_record() {
    let (mut registry, project_id) = setup_active();
    let first = registry.submit_mrv(new_mrv(&project_id, 6.0)).unwrap();
    registry
        .review_mrv(&first.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();

    let mut resubmission = new_mrv(&project_id, 6.0);
    resubmission.supersedes = Some(first.id.clone());
    assert!(matches!(
        registry.submit_mrv(resubmission),
        Err(RegistryError::InvalidTransition { .. })
    ));
}

#[test]
fn test_reviewing_back_to_submitted_is_invalid() {
    let (mut registry, project_id) = setup_active();
    let record = registry.submit_mrv(new_mrv(&project_id, 1.0)).unwrap();
    assert!(matches!(
        registry.review_mrv(&record.id, MrvStatus::Submitted, &verifier(), None),
        Err(RegistryError::InvalidTransition { .. })
    ));
}

#[test]
fn test_stakeholder_approval_is_one_way() {
    let mut registry = Registry::new();
    let s = registry
        .register_stakeholder(NewStakeholder {
            address: Some("0xresearcher".to_string()),
            name: "Dr. Rao".to_string(),
            organization: "NIO".to_string(),
            stakeholder_type: StakeholderType::Researcher,
        })
        .unwrap();
    assert!(!s.approved);
    assert_eq!(s.id, "0xresearcher");

    let approved = registry.approve_stakeholder(&s.id, &admin()).unwrap();
    assert!(approved.approved);
    assert_eq!(approved.approved_by.as_deref(), Some("0xadmin"));
    assert!(matches!(
        registry.approve_stakeholder(&s.id, &admin()),
        Err(RegistryError::InvalidTransition { .. })
    ));
}

#[test]
fn test_duplicate_stakeholder_address_rejected() {
    let mut registry = Registry::new();
    let input = NewStakeholder {
        address: Some("0xdup".to_string()),
        name: "One".to_string(),
        organization: "Org".to_string(),
        stakeholder_type: StakeholderType::Private,
    };
    registry.register_stakeholder(input.clone()).unwrap();
    assert!(matches!(
        registry.register_stakeholder(input),
        Err(RegistryError::Validation(_))
    ));
    assert_eq!(registry.stakeholders.len(), 1);
}

#[test]
fn test_stakeholder_without_address_gets_generated_id() {
    let mut registry = Registry::new();
    let s = registry
        .register_stakeholder(NewStakeholder {
            address: None,
            name: "Fisherfolk Collective".to_string(),
            organization: "Collective".to_string(),
            stakeholder_type: StakeholderType::Community,
        })
        .unwrap();
    assert!(!s.id.is_empty());
    assert!(s.address.is_empty());
    assert_eq!(s.reputation_score, INITIAL_REPUTATION);
}

#[test]
fn test_stakeholder_reviewing_unreachable_target_is_forbidden() {
    let (mut registry, project_id) = setup_active();
    let record = registry.submit_mrv(new_mrv(&project_id, 1.0)).unwrap();
    let outsider = Actor::new("0xoutsider", Role::Stakeholder);
    assert!(matches!(
        registry.review_mrv(&record.id, MrvStatus::Submitted, &outsider, None),
        Err(RegistryError::Forbidden(_))
    ));
    assert!(matches!(
        registry.review_mrv("missing", MrvStatus::Submitted, &outsider, None),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn test_address_differing_only_in_case_is_a_duplicate() {
    let mut registry = Registry::new();
    let mut input = NewStakeholder {
        address: Some("0xABCdef".to_string()),
        name: "Mixed Case".to_string(),
        organization: "Org".to_string(),
        stakeholder_type: StakeholderType::Private,
    };
    registry.register_stakeholder(input.clone()).unwrap();
    input.address = Some("0xabcdef".to_string());
    assert!(matches!(
        registry.register_stakeholder(input),
        Err(RegistryError::Validation(_))
    ));
    assert_eq!(registry.stakeholders.len(), 1);
}

#[test]
fn test_collector_matches_regardless_of_case() {
    let (mut registry, project_id) = setup_active();
    registry
        .register_stakeholder(NewStakeholder {
            address: Some("0xABCdef".to_string()),
            name: "Tide Counters".to_string(),
            organization: "Tide Counters".to_string(),
            stakeholder_type: StakeholderType::Community,
        })
        .unwrap();
    registry.approve_stakeholder("0xabcdef", &admin()).unwrap();

    let mut input = new_mrv(&project_id, 2.0);
    input.collector = "0xabcDEF".to_string();
    let record = registry.submit_mrv(input).unwrap();
    registry
        .review_mrv(&record.id, MrvStatus::Verified, &verifier(), None)
        .unwrap();
    let collector = registry.stakeholder("0xABCDEF").unwrap();
    assert_eq!(collector.reputation_score, INITIAL_REPUTATION + REPUTATION_REWARD);
}
