use std::collections::BTreeMap;

use of_core::{
    CsvId, Flow, FlowDataset, FlowId, Goal, OptimizationGoal, ProjectId, PropertyType, Role,
    TrainingStage,
};
use of_store::{FlowAction, FlowState, Reducer, Store, selectors};

const FLOW: FlowId = FlowId::new(5);
const PROJECT: ProjectId = ProjectId::new(1);

fn store() -> Store<FlowState> {
    let store = Store::new("flows", FlowState::default());
    store.dispatch(FlowAction::Initialize {
        flow_id: FLOW,
        project_id: PROJECT,
    });
    store
}

fn ids(raw: &[u64]) -> Vec<CsvId> {
    raw.iter().copied().map(CsvId::new).collect()
}

#[test]
fn attaching_datasets_merges_without_duplicates() {
    let store = store();
    store.dispatch(FlowAction::DatasetsAttached {
        flow_id: FLOW,
        csv_ids: ids(&[10, 11]),
    });
    store.dispatch(FlowAction::DatasetsAttached {
        flow_id: FLOW,
        csv_ids: ids(&[11, 12]),
    });
    store.dispatch(FlowAction::DatasetsAttached {
        flow_id: FLOW,
        csv_ids: ids(&[11, 12]),
    });

    let snapshot = store.snapshot();
    assert_eq!(snapshot.flows[&FLOW].flow.datasets, ids(&[10, 11, 12]));
}

#[test]
fn progress_never_decreases_from_polling() {
    let store = store();
    let mut seen = Vec::new();
    for progress in [1, 2, 2, 3, 6] {
        store.dispatch(FlowAction::ProgressReported {
            flow_id: FLOW,
            stage: TrainingStage::from_progress(progress).unwrap(),
        });
        seen.push(store.snapshot().flows[&FLOW].flow.progress);
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&TrainingStage::OptimizationDone));

    store.dispatch(FlowAction::ProgressReported {
        flow_id: FLOW,
        stage: TrainingStage::PreprocessingStart,
    });
    assert_eq!(
        store.snapshot().flows[&FLOW].flow.progress,
        TrainingStage::OptimizationDone
    );
}

#[test]
fn flow_listing_may_lower_progress() {
    let store = store();
    store.dispatch(FlowAction::ProgressReported {
        flow_id: FLOW,
        stage: TrainingStage::OptimizationDone,
    });
    let mut listed = Flow::new(FLOW, PROJECT, "retrained");
    listed.progress = TrainingStage::NotStarted;
    store.dispatch(FlowAction::FlowsLoaded(vec![listed]));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.flows[&FLOW].flow.progress, TrainingStage::NotStarted);
    assert_eq!(snapshot.flows[&FLOW].flow.name, "retrained");
}

#[test]
fn dataset_listing_replaces_ids_and_keeps_names() {
    let store = store();
    store.dispatch(FlowAction::DatasetsAttached {
        flow_id: FLOW,
        csv_ids: ids(&[1, 2]),
    });
    store.dispatch(FlowAction::DatasetsLoaded {
        flow_id: FLOW,
        datasets: vec![FlowDataset {
            csv_id: CsvId::new(3),
            file_name: "batch.csv".to_string(),
        }],
    });

    let snapshot = store.snapshot();
    let flow = &snapshot.flows[&FLOW].flow;
    assert_eq!(flow.datasets, ids(&[3]));
    assert_eq!(flow.dataset_names[&CsvId::new(3)], "batch.csv");
}

#[test]
fn server_roles_overwrite_local_moves() {
    let store = store();
    store.dispatch(FlowAction::RoleAssigned {
        flow_id: FLOW,
        property: "temp".to_string(),
        role: Role::Output,
    });
    store.dispatch(FlowAction::PropertiesLoaded {
        flow_id: FLOW,
        roles: BTreeMap::from([(Role::Controllable, vec!["temp".to_string()])]),
        types: None,
    });

    let snapshot = store.snapshot();
    let entry = &snapshot.flows[&FLOW];
    assert_eq!(entry.role_of("temp"), Some(Role::Controllable));
    assert!(entry.types.is_none());
}

#[test]
fn type_moves_keep_one_bucket() {
    let store = store();
    store.dispatch(FlowAction::TypesLoaded {
        flow_id: FLOW,
        types: BTreeMap::from([
            (PropertyType::Numerical, vec!["grade".to_string()]),
            (PropertyType::Categorical, vec![]),
        ]),
    });
    store.dispatch(FlowAction::TypeMoved {
        flow_id: FLOW,
        property: "grade".to_string(),
        to: PropertyType::Categorical,
    });

    let snapshot = store.snapshot();
    let types = snapshot.flows[&FLOW].types.as_ref().unwrap();
    assert!(types.names(PropertyType::Numerical).is_empty());
    assert_eq!(types.bucket_of("grade"), Some(PropertyType::Categorical));
}

#[test]
fn cleared_role_returns_to_pool() {
    let store = store();
    store.dispatch(FlowAction::TypesLoaded {
        flow_id: FLOW,
        types: BTreeMap::from([(PropertyType::Numerical, vec!["temp".to_string()])]),
    });
    store.dispatch(FlowAction::RoleAssigned {
        flow_id: FLOW,
        property: "temp".to_string(),
        role: Role::Controllable,
    });
    assert!(selectors::unassigned_properties(&store.snapshot().flows[&FLOW]).is_empty());

    store.dispatch(FlowAction::RoleCleared {
        flow_id: FLOW,
        property: "temp".to_string(),
    });
    assert_eq!(
        selectors::unassigned_properties(&store.snapshot().flows[&FLOW]),
        vec!["temp"]
    );
}

#[test]
fn priorities_seed_once() {
    let store = store();
    store.dispatch(FlowAction::PropertiesLoaded {
        flow_id: FLOW,
        roles: BTreeMap::from([
            (Role::Controllable, vec!["temp".to_string()]),
            (Role::Output, vec!["yield".to_string()]),
        ]),
        types: None,
    });
    for name in ["yield", "temp"] {
        store.dispatch(FlowAction::OptimizationLoaded {
            flow_id: FLOW,
            property: name.to_string(),
            goal: OptimizationGoal::with_goal(Goal::FitToProperty),
        });
    }
    store.dispatch(FlowAction::PrioritiesInitialized { flow_id: FLOW });
    assert_eq!(
        store.snapshot().flows[&FLOW].priorities,
        Some(vec!["temp".to_string(), "yield".to_string()])
    );

    store.dispatch(FlowAction::PrioritiesUpdated {
        flow_id: FLOW,
        order: vec!["yield".to_string(), "temp".to_string()],
    });
    store.dispatch(FlowAction::PrioritiesInitialized { flow_id: FLOW });
    assert_eq!(
        store.snapshot().flows[&FLOW].priorities,
        Some(vec!["yield".to_string(), "temp".to_string()])
    );
}

#[test]
fn persisted_order_is_one_based() {
    let store = store();
    for name in ["a", "b"] {
        store.dispatch(FlowAction::OptimizationLoaded {
            flow_id: FLOW,
            property: name.to_string(),
            goal: OptimizationGoal::with_goal(Goal::Maximize),
        });
    }
    store.dispatch(FlowAction::OrderPersisted {
        flow_id: FLOW,
        order: vec!["b".to_string(), "a".to_string()],
    });

    let snapshot = store.snapshot();
    let entry = &snapshot.flows[&FLOW];
    assert_eq!(entry.optimization["b"].order, Some(1));
    assert_eq!(entry.optimization["a"].order, Some(2));
}

#[test]
fn deleting_a_flow_drops_its_caches() {
    let state = FlowState::default()
        .reduce(FlowAction::FlowAdded(Flow::new(FLOW, PROJECT, "f")))
        .reduce(FlowAction::HistogramsLoaded {
            flow_id: FLOW,
            histograms: BTreeMap::new(),
        })
        .reduce(FlowAction::FlowDeleted(FLOW));
    assert!(state.entry(FLOW).is_none());
    assert!(selectors::flows_of(&state, PROJECT).is_empty());
}
