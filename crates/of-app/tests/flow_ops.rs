use std::collections::BTreeMap;

use of_api::{Method, ScriptedTransport};
use of_app::{AppConfig, AppError, Session, ValidationError, flow_service};
use of_core::{
    CsvId, FlowId, Goal, GoalPatch, OptimizationGoal, ProjectId, PropertyType, Role,
    TrainingStage,
};
use of_store::{FlowAction, LoadStatus};
use serde_json::json;

const FLOW: FlowId = FlowId::new(5);

fn session() -> Session<ScriptedTransport> {
    let session = Session::new(AppConfig::default(), ScriptedTransport::new());
    flow_service::initialize_flow(&session, FLOW, ProjectId::new(1));
    session
}

fn classify(session: &Session<ScriptedTransport>, name: &str, ty: PropertyType, role: Role) {
    flow_service::update_property_category(session, FLOW, name, ty);
    flow_service::update_category(session, FLOW, name, role);
}

#[test]
fn attaching_twice_keeps_ids_unique() {
    let session = session();
    session
        .api()
        .transport()
        .respond(Method::Post, "/flows/csv-add/", json!(null));

    flow_service::add_csv_to_flow(&session, FLOW, &[CsvId::new(10), CsvId::new(11)]).unwrap();
    flow_service::add_csv_to_flow(&session, FLOW, &[CsvId::new(11), CsvId::new(12)]).unwrap();

    let state = session.flows().snapshot();
    let ids: Vec<u64> = state.flows[&FLOW].flow.datasets.iter().map(|id| id.get()).collect();
    assert_eq!(ids, vec![10, 11, 12]);
}

#[test]
fn maximize_on_categorical_never_reaches_backend_or_store() {
    let session = session();
    classify(&session, "grade", PropertyType::Categorical, Role::Controllable);
    let before = session.flows().snapshot();

    let err = flow_service::post_optimization_data(
        &session,
        FLOW,
        "grade",
        &OptimizationGoal::with_goal(Goal::Maximize),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::GoalNotAllowed { .. })
    ));

    let edit = flow_service::update_optimization_data(&session, FLOW, "grade", GoalPatch::goal(Goal::Maximize));
    assert!(matches!(edit, Err(ValidationError::GoalNotAllowed { .. })));

    assert!(session.api().transport().requests().is_empty());
    assert_eq!(*session.flows().snapshot(), *before);
}

#[test]
fn partial_range_edits_are_accepted() {
    let session = session();
    classify(&session, "temp", PropertyType::Numerical, Role::Controllable);

    flow_service::update_optimization_data(&session, FLOW, "temp", GoalPatch::goal(Goal::FitToRange))
        .unwrap();
    let inverted = flow_service::update_optimization_data(&session, FLOW, "temp", GoalPatch::range(9.0, 1.0));
    assert!(matches!(inverted, Err(ValidationError::InvertedRange { .. })));

    let state = session.flows().snapshot();
    let goal = &state.flows[&FLOW].optimization["temp"];
    assert_eq!(goal.goal, Goal::FitToRange);
    assert_eq!(goal.minimum_value, None);
}

#[test]
fn unmapped_goal_code_reads_as_role_default() {
    let session = session();
    classify(&session, "yield", PropertyType::Numerical, Role::Output);
    classify(&session, "temp", PropertyType::Numerical, Role::Controllable);
    session
        .api()
        .transport()
        .respond(
            Method::Get,
            "/optimization/goals/?flow_id=5&column_name=yield",
            json!({"optimize_goal": 7, "minimum_value": 1.0, "maximum_value": 2.0}),
        )
        .respond(
            Method::Get,
            "/optimization/goals/?flow_id=5&column_name=temp",
            json!({"optimize_goal": 3, "optimize_order": 2}),
        );

    let yield_goal = flow_service::fetch_optimization_data(&session, FLOW, "yield").unwrap();
    assert_eq!(yield_goal.goal, Goal::FitToProperty);
    assert_eq!(yield_goal.maximum_value, Some(2.0));

    let temp_goal = flow_service::fetch_optimization_data(&session, FLOW, "temp").unwrap();
    assert_eq!(temp_goal.goal, Goal::Minimize);
    assert_eq!(temp_goal.order, Some(2));
}

#[test]
fn order_batch_saves_one_based_ranks() {
    let session = session();
    session
        .api()
        .transport()
        .respond(Method::Post, "/optimization/orders/", json!(null));
    for name in ["temp", "yield"] {
        session.flows().dispatch(FlowAction::OptimizationLoaded {
            flow_id: FLOW,
            property: name.to_string(),
            goal: OptimizationGoal::with_goal(Goal::Maximize),
        });
    }

    let order = vec!["yield".to_string(), "temp".to_string()];
    flow_service::post_optimization_order(&session, FLOW, &order).unwrap();

    let sent: BTreeMap<String, u64> = session
        .api()
        .transport()
        .requests_to(Method::Post, "/optimization/orders/")
        .into_iter()
        .filter_map(|r| {
            let body = r.body?;
            Some((body["column_name"].as_str()?.to_string(), body["optimize_order"].as_u64()?))
        })
        .collect();
    assert_eq!(sent, BTreeMap::from([("yield".to_string(), 1), ("temp".to_string(), 2)]));

    let state = session.flows().snapshot();
    assert_eq!(state.flows[&FLOW].priorities, Some(order));
    assert_eq!(state.flows[&FLOW].optimization["yield"].order, Some(1));
}

#[test]
fn order_batch_rolls_back_accepted_entries() {
    let session = session();
    session
        .api()
        .transport()
        .respond(Method::Post, "/optimization/orders/", json!(null))
        .fail(Method::Post, "/optimization/orders/", 500);
    for (name, previous) in [("a", 2), ("b", 1)] {
        session.flows().dispatch(FlowAction::OptimizationLoaded {
            flow_id: FLOW,
            property: name.to_string(),
            goal: OptimizationGoal {
                order: Some(previous),
                ..OptimizationGoal::with_goal(Goal::Maximize)
            },
        });
    }

    let err = flow_service::post_optimization_order(&session, FLOW, &["a".to_string(), "b".to_string()])
        .unwrap_err();
    assert!(matches!(err, AppError::Batch { .. }));

    // One accepted, one rejected, then one rollback for the accepted entry.
    let sent = session
        .api()
        .transport()
        .requests_to(Method::Post, "/optimization/orders/");
    assert_eq!(sent.len(), 3);
    let rollback = sent[2].body.clone().unwrap();
    let expected_previous = match rollback["column_name"].as_str() {
        Some("a") => 2,
        Some("b") => 1,
        other => panic!("unexpected rollback target {other:?}"),
    };
    assert_eq!(rollback["optimize_order"], expected_previous);

    let state = session.flows().snapshot();
    assert_eq!(state.status, LoadStatus::Failed);
    assert!(state.error.is_some());
    assert_eq!(state.flows[&FLOW].optimization["a"].order, Some(2));
    assert_eq!(state.flows[&FLOW].optimization["b"].order, Some(1));
    assert!(state.flows[&FLOW].priorities.is_none());
}

#[test]
fn role_batch_keeps_accepted_roles() {
    let session = session();
    session
        .api()
        .transport()
        .fail(Method::Put, "/concat-columns/properties/", 400);

    let err = flow_service::save_property_categories(
        &session,
        FLOW,
        &[("temp".to_string(), Role::Controllable)],
    )
    .unwrap_err();
    match err {
        AppError::Batch { failed, .. } => assert_eq!(failed, vec!["temp"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(session.flows().snapshot().flows[&FLOW].roles.is_none());
}

#[test]
fn deleting_flow_purges_its_caches() {
    let session = session();
    session
        .api()
        .transport()
        .respond(
            Method::Get,
            "/histograms/?flow_id=5&column_name=temp",
            json!({"bin_edges": "[0, 1]", "counts": "[4]"}),
        )
        .respond(Method::Delete, "/flows/", json!(null));

    flow_service::fetch_property_histograms(&session, FLOW, "temp").unwrap();
    assert!(session.flows().snapshot().flows[&FLOW].histograms.contains_key("temp"));

    flow_service::delete_flow(&session, FLOW).unwrap();
    assert!(session.flows().snapshot().entry(FLOW).is_none());
}

#[test]
fn local_edits_keep_progress_and_user_order() {
    let session = session();
    flow_service::update_flow(&session, FLOW, TrainingStage::SurrogateTrainingStart);
    flow_service::update_flow(&session, FLOW, TrainingStage::PreprocessingDone);

    classify(&session, "temp", PropertyType::Numerical, Role::Controllable);
    session.flows().dispatch(FlowAction::OptimizationLoaded {
        flow_id: FLOW,
        property: "temp".to_string(),
        goal: OptimizationGoal::with_goal(Goal::Maximize),
    });
    let order = vec!["yield".to_string(), "temp".to_string()];
    flow_service::update_priorities(&session, FLOW, order.clone());
    flow_service::initialize_priorities(&session, FLOW);

    let state = session.flows().snapshot();
    assert_eq!(state.flows[&FLOW].flow.progress, TrainingStage::SurrogateTrainingStart);
    assert_eq!(state.flows[&FLOW].priorities, Some(order));
    assert!(session.api().transport().requests().is_empty());
}

#[test]
fn successful_saves_and_training_trigger_settle_status() {
    let session = session();
    session
        .api()
        .transport()
        .respond(Method::Put, "/concat-columns/types/", json!(null))
        .respond(Method::Put, "/concat-columns/properties/", json!(null))
        .respond(Method::Post, "/processing/", json!(null));

    flow_service::save_property_types(
        &session,
        FLOW,
        &[("temp".to_string(), PropertyType::Numerical)],
    )
    .unwrap();
    assert_eq!(session.flows().snapshot().status, LoadStatus::Succeeded);

    session.flows().dispatch(FlowAction::Loading);
    flow_service::save_property_categories(
        &session,
        FLOW,
        &[("temp".to_string(), Role::Controllable)],
    )
    .unwrap();
    assert_eq!(session.flows().snapshot().status, LoadStatus::Succeeded);

    session.flows().dispatch(FlowAction::Loading);
    flow_service::create_model(&session, FLOW).unwrap();
    let state = session.flows().snapshot();
    assert_eq!(state.status, LoadStatus::Succeeded);
    assert_eq!(state.flows[&FLOW].type_of("temp"), Some(PropertyType::Numerical));
    assert_eq!(state.flows[&FLOW].role_of("temp"), Some(Role::Controllable));
}

#[test]
fn opening_a_flow_records_its_owner() {
    let session = Session::new(AppConfig::default(), ScriptedTransport::new());
    session.api().transport().respond(
        Method::Get,
        "/flows/?project_id=3",
        json!({"flows": [{"id": 5, "flow_name": "line 3", "progress": 2}]}),
    );

    let flow = flow_service::open_flow(&session, ProjectId::new(3), FLOW).unwrap();
    assert_eq!(flow.project_id, ProjectId::new(3));
    let state = session.flows().snapshot();
    assert_eq!(state.flows[&FLOW].flow.project_id, ProjectId::new(3));
    assert_eq!(state.flows[&FLOW].flow.progress, TrainingStage::PreprocessingDone);

    let err = flow_service::open_flow(&session, ProjectId::new(3), FlowId::new(9)).unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(session.flows().snapshot().entry(FlowId::new(9)).is_none());
}
