//! Flow operations.
//!
//! Request operations follow the project service pattern: the store changes
//! only after the backend accepted the request, and failures land in the flow
//! store's `error` field as well as in the returned `Err`. The local edits at
//! the bottom of this file never touch the network.
//!
//! Batches (role saves, type saves, goal saves, priority order) are fanned
//! out over the rayon pool and always wait for every request.

use std::collections::BTreeMap;

use of_api::{ApiClient, ApiResult, Transport};
use of_core::{
    CsvId, FeatureImportance, Flow, FlowDataset, FlowId, Goal, GoalPatch, Histogram,
    OptimizationGoal, ProjectId, PropertyType, Role, SearchResult, SurrogateCase,
    SurrogateMetric, TrainingStage, TypeLists, WizardStep,
};
use of_store::{FlowAction, FlowEntry};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::session::Session;
use crate::validation::{self, ValidationError};

// ---- flow CRUD ----

pub fn fetch_flows_by_project<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
) -> AppResult<Vec<Flow>> {
    let flows = session.flow_request("fetch_flows_by_project", |api| api.list_flows(project_id))?;
    session
        .flows()
        .dispatch(FlowAction::FlowsLoaded(flows.clone()));
    Ok(flows)
}

/// List `project_id`'s flows and return `flow_id` among them, so the store
/// entry carries its real owner.
pub fn open_flow<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
    flow_id: FlowId,
) -> AppResult<Flow> {
    fetch_flows_by_project(session, project_id)?
        .into_iter()
        .find(|f| f.flow_id == flow_id)
        .ok_or_else(|| {
            AppError::InvalidInput(format!("flow {flow_id} is not in project {project_id}"))
        })
}

pub fn add_flow<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
    name: &str,
) -> AppResult<Flow> {
    let flow = session.flow_request("add_flow", |api| api.create_flow(project_id, name))?;
    info!(flow_id = %flow.flow_id, %project_id, name, "flow created");
    session.flows().dispatch(FlowAction::FlowAdded(flow.clone()));
    Ok(flow)
}

pub fn edit_flow<T: Transport>(session: &Session<T>, flow_id: FlowId, name: &str) -> AppResult<()> {
    session.flow_request("edit_flow", |api| api.rename_flow(flow_id, name))?;
    session.flows().dispatch(FlowAction::FlowRenamed {
        flow_id,
        name: name.to_string(),
    });
    Ok(())
}

pub fn delete_flow<T: Transport>(session: &Session<T>, flow_id: FlowId) -> AppResult<()> {
    session.flow_request("delete_flow", |api| api.delete_flow(flow_id))?;
    info!(%flow_id, "flow deleted");
    session.flows().dispatch(FlowAction::FlowDeleted(flow_id));
    Ok(())
}

// ---- datasets ----

pub fn fetch_flow_datasets<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<Vec<FlowDataset>> {
    let datasets = session.flow_request("fetch_flow_datasets", |api| api.flow_datasets(flow_id))?;
    session.flows().dispatch(FlowAction::DatasetsLoaded {
        flow_id,
        datasets: datasets.clone(),
    });
    Ok(datasets)
}

pub fn add_csv_to_flow<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    csv_ids: &[CsvId],
) -> AppResult<()> {
    session.flow_request("add_csv_to_flow", |api| api.add_flow_datasets(flow_id, csv_ids))?;
    session.flows().dispatch(FlowAction::DatasetsAttached {
        flow_id,
        csv_ids: csv_ids.to_vec(),
    });
    Ok(())
}

// ---- property classification ----

pub fn fetch_flow_properties<T: Transport>(session: &Session<T>, flow_id: FlowId) -> AppResult<()> {
    let lists = session.flow_request("fetch_flow_properties", |api| api.flow_properties(flow_id))?;
    session.flows().dispatch(FlowAction::PropertiesLoaded {
        flow_id,
        roles: lists.roles(),
        types: lists.types(),
    });
    Ok(())
}

pub fn fetch_property_types<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<TypeLists> {
    let types = session.flow_request("fetch_property_types", |api| api.property_types(flow_id))?;
    session.flows().dispatch(FlowAction::TypesLoaded {
        flow_id,
        types: types.clone(),
    });
    Ok(types)
}

/// Persist type assignments. Accepted ones are applied to the store even when
/// others fail.
pub fn save_property_types<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    assignments: &[(String, PropertyType)],
) -> AppResult<()> {
    session.flows().dispatch(FlowAction::Loading);
    let results = fan_out(session, assignments, |api, (name, ty)| {
        api.save_property_type(flow_id, name, *ty)
    });
    let mut failed = Vec::new();
    for ((name, ty), result) in results {
        match result {
            Ok(()) => session.flows().dispatch(FlowAction::TypeMoved {
                flow_id,
                property: name.clone(),
                to: *ty,
            }),
            Err(err) => {
                warn!(%flow_id, property = %name, error = %err, "type save failed");
                failed.push(name.clone());
            }
        }
    }
    settle_batch(session, "save_property_types", failed)
}

/// Persist role assignments. There is no rollback: accepted roles stay saved
/// when others fail.
pub fn save_property_categories<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    assignments: &[(String, Role)],
) -> AppResult<()> {
    session.flows().dispatch(FlowAction::Loading);
    let results = fan_out(session, assignments, |api, (name, role)| {
        api.save_property_role(flow_id, name, *role)
    });
    let mut failed = Vec::new();
    for ((name, role), result) in results {
        match result {
            Ok(()) => session.flows().dispatch(FlowAction::RoleAssigned {
                flow_id,
                property: name.clone(),
                role: *role,
            }),
            Err(err) => {
                warn!(%flow_id, property = %name, error = %err, "role save failed");
                failed.push(name.clone());
            }
        }
    }
    settle_batch(session, "save_property_categories", failed)
}

// ---- histograms ----

pub fn fetch_flow_histograms<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<BTreeMap<String, Histogram>> {
    let histograms = session.flow_request("fetch_flow_histograms", |api| api.all_histograms(flow_id))?;
    session.flows().dispatch(FlowAction::HistogramsLoaded {
        flow_id,
        histograms: histograms.clone(),
    });
    Ok(histograms)
}

pub fn fetch_property_histograms<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    column: &str,
) -> AppResult<Histogram> {
    let histogram = session.flow_request("fetch_property_histograms", |api| {
        api.histogram(flow_id, column)
    })?;
    session.flows().dispatch(FlowAction::HistogramsLoaded {
        flow_id,
        histograms: BTreeMap::from([(column.to_string(), histogram.clone())]),
    });
    Ok(histogram)
}

// ---- optimization ----

/// Read the persisted goal of one property and merge it over what the store
/// holds. Unknown goal codes decode to the role default; absent bounds keep
/// the local values.
pub fn fetch_optimization_data<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    property: &str,
) -> AppResult<OptimizationGoal> {
    let record = session.flow_request("fetch_optimization_data", |api| {
        api.optimization_goal(flow_id, property)
    })?;
    let role = session
        .flows()
        .select(|s| s.entry(flow_id).and_then(|e| e.role_of(property)))
        .unwrap_or(Role::Controllable);
    let patch = GoalPatch {
        goal: Some(Goal::from_code_or_default(record.optimize_goal, role)),
        minimum_value: record.minimum_value,
        maximum_value: record.maximum_value,
        order: record.optimize_order,
    };
    session.flows().dispatch(FlowAction::OptimizationPatched {
        flow_id,
        property: property.to_string(),
        patch: patch.clone(),
    });
    let stored = session
        .flows()
        .select(|s| s.entry(flow_id).and_then(|e| e.optimization.get(property).cloned()));
    Ok(stored.unwrap_or_else(|| {
        let mut goal = OptimizationGoal::with_goal(Goal::default_for(role));
        goal.apply(&patch);
        goal
    }))
}

/// Validate and persist one goal.
pub fn post_optimization_data<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    property: &str,
    goal: &OptimizationGoal,
) -> AppResult<()> {
    post_optimization_goals(session, flow_id, &[(property.to_string(), goal.clone())])
}

/// Validate every goal first; nothing is sent if any is invalid.
pub fn post_optimization_goals<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    goals: &[(String, OptimizationGoal)],
) -> AppResult<()> {
    let snapshot = session.flows().snapshot();
    let entry = snapshot.entry(flow_id);
    for (property, goal) in goals {
        check_goal(entry, property, goal, false)?;
    }

    session.flows().dispatch(FlowAction::Loading);
    let results = fan_out(session, goals, |api, (property, goal)| {
        api.save_optimization_goal(flow_id, property, goal)
    });
    let mut failed = Vec::new();
    for ((property, goal), result) in results {
        match result {
            Ok(()) => {
                let order = entry
                    .and_then(|e| e.optimization.get(property))
                    .and_then(|g| g.order);
                session.flows().dispatch(FlowAction::OptimizationLoaded {
                    flow_id,
                    property: property.clone(),
                    goal: OptimizationGoal {
                        order: goal.order.or(order),
                        ..goal.clone()
                    },
                });
            }
            Err(err) => {
                warn!(%flow_id, %property, error = %err, "goal save failed");
                failed.push(property.clone());
            }
        }
    }
    settle_batch(session, "post_optimization_data", failed)
}

/// Persist a priority order (1-based) with one request per property.
///
/// On partial failure the properties that were accepted are re-posted with
/// the order they had before, where it is known, and the batch fails.
pub fn post_optimization_order<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    order: &[String],
) -> AppResult<()> {
    let previous: BTreeMap<String, Option<u32>> = session.flows().select(|s| {
        s.entry(flow_id)
            .map(|e| {
                e.optimization
                    .iter()
                    .map(|(name, goal)| (name.clone(), goal.order))
                    .collect()
            })
            .unwrap_or_default()
    });
    let ranked: Vec<(String, u32)> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), u32::try_from(i + 1).unwrap_or(u32::MAX)))
        .collect();

    session.flows().dispatch(FlowAction::Loading);
    let results = fan_out(session, &ranked, |api, (name, rank)| {
        api.save_optimization_order(flow_id, name, *rank)
    });

    let mut accepted = Vec::new();
    let mut failed = Vec::new();
    for ((name, rank), result) in results {
        match result {
            Ok(()) => accepted.push((name.clone(), *rank)),
            Err(err) => {
                warn!(%flow_id, property = %name, error = %err, "order save failed");
                failed.push(name.clone());
            }
        }
    }

    if failed.is_empty() {
        info!(%flow_id, count = order.len(), "priority order saved");
        session.flows().dispatch(FlowAction::OrderPersisted {
            flow_id,
            order: order.to_vec(),
        });
        return Ok(());
    }

    let rollback: Vec<(String, u32)> = accepted
        .into_iter()
        .filter_map(|(name, rank)| match previous.get(&name).copied().flatten() {
            Some(prev) if prev != rank => Some((name, prev)),
            _ => None,
        })
        .collect();
    for ((name, _), result) in fan_out(session, &rollback, |api, (name, prev)| {
        api.save_optimization_order(flow_id, name, *prev)
    }) {
        if let Err(err) = result {
            warn!(%flow_id, property = %name, error = %err, "order rollback failed");
        }
    }
    settle_batch(session, "post_optimization_order", failed)
}

// ---- training ----

pub fn create_model<T: Transport>(session: &Session<T>, flow_id: FlowId) -> AppResult<()> {
    session.flow_request("create_model", |api| api.start_processing(flow_id))?;
    info!(%flow_id, "training started");
    session.flows().dispatch(FlowAction::Settled);
    Ok(())
}

/// One progress request; the store keeps the highest stage seen.
pub fn poll_flow_progress<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<TrainingStage> {
    let stage = session.flow_request("poll_flow_progress", |api| api.flow_progress(flow_id))?;
    session
        .flows()
        .dispatch(FlowAction::ProgressReported { flow_id, stage });
    Ok(stage)
}

// ---- results ----

pub fn fetch_surrogate_feature_importance<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<Vec<FeatureImportance>> {
    let items = session.flow_request("fetch_surrogate_feature_importance", |api| {
        api.feature_importance(flow_id)
    })?;
    session.flows().dispatch(FlowAction::FeatureImportanceLoaded {
        flow_id,
        items: items.clone(),
    });
    Ok(items)
}

pub fn fetch_surrogate_matric<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<Vec<SurrogateMetric>> {
    let items = session.flow_request("fetch_surrogate_matric", |api| api.surrogate_metrics(flow_id))?;
    session.flows().dispatch(FlowAction::SurrogateMetricsLoaded {
        flow_id,
        items: items.clone(),
    });
    Ok(items)
}

pub fn fetch_surrogate_result<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<Vec<SurrogateCase>> {
    let items = session.flow_request("fetch_surrogate_result", |api| api.surrogate_cases(flow_id))?;
    session.flows().dispatch(FlowAction::SurrogateCasesLoaded {
        flow_id,
        items: items.clone(),
    });
    Ok(items)
}

pub fn fetch_search_result<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
) -> AppResult<Vec<SearchResult>> {
    let items = session.flow_request("fetch_search_result", |api| api.search_result(flow_id))?;
    session.flows().dispatch(FlowAction::SearchResultLoaded {
        flow_id,
        items: items.clone(),
    });
    Ok(items)
}

// ---- local edits ----

pub fn initialize_flow<T: Transport>(session: &Session<T>, flow_id: FlowId, project_id: ProjectId) {
    session.flows().dispatch(FlowAction::Initialize {
        flow_id,
        project_id,
    });
}

pub fn set_current_step<T: Transport>(session: &Session<T>, flow_id: FlowId, step: WizardStep) {
    session
        .flows()
        .dispatch(FlowAction::SetCurrentStep { flow_id, step });
}

/// Record a progress value observed elsewhere; lower values are ignored.
pub fn update_flow<T: Transport>(session: &Session<T>, flow_id: FlowId, stage: TrainingStage) {
    session
        .flows()
        .dispatch(FlowAction::ProgressReported { flow_id, stage });
}

/// Move a property between data-type buckets.
pub fn update_property_category<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    property: &str,
    to: PropertyType,
) {
    session.flows().dispatch(FlowAction::TypeMoved {
        flow_id,
        property: property.to_string(),
        to,
    });
}

/// Give a property a role, taking it out of any other role bucket.
pub fn update_category<T: Transport>(session: &Session<T>, flow_id: FlowId, property: &str, role: Role) {
    session.flows().dispatch(FlowAction::RoleAssigned {
        flow_id,
        property: property.to_string(),
        role,
    });
}

/// Return a property to the dataset-properties pool.
pub fn remove_category<T: Transport>(session: &Session<T>, flow_id: FlowId, property: &str) {
    session.flows().dispatch(FlowAction::RoleCleared {
        flow_id,
        property: property.to_string(),
    });
}

/// Merge a partial goal edit. Illegal goals and inverted ranges are rejected
/// without touching the store; a half-entered range is accepted.
pub fn update_optimization_data<T: Transport>(
    session: &Session<T>,
    flow_id: FlowId,
    property: &str,
    patch: GoalPatch,
) -> Result<(), ValidationError> {
    let snapshot = session.flows().snapshot();
    let entry = snapshot.entry(flow_id);
    let role = entry.and_then(|e| e.role_of(property));
    let mut merged = entry
        .and_then(|e| e.optimization.get(property).cloned())
        .unwrap_or_else(|| {
            OptimizationGoal::with_goal(role.map(Goal::default_for).unwrap_or(Goal::NoOptimization))
        });
    merged.apply(&patch);
    check_goal(entry, property, &merged, true)?;

    session.flows().dispatch(FlowAction::OptimizationPatched {
        flow_id,
        property: property.to_string(),
        patch,
    });
    Ok(())
}

pub fn update_priorities<T: Transport>(session: &Session<T>, flow_id: FlowId, order: Vec<String>) {
    session
        .flows()
        .dispatch(FlowAction::PrioritiesUpdated { flow_id, order });
}

/// Seed the priority order from the optimization data, once.
pub fn initialize_priorities<T: Transport>(session: &Session<T>, flow_id: FlowId) {
    session
        .flows()
        .dispatch(FlowAction::PrioritiesInitialized { flow_id });
}

pub fn clear_error<T: Transport>(session: &Session<T>) {
    session.flows().dispatch(FlowAction::ClearError);
}

// ---- helpers ----

fn check_goal(
    entry: Option<&FlowEntry>,
    property: &str,
    goal: &OptimizationGoal,
    partial: bool,
) -> Result<(), ValidationError> {
    let ty = entry.and_then(|e| e.type_of(property));
    let role = entry.and_then(|e| e.role_of(property));
    match validation::validate_goal(property, ty, role, goal) {
        Err(ValidationError::MissingBound { .. }) if partial => Ok(()),
        other => other,
    }
}

fn fan_out<'a, T, I, F>(session: &Session<T>, items: &'a [I], op: F) -> Vec<(&'a I, ApiResult<()>)>
where
    T: Transport,
    I: Sync,
    F: Fn(&ApiClient<T>, &I) -> ApiResult<()> + Sync,
{
    items
        .par_iter()
        .map(|item| (item, op(session.api(), item)))
        .collect()
}

fn settle_batch<T: Transport>(
    session: &Session<T>,
    operation: &'static str,
    failed: Vec<String>,
) -> AppResult<()> {
    if failed.is_empty() {
        session.flows().dispatch(FlowAction::Settled);
        return Ok(());
    }
    let err = AppError::Batch { operation, failed };
    warn!(operation, error = %err, "batch incomplete");
    session.flows().dispatch(FlowAction::Failed(err.to_string()));
    Err(err)
}
