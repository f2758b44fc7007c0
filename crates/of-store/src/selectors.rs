//! Derived views over store snapshots.

use of_core::{Dataset, Flow, ProjectId, PropertyType, Role};

use crate::flow_store::{FlowEntry, FlowState};
use crate::project_store::ProjectState;

pub fn datasets_of(state: &ProjectState, project_id: ProjectId) -> &[Dataset] {
    state
        .datasets
        .get(&project_id)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn flows_of(state: &FlowState, project_id: ProjectId) -> Vec<&Flow> {
    state
        .flows
        .values()
        .map(|entry| &entry.flow)
        .filter(|flow| flow.project_id == project_id)
        .collect()
}

/// Properties with a type but no role: the dataset-properties pool.
pub fn unassigned_properties(entry: &FlowEntry) -> Vec<String> {
    let Some(types) = &entry.types else {
        return Vec::new();
    };
    types
        .iter()
        .filter(|(ty, _)| *ty != PropertyType::Unavailable)
        .flat_map(|(_, names)| names.iter())
        .filter(|name| entry.role_of(name).is_none())
        .cloned()
        .collect()
}

/// Controllable then output properties, in partition order.
pub fn goal_targets(entry: &FlowEntry) -> Vec<(String, Role)> {
    let Some(roles) = &entry.roles else {
        return Vec::new();
    };
    [Role::Controllable, Role::Output]
        .into_iter()
        .flat_map(|role| roles.names(role).iter().map(move |name| (name.clone(), role)))
        .collect()
}

/// Goal targets that have no optimization data yet.
pub fn missing_optimization(entry: &FlowEntry) -> Vec<String> {
    goal_targets(entry)
        .into_iter()
        .filter(|(name, _)| !entry.optimization.contains_key(name))
        .map(|(name, _)| name)
        .collect()
}

/// Initial priority order: controllable properties first, then outputs.
/// Within a role, a persisted `order` wins; unordered properties follow in
/// partition order. Only properties with optimization data are included.
pub fn seed_priorities(entry: &FlowEntry) -> Vec<String> {
    let mut order = Vec::new();
    for role in [Role::Controllable, Role::Output] {
        let mut group: Vec<(Option<u32>, usize, &String)> = goal_targets(entry)
            .iter()
            .filter(|(_, r)| *r == role)
            .enumerate()
            .filter_map(|(i, (name, _))| {
                entry
                    .optimization
                    .get_key_value(name)
                    .map(|(key, goal)| (goal.order, i, key))
            })
            .collect();
        // Some(order) sorts before None.
        group.sort_by_key(|(persisted, i, _)| (persisted.is_none(), *persisted, *i));
        order.extend(group.into_iter().map(|(_, _, name)| name.clone()));
    }
    order
}
