//! Per-flow wizard state.
//!
//! One [`FlowEntry`] per flow id holds everything the wizard steps read:
//! referenced datasets, the type and role partitions, cached histograms,
//! optimization goals, the priority order and training artifacts. Deleting a
//! flow drops the whole entry.

use std::collections::BTreeMap;

use of_core::{
    CsvId, FeatureImportance, Flow, FlowDataset, FlowId, Goal, GoalPatch, Histogram,
    OptimizationGoal, ProjectId, PropertyType, Role, RoleLists, SearchResult, SurrogateCase,
    SurrogateMetric, TrainingStage, TypeLists, WizardStep,
};

use crate::container::{LoadStatus, Reducer};
use crate::partition::Partition;
use crate::selectors;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowEntry {
    pub flow: Flow,
    /// `None` until the backend has listed column types.
    pub types: Option<Partition<PropertyType>>,
    /// `None` until the backend has listed roles.
    pub roles: Option<Partition<Role>>,
    pub histograms: BTreeMap<String, Histogram>,
    pub optimization: BTreeMap<String, OptimizationGoal>,
    pub priorities: Option<Vec<String>>,
    pub feature_importance: Option<Vec<FeatureImportance>>,
    pub surrogate_metrics: Option<Vec<SurrogateMetric>>,
    pub surrogate_cases: Option<Vec<SurrogateCase>>,
    pub search_result: Option<Vec<SearchResult>>,
}

impl FlowEntry {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            types: None,
            roles: None,
            histograms: BTreeMap::new(),
            optimization: BTreeMap::new(),
            priorities: None,
            feature_importance: None,
            surrogate_metrics: None,
            surrogate_cases: None,
            search_result: None,
        }
    }

    pub fn role_of(&self, property: &str) -> Option<Role> {
        self.roles.as_ref().and_then(|r| r.bucket_of(property))
    }

    pub fn type_of(&self, property: &str) -> Option<PropertyType> {
        self.types.as_ref().and_then(|t| t.bucket_of(property))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    pub flows: BTreeMap<FlowId, FlowEntry>,
    pub status: LoadStatus,
    pub error: Option<String>,
}

impl FlowState {
    pub fn entry(&self, flow_id: FlowId) -> Option<&FlowEntry> {
        self.flows.get(&flow_id)
    }
}

#[derive(Debug, Clone)]
pub enum FlowAction {
    Loading,
    /// A request that returns nothing to store went through.
    Settled,
    Failed(String),
    ClearError,

    FlowsLoaded(Vec<Flow>),
    FlowAdded(Flow),
    FlowRenamed { flow_id: FlowId, name: String },
    FlowDeleted(FlowId),
    Initialize { flow_id: FlowId, project_id: ProjectId },
    SetCurrentStep { flow_id: FlowId, step: WizardStep },
    ProgressReported { flow_id: FlowId, stage: TrainingStage },

    DatasetsLoaded { flow_id: FlowId, datasets: Vec<FlowDataset> },
    DatasetsAttached { flow_id: FlowId, csv_ids: Vec<CsvId> },

    PropertiesLoaded { flow_id: FlowId, roles: RoleLists, types: Option<TypeLists> },
    TypesLoaded { flow_id: FlowId, types: TypeLists },
    TypeMoved { flow_id: FlowId, property: String, to: PropertyType },
    RoleAssigned { flow_id: FlowId, property: String, role: Role },
    RoleCleared { flow_id: FlowId, property: String },

    HistogramsLoaded { flow_id: FlowId, histograms: BTreeMap<String, Histogram> },

    OptimizationLoaded { flow_id: FlowId, property: String, goal: OptimizationGoal },
    OptimizationPatched { flow_id: FlowId, property: String, patch: GoalPatch },
    PrioritiesUpdated { flow_id: FlowId, order: Vec<String> },
    PrioritiesInitialized { flow_id: FlowId },
    OrderPersisted { flow_id: FlowId, order: Vec<String> },

    FeatureImportanceLoaded { flow_id: FlowId, items: Vec<FeatureImportance> },
    SurrogateMetricsLoaded { flow_id: FlowId, items: Vec<SurrogateMetric> },
    SurrogateCasesLoaded { flow_id: FlowId, items: Vec<SurrogateCase> },
    SearchResultLoaded { flow_id: FlowId, items: Vec<SearchResult> },
}

impl FlowAction {
    /// Actions carrying a backend response; these settle the request status.
    fn settles(&self) -> bool {
        !matches!(
            self,
            FlowAction::Loading
                | FlowAction::Failed(_)
                | FlowAction::ClearError
                | FlowAction::Initialize { .. }
                | FlowAction::SetCurrentStep { .. }
                | FlowAction::TypeMoved { .. }
                | FlowAction::RoleAssigned { .. }
                | FlowAction::RoleCleared { .. }
                | FlowAction::OptimizationPatched { .. }
                | FlowAction::PrioritiesUpdated { .. }
                | FlowAction::PrioritiesInitialized { .. }
        )
    }
}

impl Reducer for FlowState {
    type Action = FlowAction;

    fn reduce(mut self, action: FlowAction) -> Self {
        if action.settles() {
            self.status = LoadStatus::Succeeded;
        }
        match action {
            FlowAction::Loading => self.status = LoadStatus::Loading,
            FlowAction::Failed(message) => {
                self.status = LoadStatus::Failed;
                self.error = Some(message);
            }
            FlowAction::Settled => {}
            FlowAction::ClearError => self.error = None,

            FlowAction::FlowsLoaded(flows) => {
                for flow in flows {
                    match self.flows.get_mut(&flow.flow_id) {
                        // A fresh listing is authoritative, even for progress.
                        Some(entry) => {
                            entry.flow.name = flow.name;
                            entry.flow.project_id = flow.project_id;
                            entry.flow.progress = flow.progress;
                        }
                        None => {
                            self.flows.insert(flow.flow_id, FlowEntry::new(flow));
                        }
                    }
                }
            }
            FlowAction::FlowAdded(flow) => {
                self.flows.insert(flow.flow_id, FlowEntry::new(flow));
            }
            FlowAction::FlowRenamed { flow_id, name } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.flow.name = name;
                }
            }
            FlowAction::FlowDeleted(flow_id) => {
                self.flows.remove(&flow_id);
            }
            FlowAction::Initialize {
                flow_id,
                project_id,
            } => {
                self.flows
                    .entry(flow_id)
                    .or_insert_with(|| FlowEntry::new(Flow::new(flow_id, project_id, "")));
            }
            FlowAction::SetCurrentStep { flow_id, step } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.flow.current_step = Some(step);
                }
            }
            FlowAction::ProgressReported { flow_id, stage } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.flow.progress = entry.flow.progress.max(stage);
                }
            }

            FlowAction::DatasetsLoaded { flow_id, datasets } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.flow.datasets.clear();
                    for dataset in datasets {
                        if !entry.flow.datasets.contains(&dataset.csv_id) {
                            entry.flow.datasets.push(dataset.csv_id);
                        }
                        entry.flow.dataset_names.insert(dataset.csv_id, dataset.file_name);
                    }
                }
            }
            FlowAction::DatasetsAttached { flow_id, csv_ids } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    for id in csv_ids {
                        if !entry.flow.datasets.contains(&id) {
                            entry.flow.datasets.push(id);
                        }
                    }
                }
            }

            FlowAction::PropertiesLoaded {
                flow_id,
                roles,
                types,
            } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.roles = Some(Partition::from_lists(&roles));
                    if let Some(types) = types {
                        entry.types = Some(Partition::from_lists(&types));
                    }
                }
            }
            FlowAction::TypesLoaded { flow_id, types } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.types = Some(Partition::from_lists(&types));
                }
            }
            FlowAction::TypeMoved {
                flow_id,
                property,
                to,
            } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry
                        .types
                        .get_or_insert_with(Partition::default)
                        .move_to(&property, to);
                }
            }
            FlowAction::RoleAssigned {
                flow_id,
                property,
                role,
            } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry
                        .roles
                        .get_or_insert_with(Partition::default)
                        .move_to(&property, role);
                }
            }
            FlowAction::RoleCleared { flow_id, property } => {
                if let Some(roles) = self.flows.get_mut(&flow_id).and_then(|e| e.roles.as_mut()) {
                    roles.remove(&property);
                }
            }

            FlowAction::HistogramsLoaded {
                flow_id,
                histograms,
            } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.histograms.extend(histograms);
                }
            }

            FlowAction::OptimizationLoaded {
                flow_id,
                property,
                goal,
            } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.optimization.insert(property, goal);
                }
            }
            FlowAction::OptimizationPatched {
                flow_id,
                property,
                patch,
            } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    let fallback = entry
                        .role_of(&property)
                        .map(Goal::default_for)
                        .unwrap_or(Goal::NoOptimization);
                    entry
                        .optimization
                        .entry(property)
                        .or_insert_with(|| OptimizationGoal::with_goal(fallback))
                        .apply(&patch);
                }
            }
            FlowAction::PrioritiesUpdated { flow_id, order } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.priorities = Some(order);
                }
            }
            FlowAction::PrioritiesInitialized { flow_id } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    if entry.priorities.is_none() {
                        entry.priorities = Some(selectors::seed_priorities(entry));
                    }
                }
            }
            FlowAction::OrderPersisted { flow_id, order } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    for (i, property) in order.iter().enumerate() {
                        if let Some(goal) = entry.optimization.get_mut(property) {
                            goal.order = u32::try_from(i + 1).ok();
                        }
                    }
                    entry.priorities = Some(order);
                }
            }

            FlowAction::FeatureImportanceLoaded { flow_id, items } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.feature_importance = Some(items);
                }
            }
            FlowAction::SurrogateMetricsLoaded { flow_id, items } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.surrogate_metrics = Some(items);
                }
            }
            FlowAction::SurrogateCasesLoaded { flow_id, items } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.surrogate_cases = Some(items);
                }
            }
            FlowAction::SearchResultLoaded { flow_id, items } => {
                if let Some(entry) = self.flows.get_mut(&flow_id) {
                    entry.search_result = Some(items);
                }
            }
        }
        self
    }
}
