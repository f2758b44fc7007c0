//! Flow wizard state machine.
//!
//! Entering a step first loads whatever that step reads (only what the store
//! does not already hold), then checks the step's guard. `advance` persists
//! the current step's edits and waits for every save before moving on (on
//! the training step that means triggering training if it never started);
//! `back` never saves.

use std::sync::Arc;
use std::thread;

use of_api::Transport;
use of_core::{
    FlowId, FlowRoute, Goal, OptimizationGoal, PropertyType, Role, TrainingStage, WizardStep,
};
use of_store::{FlowAction, FlowEntry, FlowState, selectors};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::flow_service;
use crate::polling::{PollEvent, ProgressPoller};
use crate::project_service;
use crate::session::Session;
use crate::validation::{self, ValidationError};

/// A step's prerequisite is missing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
    #[error("flow {0} is not loaded")]
    UnknownFlow(FlowId),

    #[error("flow {0} has no datasets")]
    NoDatasets(FlowId),

    #[error("property types of flow {0} are not loaded")]
    TypesNotLoaded(FlowId),

    #[error("flow {0} has no controllable or output property")]
    NoGoalTargets(FlowId),

    #[error("no optimization data for: {}", .0.join(", "))]
    MissingOptimization(Vec<String>),

    #[error("{0}")]
    InvalidGoal(ValidationError),

    #[error("flow {0} has no priority order")]
    NoPriorities(FlowId),

    #[error("training is at {actual}, {required} is required")]
    TrainingIncomplete {
        required: TrainingStage,
        actual: TrainingStage,
    },

    #[error("{0} is the last step")]
    NoNextStep(WizardStep),

    #[error("{0} is the first step")]
    NoPreviousStep(WizardStep),

    #[error("only possible on {expected}, not {actual}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },
}

pub struct Wizard<T: Transport + 'static> {
    session: Session<T>,
    route: FlowRoute,
    poller: Option<ProgressPoller>,
}

impl<T: Transport + 'static> Wizard<T> {
    /// Open the wizard at `route`.
    pub fn enter(session: Session<T>, route: FlowRoute) -> AppResult<Self> {
        let known = session
            .flows()
            .select(|s| s.entry(route.flow_id).is_some());
        if !known {
            flow_service::fetch_flows_by_project(&session, route.project_id)?;
            flow_service::initialize_flow(&session, route.flow_id, route.project_id);
        }

        let mut wizard = Self {
            session,
            route,
            poller: None,
        };
        wizard.go_to(route.step)?;
        Ok(wizard)
    }

    pub fn route(&self) -> FlowRoute {
        self.route
    }

    pub fn step(&self) -> WizardStep {
        self.route.step
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn snapshot(&self) -> Arc<FlowState> {
        self.session.flows().snapshot()
    }

    fn flow_id(&self) -> FlowId {
        self.route.flow_id
    }

    /// Save the current step, then move to the next one.
    pub fn advance(&mut self) -> AppResult<WizardStep> {
        let current = self.route.step;
        let next = current.next().ok_or(GuardError::NoNextStep(current))?;
        self.save(current)?;
        if current == WizardStep::TrainingProgress && self.training_idle() {
            self.start_training()?;
        }
        self.go_to(next)?;
        Ok(next)
    }

    /// Move to the previous step without saving.
    pub fn back(&mut self) -> AppResult<WizardStep> {
        let current = self.route.step;
        let prev = current.prev().ok_or(GuardError::NoPreviousStep(current))?;
        self.go_to(prev)?;
        Ok(prev)
    }

    /// Trigger training and start watching its progress.
    pub fn start_training(&mut self) -> AppResult<()> {
        self.require_step(WizardStep::TrainingProgress)?;
        self.check(WizardStep::TrainingProgress)?;
        flow_service::create_model(&self.session, self.flow_id())?;
        self.stop_watching();
        self.watch();
        Ok(())
    }

    /// Block until training reports its final stage, then move to the
    /// performance step after the configured delay. Works for training
    /// started elsewhere too.
    pub fn await_training(&mut self, mut on_event: impl FnMut(&PollEvent)) -> AppResult<WizardStep> {
        self.require_step(WizardStep::TrainingProgress)?;
        self.watch();

        let mut completed = false;
        if let Some(poller) = &self.poller {
            while let Ok(event) = poller.events().recv() {
                on_event(&event);
                if event == PollEvent::Completed {
                    completed = true;
                    break;
                }
            }
        }
        self.stop_watching();
        if !completed {
            return Err(AppError::PollingStopped);
        }

        let delay = self.session.config().results_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.go_to(WizardStep::CheckPerformance)?;
        Ok(WizardStep::CheckPerformance)
    }

    /// Nothing reported and nothing being watched: training was never
    /// triggered from here.
    fn training_idle(&self) -> bool {
        self.poller.is_none()
            && self.with_entry(|e| e.flow.progress == TrainingStage::NotStarted)
    }

    pub fn is_watching(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    /// Attach a poller unless one exists; a finished poller still holds
    /// events that have not been read.
    fn watch(&mut self) {
        if self.poller.is_some() {
            return;
        }
        let interval = self.session.config().poll_interval();
        self.poller = Some(ProgressPoller::start(
            self.session.clone(),
            self.flow_id(),
            interval,
        ));
    }

    fn stop_watching(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.cancel();
        }
    }

    fn require_step(&self, expected: WizardStep) -> Result<(), GuardError> {
        if self.route.step == expected {
            Ok(())
        } else {
            Err(GuardError::WrongStep {
                expected,
                actual: self.route.step,
            })
        }
    }

    /// A failed prepare or guard leaves the wizard, and its poller, where
    /// they were.
    fn go_to(&mut self, step: WizardStep) -> AppResult<()> {
        self.prepare(step)?;
        self.check(step)?;
        if step != WizardStep::TrainingProgress {
            self.stop_watching();
        }
        flow_service::set_current_step(&self.session, self.flow_id(), step);
        self.route = self.route.with_step(step);
        info!(route = %self.route, "entered step");
        Ok(())
    }

    // ---- loading ----

    fn prepare(&self, step: WizardStep) -> AppResult<()> {
        match step {
            WizardStep::SelectDatasets => {
                self.ensure_project_datasets()?;
                self.ensure_flow_datasets()
            }
            WizardStep::AnalyzeProperties => {
                self.ensure_flow_datasets()?;
                self.ensure_properties()?;
                self.ensure_histograms()
            }
            WizardStep::ConfigureProperties => {
                self.ensure_properties()?;
                self.ensure_types()
            }
            WizardStep::SetGoals => {
                self.ensure_properties()?;
                self.ensure_types()?;
                self.ensure_histograms()?;
                self.ensure_goals()
            }
            WizardStep::SetPriorities | WizardStep::TrainingProgress => {
                self.ensure_properties()?;
                self.ensure_types()?;
                self.ensure_histograms()?;
                self.ensure_goals()?;
                flow_service::initialize_priorities(&self.session, self.flow_id());
                if step == WizardStep::TrainingProgress {
                    flow_service::poll_flow_progress(&self.session, self.flow_id())?;
                }
                Ok(())
            }
            WizardStep::CheckPerformance => {
                let stage = flow_service::poll_flow_progress(&self.session, self.flow_id())?;
                if stage >= TrainingStage::SurrogateTrainingDone {
                    self.ensure_performance()?;
                }
                Ok(())
            }
            WizardStep::OptimizationResults => {
                let stage = flow_service::poll_flow_progress(&self.session, self.flow_id())?;
                if stage.is_terminal() {
                    self.ensure_search_result()?;
                }
                Ok(())
            }
        }
    }

    fn ensure_project_datasets(&self) -> AppResult<()> {
        let project_id = self.route.project_id;
        let loaded = self
            .session
            .projects()
            .select(|s| s.datasets.contains_key(&project_id));
        if !loaded {
            project_service::fetch_csv_files_by_project(&self.session, project_id)?;
        }
        Ok(())
    }

    fn ensure_flow_datasets(&self) -> AppResult<()> {
        let empty = self.with_entry(|e| e.flow.datasets.is_empty());
        if empty {
            flow_service::fetch_flow_datasets(&self.session, self.flow_id())?;
        }
        Ok(())
    }

    fn ensure_properties(&self) -> AppResult<()> {
        if self.with_entry(|e| e.roles.is_none()) {
            flow_service::fetch_flow_properties(&self.session, self.flow_id())?;
        }
        Ok(())
    }

    fn ensure_types(&self) -> AppResult<()> {
        if self.with_entry(|e| e.types.is_none()) {
            flow_service::fetch_property_types(&self.session, self.flow_id())?;
        }
        Ok(())
    }

    fn ensure_histograms(&self) -> AppResult<()> {
        if self.with_entry(|e| e.histograms.is_empty()) {
            flow_service::fetch_flow_histograms(&self.session, self.flow_id())?;
        }
        Ok(())
    }

    /// Seed defaults for goal targets without data (goal by role, range from
    /// the histogram's outer edges), then merge whatever the backend has
    /// persisted for them.
    fn ensure_goals(&self) -> AppResult<()> {
        let flow_id = self.flow_id();
        let snapshot = self.snapshot();
        let Some(entry) = snapshot.entry(flow_id) else {
            return Err(GuardError::UnknownFlow(flow_id).into());
        };
        let missing: Vec<(String, Role)> = selectors::goal_targets(entry)
            .into_iter()
            .filter(|(name, _)| !entry.optimization.contains_key(name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        for (name, role) in &missing {
            let range = entry.histograms.get(name).and_then(|h| h.range());
            self.session.flows().dispatch(FlowAction::OptimizationLoaded {
                flow_id,
                property: name.clone(),
                goal: OptimizationGoal {
                    goal: Goal::default_for(*role),
                    minimum_value: range.map(|r| r.0),
                    maximum_value: range.map(|r| r.1),
                    order: None,
                },
            });
        }

        let session = &self.session;
        missing.par_iter().for_each(|(name, _)| {
            if let Err(err) = flow_service::fetch_optimization_data(session, flow_id, name) {
                warn!(%flow_id, property = %name, error = %err, "keeping default goal");
            }
        });
        Ok(())
    }

    fn ensure_performance(&self) -> AppResult<()> {
        let flow_id = self.flow_id();
        let (importance, metrics, cases) = self.with_entry(|e| {
            (
                e.feature_importance.is_none(),
                e.surrogate_metrics.is_none(),
                e.surrogate_cases.is_none(),
            )
        });
        if importance {
            flow_service::fetch_surrogate_feature_importance(&self.session, flow_id)?;
        }
        if metrics {
            flow_service::fetch_surrogate_matric(&self.session, flow_id)?;
        }
        if cases {
            flow_service::fetch_surrogate_result(&self.session, flow_id)?;
        }
        Ok(())
    }

    fn ensure_search_result(&self) -> AppResult<()> {
        if self.with_entry(|e| e.search_result.is_none()) {
            flow_service::fetch_search_result(&self.session, self.flow_id())?;
        }
        Ok(())
    }

    /// `f` applied to this flow's entry, `R::default()` when there is none.
    fn with_entry<R: Default>(&self, f: impl FnOnce(&FlowEntry) -> R) -> R {
        let flow_id = self.flow_id();
        self.session
            .flows()
            .select(|s| s.entry(flow_id).map(f).unwrap_or_default())
    }

    // ---- guards ----

    /// Whether `step` can be shown with what the store holds now.
    pub fn check(&self, step: WizardStep) -> Result<(), GuardError> {
        let flow_id = self.flow_id();
        let snapshot = self.snapshot();
        let entry = snapshot
            .entry(flow_id)
            .ok_or(GuardError::UnknownFlow(flow_id))?;

        match step {
            WizardStep::SelectDatasets => Ok(()),
            WizardStep::AnalyzeProperties => {
                if entry.flow.datasets.is_empty() {
                    return Err(GuardError::NoDatasets(flow_id));
                }
                Ok(())
            }
            WizardStep::ConfigureProperties => {
                if entry.types.is_none() {
                    return Err(GuardError::TypesNotLoaded(flow_id));
                }
                Ok(())
            }
            WizardStep::SetGoals => {
                if selectors::goal_targets(entry).is_empty() {
                    return Err(GuardError::NoGoalTargets(flow_id));
                }
                Ok(())
            }
            WizardStep::SetPriorities => {
                let targets = selectors::goal_targets(entry);
                if targets.is_empty() {
                    return Err(GuardError::NoGoalTargets(flow_id));
                }
                let missing = selectors::missing_optimization(entry);
                if !missing.is_empty() {
                    return Err(GuardError::MissingOptimization(missing));
                }
                for (name, role) in targets {
                    if let Some(goal) = entry.optimization.get(&name) {
                        validation::validate_goal(&name, entry.type_of(&name), Some(role), goal)
                            .map_err(GuardError::InvalidGoal)?;
                    }
                }
                Ok(())
            }
            WizardStep::TrainingProgress => {
                if entry.priorities.as_ref().is_none_or(Vec::is_empty) {
                    return Err(GuardError::NoPriorities(flow_id));
                }
                Ok(())
            }
            WizardStep::CheckPerformance => {
                require_stage(entry.flow.progress, TrainingStage::SurrogateTrainingDone)
            }
            WizardStep::OptimizationResults => {
                require_stage(entry.flow.progress, TrainingStage::OptimizationDone)
            }
        }
    }

    // ---- saving ----

    fn save(&self, step: WizardStep) -> AppResult<()> {
        let flow_id = self.flow_id();
        let snapshot = self.snapshot();
        let entry = snapshot
            .entry(flow_id)
            .ok_or(GuardError::UnknownFlow(flow_id))?;

        match step {
            WizardStep::ConfigureProperties => {
                let types: Vec<(String, PropertyType)> = entry
                    .types
                    .iter()
                    .flat_map(|p| p.iter())
                    .flat_map(|(ty, names)| names.iter().map(move |n| (n.clone(), ty)))
                    .collect();
                let roles: Vec<(String, Role)> = entry
                    .roles
                    .iter()
                    .flat_map(|p| p.iter())
                    .flat_map(|(role, names)| names.iter().map(move |n| (n.clone(), role)))
                    .collect();
                flow_service::save_property_types(&self.session, flow_id, &types)?;
                flow_service::save_property_categories(&self.session, flow_id, &roles)?;
                Ok(())
            }
            WizardStep::SetGoals => {
                let missing = selectors::missing_optimization(entry);
                if !missing.is_empty() {
                    return Err(GuardError::MissingOptimization(missing).into());
                }
                let goals: Vec<(String, OptimizationGoal)> = selectors::goal_targets(entry)
                    .into_iter()
                    .filter_map(|(name, _)| {
                        let goal = entry.optimization.get(&name)?.clone();
                        Some((name, goal))
                    })
                    .collect();
                flow_service::post_optimization_goals(&self.session, flow_id, &goals)
            }
            WizardStep::SetPriorities => {
                flow_service::initialize_priorities(&self.session, flow_id);
                let order = self
                    .session
                    .flows()
                    .select(|s| s.entry(flow_id).and_then(|e| e.priorities.clone()))
                    .unwrap_or_default();
                if order.is_empty() {
                    return Err(GuardError::NoPriorities(flow_id).into());
                }
                flow_service::post_optimization_order(&self.session, flow_id, &order)
            }
            WizardStep::SelectDatasets
            | WizardStep::AnalyzeProperties
            | WizardStep::TrainingProgress
            | WizardStep::CheckPerformance
            | WizardStep::OptimizationResults => Ok(()),
        }
    }
}

fn require_stage(actual: TrainingStage, required: TrainingStage) -> Result<(), GuardError> {
    if actual >= required {
        Ok(())
    } else {
        Err(GuardError::TrainingIncomplete { required, actual })
    }
}
