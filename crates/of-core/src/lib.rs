//! of-core: stable foundation for optiflow.
//!
//! Contains:
//! - ids (typed backend identifiers)
//! - property (data type and optimization role of a dataset column)
//! - goal (optimization objectives and their wire codes)
//! - stage (training pipeline stages reported by the backend)
//! - step (wizard steps and client routes)
//! - histogram (decoded bin-edge/count pairs)
//! - model (projects, datasets, flows)
//! - results (model-quality and recommendation artifacts)
//! - error (shared error types)

pub mod error;
pub mod goal;
pub mod histogram;
pub mod ids;
pub mod model;
pub mod property;
pub mod results;
pub mod stage;
pub mod step;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use goal::{Goal, GoalPatch, OptimizationGoal};
pub use histogram::{Histogram, MAX_DISPLAY_BINS};
pub use ids::*;
pub use model::{Dataset, Flow, FlowDataset, Project, RoleLists, TypeLists};
pub use property::{PropertyType, Role};
pub use results::{FeatureImportance, SearchResult, SurrogateCase, SurrogateMetric};
pub use stage::TrainingStage;
pub use step::{FlowRoute, WizardStep};
