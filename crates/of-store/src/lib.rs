//! of-store: client state for optiflow.
//!
//! Contains:
//! - container (snapshot store and the reducer trait)
//! - partition (disjoint property buckets)
//! - project_store (projects and their datasets)
//! - flow_store (per-flow wizard state)
//! - selectors (derived views)

pub mod container;
pub mod flow_store;
pub mod partition;
pub mod project_store;
pub mod selectors;

pub use container::{LoadStatus, Reducer, Store};
pub use flow_store::{FlowAction, FlowEntry, FlowState};
pub use partition::Partition;
pub use project_store::{ProjectAction, ProjectState};
