//! Client-side entities, normalized from the backend's wire shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CsvId, FlowId, ProjectId};
use crate::property::{PropertyType, Role};
use crate::stage::TrainingStage;
use crate::step::WizardStep;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// An uploaded CSV. Belongs to exactly one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub csv_id: CsvId,
    pub project_id: ProjectId,
    pub file_name: String,
    pub rows: Option<u64>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDataset {
    pub csv_id: CsvId,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub flow_id: FlowId,
    pub project_id: ProjectId,
    pub name: String,
    pub current_step: Option<WizardStep>,
    pub progress: TrainingStage,
    /// Referenced datasets, in the order they were attached.
    pub datasets: Vec<CsvId>,
    pub dataset_names: BTreeMap<CsvId, String>,
}

impl Flow {
    pub fn new(flow_id: FlowId, project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            flow_id,
            project_id,
            name: name.into(),
            current_step: None,
            progress: TrainingStage::NotStarted,
            datasets: Vec::new(),
            dataset_names: BTreeMap::new(),
        }
    }
}

/// Property names grouped by data type, as listed by the backend.
pub type TypeLists = BTreeMap<PropertyType, Vec<String>>;

/// Property names grouped by role, as listed by the backend.
pub type RoleLists = BTreeMap<Role, Vec<String>>;
