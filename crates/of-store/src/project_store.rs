//! Projects and the datasets uploaded to them.

use std::collections::BTreeMap;

use of_core::{CsvId, Dataset, Project, ProjectId};

use crate::container::{LoadStatus, Reducer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    pub projects: Vec<Project>,
    pub datasets: BTreeMap<ProjectId, Vec<Dataset>>,
    pub status: LoadStatus,
    /// Last failure. Later successes leave it in place; see `ClearError`.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ProjectAction {
    Loading,
    Failed(String),
    ClearError,
    ProjectsLoaded(Vec<Project>),
    ProjectAdded(Project),
    ProjectEdited {
        project_id: ProjectId,
        name: String,
        description: String,
    },
    ProjectDeleted(ProjectId),
    DatasetsLoaded {
        project_id: ProjectId,
        datasets: Vec<Dataset>,
    },
    DatasetUploaded(Dataset),
    DatasetDeleted {
        project_id: ProjectId,
        csv_id: CsvId,
    },
}

impl Reducer for ProjectState {
    type Action = ProjectAction;

    fn reduce(mut self, action: ProjectAction) -> Self {
        match action {
            ProjectAction::Loading => {
                self.status = LoadStatus::Loading;
                return self;
            }
            ProjectAction::Failed(message) => {
                self.status = LoadStatus::Failed;
                self.error = Some(message);
                return self;
            }
            ProjectAction::ClearError => {
                self.error = None;
                return self;
            }
            ProjectAction::ProjectsLoaded(projects) => self.projects = projects,
            ProjectAction::ProjectAdded(project) => self.projects.push(project),
            ProjectAction::ProjectEdited {
                project_id,
                name,
                description,
            } => {
                if let Some(project) = self.projects.iter_mut().find(|p| p.project_id == project_id) {
                    project.name = name;
                    project.description = description;
                }
            }
            ProjectAction::ProjectDeleted(project_id) => {
                self.projects.retain(|p| p.project_id != project_id);
                self.datasets.remove(&project_id);
            }
            ProjectAction::DatasetsLoaded {
                project_id,
                datasets,
            } => {
                self.datasets.insert(project_id, datasets);
            }
            ProjectAction::DatasetUploaded(dataset) => {
                self.datasets
                    .entry(dataset.project_id)
                    .or_default()
                    .push(dataset);
            }
            ProjectAction::DatasetDeleted { project_id, csv_id } => {
                if let Some(list) = self.datasets.get_mut(&project_id) {
                    list.retain(|d| d.csv_id != csv_id);
                }
            }
        }
        self.status = LoadStatus::Succeeded;
        self
    }
}
