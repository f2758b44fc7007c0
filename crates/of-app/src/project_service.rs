//! Project and dataset operations.
//!
//! Each operation performs its request, then updates the project store on
//! success. Failures are recorded in the store's `error` field and returned.

use std::path::Path;

use of_api::Transport;
use of_core::{CsvId, Dataset, Project, ProjectId};
use of_store::ProjectAction;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::session::Session;

pub fn fetch_projects<T: Transport>(session: &Session<T>) -> AppResult<Vec<Project>> {
    let projects = session.project_request("fetch_projects", |api| api.list_projects())?;
    session
        .projects()
        .dispatch(ProjectAction::ProjectsLoaded(projects.clone()));
    Ok(projects)
}

pub fn add_project<T: Transport>(
    session: &Session<T>,
    name: &str,
    description: &str,
) -> AppResult<Project> {
    let project = session.project_request("add_project", |api| api.create_project(name, description))?;
    info!(project_id = %project.project_id, name, "project created");
    session
        .projects()
        .dispatch(ProjectAction::ProjectAdded(project.clone()));
    Ok(project)
}

pub fn edit_project<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
    name: &str,
    description: &str,
) -> AppResult<()> {
    session.project_request("edit_project", |api| {
        api.update_project(project_id, name, description)
    })?;
    session.projects().dispatch(ProjectAction::ProjectEdited {
        project_id,
        name: name.to_string(),
        description: description.to_string(),
    });
    Ok(())
}

pub fn delete_project<T: Transport>(session: &Session<T>, project_id: ProjectId) -> AppResult<()> {
    session.project_request("delete_project", |api| api.delete_project(project_id))?;
    info!(%project_id, "project deleted");
    session
        .projects()
        .dispatch(ProjectAction::ProjectDeleted(project_id));
    Ok(())
}

pub fn fetch_csv_files_by_project<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
) -> AppResult<Vec<Dataset>> {
    let datasets = session.project_request("fetch_csv_files_by_project", |api| {
        api.list_datasets(project_id)
    })?;
    session.projects().dispatch(ProjectAction::DatasetsLoaded {
        project_id,
        datasets: datasets.clone(),
    });
    Ok(datasets)
}

pub fn upload_csv_file<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
    file_name: &str,
    bytes: Vec<u8>,
) -> AppResult<Dataset> {
    let writer = session.config().writer.clone();
    let dataset = session.project_request("upload_csv_file", |api| {
        api.upload_dataset(project_id, file_name, bytes, &writer)
    })?;
    info!(%project_id, csv_id = %dataset.csv_id, file_name, "dataset uploaded");
    session
        .projects()
        .dispatch(ProjectAction::DatasetUploaded(dataset.clone()));
    Ok(dataset)
}

/// Read `path` and upload it under its file name.
pub fn upload_csv_path<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
    path: &Path,
) -> AppResult<Dataset> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::InvalidInput(format!("not a file path: {}", path.display())))?;
    upload_csv_file(session, project_id, file_name, bytes)
}

pub fn delete_csv_file<T: Transport>(
    session: &Session<T>,
    project_id: ProjectId,
    csv_id: CsvId,
) -> AppResult<()> {
    session.project_request("delete_csv_file", |api| api.delete_dataset(csv_id))?;
    session
        .projects()
        .dispatch(ProjectAction::DatasetDeleted { project_id, csv_id });
    Ok(())
}

pub fn clear_error<T: Transport>(session: &Session<T>) {
    session.projects().dispatch(ProjectAction::ClearError);
}
