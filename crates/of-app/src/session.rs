//! Shared handles for one connection to the backend.

use std::sync::Arc;

use of_api::{ApiClient, ApiResult, HttpTransport, Transport};
use of_store::{FlowAction, FlowState, ProjectAction, ProjectState, Store};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// API client plus both stores. Cloning is cheap; clones share state, which
/// is how worker threads (the progress poller, batch requests) report back.
pub struct Session<T> {
    api: Arc<ApiClient<T>>,
    projects: Arc<Store<ProjectState>>,
    flows: Arc<Store<FlowState>>,
    config: Arc<AppConfig>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            projects: Arc::clone(&self.projects),
            flows: Arc::clone(&self.flows),
            config: Arc::clone(&self.config),
        }
    }
}

impl Session<HttpTransport> {
    pub fn connect(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.api_base_url, config.request_timeout())?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Session<T> {
    pub fn new(config: AppConfig, transport: T) -> Self {
        Self {
            api: Arc::new(ApiClient::new(transport)),
            projects: Arc::new(Store::new("projects", ProjectState::default())),
            flows: Arc::new(Store::new("flows", FlowState::default())),
            config: Arc::new(config),
        }
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn projects(&self) -> &Store<ProjectState> {
        &self.projects
    }

    pub fn flows(&self) -> &Store<FlowState> {
        &self.flows
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one project request: `Loading` first, `Failed` on error.
    pub(crate) fn project_request<R>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&ApiClient<T>) -> ApiResult<R>,
    ) -> AppResult<R> {
        self.projects.dispatch(ProjectAction::Loading);
        match op(&self.api) {
            Ok(value) => {
                debug!(operation, "request succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "request failed");
                self.projects.dispatch(ProjectAction::Failed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Flow counterpart of [`Session::project_request`].
    pub(crate) fn flow_request<R>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&ApiClient<T>) -> ApiResult<R>,
    ) -> AppResult<R> {
        self.flows.dispatch(FlowAction::Loading);
        match op(&self.api) {
            Ok(value) => {
                debug!(operation, "request succeeded");
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "request failed");
                self.flows.dispatch(FlowAction::Failed(err.to_string()));
                Err(err.into())
            }
        }
    }
}
