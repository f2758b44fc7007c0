//! Typed endpoints.

use std::collections::BTreeMap;

use of_core::{
    CsvId, Dataset, FeatureImportance, Flow, FlowDataset, FlowId, Histogram, OptimizationGoal,
    Project, ProjectId, PropertyType, Role, SearchResult, SurrogateCase, SurrogateMetric,
    TrainingStage, TypeLists,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::request::{ApiRequest, UploadForm};
use crate::transport::Transport;
use crate::wire::{
    CreatedFlow, CreatedProject, CsvList, FeatureImportanceList, FlowCsvList, FlowList, GoalRecord,
    HistogramMap, ProgressRecord, ProjectList, PropertyLists, SearchResultList, SurrogateCaseList,
    SurrogateMetricList, UploadedCsv,
};
use crate::{ApiError, ApiResult};

pub struct ApiClient<T> {
    transport: T,
}

fn decode<D: DeserializeOwned>(target: &str, value: Value) -> ApiResult<D> {
    serde_json::from_value(value).map_err(|e| ApiError::Malformed {
        target: target.to_string(),
        what: e.to_string(),
    })
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn fetch<D: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<D> {
        let target = request.target();
        let value = self.transport.execute(&request)?;
        decode(&target, value)
    }

    fn send(&self, request: ApiRequest) -> ApiResult<()> {
        self.transport.execute(&request).map(|_| ())
    }

    // ---- projects ----

    pub fn list_projects(&self) -> ApiResult<Vec<Project>> {
        let list: ProjectList = self.fetch(ApiRequest::get("/projects/"))?;
        Ok(list
            .projects
            .into_iter()
            .map(|p| Project {
                project_id: p.id,
                name: p.name,
                description: p.description,
                created_at: p.created_at,
            })
            .collect())
    }

    pub fn create_project(&self, name: &str, description: &str) -> ApiResult<Project> {
        let created: CreatedProject = self.fetch(ApiRequest::post(
            "/projects/",
            json!({ "name": name, "description": description }),
        ))?;
        Ok(Project {
            project_id: created.project_id,
            name: name.to_string(),
            description: description.to_string(),
            created_at: created.created_at,
        })
    }

    pub fn update_project(&self, project_id: ProjectId, name: &str, description: &str) -> ApiResult<()> {
        self.send(ApiRequest::put(
            "/projects/",
            json!({ "project_id": project_id, "name": name, "description": description }),
        ))
    }

    pub fn delete_project(&self, project_id: ProjectId) -> ApiResult<()> {
        self.send(ApiRequest::delete("/projects/", json!({ "project_id": project_id })))
    }

    // ---- datasets ----

    pub fn list_datasets(&self, project_id: ProjectId) -> ApiResult<Vec<Dataset>> {
        let list: CsvList = self.fetch(ApiRequest::get("/csvs/").with_query("project_id", project_id))?;
        Ok(list
            .csvs
            .into_iter()
            .map(|c| Dataset {
                csv_id: c.id,
                project_id: c.project,
                file_name: c.file_name,
                rows: c.rows,
                size: c.size,
            })
            .collect())
    }

    pub fn upload_dataset(
        &self,
        project_id: ProjectId,
        file_name: &str,
        bytes: Vec<u8>,
        writer: &str,
    ) -> ApiResult<Dataset> {
        let size = bytes.len() as u64;
        let form = UploadForm {
            file_field: "csv_file".to_string(),
            file_name: file_name.to_string(),
            bytes,
            fields: vec![
                ("writer".to_string(), writer.to_string()),
                ("project_id".to_string(), project_id.to_string()),
            ],
        };
        let value = self.transport.upload("/csvs/", form)?;
        let uploaded: UploadedCsv = decode("/csvs/", value)?;
        Ok(Dataset {
            csv_id: uploaded.csv_id,
            project_id,
            file_name: uploaded.file_name.unwrap_or_else(|| file_name.to_string()),
            rows: uploaded.rows,
            size: uploaded.size.or(Some(size)),
        })
    }

    pub fn delete_dataset(&self, csv_id: CsvId) -> ApiResult<()> {
        self.send(ApiRequest::delete("/csvs/", json!({ "file_id": csv_id })))
    }

    // ---- flows ----

    pub fn list_flows(&self, project_id: ProjectId) -> ApiResult<Vec<Flow>> {
        let target = format!("/flows/?project_id={project_id}");
        let list: FlowList = self.fetch(ApiRequest::get("/flows/").with_query("project_id", project_id))?;
        list.flows
            .into_iter()
            .map(|f| {
                let mut flow = Flow::new(f.id, project_id, f.flow_name);
                if let Some(progress) = f.progress {
                    flow.progress = stage(&target, progress)?;
                }
                Ok(flow)
            })
            .collect()
    }

    pub fn create_flow(&self, project_id: ProjectId, name: &str) -> ApiResult<Flow> {
        let created: CreatedFlow = self.fetch(ApiRequest::post(
            "/flows/",
            json!({ "project_id": project_id, "flow_name": name }),
        ))?;
        Ok(Flow::new(created.flow_id, project_id, name))
    }

    pub fn rename_flow(&self, flow_id: FlowId, name: &str) -> ApiResult<()> {
        self.send(ApiRequest::put(
            "/flows/",
            json!({ "flow_id": flow_id, "flow_name": name }),
        ))
    }

    pub fn delete_flow(&self, flow_id: FlowId) -> ApiResult<()> {
        self.send(ApiRequest::delete("/flows/", json!({ "flow_id": flow_id })))
    }

    pub fn flow_datasets(&self, flow_id: FlowId) -> ApiResult<Vec<FlowDataset>> {
        let list: FlowCsvList =
            self.fetch(ApiRequest::get("/flows/csv-add/").with_query("flow_id", flow_id))?;
        Ok(list
            .csvs
            .into_iter()
            .map(|c| FlowDataset {
                csv_id: c.id,
                file_name: c
                    .csv_name
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }

    pub fn add_flow_datasets(&self, flow_id: FlowId, csv_ids: &[CsvId]) -> ApiResult<()> {
        self.send(ApiRequest::post(
            "/flows/csv-add/",
            json!({ "flow_id": flow_id, "csv_ids": csv_ids }),
        ))
    }

    pub fn flow_progress(&self, flow_id: FlowId) -> ApiResult<TrainingStage> {
        let request = ApiRequest::get("/flows/progress/").with_query("flow_id", flow_id);
        let target = request.target();
        let record: ProgressRecord = self.fetch(request)?;
        stage(&target, record.progress)
    }

    // ---- property classification ----

    pub fn flow_properties(&self, flow_id: FlowId) -> ApiResult<PropertyLists> {
        self.fetch(ApiRequest::get("/concat-columns/properties/").with_query("flow_id", flow_id))
    }

    pub fn property_types(&self, flow_id: FlowId) -> ApiResult<TypeLists> {
        let request = ApiRequest::get("/concat-columns/types/").with_query("flow_id", flow_id);
        let target = request.target();
        let lists: PropertyLists = self.fetch(request)?;
        lists.types().ok_or(ApiError::Malformed {
            target,
            what: "no property type lists".to_string(),
        })
    }

    pub fn save_property_role(&self, flow_id: FlowId, column: &str, role: Role) -> ApiResult<()> {
        self.send(ApiRequest::put(
            "/concat-columns/properties/",
            json!({ "flow_id": flow_id, "column_name": column, "property_type": role }),
        ))
    }

    pub fn save_property_type(&self, flow_id: FlowId, column: &str, ty: PropertyType) -> ApiResult<()> {
        self.send(ApiRequest::put(
            "/concat-columns/types/",
            json!({ "flow_id": flow_id, "column_name": column, "column_type": ty }),
        ))
    }

    // ---- histograms ----

    pub fn all_histograms(&self, flow_id: FlowId) -> ApiResult<BTreeMap<String, Histogram>> {
        let map: HistogramMap =
            self.fetch(ApiRequest::get("/histograms/all").with_query("flow_id", flow_id))?;
        Ok(map.histograms)
    }

    pub fn histogram(&self, flow_id: FlowId, column: &str) -> ApiResult<Histogram> {
        self.fetch(
            ApiRequest::get("/histograms/")
                .with_query("flow_id", flow_id)
                .with_query("column_name", column),
        )
    }

    // ---- optimization ----

    pub fn optimization_goal(&self, flow_id: FlowId, column: &str) -> ApiResult<GoalRecord> {
        self.fetch(
            ApiRequest::get("/optimization/goals/")
                .with_query("flow_id", flow_id)
                .with_query("column_name", column),
        )
    }

    pub fn save_optimization_goal(
        &self,
        flow_id: FlowId,
        column: &str,
        goal: &OptimizationGoal,
    ) -> ApiResult<()> {
        self.send(ApiRequest::post(
            "/optimization/goals/",
            json!({
                "flow_id": flow_id,
                "column_name": column,
                "optimize_goal": goal.goal.code(),
                "minimum_value": goal.minimum_value,
                "maximum_value": goal.maximum_value,
            }),
        ))
    }

    pub fn save_optimization_order(&self, flow_id: FlowId, column: &str, order: u32) -> ApiResult<()> {
        self.send(ApiRequest::post(
            "/optimization/orders/",
            json!({ "flow_id": flow_id, "column_name": column, "optimize_order": order }),
        ))
    }

    pub fn start_processing(&self, flow_id: FlowId) -> ApiResult<()> {
        self.send(ApiRequest::post("/processing/", json!({ "flow_id": flow_id })))
    }

    // ---- results ----

    pub fn feature_importance(&self, flow_id: FlowId) -> ApiResult<Vec<FeatureImportance>> {
        let list: FeatureImportanceList = self.fetch(
            ApiRequest::get("/surrogate/feature-importance/").with_query("flow_id", flow_id),
        )?;
        Ok(list.surrogate_feature_importance)
    }

    pub fn surrogate_metrics(&self, flow_id: FlowId) -> ApiResult<Vec<SurrogateMetric>> {
        let list: SurrogateMetricList =
            self.fetch(ApiRequest::get("/surrogate/matric/").with_query("flow_id", flow_id))?;
        Ok(list.surrogate_matric)
    }

    pub fn surrogate_cases(&self, flow_id: FlowId) -> ApiResult<Vec<SurrogateCase>> {
        let list: SurrogateCaseList =
            self.fetch(ApiRequest::get("/surrogate/result/").with_query("flow_id", flow_id))?;
        Ok(list.surrogate_result)
    }

    pub fn search_result(&self, flow_id: FlowId) -> ApiResult<Vec<SearchResult>> {
        let list: SearchResultList =
            self.fetch(ApiRequest::get("/search/result/").with_query("flow_id", flow_id))?;
        Ok(list.search_result)
    }
}

fn stage(target: &str, progress: i64) -> ApiResult<TrainingStage> {
    TrainingStage::from_progress(progress).map_err(|e| ApiError::Malformed {
        target: target.to_string(),
        what: e.to_string(),
    })
}
