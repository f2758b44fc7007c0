//! Response shapes as the backend sends them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use of_core::{
    CsvId, FeatureImportance, FlowId, Histogram, ProjectId, PropertyType, Role, RoleLists,
    SearchResult, SurrogateCase, SurrogateMetric, TypeLists,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedProject {
    pub project_id: ProjectId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CsvList {
    pub csvs: Vec<CsvRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CsvRecord {
    pub id: CsvId,
    pub project: ProjectId,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UploadedCsv {
    pub csv_id: CsvId,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FlowList {
    pub flows: Vec<FlowRecord>,
}

#[derive(Debug, Deserialize)]
pub struct FlowRecord {
    pub id: FlowId,
    #[serde(default)]
    pub flow_name: String,
    #[serde(default)]
    pub progress: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedFlow {
    pub flow_id: FlowId,
}

#[derive(Debug, Deserialize)]
pub struct FlowCsvList {
    pub csvs: Vec<FlowCsvRecord>,
}

#[derive(Debug, Deserialize)]
pub struct FlowCsvRecord {
    pub id: CsvId,
    /// Not always a string on older servers; non-strings are shown as "Unknown".
    #[serde(default)]
    pub csv_name: Value,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRecord {
    pub progress: i64,
}

/// `/concat-columns/properties/` and `/concat-columns/types/` payloads.
///
/// Role lists are always present on the properties endpoint; type lists may
/// accompany them.
#[derive(Debug, Default, Deserialize)]
pub struct PropertyLists {
    pub environmental: Option<Vec<String>>,
    pub controllable: Option<Vec<String>>,
    pub output: Option<Vec<String>>,
    pub numerical: Option<Vec<String>>,
    pub categorical: Option<Vec<String>>,
    pub text: Option<Vec<String>>,
    pub unavailable: Option<Vec<String>>,
}

impl PropertyLists {
    pub fn roles(&self) -> RoleLists {
        Role::ALL
            .into_iter()
            .map(|role| (role, self.role_list(role).cloned().unwrap_or_default()))
            .collect()
    }

    /// `None` when the payload carried no type list at all.
    pub fn types(&self) -> Option<TypeLists> {
        let lists: TypeLists = PropertyType::ALL
            .into_iter()
            .filter_map(|ty| self.type_list(ty).map(|names| (ty, names.clone())))
            .collect();
        if lists.is_empty() { None } else { Some(lists) }
    }

    fn role_list(&self, role: Role) -> Option<&Vec<String>> {
        match role {
            Role::Environmental => self.environmental.as_ref(),
            Role::Controllable => self.controllable.as_ref(),
            Role::Output => self.output.as_ref(),
        }
    }

    fn type_list(&self, ty: PropertyType) -> Option<&Vec<String>> {
        match ty {
            PropertyType::Numerical => self.numerical.as_ref(),
            PropertyType::Categorical => self.categorical.as_ref(),
            PropertyType::Text => self.text.as_ref(),
            PropertyType::Unavailable => self.unavailable.as_ref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistogramMap {
    pub histograms: BTreeMap<String, Histogram>,
}

/// Persisted optimization config of one column. Codes are decoded by the
/// caller, which knows the column's role.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GoalRecord {
    #[serde(default)]
    pub optimize_goal: Option<i64>,
    #[serde(default)]
    pub minimum_value: Option<f64>,
    #[serde(default)]
    pub maximum_value: Option<f64>,
    #[serde(default)]
    pub optimize_order: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureImportanceList {
    pub surrogate_feature_importance: Vec<FeatureImportance>,
}

#[derive(Debug, Deserialize)]
pub struct SurrogateMetricList {
    pub surrogate_matric: Vec<SurrogateMetric>,
}

#[derive(Debug, Deserialize)]
pub struct SurrogateCaseList {
    pub surrogate_result: Vec<SurrogateCase>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResultList {
    pub search_result: Vec<SearchResult>,
}
