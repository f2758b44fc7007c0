//! Wizard steps and the client routes that address them.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{FlowId, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    SelectDatasets,
    AnalyzeProperties,
    ConfigureProperties,
    SetGoals,
    SetPriorities,
    TrainingProgress,
    CheckPerformance,
    OptimizationResults,
}

impl WizardStep {
    pub const ALL: [WizardStep; 8] = [
        WizardStep::SelectDatasets,
        WizardStep::AnalyzeProperties,
        WizardStep::ConfigureProperties,
        WizardStep::SetGoals,
        WizardStep::SetPriorities,
        WizardStep::TrainingProgress,
        WizardStep::CheckPerformance,
        WizardStep::OptimizationResults,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            WizardStep::SelectDatasets => "select-datasets",
            WizardStep::AnalyzeProperties => "analyze-properties",
            WizardStep::ConfigureProperties => "configure-properties",
            WizardStep::SetGoals => "set-goals",
            WizardStep::SetPriorities => "set-priorities",
            WizardStep::TrainingProgress => "training-progress",
            WizardStep::CheckPerformance => "check-performance",
            WizardStep::OptimizationResults => "optimization-results",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::SelectDatasets => "Select Datasets",
            WizardStep::AnalyzeProperties => "Analyze Properties",
            WizardStep::ConfigureProperties => "Configure Properties",
            WizardStep::SetGoals => "Set Goals",
            WizardStep::SetPriorities => "Set Priorities",
            WizardStep::TrainingProgress => "Model Training Progress",
            WizardStep::CheckPerformance => "Check Performance",
            WizardStep::OptimizationResults => "Optimization Results",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<WizardStep> {
        WizardStep::ALL.get(self.index() + 1).copied()
    }

    pub fn prev(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| WizardStep::ALL[i])
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for WizardStep {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WizardStep::ALL
            .into_iter()
            .find(|step| step.slug() == s.trim())
            .ok_or_else(|| CoreError::Unknown {
                what: "wizard step",
                value: s.to_string(),
            })
    }
}

/// `/projects/:projectId/flows/:flowId/<step-slug>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowRoute {
    pub project_id: ProjectId,
    pub flow_id: FlowId,
    pub step: WizardStep,
}

impl FlowRoute {
    pub fn new(project_id: ProjectId, flow_id: FlowId, step: WizardStep) -> Self {
        Self {
            project_id,
            flow_id,
            step,
        }
    }

    pub fn with_step(self, step: WizardStep) -> Self {
        Self { step, ..self }
    }
}

impl fmt::Display for FlowRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/projects/{}/flows/{}/{}",
            self.project_id,
            self.flow_id,
            self.step.slug()
        )
    }
}

impl FromStr for FlowRoute {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidRoute {
            route: s.to_string(),
        };
        let segments: Vec<&str> = s.trim().trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["projects", project, "flows", flow, step] => Ok(FlowRoute {
                project_id: project.parse().map_err(|_| invalid())?,
                flow_id: flow.parse().map_err(|_| invalid())?,
                step: step.parse().map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}
