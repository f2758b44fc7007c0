use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Backend training pipeline stage, reported as an integer `progress` 0-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum TrainingStage {
    #[default]
    NotStarted,
    PreprocessingStart,
    PreprocessingDone,
    SurrogateTrainingStart,
    SurrogateTrainingDone,
    OptimizationStart,
    OptimizationDone,
}

impl TrainingStage {
    pub const ALL: [TrainingStage; 7] = [
        TrainingStage::NotStarted,
        TrainingStage::PreprocessingStart,
        TrainingStage::PreprocessingDone,
        TrainingStage::SurrogateTrainingStart,
        TrainingStage::SurrogateTrainingDone,
        TrainingStage::OptimizationStart,
        TrainingStage::OptimizationDone,
    ];

    pub fn from_progress(progress: i64) -> CoreResult<Self> {
        usize::try_from(progress)
            .ok()
            .and_then(|i| TrainingStage::ALL.get(i).copied())
            .ok_or(CoreError::ProgressOutOfRange { value: progress })
    }

    pub fn progress(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        self == TrainingStage::OptimizationDone
    }

    pub fn label(self) -> &'static str {
        match self {
            TrainingStage::NotStarted => "Not Started",
            TrainingStage::PreprocessingStart => "Preprocessing Start",
            TrainingStage::PreprocessingDone => "Preprocessing Done",
            TrainingStage::SurrogateTrainingStart => "Surrogate Training Start",
            TrainingStage::SurrogateTrainingDone => "Surrogate Training Done",
            TrainingStage::OptimizationStart => "Optimization Start",
            TrainingStage::OptimizationDone => "Optimization Done",
        }
    }
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/6 {}", self.progress(), self.label())
    }
}

impl TryFrom<i64> for TrainingStage {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        TrainingStage::from_progress(value)
    }
}

impl From<TrainingStage> for u8 {
    fn from(stage: TrainingStage) -> Self {
        stage.progress()
    }
}
