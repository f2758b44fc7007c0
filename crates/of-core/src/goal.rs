//! Optimization goals and their numeric wire codes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::property::{PropertyType, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "No Optimization")]
    NoOptimization,
    Maximize,
    Minimize,
    #[serde(rename = "Fit to Range")]
    FitToRange,
    #[serde(rename = "Fit to Property")]
    FitToProperty,
}

impl Goal {
    pub const ALL: [Goal; 5] = [
        Goal::NoOptimization,
        Goal::Maximize,
        Goal::Minimize,
        Goal::FitToRange,
        Goal::FitToProperty,
    ];

    /// `optimize_goal` code used by the backend.
    pub fn code(self) -> u8 {
        match self {
            Goal::NoOptimization => 1,
            Goal::Maximize => 2,
            Goal::Minimize => 3,
            Goal::FitToRange => 4,
            Goal::FitToProperty => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Goal> {
        Goal::ALL.into_iter().find(|g| i64::from(g.code()) == code)
    }

    /// Decode a server code, falling back to the role default when the code
    /// is missing or outside 1-5.
    pub fn from_code_or_default(code: Option<i64>, role: Role) -> Goal {
        code.and_then(Goal::from_code)
            .unwrap_or_else(|| Goal::default_for(role))
    }

    pub fn default_for(role: Role) -> Goal {
        match role {
            Role::Output => Goal::FitToProperty,
            Role::Controllable | Role::Environmental => Goal::NoOptimization,
        }
    }

    /// Categorical columns and outputs can only be fitted to a property.
    pub fn allowed_for(self, ty: Option<PropertyType>, role: Role) -> bool {
        if ty == Some(PropertyType::Categorical) || role == Role::Output {
            self == Goal::FitToProperty
        } else {
            true
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Goal::NoOptimization => "No Optimization",
            Goal::Maximize => "Maximize",
            Goal::Minimize => "Minimize",
            Goal::FitToRange => "Fit to Range",
            Goal::FitToProperty => "Fit to Property",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Goal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        Goal::ALL
            .into_iter()
            .find(|g| {
                let label: String = g.label().chars().filter(|c| *c != ' ').collect();
                label.eq_ignore_ascii_case(&wanted)
            })
            .ok_or_else(|| CoreError::Unknown {
                what: "goal",
                value: s.to_string(),
            })
    }
}

/// Per-property optimization configuration held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationGoal {
    pub goal: Goal,
    pub minimum_value: Option<f64>,
    pub maximum_value: Option<f64>,
    /// 1-based priority persisted as `optimize_order`.
    pub order: Option<u32>,
}

impl OptimizationGoal {
    pub fn with_goal(goal: Goal) -> Self {
        Self {
            goal,
            minimum_value: None,
            maximum_value: None,
            order: None,
        }
    }

    /// Shallow merge: fields present in the patch win.
    pub fn apply(&mut self, patch: &GoalPatch) {
        if let Some(goal) = patch.goal {
            self.goal = goal;
        }
        if let Some(min) = patch.minimum_value {
            self.minimum_value = Some(min);
        }
        if let Some(max) = patch.maximum_value {
            self.maximum_value = Some(max);
        }
        if let Some(order) = patch.order {
            self.order = Some(order);
        }
    }
}

/// Partial update for [`OptimizationGoal`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub goal: Option<Goal>,
    pub minimum_value: Option<f64>,
    pub maximum_value: Option<f64>,
    pub order: Option<u32>,
}

impl GoalPatch {
    pub fn goal(goal: Goal) -> Self {
        Self {
            goal: Some(goal),
            ..Self::default()
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self {
            minimum_value: Some(min),
            maximum_value: Some(max),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_exactly() {
        assert_eq!(Goal::from_code(1), Some(Goal::NoOptimization));
        assert_eq!(Goal::from_code(2), Some(Goal::Maximize));
        assert_eq!(Goal::from_code(3), Some(Goal::Minimize));
        assert_eq!(Goal::from_code(4), Some(Goal::FitToRange));
        assert_eq!(Goal::from_code(5), Some(Goal::FitToProperty));
        for goal in Goal::ALL {
            assert_eq!(Goal::from_code(i64::from(goal.code())), Some(goal));
        }
    }

    #[test]
    fn unmapped_code_falls_back_to_role_default() {
        assert_eq!(Goal::from_code_or_default(Some(0), Role::Output), Goal::FitToProperty);
        assert_eq!(Goal::from_code_or_default(Some(9), Role::Controllable), Goal::NoOptimization);
        assert_eq!(Goal::from_code_or_default(None, Role::Output), Goal::FitToProperty);
    }

    #[test]
    fn legality_rule() {
        assert!(!Goal::Maximize.allowed_for(Some(PropertyType::Categorical), Role::Controllable));
        assert!(!Goal::Minimize.allowed_for(Some(PropertyType::Numerical), Role::Output));
        assert!(Goal::FitToProperty.allowed_for(Some(PropertyType::Categorical), Role::Output));
        assert!(Goal::FitToRange.allowed_for(Some(PropertyType::Numerical), Role::Controllable));
    }

    #[test]
    fn parses_labels_loosely() {
        assert_eq!("Fit to Range".parse::<Goal>(), Ok(Goal::FitToRange));
        assert_eq!("fit-to-property".parse::<Goal>(), Ok(Goal::FitToProperty));
        assert_eq!("no_optimization".parse::<Goal>(), Ok(Goal::NoOptimization));
        assert!("maximise".parse::<Goal>().is_err());
    }

    #[test]
    fn patch_is_shallow() {
        let mut data = OptimizationGoal {
            goal: Goal::Maximize,
            minimum_value: Some(1.0),
            maximum_value: Some(5.0),
            order: Some(2),
        };
        data.apply(&GoalPatch {
            maximum_value: Some(8.0),
            ..GoalPatch::default()
        });
        assert_eq!(data.goal, Goal::Maximize);
        assert_eq!(data.minimum_value, Some(1.0));
        assert_eq!(data.maximum_value, Some(8.0));
        assert_eq!(data.order, Some(2));
    }
}
