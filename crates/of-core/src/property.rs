//! Classification axes for dataset columns ("properties").
//!
//! A property carries at most one [`PropertyType`] (server-assigned, user
//! adjustable) and at most one [`Role`] (user-assigned). Properties without a
//! role sit in the dataset-properties pool.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Numerical,
    Categorical,
    Text,
    Unavailable,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::Numerical,
        PropertyType::Categorical,
        PropertyType::Text,
        PropertyType::Unavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::Numerical => "numerical",
            PropertyType::Categorical => "categorical",
            PropertyType::Text => "text",
            PropertyType::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Unknown {
                what: "property type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Environmental,
    Controllable,
    Output,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Environmental, Role::Controllable, Role::Output];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Environmental => "environmental",
            Role::Controllable => "controllable",
            Role::Output => "output",
        }
    }

    /// Only controllable and output properties carry an optimization goal.
    pub fn has_goal(self) -> bool {
        matches!(self, Role::Controllable | Role::Output)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Unknown {
                what: "role",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Categorical".parse::<PropertyType>(), Ok(PropertyType::Categorical));
        assert_eq!(" output ".parse::<Role>(), Ok(Role::Output));
        assert!("target".parse::<Role>().is_err());
    }

    #[test]
    fn environmental_has_no_goal() {
        assert!(!Role::Environmental.has_goal());
        assert!(Role::Controllable.has_goal());
        assert!(Role::Output.has_goal());
    }
}
