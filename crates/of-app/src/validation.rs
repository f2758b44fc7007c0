//! Client-side checks on user-entered goal settings.
//!
//! Everything here runs before a request is built; a rejected edit never
//! reaches the store.

use of_core::{Goal, OptimizationGoal, PropertyType, Role};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{input}' is not a number")]
    NotANumber { input: String },

    #[error("{goal} is not allowed for {property} (only Fit to Property)")]
    GoalNotAllowed { property: String, goal: Goal },

    #[error("{property}: minimum {min} is greater than maximum {max}")]
    InvertedRange { property: String, min: f64, max: f64 },

    #[error("{property}: Fit to Range needs a {bound} value")]
    MissingBound {
        property: String,
        bound: &'static str,
    },

    #[error("{property} has no goal role")]
    NotAGoalTarget { property: String },
}

/// Parse a range bound typed by the user.
pub fn parse_bound(text: &str) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::NotANumber {
        input: text.to_string(),
    };
    let value: f64 = text.trim().parse().map_err(|_| invalid())?;
    if value.is_finite() { Ok(value) } else { Err(invalid()) }
}

pub fn validate_goal(
    property: &str,
    ty: Option<PropertyType>,
    role: Option<Role>,
    goal: &OptimizationGoal,
) -> Result<(), ValidationError> {
    let Some(role) = role.filter(|r| r.has_goal()) else {
        return Err(ValidationError::NotAGoalTarget {
            property: property.to_string(),
        });
    };
    if !goal.goal.allowed_for(ty, role) {
        return Err(ValidationError::GoalNotAllowed {
            property: property.to_string(),
            goal: goal.goal,
        });
    }
    if goal.goal == Goal::FitToRange {
        if goal.minimum_value.is_none() {
            return Err(ValidationError::MissingBound {
                property: property.to_string(),
                bound: "minimum",
            });
        }
        if goal.maximum_value.is_none() {
            return Err(ValidationError::MissingBound {
                property: property.to_string(),
                bound: "maximum",
            });
        }
    }
    if let (Some(min), Some(max)) = (goal.minimum_value, goal.maximum_value) {
        if min > max {
            return Err(ValidationError::InvertedRange {
                property: property.to_string(),
                min,
                max,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_must_be_finite_numbers() {
        assert_eq!(parse_bound(" 2.5 "), Ok(2.5));
        assert!(parse_bound("abc").is_err());
        assert!(parse_bound("inf").is_err());
        assert!(parse_bound("NaN").is_err());
        assert!(parse_bound("").is_err());
    }

    #[test]
    fn maximize_rejected_for_categorical() {
        let err = validate_goal(
            "grade",
            Some(PropertyType::Categorical),
            Some(Role::Controllable),
            &OptimizationGoal::with_goal(Goal::Maximize),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::GoalNotAllowed { .. }));
    }

    #[test]
    fn fit_to_range_needs_ordered_bounds() {
        let mut goal = OptimizationGoal::with_goal(Goal::FitToRange);
        goal.minimum_value = Some(4.0);
        let role = Some(Role::Controllable);
        let ty = Some(PropertyType::Numerical);
        assert!(matches!(
            validate_goal("temp", ty, role, &goal),
            Err(ValidationError::MissingBound { bound: "maximum", .. })
        ));
        goal.maximum_value = Some(1.0);
        assert!(matches!(
            validate_goal("temp", ty, role, &goal),
            Err(ValidationError::InvertedRange { .. })
        ));
        goal.maximum_value = Some(9.0);
        assert_eq!(validate_goal("temp", ty, role, &goal), Ok(()));
    }

    #[test]
    fn environmental_properties_carry_no_goal() {
        let goal = OptimizationGoal::with_goal(Goal::NoOptimization);
        assert!(matches!(
            validate_goal("humidity", None, Some(Role::Environmental), &goal),
            Err(ValidationError::NotAGoalTarget { .. })
        ));
    }
}
