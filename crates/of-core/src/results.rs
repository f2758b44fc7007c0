//! Model-quality and recommendation artifacts produced by training.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub column_name: String,
    pub importance: f64,
}

impl FeatureImportance {
    /// Highest importance first.
    pub fn ranked(items: &[FeatureImportance]) -> Vec<FeatureImportance> {
        let mut sorted = items.to_vec();
        sorted.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        sorted
    }
}

/// Fit quality of the surrogate model for one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateMetric {
    pub column_name: String,
    pub r_squared: f64,
    pub rmse: f64,
}

/// One held-out prediction, ranked by error (rank 1 is the closest fit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateCase {
    pub column_name: String,
    pub ground_truth: f64,
    pub predicted: f64,
    pub rank: i64,
}

impl SurrogateCase {
    pub fn best_cases(cases: &[SurrogateCase], n: usize) -> Vec<SurrogateCase> {
        let mut sorted = cases.to_vec();
        sorted.sort_by_key(|c| c.rank);
        sorted.truncate(n);
        sorted
    }

    pub fn worst_cases(cases: &[SurrogateCase], n: usize) -> Vec<SurrogateCase> {
        let mut sorted = cases.to_vec();
        sorted.sort_by_key(|c| c.rank);
        let skip = sorted.len().saturating_sub(n);
        sorted.split_off(skip)
    }
}

/// Final recommendation for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub column_name: String,
    pub ground_truth: Vec<f64>,
    pub predicted: Vec<f64>,
    #[serde(default)]
    pub average_change_rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(rank: i64) -> SurrogateCase {
        SurrogateCase {
            column_name: "yield".to_string(),
            ground_truth: 1.0,
            predicted: 1.0 + rank as f64 / 10.0,
            rank,
        }
    }

    #[test]
    fn best_and_worst_by_rank() {
        let cases: Vec<_> = [4, 1, 6, 2, 5, 3, 7].into_iter().map(case).collect();
        let best: Vec<i64> = SurrogateCase::best_cases(&cases, 3).iter().map(|c| c.rank).collect();
        let worst: Vec<i64> = SurrogateCase::worst_cases(&cases, 3).iter().map(|c| c.rank).collect();
        assert_eq!(best, vec![1, 2, 3]);
        assert_eq!(worst, vec![5, 6, 7]);
        assert_eq!(SurrogateCase::worst_cases(&cases[..2], 5).len(), 2);
    }

    #[test]
    fn importance_sorted_descending() {
        let items = vec![
            FeatureImportance { column_name: "a".into(), importance: 0.1 },
            FeatureImportance { column_name: "b".into(), importance: 0.7 },
            FeatureImportance { column_name: "c".into(), importance: 0.2 },
        ];
        let names: Vec<_> = FeatureImportance::ranked(&items)
            .into_iter()
            .map(|i| i.column_name)
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }
}
