//! Precomputed property distributions.
//!
//! The backend stores `bin_edges` and `counts` as JSON documents and ships
//! them as JSON-encoded strings (`"[0.0, 1.5, 3.0]"`). Both the encoded and
//! the plain-array form are accepted when decoding.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Charts show at most this many bins.
pub const MAX_DISPLAY_BINS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    #[serde(deserialize_with = "encoded_series")]
    pub bin_edges: Vec<f64>,
    #[serde(deserialize_with = "encoded_series")]
    pub counts: Vec<f64>,
}

impl Histogram {
    pub fn from_encoded(bin_edges: &str, counts: &str) -> CoreResult<Self> {
        Ok(Self {
            bin_edges: parse_series("bin_edges", bin_edges)?,
            counts: parse_series("counts", counts)?,
        })
    }

    /// First and last bin edge, used to seed a goal's default range.
    pub fn range(&self) -> Option<(f64, f64)> {
        if self.bin_edges.len() < 2 {
            return None;
        }
        let first = *self.bin_edges.first()?;
        let last = *self.bin_edges.last()?;
        Some((first, last))
    }

    /// Midpoint of every adjacent edge pair.
    pub fn bin_centers(&self) -> Vec<f64> {
        self.bin_edges
            .windows(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Copy limited to `max_bins` bins (and the `max_bins + 1` edges around
    /// them); the second value tells whether anything was cut off.
    pub fn truncated(&self, max_bins: usize) -> (Histogram, bool) {
        if self.counts.len() <= max_bins {
            return (self.clone(), false);
        }
        let counts = self.counts[..max_bins].to_vec();
        let bin_edges = self.bin_edges.iter().take(max_bins + 1).copied().collect();
        (Histogram { bin_edges, counts }, true)
    }
}

fn parse_series(what: &'static str, raw: &str) -> CoreResult<Vec<f64>> {
    serde_json::from_str(raw).map_err(|e| CoreError::Histogram {
        what,
        reason: e.to_string(),
    })
}

fn encoded_series<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Series {
        Encoded(String),
        Plain(Vec<f64>),
    }

    match Series::deserialize(deserializer)? {
        Series::Plain(values) => Ok(values),
        Series::Encoded(raw) => serde_json::from_str(&raw).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_encoded_strings() {
        let json = r#"{"bin_edges": "[0.0, 1.0, 2.0]", "counts": "[3, 4]"}"#;
        let hist: Histogram = serde_json::from_str(json).unwrap();
        assert_eq!(hist.bin_edges, vec![0.0, 1.0, 2.0]);
        assert_eq!(hist.counts, vec![3.0, 4.0]);
        assert_eq!(hist.range(), Some((0.0, 2.0)));
        assert_eq!(hist.bin_centers(), vec![0.5, 1.5]);
        assert_eq!(hist.total(), 7.0);
    }

    #[test]
    fn accepts_plain_arrays() {
        let json = r#"{"bin_edges": [1, 2], "counts": [5]}"#;
        let hist: Histogram = serde_json::from_str(json).unwrap();
        assert_eq!(hist.range(), Some((1.0, 2.0)));
    }

    #[test]
    fn rejects_garbage() {
        let json = r#"{"bin_edges": "[1, 2", "counts": "[5]"}"#;
        assert!(serde_json::from_str::<Histogram>(json).is_err());
        assert!(Histogram::from_encoded("nope", "[]").is_err());
    }

    #[test]
    fn truncates_to_display_limit() {
        let hist = Histogram {
            bin_edges: (0..=30).map(f64::from).collect(),
            counts: vec![1.0; 30],
        };
        let (short, cut) = hist.truncated(MAX_DISPLAY_BINS);
        assert!(cut);
        assert_eq!(short.counts.len(), MAX_DISPLAY_BINS);
        assert_eq!(short.bin_edges.len(), MAX_DISPLAY_BINS + 1);
        assert_eq!(short.bin_centers().len(), short.counts.len());
        assert_eq!(short.range(), Some((0.0, 20.0)));

        let (same, cut) = short.truncated(MAX_DISPLAY_BINS);
        assert!(!cut);
        assert_eq!(same, short);
    }

    #[test]
    fn single_edge_has_no_range() {
        let hist = Histogram::from_encoded("[4.0]", "[]").unwrap();
        assert_eq!(hist.range(), None);
        assert!(hist.bin_centers().is_empty());
    }
}
