use polars::prelude::*;

use crate::error::{DashboardError, Result};

/// Maps numeric values onto an ordered set of labelled intervals.
///
/// Interval `i` is `(boundaries[i], boundaries[i + 1]]`. The first interval
/// also takes its lower bound and anything below it, and the last one takes
/// anything above its upper bound, so every non-NaN value gets a label.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucketer {
    boundaries: Vec<f64>,
    labels: Vec<String>,
}

impl Bucketer {
    pub fn new<S: Into<String>>(
        name: &str,
        boundaries: Vec<f64>,
        labels: Vec<S>,
    ) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let invalid = |reason: String| DashboardError::Bucket {
            table: name.to_string(),
            reason,
        };
        if labels.is_empty() {
            return Err(invalid("no labels".to_string()));
        }
        if boundaries.len() != labels.len() + 1 {
            return Err(invalid(format!(
                "{} boundaries for {} labels",
                boundaries.len(),
                labels.len()
            )));
        }
        if let Some(pair) = boundaries.windows(2).find(|pair| !(pair[0] < pair[1])) {
            return Err(invalid(format!(
                "boundaries not increasing at {} -> {}",
                pair[0], pair[1]
            )));
        }
        Ok(Bucketer { boundaries, labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label_for(&self, value: f64) -> Option<&str> {
        if value.is_nan() {
            return None;
        }
        let index = self.boundaries[1..]
            .iter()
            .position(|&upper| value <= upper)
            .unwrap_or(self.labels.len() - 1);
        Some(self.labels[index].as_str())
    }

    /// Buckets a whole column. Nulls and NaNs come out as nulls.
    pub fn bucket_series(&self, series: &Series) -> PolarsResult<Series> {
        let values = series.cast(&DataType::Float64)?;
        let labels: Vec<Option<&str>> = values
            .f64()?
            .into_iter()
            .map(|value| value.and_then(|v| self.label_for(v)))
            .collect();
        Ok(Series::new(series.name(), labels))
    }
}
