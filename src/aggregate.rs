use std::cmp::Ordering;
use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::loader::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Count,
    /// Counts per key, most frequent first.
    Distribution,
}

/// A key a fixed-order table must contain, and the label it is shown under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedKey {
    pub key: String,
    pub label: String,
}

impl FixedKey {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        FixedKey {
            label: key.clone(),
            key,
        }
    }

    pub fn labelled(key: impl Into<String>, label: impl Into<String>) -> Self {
        FixedKey {
            key: key.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    Natural,
    Fixed(Vec<FixedKey>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by: Option<String>,
    pub value: Option<String>,
    pub reduction: Reduction,
    pub order: KeyOrder,
}

impl AggregationSpec {
    pub fn count() -> Self {
        AggregationSpec {
            group_by: None,
            value: None,
            reduction: Reduction::Count,
            order: KeyOrder::Natural,
        }
    }

    pub fn sum(value: &str) -> Self {
        AggregationSpec {
            value: Some(value.to_string()),
            reduction: Reduction::Sum,
            ..Self::count()
        }
    }

    pub fn mean(value: &str) -> Self {
        AggregationSpec {
            value: Some(value.to_string()),
            reduction: Reduction::Mean,
            ..Self::count()
        }
    }

    pub fn distribution() -> Self {
        AggregationSpec {
            reduction: Reduction::Distribution,
            ..Self::count()
        }
    }

    pub fn by(mut self, column: &str) -> Self {
        self.group_by = Some(column.to_string());
        self
    }

    pub fn ordered(mut self, keys: Vec<FixedKey>) -> Self {
        self.order = KeyOrder::Fixed(keys);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Count(u64),
    Sum(f64),
    Mean(Option<f64>),
}

impl Value {
    fn empty(reduction: Reduction) -> Value {
        match reduction {
            Reduction::Count | Reduction::Distribution => Value::Count(0),
            Reduction::Sum => Value::Sum(0.0),
            Reduction::Mean => Value::Mean(None),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Count(count) => Some(*count as f64),
            Value::Sum(sum) => Some(*sum),
            Value::Mean(mean) => *mean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    Scalar { value: Value },
    Table { rows: Vec<Row> },
}

impl Aggregate {
    pub fn rows(&self) -> &[Row] {
        match self {
            Aggregate::Scalar { .. } => &[],
            Aggregate::Table { rows } => rows,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.rows().iter().find(|row| row.key == key).map(|row| row.value)
    }
}

#[derive(Debug, Default, Clone)]
struct Accumulator {
    rows: u64,
    observed: u64,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value.filter(|v| !v.is_nan()) {
            self.observed += 1;
            self.sum += v;
        }
    }

    fn finish(&self, reduction: Reduction) -> Value {
        match reduction {
            Reduction::Count | Reduction::Distribution => Value::Count(self.rows),
            Reduction::Sum => Value::Sum(self.sum),
            Reduction::Mean if self.observed == 0 => Value::Mean(None),
            Reduction::Mean => Value::Mean(Some(self.sum / self.observed as f64)),
        }
    }
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name).map_err(|_| DashboardError::Schema {
        missing: vec![name.to_string()],
    })
}

/// A group key as it is reported, ordered by value when the group column is
/// numeric and by text otherwise.
#[derive(Debug, Clone)]
struct GroupKey {
    text: String,
    number: Option<f64>,
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => self.text.cmp(&other.text),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

/// Numeric columns render as their shortest decimal form, so a 0/1 flag
/// groups under "0" and "1".
fn group_keys(series: &Series) -> PolarsResult<Vec<Option<GroupKey>>> {
    if series.dtype() == &DataType::Utf8 {
        return Ok(series
            .utf8()?
            .into_iter()
            .map(|key| {
                key.map(|text| GroupKey {
                    text: text.to_string(),
                    number: None,
                })
            })
            .collect());
    }
    let numbers = series.cast(&DataType::Float64)?;
    let keys = numbers
        .f64()?
        .into_iter()
        .map(|key| {
            key.filter(|k| !k.is_nan()).map(|k| GroupKey {
                text: k.to_string(),
                number: Some(k),
            })
        })
        .collect();
    Ok(keys)
}

fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let numbers = series.cast(&DataType::Float64)?;
    let values = numbers.f64()?.into_iter().collect();
    Ok(values)
}

pub fn aggregate(dataset: &Dataset, spec: &AggregationSpec) -> Result<Aggregate> {
    let df = dataset.frame();

    let values = match (&spec.value, spec.reduction) {
        (Some(name), _) => Some(numeric_values(column(df, name)?)?),
        (None, Reduction::Sum | Reduction::Mean) => {
            return Err(DashboardError::InvalidSpec {
                reason: format!("{:?} needs a value column", spec.reduction),
            })
        }
        (None, _) => None,
    };
    let value_at = |index: usize| values.as_ref().and_then(|v| v[index]);

    let group_by = match &spec.group_by {
        Some(name) => name,
        None => {
            let mut total = Accumulator::default();
            for index in 0..df.height() {
                total.push(value_at(index));
            }
            return Ok(Aggregate::Scalar {
                value: total.finish(spec.reduction),
            });
        }
    };

    let keys = group_keys(column(df, group_by)?)?;
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for (index, key) in keys.into_iter().enumerate() {
        if let Some(key) = key {
            groups.entry(key).or_default().push(value_at(index));
        }
    }

    let rows = match &spec.order {
        KeyOrder::Fixed(fixed) => fixed
            .iter()
            .map(|fixed_key| Row {
                key: fixed_key.label.clone(),
                value: groups
                    .iter()
                    .find(|(key, _)| key.text == fixed_key.key)
                    .map(|(_, group)| group.finish(spec.reduction))
                    .unwrap_or_else(|| Value::empty(spec.reduction)),
            })
            .collect(),
        KeyOrder::Natural => {
            let mut rows: Vec<(u64, Row)> = groups
                .into_iter()
                .map(|(key, group)| {
                    let row = Row {
                        key: key.text,
                        value: group.finish(spec.reduction),
                    };
                    (group.rows, row)
                })
                .collect();
            if spec.reduction == Reduction::Distribution {
                // Stable sort keeps natural key order among equal counts.
                rows.sort_by(|a, b| b.0.cmp(&a.0));
            }
            rows.into_iter().map(|(_, row)| row).collect()
        }
    };

    Ok(Aggregate::Table { rows })
}
