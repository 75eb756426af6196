use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::filter::project;
use crate::data::model::{ColumnType, Table, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Numeric outcome summaries
// ---------------------------------------------------------------------------

/// Five-number summary plus Tukey whiskers, for box plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest observation within 1.5·IQR below `q1`.
    pub lower_whisker: f64,
    /// Largest observation within 1.5·IQR above `q3`.
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (N−1). NaN for a single observation.
    pub std_dev: f64,
    pub box_stats: BoxStats,
}

impl NumericSummary {
    /// Summarize a non-empty sample. Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(NumericSummary {
            count: values.len(),
            mean: mean(values),
            std_dev: sample_variance(values).sqrt(),
            box_stats: box_stats(&sorted),
        })
    }

    /// Sample variance, NaN for a single observation.
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    pub fn sum(&self) -> f64 {
        self.mean * self.count as f64
    }
}

/// Group key → summary, ordered by key.
pub type NumericGroups = BTreeMap<Value, NumericSummary>;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance; NaN when fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let pos = p.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn box_stats(sorted: &[f64]) -> BoxStats {
    let q1 = quantile(sorted, 0.25);
    let q3 = quantile(sorted, 0.75);
    let reach = 1.5 * (q3 - q1);
    let (low_fence, high_fence) = (q1 - reach, q3 + reach);

    let within = |v: &f64| (low_fence..=high_fence).contains(v);
    BoxStats {
        min: sorted[0],
        q1,
        median: quantile(sorted, 0.5),
        q3,
        max: sorted[sorted.len() - 1],
        lower_whisker: sorted.iter().copied().find(|v| within(v)).unwrap_or(q1),
        upper_whisker: sorted.iter().copied().rev().find(|v| within(v)).unwrap_or(q3),
        outliers: sorted.iter().copied().filter(|v| !within(v)).collect(),
    }
}

/// Partition `value_col` by `group_col`, dropping rows missing either.
pub fn partition_numeric(
    table: &Table,
    group_col: &str,
    value_col: &str,
) -> Result<BTreeMap<Value, Vec<f64>>> {
    table.column_index(group_col)?;
    table.require_type(value_col, ColumnType::Numeric)?;
    let projected = project(table, &[group_col, value_col])?;

    let mut groups: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
    for row in projected.rows() {
        // Projection keeps group first; a group column equal to the value
        // column collapses to a single cell.
        let key = &row[0];
        if let Some(v) = row.last().and_then(Value::as_f64) {
            groups.entry(key.clone()).or_default().push(v);
        }
    }
    Ok(groups)
}

/// Per-group count, mean and standard deviation of a numeric outcome.
///
/// An empty table yields an empty mapping: callers treat that as
/// insufficient data rather than an error.
pub fn summarize_numeric(table: &Table, group_col: &str, value_col: &str) -> Result<NumericGroups> {
    let groups = partition_numeric(table, group_col, value_col)?;
    Ok(groups
        .into_iter()
        .filter_map(|(key, values)| NumericSummary::from_values(&values).map(|s| (key, s)))
        .collect())
}

// ---------------------------------------------------------------------------
// Categorical outcome summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryShare {
    pub count: usize,
    pub proportion: f64,
}

/// Outcome distribution within one group. Every group of a
/// [`CategoricalGroups`] exposes the same category set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub count: usize,
    pub categories: BTreeMap<Value, CategoryShare>,
}

impl CategoricalSummary {
    /// Share of the category matching `label`, zero when absent.
    pub fn share_of_label(&self, label: &str) -> CategoryShare {
        let count = self
            .categories
            .iter()
            .filter(|(cat, _)| cat.matches_label(label))
            .map(|(_, share)| share.count)
            .sum();
        CategoryShare {
            count,
            proportion: if self.count == 0 {
                0.0
            } else {
                count as f64 / self.count as f64
            },
        }
    }
}

pub type CategoricalGroups = BTreeMap<Value, CategoricalSummary>;

/// Per-group counts and proportions of each outcome category.
///
/// Categories seen anywhere in the table are reported for every group;
/// a combination absent from the data is filled with count 0.
pub fn summarize_categorical(
    table: &Table,
    group_col: &str,
    outcome_col: &str,
) -> Result<CategoricalGroups> {
    let projected = project(table, &[group_col, outcome_col])?;

    let mut counts: BTreeMap<Value, BTreeMap<Value, usize>> = BTreeMap::new();
    let mut categories: BTreeSet<Value> = BTreeSet::new();
    for row in projected.rows() {
        let (key, outcome) = (&row[0], &row[row.len() - 1]);
        categories.insert(outcome.clone());
        *counts
            .entry(key.clone())
            .or_default()
            .entry(outcome.clone())
            .or_default() += 1;
    }

    Ok(counts
        .into_iter()
        .map(|(key, by_outcome)| {
            let total: usize = by_outcome.values().sum();
            let shares = categories
                .iter()
                .map(|cat| {
                    let count = by_outcome.get(cat).copied().unwrap_or(0);
                    let share = CategoryShare {
                        count,
                        proportion: count as f64 / total as f64,
                    };
                    (cat.clone(), share)
                })
                .collect();
            (
                key,
                CategoricalSummary {
                    count: total,
                    categories: shares,
                },
            )
        })
        .collect())
}
