//! Hypothesis tests for group disparities.
//!
//! Test selection is a fixed decision table over the outcome type and the
//! number of non-empty groups:
//!
//! | outcome     | groups | test                                |
//! |-------------|--------|-------------------------------------|
//! | numeric     | 0–1    | none                                |
//! | numeric     | 2      | Welch two-sample t-test (two-sided) |
//! | numeric     | ≥ 3    | one-way ANOVA                       |
//! | categorical | ≥ 2    | chi-square test of independence     |
//!
//! Every function here is pure; an undefined test is `None`, never a panic.

use std::fmt;

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};

use super::summary::{CategoricalGroups, NumericGroups, NumericSummary};
use crate::data::model::Value;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestKind {
    WelchT,
    Anova,
    ChiSquare,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::WelchT => write!(f, "Welch two-sample t-test"),
            TestKind::Anova => write!(f, "One-way ANOVA"),
            TestKind::ChiSquare => write!(f, "Chi-square test of independence"),
        }
    }
}

/// One line of an ANOVA summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaRow {
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTable {
    /// Between-group (factor) variation.
    pub between: AnovaRow,
    /// Within-group (residual) variation.
    pub within: AnovaRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TestDetail {
    Welch {
        /// Welch–Satterthwaite degrees of freedom (fractional).
        df: f64,
        mean_difference: f64,
        standard_error: f64,
    },
    Anova(AnovaTable),
    ChiSquare {
        /// Groups and categories kept after dropping all-zero margins.
        groups: Vec<Value>,
        categories: Vec<Value>,
        expected: Vec<Vec<f64>>,
        yates_corrected: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub kind: TestKind,
    pub statistic: f64,
    /// Always within [0, 1].
    pub p_value: f64,
    /// (r−1)(c−1) for chi-square, the between-group df for ANOVA, `None`
    /// for Welch (see [`TestDetail::Welch`]).
    pub degrees_of_freedom: Option<usize>,
    pub detail: TestDetail,
}

impl TestResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

// ---------------------------------------------------------------------------
// Numeric outcomes
// ---------------------------------------------------------------------------

/// The test that applies to a numeric outcome with `groups` non-empty groups.
pub fn select_numeric_test(groups: usize) -> Option<TestKind> {
    match groups {
        0 | 1 => None,
        2 => Some(TestKind::WelchT),
        _ => Some(TestKind::Anova),
    }
}

/// Run the test selected for these groups, if one applies and is defined.
pub fn test_numeric(groups: &NumericGroups) -> Option<TestResult> {
    let non_empty: Vec<&NumericSummary> = groups.values().filter(|s| s.count > 0).collect();
    let kind = select_numeric_test(non_empty.len());
    log::debug!("{} non-empty groups → {:?}", non_empty.len(), kind);

    match kind? {
        TestKind::WelchT => welch_t_test(non_empty[0], non_empty[1]),
        TestKind::Anova => one_way_anova(&non_empty),
        TestKind::ChiSquare => None,
    }
}

/// Variance of the mean; a single observation contributes none.
fn mean_variance(s: &NumericSummary) -> f64 {
    if s.count > 1 {
        s.variance() / s.count as f64
    } else {
        0.0
    }
}

/// Two-sided Welch t-test of `a.mean - b.mean`, not assuming equal variances.
///
/// A single-member group contributes zero variance and no term to the
/// Satterthwaite denominator. `None` when the standard error is zero.
pub fn welch_t_test(a: &NumericSummary, b: &NumericSummary) -> Option<TestResult> {
    let (va, vb) = (mean_variance(a), mean_variance(b));
    let se2 = va + vb;
    if !se2.is_finite() || se2 <= 0.0 {
        return None;
    }

    let satterthwaite = |v: f64, n: usize| if n > 1 { v * v / (n - 1) as f64 } else { 0.0 };
    let df = se2 * se2 / (satterthwaite(va, a.count) + satterthwaite(vb, b.count));

    let standard_error = se2.sqrt();
    let mean_difference = a.mean - b.mean;
    let t = mean_difference / standard_error;

    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let p_value = (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0);

    Some(TestResult {
        kind: TestKind::WelchT,
        statistic: t,
        p_value,
        degrees_of_freedom: None,
        detail: TestDetail::Welch {
            df,
            mean_difference,
            standard_error,
        },
    })
}

/// One-way ANOVA across all groups.
///
/// `None` with fewer than two groups, no residual degrees of freedom, or
/// zero within-group variation.
pub fn one_way_anova(groups: &[&NumericSummary]) -> Option<TestResult> {
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.count).sum();
    if k < 2 || n <= k {
        return None;
    }

    let grand_mean = groups.iter().map(|g| g.sum()).sum::<f64>() / n as f64;
    let ss_between: f64 = groups
        .iter()
        .map(|g| g.count as f64 * (g.mean - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .filter(|g| g.count > 1)
        .map(|g| (g.count - 1) as f64 * g.variance())
        .sum();
    if !ss_within.is_finite() || ss_within <= 0.0 {
        return None;
    }

    let (df_between, df_within) = (k - 1, n - k);
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;
    let f = ms_between / ms_within;

    let dist = FisherSnedecor::new(df_between as f64, df_within as f64).ok()?;
    let p_value = dist.sf(f).clamp(0.0, 1.0);

    Some(TestResult {
        kind: TestKind::Anova,
        statistic: f,
        p_value,
        degrees_of_freedom: Some(df_between),
        detail: TestDetail::Anova(AnovaTable {
            between: AnovaRow {
                df: df_between,
                sum_sq: ss_between,
                mean_sq: ms_between,
            },
            within: AnovaRow {
                df: df_within,
                sum_sq: ss_within,
                mean_sq: ms_within,
            },
        }),
    })
}

// ---------------------------------------------------------------------------
// Categorical outcomes
// ---------------------------------------------------------------------------

/// Counts cross-tabulated by group (rows) and outcome category (columns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub groups: Vec<Value>,
    pub categories: Vec<Value>,
    pub counts: Vec<Vec<usize>>,
}

impl ContingencyTable {
    /// Zero-filled table over every group and category of the summary.
    pub fn from_groups(groups: &CategoricalGroups) -> Self {
        let categories: Vec<Value> = groups
            .values()
            .flat_map(|s| s.categories.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let counts = groups
            .values()
            .map(|s| {
                categories
                    .iter()
                    .map(|c| s.categories.get(c).map_or(0, |share| share.count))
                    .collect()
            })
            .collect();
        ContingencyTable {
            groups: groups.keys().cloned().collect(),
            categories,
            counts,
        }
    }

    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<usize> {
        (0..self.categories.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.row_totals().iter().sum()
    }

    /// Copy without all-zero rows and columns.
    pub fn without_empty_margins(&self) -> Self {
        let row_totals = self.row_totals();
        let col_totals = self.column_totals();
        let rows: Vec<usize> = (0..self.groups.len())
            .filter(|&i| row_totals[i] > 0)
            .collect();
        let cols: Vec<usize> = (0..self.categories.len())
            .filter(|&j| col_totals[j] > 0)
            .collect();

        ContingencyTable {
            groups: rows.iter().map(|&i| self.groups[i].clone()).collect(),
            categories: cols.iter().map(|&j| self.categories[j].clone()).collect(),
            counts: rows
                .iter()
                .map(|&i| cols.iter().map(|&j| self.counts[i][j]).collect())
                .collect(),
        }
    }
}

/// Chi-square test of independence on a contingency table.
///
/// All-zero rows and columns are dropped first; fewer than two of either
/// leaves the test undefined. With one degree of freedom and `yates` set,
/// each observed count is moved up to 0.5 towards its expectation.
pub fn chi_square_independence(table: &ContingencyTable, yates: bool) -> Option<TestResult> {
    let reduced = table.without_empty_margins();
    let (r, c) = (reduced.groups.len(), reduced.categories.len());
    if r < 2 || c < 2 {
        log::debug!("contingency table reduced to {r}x{c}, no chi-square test");
        return None;
    }

    let total = reduced.total() as f64;
    let row_totals = reduced.row_totals();
    let col_totals = reduced.column_totals();
    let expected: Vec<Vec<f64>> = row_totals
        .iter()
        .map(|&ri| {
            col_totals
                .iter()
                .map(|&cj| ri as f64 * cj as f64 / total)
                .collect()
        })
        .collect();

    let dof = (r - 1) * (c - 1);
    let yates_corrected = yates && dof == 1;

    let mut statistic = 0.0;
    for (obs_row, exp_row) in reduced.counts.iter().zip(&expected) {
        for (&o, &e) in obs_row.iter().zip(exp_row) {
            let mut diff = (o as f64 - e).abs();
            if yates_corrected {
                diff = (diff - 0.5).max(0.0);
            }
            statistic += diff * diff / e;
        }
    }
    if !statistic.is_finite() {
        return None;
    }

    let dist = ChiSquared::new(dof as f64).ok()?;
    let p_value = dist.sf(statistic).clamp(0.0, 1.0);

    Some(TestResult {
        kind: TestKind::ChiSquare,
        statistic,
        p_value,
        degrees_of_freedom: Some(dof),
        detail: TestDetail::ChiSquare {
            groups: reduced.groups,
            categories: reduced.categories,
            expected,
            yates_corrected,
        },
    })
}

/// Build the contingency table for these groups and test it.
pub fn test_categorical(groups: &CategoricalGroups, yates: bool) -> Option<TestResult> {
    if groups.len() < 2 {
        return None;
    }
    chi_square_independence(&ContingencyTable::from_groups(groups), yates)
}
