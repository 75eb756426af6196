use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of a loan table
// ---------------------------------------------------------------------------

/// A typed cell. Groups and outcome categories are keyed by `Value`, so it
/// carries a total order: `Missing` < numbers < text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Build a numeric cell; NaN and infinities become `Missing`.
    pub fn number(v: f64) -> Self {
        if v.is_finite() {
            Value::Number(v)
        } else {
            Value::Missing
        }
    }

    /// Turn a non-finite number into `Missing` in place.
    fn normalize(&mut self) {
        if matches!(self, Value::Number(v) if !v.is_finite()) {
            *self = Value::Missing;
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// The column type this value is compatible with (`None` for missing).
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Number(_) => Some(ColumnType::Numeric),
            Value::Text(_) => Some(ColumnType::Categorical),
            Value::Missing => None,
        }
    }

    /// Whether this value matches an outcome label typed by the analyst,
    /// e.g. `"Approved"` or `"1"` for a 0/1 coded column.
    pub fn matches_label(&self, label: &str) -> bool {
        match self {
            Value::Text(s) => s == label,
            Value::Number(v) => label.trim().parse::<f64>().is_ok_and(|l| l == *v),
            Value::Missing => false,
        }
    }
}

// -- Manual Eq/Ord so Value can key BTreeMap / BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        fn discriminant(v: &Value) -> u8 {
            match v {
                Value::Missing => 0,
                Value::Number(_) => 1,
                Value::Text(_) => 2,
            }
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.0}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Categorical => write!(f, "categorical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the immutable loan dataset
// ---------------------------------------------------------------------------

/// Rows of typed values over a fixed schema. Filtering and projection
/// (see [`crate::data::filter`]) always produce a new `Table`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking every row against the schema. Non-finite
    /// numbers are stored as `Missing`.
    pub fn new(columns: Vec<Column>, mut rows: Vec<Vec<Value>>) -> Result<Self> {
        for row in &mut rows {
            for cell in row.iter_mut() {
                cell.normalize();
            }
        }
        for (row_no, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AnalysisError::RaggedRow {
                    row: row_no,
                    found: row.len(),
                    expected: columns.len(),
                });
            }
            for (col, value) in columns.iter().zip(row) {
                if let Some(ty) = value.column_type() {
                    if ty != col.ty {
                        return Err(AnalysisError::TypeMismatch {
                            row: row_no,
                            column: col.name.clone(),
                            declared: col.ty,
                            value: value.to_string(),
                        });
                    }
                }
            }
        }
        Ok(Table { columns, rows })
    }

    /// Build a table from column-name → value records, inferring types.
    ///
    /// A column is numeric when every non-missing cell is a number; any
    /// text cell makes it categorical, and its numbers are kept as text.
    /// Columns are ordered by first appearance; absent cells are missing.
    pub fn from_records(records: Vec<BTreeMap<String, Value>>) -> Self {
        let mut names: Vec<String> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for rec in &records {
            for key in rec.keys() {
                if seen.insert(key.clone()) {
                    names.push(key.clone());
                }
            }
        }

        let columns: Vec<Column> = names
            .iter()
            .map(|name| {
                let any_text = records
                    .iter()
                    .any(|rec| matches!(rec.get(name), Some(Value::Text(_))));
                let ty = if any_text {
                    ColumnType::Categorical
                } else {
                    ColumnType::Numeric
                };
                Column::new(name.clone(), ty)
            })
            .collect();

        let rows = records
            .into_iter()
            .map(|mut rec| {
                columns
                    .iter()
                    .map(|col| match (rec.remove(&col.name), col.ty) {
                        (Some(Value::Number(v)), _) if !v.is_finite() => Value::Missing,
                        (Some(Value::Number(v)), ColumnType::Categorical) => {
                            Value::Text(Value::Number(v).to_string())
                        }
                        (Some(v), _) => v,
                        (None, _) => Value::Missing,
                    })
                    .collect()
            })
            .collect();

        Table { columns, rows }
    }

    /// Table with the given schema and no rows.
    pub fn empty(columns: Vec<Column>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Position of `name` in the schema, or `UnknownColumn`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| AnalysisError::UnknownColumn {
                column: name.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    /// Fail with `ColumnType` unless `name` exists and has type `expected`.
    pub fn require_type(&self, name: &str, expected: ColumnType) -> Result<usize> {
        let idx = self.column_index(name)?;
        let actual = self.columns[idx].ty;
        if actual != expected {
            return Err(AnalysisError::ColumnType {
                column: name.to_string(),
                expected,
                actual,
            });
        }
        Ok(idx)
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted distinct non-missing values of a column.
    pub fn unique_values(&self, name: &str) -> Result<BTreeSet<Value>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| &row[idx])
            .filter(|v| !v.is_missing())
            .cloned()
            .collect())
    }

    /// Names of numeric columns, in schema order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.ty == ColumnType::Numeric)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Names of categorical columns, in schema order.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.ty == ColumnType::Categorical)
            .map(|c| c.name.clone())
            .collect()
    }

    /// The first `n` rows, for the data preview.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub(crate) fn from_parts_unchecked(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Table { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn value_order_is_missing_numbers_text() {
        let mut vals = vec![
            Value::text("B"),
            Value::Number(2.0),
            Value::Missing,
            Value::text("A"),
            Value::Number(-1.0),
        ];
        vals.sort();
        assert_eq!(
            vals,
            vec![
                Value::Missing,
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::text("A"),
                Value::text("B"),
            ]
        );
    }

    #[test]
    fn non_finite_numbers_become_missing() {
        assert!(Value::number(f64::NAN).is_missing());
        assert!(Value::from(f64::INFINITY).is_missing());
        assert_eq!(Value::number(1.5), Value::Number(1.5));
    }

    #[test]
    fn display_whole_numbers_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.25).to_string(), "3.25");
        assert_eq!(Value::text("Asian").to_string(), "Asian");
    }

    #[test]
    fn label_matching_accepts_numeric_codes() {
        assert!(Value::text("Approved").matches_label("Approved"));
        assert!(!Value::text("approved").matches_label("Approved"));
        assert!(Value::Number(1.0).matches_label("1"));
        assert!(!Value::Number(0.0).matches_label("1"));
        assert!(!Value::Missing.matches_label("Approved"));
    }

    #[test]
    fn constructors_store_non_finite_numbers_as_missing() {
        let cols = vec![
            Column::new("Race", ColumnType::Categorical),
            Column::new("AIP", ColumnType::Numeric),
        ];
        let table = Table::new(
            cols,
            vec![
                vec![Value::text("A"), Value::Number(f64::NAN)],
                vec![Value::text("B"), Value::Number(f64::NEG_INFINITY)],
                vec![Value::text("B"), Value::Number(2.5)],
            ],
        )
        .unwrap();
        assert!(table.rows()[0][1].is_missing());
        assert!(table.rows()[1][1].is_missing());
        assert_eq!(table.rows()[2][1], Value::Number(2.5));

        let table = Table::from_records(vec![
            record(&[("AIP", Value::Number(f64::INFINITY))]),
            record(&[("AIP", Value::Number(4.0))]),
        ]);
        assert_eq!(table.column("AIP").unwrap().ty, ColumnType::Numeric);
        assert!(table.rows()[0][0].is_missing());
    }

    #[test]
    fn new_rejects_type_mismatch() {
        let cols = vec![Column::new("AIP", ColumnType::Numeric)];
        let err = Table::new(cols, vec![vec![Value::text("high")]]).unwrap_err();
        assert!(matches!(err, AnalysisError::TypeMismatch { row: 0, .. }));
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let cols = vec![
            Column::new("Race", ColumnType::Categorical),
            Column::new("AIP", ColumnType::Numeric),
        ];
        let err = Table::new(cols, vec![vec![Value::text("A")]]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::RaggedRow {
                row: 0,
                found: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn from_records_infers_types_and_fills_missing() {
        let table = Table::from_records(vec![
            record(&[("Race", Value::text("A")), ("AIP", Value::Number(1.0))]),
            record(&[("Race", Value::text("B")), ("Code", Value::Number(7.0))]),
            record(&[("Code", Value::text("x"))]),
        ]);
        assert_eq!(table.column("AIP").unwrap().ty, ColumnType::Numeric);
        assert_eq!(table.column("Race").unwrap().ty, ColumnType::Categorical);
        assert_eq!(table.column("Code").unwrap().ty, ColumnType::Categorical);

        let code = table.column_index("Code").unwrap();
        assert_eq!(table.rows()[1][code], Value::text("7"));
        let aip = table.column_index("AIP").unwrap();
        assert!(table.rows()[1][aip].is_missing());
    }

    #[test]
    fn unknown_column_is_reported() {
        let table = Table::empty(vec![Column::new("Race", ColumnType::Categorical)]);
        assert_eq!(
            table.column_index("Sex").unwrap_err(),
            AnalysisError::UnknownColumn {
                column: "Sex".into()
            }
        );
    }

    #[test]
    fn require_type_checks_declared_type() {
        let table = Table::empty(vec![Column::new("Race", ColumnType::Categorical)]);
        assert!(matches!(
            table.require_type("Race", ColumnType::Numeric),
            Err(AnalysisError::ColumnType { .. })
        ));
        assert_eq!(table.require_type("Race", ColumnType::Categorical), Ok(0));
    }

    #[test]
    fn unique_values_are_sorted_and_skip_missing() {
        let table = Table::from_records(vec![
            record(&[("Race", Value::text("B"))]),
            record(&[("Race", Value::Missing)]),
            record(&[("Race", Value::text("A"))]),
            record(&[("Race", Value::text("B"))]),
        ]);
        let uniq: Vec<Value> = table.unique_values("Race").unwrap().into_iter().collect();
        assert_eq!(uniq, vec![Value::text("A"), Value::text("B")]);
    }
}
