use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{Table, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per column
// ---------------------------------------------------------------------------

/// Accepted values for one column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// The "All" selector state: no constraint.
    #[default]
    All,
    /// Only rows whose value is in the set. An empty set accepts nothing.
    OneOf(BTreeSet<Value>),
}

impl Selection {
    pub fn one(value: impl Into<Value>) -> Self {
        Selection::OneOf(BTreeSet::from([value.into()]))
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Selection::All => true,
            Selection::OneOf(set) => set.contains(value),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

impl FromIterator<Value> for Selection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Selection::OneOf(iter.into_iter().collect())
    }
}

/// Per-column constraints: column_name → selection.
/// A column absent from the map is unconstrained.
pub type Filter = BTreeMap<String, Selection>;

/// Return indices of rows that pass all constraints.
///
/// A row passes a column constraint when:
/// * the selection is `All` → passes (no constraint)
/// * the selection is an empty set → nothing selected → fails
/// * the row's value is in the selected set → passes; a missing cell
///   passes only if `Value::Missing` is selected
pub fn filtered_indices(table: &Table, constraints: &Filter) -> Result<Vec<usize>> {
    let active: Vec<(usize, &BTreeSet<Value>)> = constraints
        .iter()
        .map(|(col, sel)| Ok((table.column_index(col)?, sel)))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter_map(|(idx, sel)| match sel {
            Selection::All => None,
            Selection::OneOf(set) => Some((idx, set)),
        })
        .collect();

    Ok(table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| active.iter().all(|(idx, set)| set.contains(&row[*idx])))
        .map(|(i, _)| i)
        .collect())
}

/// New table holding only rows that satisfy every constraint, in their
/// original order and with the full column set.
pub fn filter(table: &Table, constraints: &Filter) -> Result<Table> {
    let keep = filtered_indices(table, constraints)?;
    let rows = keep.iter().map(|&i| table.rows()[i].clone()).collect();
    log::debug!(
        "filter kept {} of {} rows ({} constraints)",
        keep.len(),
        table.len(),
        constraints.len()
    );
    Ok(Table::from_parts_unchecked(table.columns().to_vec(), rows))
}

/// New table with only the named columns, in the requested order, dropping
/// every row that is missing a value in any of them.
pub fn project<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<Table> {
    let mut indices: Vec<usize> = Vec::with_capacity(columns.len());
    for name in columns {
        let idx = table.column_index(name.as_ref())?;
        if !indices.contains(&idx) {
            indices.push(idx);
        }
    }

    let schema = indices.iter().map(|&i| table.columns()[i].clone()).collect();
    let rows: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .filter(|row| indices.iter().all(|&i| !row[i].is_missing()))
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    if rows.len() < table.len() {
        log::debug!(
            "projection dropped {} rows with missing values",
            table.len() - rows.len()
        );
    }
    Ok(Table::from_parts_unchecked(schema, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnType};
    use crate::error::AnalysisError;

    fn loans() -> Table {
        Table::new(
            vec![
                Column::new("Race", ColumnType::Categorical),
                Column::new("LoanType", ColumnType::Categorical),
                Column::new("AIP", ColumnType::Numeric),
            ],
            vec![
                vec!["A".into(), "Auto".into(), Value::Number(4.0)],
                vec!["B".into(), "Mortgage".into(), Value::Number(3.5)],
                vec!["A".into(), "Mortgage".into(), Value::Missing],
                vec![Value::Missing, "Auto".into(), Value::Number(5.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn all_selection_is_a_no_op() {
        let table = loans();
        let f = Filter::from([("LoanType".to_string(), Selection::All)]);
        assert_eq!(filter(&table, &f).unwrap(), table);
    }

    #[test]
    fn filter_preserves_order_and_schema() {
        let table = loans();
        let f = Filter::from([("LoanType".to_string(), Selection::one("Mortgage"))]);
        let out = filter(&table, &f).unwrap();
        assert_eq!(out.columns(), table.columns());
        assert_eq!(out.rows(), &table.rows()[1..3]);
    }

    #[test]
    fn constraints_combine_with_and() {
        let table = loans();
        let f = Filter::from([
            ("LoanType".to_string(), Selection::one("Auto")),
            ("Race".to_string(), Selection::one("A")),
        ]);
        let out = filter(&table, &f).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0][2], Value::Number(4.0));
    }

    #[test]
    fn empty_selection_hides_everything() {
        let table = loans();
        let f = Filter::from([("Race".to_string(), Selection::OneOf(BTreeSet::new()))]);
        assert!(filter(&table, &f).unwrap().is_empty());
    }

    #[test]
    fn missing_cells_pass_only_when_selected() {
        let table = loans();
        let f = Filter::from([(
            "Race".to_string(),
            [Value::Missing, Value::text("B")].into_iter().collect(),
        )]);
        assert_eq!(filter(&table, &f).unwrap().len(), 2);
    }

    #[test]
    fn filter_on_unknown_column_fails() {
        let f = Filter::from([("Purpose".to_string(), Selection::All)]);
        assert!(matches!(
            filter(&loans(), &f),
            Err(AnalysisError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn project_drops_rows_with_missing_values() {
        let out = project(&loans(), &["AIP", "Race"]).unwrap();
        assert_eq!(out.column_names(), vec!["AIP", "Race"]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0], vec![Value::Number(4.0), Value::text("A")]);
    }

    #[test]
    fn project_collapses_duplicate_columns() {
        let out = project(&loans(), &["Race", "Race"]).unwrap();
        assert_eq!(out.column_names(), vec!["Race"]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn project_unknown_column_fails() {
        assert_eq!(
            project(&loans(), &["APR"]).unwrap_err(),
            AnalysisError::UnknownColumn {
                column: "APR".into()
            }
        );
    }
}
