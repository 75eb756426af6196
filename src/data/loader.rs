use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use calamine::{Data, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnType, Table, Value};

/// Cell spellings treated as missing in text formats.
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a loan table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one loan per line (recommended)
/// * `.xlsx`    – first worksheet, header row, one loan per line
/// * `.json`    – `[{ "Race": "A", "AIP": 4.1, ... }, ...]`
/// * `.parquet` – flat columns of strings, integers, floats or booleans
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "xlsx" | "xls" | "xlsm" | "ods" => load_excel(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.column_names(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one loan per record.
/// A column is numeric when every non-missing cell parses as a float.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but the header has {}",
                record.len(),
                headers.len()
            );
        }
        raw.push(record.iter().map(|s| s.trim().to_string()).collect());
    }

    table_from_text(headers, raw)
}

/// Typed table from header names and raw text cells. A column is numeric
/// when every non-missing cell parses as a float.
fn table_from_text(headers: Vec<String>, raw: Vec<Vec<String>>) -> Result<Table> {
    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let numeric = raw
                .iter()
                .map(|row| row[idx].as_str())
                .filter(|cell| !is_missing_token(cell))
                .all(|cell| cell.parse::<f64>().is_ok());
            let ty = if numeric {
                ColumnType::Numeric
            } else {
                ColumnType::Categorical
            };
            Column::new(name.clone(), ty)
        })
        .collect();

    let rows = raw
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&columns)
                .map(|(cell, col)| parse_cell(cell, col.ty))
                .collect()
        })
        .collect();

    Ok(Table::new(columns, rows)?)
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

/// First worksheet of a workbook; the first row holds the column names.
/// Cells go through their text form so types are inferred as for CSV.
fn load_excel(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("workbook has no worksheets")?;
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("reading worksheet '{sheet}'"))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .context("worksheet is empty")?
        .iter()
        .map(excel_cell_text)
        .collect();

    let raw: Vec<Vec<String>> = rows
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(excel_cell_text).collect();
            cells.resize(headers.len(), String::new());
            cells
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    log::debug!("worksheet '{sheet}': {} data rows", raw.len());
    table_from_text(headers, raw)
}

fn excel_cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell)
}

fn parse_cell(cell: String, ty: ColumnType) -> Value {
    if is_missing_token(&cell) {
        return Value::Missing;
    }
    match ty {
        ColumnType::Numeric => cell.parse::<f64>().map(Value::number).unwrap_or(Value::Missing),
        ColumnType::Categorical => Value::Text(cell),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Race": "Asian", "LoanType": "Auto", "AIP": 4.25 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(obj
                .iter()
                .map(|(key, val)| (key.clone(), json_to_value(val)))
                .collect::<BTreeMap<_, _>>())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Table::from_records(rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) if is_missing_token(s) => Value::Missing,
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => n.as_f64().map(Value::number).unwrap_or(Value::Missing),
        JsonValue::Bool(b) => Value::Text(b.to_string()),
        JsonValue::Null => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat columns.
///
/// Numeric Arrow types become numeric columns; everything else (strings,
/// booleans, dates, dictionaries) is read through its string form as a
/// categorical column. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| {
            let ty = if f.data_type().is_numeric() {
                ColumnType::Numeric
            } else {
                ColumnType::Categorical
            };
            Column::new(f.name().clone(), ty)
        })
        .collect();

    let reader = builder.build().context("building parquet reader")?;
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let n_rows = batch.num_rows();
        let start = rows.len();
        rows.extend((0..n_rows).map(|_| Vec::with_capacity(columns.len())));

        for (col_idx, col) in columns.iter().enumerate() {
            let array = batch.column(col_idx);
            let cells = extract_column(array.as_ref(), col.ty)
                .with_context(|| format!("reading column '{}'", col.name))?;
            for (offset, cell) in cells.into_iter().enumerate() {
                rows[start + offset].push(cell);
            }
        }
    }

    Ok(Table::new(columns, rows)?)
}

// -- Parquet / Arrow helpers --

/// Read a whole Arrow column as typed cells; nulls become `Missing`.
fn extract_column(array: &dyn Array, ty: ColumnType) -> Result<Vec<Value>> {
    match ty {
        ColumnType::Numeric => {
            let cast_arr = cast(array, &DataType::Float64).context("casting to Float64")?;
            let floats = cast_arr
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(floats
                .iter()
                .map(|v| v.map(Value::number).unwrap_or(Value::Missing))
                .collect())
        }
        ColumnType::Categorical => {
            let cast_arr = cast(array, &DataType::Utf8).context("casting to Utf8")?;
            let strings = cast_arr
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(strings
                .iter()
                .map(|v| match v {
                    Some(s) if !is_missing_token(s) => Value::text(s),
                    _ => Value::Missing,
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens_parse_as_missing() {
        assert!(parse_cell("NA".into(), ColumnType::Numeric).is_missing());
        assert!(parse_cell(String::new(), ColumnType::Categorical).is_missing());
        assert_eq!(
            parse_cell("4.5".into(), ColumnType::Numeric),
            Value::Number(4.5)
        );
    }

    #[test]
    fn json_values_map_to_cells() {
        assert_eq!(json_to_value(&serde_json::json!(2.5)), Value::Number(2.5));
        assert_eq!(json_to_value(&serde_json::json!("A")), Value::text("A"));
        assert_eq!(json_to_value(&serde_json::json!(true)), Value::text("true"));
        assert!(json_to_value(&serde_json::json!(null)).is_missing());
    }
}
