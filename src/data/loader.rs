use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, ColumnType, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line, empty cells are missing
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.parquet` – any flat schema; nulls are missing
/// * `.xlsx` / `.xls` / `.xlsm` / `.ods` – first sheet, first row is the header
///   (needs the `excel` feature)
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        "xlsx" | "xls" | "xlsm" | "ods" => load_excel(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} rows with columns {:?}",
        table.n_rows(),
        table.column_names()
    );
    Ok(table)
}

/// Identifier used to tell a re-upload of the same file from a new one.
pub fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

/// Parse CSV from any reader. The first record is the header.
pub fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                headers.len(),
                record.len()
            );
        }
        for (col, value) in cells.iter_mut().zip(record.iter()) {
            col.push(guess_cell_type(value));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| typed_column(name, values))
        .collect();
    Ok(Table::from_columns(columns)?)
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::float(f);
    }
    match s.to_ascii_lowercase().as_str() {
        "true" => return CellValue::Bool(true),
        "false" => return CellValue::Bool(false),
        "na" | "n/a" | "null" | "none" => return CellValue::Null,
        _ => {}
    }
    if let Some(date) = parse_date(s) {
        return CellValue::Date(date);
    }
    CellValue::String(s.to_string())
}

/// Normalise ISO-8601 dates and datetimes; `None` for anything else.
fn parse_date(s: &str) -> Option<String> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.format("%Y-%m-%d").to_string());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Infer the column type; a text column keeps every present cell as text so
/// `"12"` next to `"abc"` stays a string, as it was in the file.
fn typed_column(name: String, values: Vec<CellValue>) -> Column {
    match ColumnType::infer(&values) {
        ColumnType::Text => {
            let values = values
                .into_iter()
                .map(|v| match v {
                    CellValue::Null | CellValue::String(_) => v,
                    other => CellValue::String(other.to_string()),
                })
                .collect();
            Column::with_type(name, ColumnType::Text, values)
        }
        dtype => Column::with_type(name, dtype, values),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "age": 25, "city": "Oslo" },
///   { "age": null, "city": "Rome" }
/// ]
/// ```
///
/// Columns appear in first-seen order; keys absent from a record are missing.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text)
}

pub fn read_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let values = records
                .iter()
                .map(|rec| rec.get(&name).map_or(CellValue::Null, json_to_cell))
                .collect();
            typed_column(name, values)
        })
        .collect();
    Ok(Table::from_columns(columns)?)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => match parse_date(s) {
            Some(d) => CellValue::Date(d),
            None => CellValue::String(s.clone()),
        },
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

/// Read the first worksheet. The first row of its used range is the header.
#[cfg(feature = "excel")]
fn load_excel(path: &Path) -> Result<Table> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no sheets")?
        .context("reading first sheet")?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match excel_cell(cell) {
            CellValue::Null => format!("Unnamed: {i}"),
            name => name.to_string(),
        })
        .collect();

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (col, values) in cells.iter_mut().enumerate() {
            values.push(row.get(col).map_or(CellValue::Null, excel_cell));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| typed_column(name, values))
        .collect();
    Ok(Table::from_columns(columns)?)
}

#[cfg(not(feature = "excel"))]
fn load_excel(_path: &Path) -> Result<Table> {
    bail!("Excel files need the `excel` feature")
}

/// Workbooks store every number as a float; whole numbers come back as
/// integers, the way a spreadsheet user typed them.
#[cfg(feature = "excel")]
fn excel_cell(cell: &calamine::Data) -> CellValue {
    use calamine::Data;
    use chrono::Timelike;

    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            CellValue::Integer(*f as i64)
        }
        Data::Float(f) => CellValue::float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => {
            let s = s.trim();
            match s.to_ascii_lowercase().as_str() {
                "" | "na" | "n/a" | "nan" | "null" | "none" => CellValue::Null,
                _ => parse_date(s).map_or_else(|| CellValue::String(s.to_string()), CellValue::Date),
            }
        }
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                CellValue::Date(dt.format("%Y-%m-%d").to_string())
            }
            Some(dt) => CellValue::Date(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Date(parse_date(s).unwrap_or_else(|| s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        // Empty and error cells (`#N/A`, `#DIV/0!`).
        _ => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with a flat schema. Column types come from the
/// Arrow schema rather than from the values.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); schema.fields().len()];
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, values) in cells.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            values.extend(extract_cells(array).with_context(|| {
                format!("column '{}'", schema.field(col_idx).name())
            })?);
        }
    }

    let columns = schema
        .fields()
        .iter()
        .zip(cells)
        .map(|(field, values)| {
            Column::with_type(field.name().clone(), arrow_column_type(field.data_type()), values)
        })
        .collect();
    Ok(Table::from_columns(columns)?)
}

fn arrow_column_type(dt: &DataType) -> ColumnType {
    match dt {
        dt if dt.is_integer() || dt.is_floating() => ColumnType::Numeric,
        DataType::Boolean => ColumnType::Boolean,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => ColumnType::Temporal,
        _ => ColumnType::Text,
    }
}

// -- Parquet / Arrow helpers --

macro_rules! primitive_cells {
    ($array:expr, $ty:ty, $make:expr) => {{
        let arr = $array
            .as_primitive_opt::<$ty>()
            .context(concat!("expected ", stringify!($ty), " array"))?;
        arr.iter()
            .map(|v| v.map_or(CellValue::Null, $make))
            .collect()
    }};
}

/// Convert a whole Arrow column into cells.
fn extract_cells(array: &ArrayRef) -> Result<Vec<CellValue>> {
    let cells: Vec<CellValue> = match array.data_type() {
        DataType::Int8 => primitive_cells!(array, Int8Type, |v| CellValue::Integer(v as i64)),
        DataType::Int16 => primitive_cells!(array, Int16Type, |v| CellValue::Integer(v as i64)),
        DataType::Int32 => primitive_cells!(array, Int32Type, |v| CellValue::Integer(v as i64)),
        DataType::Int64 => primitive_cells!(array, Int64Type, CellValue::Integer),
        DataType::UInt8 => primitive_cells!(array, UInt8Type, |v| CellValue::Integer(v as i64)),
        DataType::UInt16 => primitive_cells!(array, UInt16Type, |v| CellValue::Integer(v as i64)),
        DataType::UInt32 => primitive_cells!(array, UInt32Type, |v| CellValue::Integer(v as i64)),
        DataType::UInt64 => primitive_cells!(array, UInt64Type, |v| CellValue::Float(v as f64)),
        // NaN is how Polars and NumPy store a missing float.
        DataType::Float32 => primitive_cells!(array, Float32Type, |v| CellValue::float(v as f64)),
        DataType::Float64 => primitive_cells!(array, Float64Type, CellValue::float),
        DataType::Boolean => {
            let arr = array.as_boolean_opt().context("expected boolean array")?;
            arr.iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Bool))
                .collect()
        }
        dt => {
            // Strings, dates, timestamps and anything else go through Arrow's
            // own display formatting.
            let temporal = arrow_column_type(dt) == ColumnType::Temporal;
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())
                .context("formatting column")?;
            (0..array.len())
                .map(|row| {
                    if array.is_null(row) {
                        CellValue::Null
                    } else if temporal {
                        CellValue::Date(formatter.value(row).to_string())
                    } else {
                        CellValue::String(formatter.value(row).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_cells_are_typed_per_column() {
        let data = "age,city,member,joined,code\n\
                    25,Oslo,true,2024-01-05,7\n\
                    ,Rome,false,2023-12-31,x9\n\
                    30.5,,true,,12\n";
        let table = read_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column("age").unwrap().dtype(), ColumnType::Numeric);
        assert_eq!(table.column("city").unwrap().dtype(), ColumnType::Text);
        assert_eq!(table.column("member").unwrap().dtype(), ColumnType::Boolean);
        assert_eq!(table.column("joined").unwrap().dtype(), ColumnType::Temporal);
        assert_eq!(table.cell(1, "age"), Some(&CellValue::Null));
        assert_eq!(table.cell(2, "city"), Some(&CellValue::Null));

        // Mixed column: numbers stay text like the rest of the column.
        let code = table.column("code").unwrap();
        assert_eq!(code.dtype(), ColumnType::Text);
        assert_eq!(code.values()[0], CellValue::from("7"));
    }

    #[test]
    fn csv_rejects_ragged_rows() {
        let data = "a,b\n1,2\n3\n";
        assert!(read_csv(csv::Reader::from_reader(data.as_bytes())).is_err());
    }

    #[test]
    fn json_records_keep_first_seen_column_order() {
        let text = r#"[{"b": 1, "a": "x"}, {"a": null, "c": true}]"#;
        let table = read_json(text).unwrap();
        assert_eq!(table.column_names(), vec!["b", "a", "c"]);
        assert_eq!(table.cell(1, "b"), Some(&CellValue::Null));
        assert_eq!(table.cell(0, "c"), Some(&CellValue::Null));
        assert_eq!(table.column("c").unwrap().dtype(), ColumnType::Boolean);
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "name,score\nann,1\nbob,").unwrap();
        drop(f);

        let table = load_file(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(source_id(&path), "people.csv");

        let bad = dir.path().join("people.txt");
        std::fs::write(&bad, b"").unwrap();
        let err = load_file(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported"));
    }
}
