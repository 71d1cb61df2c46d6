use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::model::{CellValue, Table};

/// Write `table` as CSV: header row, then one record per row.
/// Missing cells are written as empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.column_names())
        .context("writing CSV header")?;
    for (row_no, row) in table.rows().enumerate() {
        wtr.write_record(row.iter().map(|v| cell_text(v)))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

pub fn save_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(table, std::io::BufWriter::new(file))
}

/// Save `table` to `path`, picking the format from the extension
/// (`.csv`, or `.xlsx` with the `excel` feature).
pub fn save(table: &Table, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => save_csv(table, path),
        #[cfg(feature = "excel")]
        "xlsx" => save_xlsx(table, path),
        other => bail!("Unsupported export extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Excel
// ---------------------------------------------------------------------------

/// One worksheet, header row first, missing cells left blank.
#[cfg(feature = "excel")]
fn build_workbook(table: &Table) -> Result<rust_xlsxwriter::Workbook> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col_no, name) in table.column_names().into_iter().enumerate() {
        let col = u16::try_from(col_no).context("too many columns for a worksheet")?;
        sheet.write_string(0, col, name)?;
    }
    for (row_no, row) in table.rows().enumerate() {
        let r = u32::try_from(row_no + 1).context("too many rows for a worksheet")?;
        for (col_no, cell) in row.into_iter().enumerate() {
            let c = u16::try_from(col_no).context("too many columns for a worksheet")?;
            match cell {
                v if v.is_missing() => {}
                CellValue::Integer(i) => {
                    sheet.write_number(r, c, *i as f64)?;
                }
                CellValue::Float(f) => {
                    sheet.write_number(r, c, *f)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                CellValue::String(s) | CellValue::Date(s) => {
                    sheet.write_string(r, c, s.as_str())?;
                }
                CellValue::Null => {}
            }
        }
    }
    Ok(workbook)
}

#[cfg(feature = "excel")]
pub fn to_xlsx_bytes(table: &Table) -> Result<Vec<u8>> {
    build_workbook(table)?
        .save_to_buffer()
        .context("writing workbook")
}

#[cfg(feature = "excel")]
pub fn save_xlsx(table: &Table, path: &Path) -> Result<()> {
    build_workbook(table)?
        .save(path)
        .with_context(|| format!("writing {}", path.display()))
}

/// Floats always carry a decimal point or exponent so a reload keeps them
/// as floats (`40000.0`, not `40000`).
fn cell_text(v: &CellValue) -> String {
    match v {
        v if v.is_missing() => String::new(),
        CellValue::Float(f) => format!("{f:?}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;
    use crate::data::model::Column;

    #[test]
    fn writes_missing_as_empty_fields() {
        let table = Table::from_columns(vec![
            Column::new("name", vec!["a,b".into(), CellValue::Null]),
            Column::new("score", vec![1.5f64.into(), 2i64.into()]),
        ])
        .unwrap();
        let text = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        assert_eq!(text, "name,score\n\"a,b\",1.5\n,2\n");

        let back = read_csv(csv::Reader::from_reader(text.as_bytes())).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn save_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::from_columns(vec![Column::new("x", vec![1i64.into()])]).unwrap();
        let err = save(&table, &dir.path().join("out.txt")).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));

        let path = dir.path().join("out.csv");
        save(&table, &path).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x\n1\n");
    }

    #[cfg(feature = "excel")]
    #[test]
    fn xlsx_bytes_are_a_zip_archive() {
        let table = Table::from_columns(vec![Column::new("x", vec![1i64.into()])]).unwrap();
        let bytes = to_xlsx_bytes(&table).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn whole_floats_stay_floats() {
        let table = Table::from_columns(vec![
            Column::new("id", vec![1i64.into(), 2i64.into(), 3i64.into()]),
            Column::new(
                "income",
                vec![40_000.0f64.into(), CellValue::Null, 52_500.5f64.into()],
            ),
        ])
        .unwrap();
        let text = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        assert_eq!(text, "id,income\n1,40000.0\n2,\n3,52500.5\n");

        let back = read_csv(csv::Reader::from_reader(text.as_bytes())).unwrap();
        assert_eq!(back.cell(0, "income"), Some(&CellValue::Float(40_000.0)));
        assert_eq!(back, table);
    }
}
