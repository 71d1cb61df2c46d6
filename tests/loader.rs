use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use data_viz::clean::ColumnOutcome;
use data_viz::data::{export, loader};
use data_viz::{CellValue, ColumnType, DatasetState, Strategy};

fn write_parquet(path: &std::path::Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("age", DataType::Int32, true),
        Field::new("score", DataType::Float64, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("joined", DataType::Date32, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(vec![Some(25), None, Some(31)])),
            Arc::new(Float64Array::from(vec![None::<f64>, None, None])),
            Arc::new(StringArray::from(vec![Some("Oslo"), Some("Rome"), None])),
            Arc::new(Date32Array::from(vec![Some(19_723), None, Some(0)])),
        ],
    )
    .unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn parquet_schema_types_and_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.parquet");
    write_parquet(&path);

    let table = loader::load_file(&path).unwrap();
    assert_eq!(table.column_names(), vec!["age", "score", "city", "joined"]);
    assert_eq!(table.cell(0, "age"), Some(&CellValue::Integer(25)));
    assert_eq!(table.cell(1, "age"), Some(&CellValue::Null));
    assert_eq!(table.cell(2, "city"), Some(&CellValue::Null));
    assert_eq!(table.cell(2, "joined"), Some(&CellValue::Date("1970-01-01".into())));
    assert_eq!(table.column("joined").unwrap().dtype(), ColumnType::Temporal);

    // An all-null float column keeps its numeric type from the schema.
    let score = table.column("score").unwrap();
    assert_eq!(score.dtype(), ColumnType::Numeric);
    assert_eq!(score.missing_count(), 3);
}

#[test]
fn all_null_numeric_column_cannot_be_mean_filled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.parquet");
    write_parquet(&path);

    let mut state = DatasetState::new();
    state.load(loader::load_file(&path).unwrap(), &loader::source_id(&path));
    let report = state
        .apply_missing_strategy(Strategy::FillMean, &["score", "age"])
        .unwrap();

    assert!(report.has_warnings());
    let current = state.current().unwrap();
    assert_eq!(current.column("score").unwrap().missing_count(), 3);
    assert_eq!(current.cell(1, "age"), Some(&CellValue::Integer(28)));
}

#[test]
fn parquet_nan_counts_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.parquet");
    let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Float64, true)]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(Float64Array::from(vec![
            Some(1.0),
            Some(2.0),
            Some(3.0),
            Some(4.0),
            Some(f64::NAN),
            None,
        ]))],
    )
    .unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = loader::load_file(&path).unwrap();
    assert_eq!(table.cell(4, "x"), Some(&CellValue::Null));
    assert_eq!(table.column("x").unwrap().missing_count(), 2);

    let mut state = DatasetState::new();
    state.load(table, &loader::source_id(&path));
    let report = state.apply_missing_strategy(Strategy::FillMean, &["x"]).unwrap();
    assert_eq!(
        report.columns,
        vec![ColumnOutcome::Filled {
            column: "x".into(),
            value: CellValue::Float(2.5),
            cells: 2,
        }]
    );
    let current = state.current().unwrap();
    assert_eq!(current.column("x").unwrap().missing_count(), 0);
    assert_eq!(current.cell(5, "x"), Some(&CellValue::Float(2.5)));
}

#[test]
fn csv_export_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.csv");
    std::fs::write(&src, "name,age,joined\nann,31,2024-02-01\nbob,,2023-11-30\n").unwrap();

    let table = loader::load_file(&src).unwrap();
    let out = dir.path().join("out.csv");
    export::save_csv(&table, &out).unwrap();

    assert_eq!(loader::load_file(&out).unwrap(), table);
}

#[cfg(feature = "excel")]
#[test]
fn xlsx_export_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.csv");
    std::fs::write(
        &src,
        "name,age,score,member,joined\n\
         ann,31,1.5,true,2024-02-01\n\
         bob,,2.25,false,2023-11-30\n",
    )
    .unwrap();

    let table = loader::load_file(&src).unwrap();
    let out = dir.path().join("cleaned_data.xlsx");
    export::save(&table, &out).unwrap();

    let back = loader::load_file(&out).unwrap();
    assert_eq!(back.cell(1, "age"), Some(&CellValue::Null));
    assert_eq!(back.column("joined").unwrap().dtype(), ColumnType::Temporal);
    assert_eq!(back, table);
}
