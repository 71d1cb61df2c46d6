use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use data_viz::data::export;
use data_viz::{CellValue, Column, Table};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const ROWS: usize = 200;
const MISSING_RATE: f64 = 0.08;
const OUTLIER_RATE: f64 = 0.03;

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let cities = ["Oslo", "Rome", "Lima", "Pune", "Kyiv"];

    let mut ids = Vec::with_capacity(ROWS);
    let mut ages: Vec<Option<i64>> = Vec::with_capacity(ROWS);
    let mut incomes: Vec<Option<f64>> = Vec::with_capacity(ROWS);
    let mut city_col: Vec<Option<String>> = Vec::with_capacity(ROWS);
    let mut members: Vec<Option<bool>> = Vec::with_capacity(ROWS);
    let mut signups: Vec<Option<String>> = Vec::with_capacity(ROWS);

    for i in 0..ROWS {
        ids.push(i as i64);

        let mut age = rng.gauss(38.0, 9.0).round().max(18.0) as i64;
        if rng.chance(OUTLIER_RATE) {
            age *= 5;
        }
        ages.push((!rng.chance(MISSING_RATE)).then_some(age));

        let mut income = (rng.gauss(52_000.0, 12_000.0) / 10.0).round() * 10.0;
        if rng.chance(OUTLIER_RATE) {
            income *= 20.0;
        }
        incomes.push((!rng.chance(MISSING_RATE)).then_some(income));

        let city = rng.pick(&cities).to_string();
        city_col.push((!rng.chance(MISSING_RATE)).then_some(city));

        members.push((!rng.chance(MISSING_RATE)).then_some(rng.chance(0.4)));

        let day = 1 + rng.next_u64() % 28;
        let month = 1 + rng.next_u64() % 12;
        signups.push((!rng.chance(MISSING_RATE)).then(|| format!("2024-{month:02}-{day:02}")));
    }

    // CSV through the library's own table + exporter.
    let table = Table::from_columns(vec![
        Column::new("id", ids.iter().map(|&v| v.into()).collect()),
        Column::new("age", ages.iter().map(|&v| v.into()).collect()),
        Column::new("income", incomes.iter().map(|&v| v.into()).collect()),
        Column::new(
            "city",
            city_col.iter().map(|v| v.as_deref().into()).collect(),
        ),
        Column::new("member", members.iter().map(|&v| v.into()).collect()),
        Column::new(
            "signup",
            signups
                .iter()
                .map(|v| v.clone().map_or(CellValue::Null, CellValue::Date))
                .collect(),
        ),
    ])?;
    let csv_path = std::path::Path::new("sample_data.csv");
    export::save_csv(&table, csv_path)?;

    // Same data as Parquet.
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("age", DataType::Int64, true),
        Field::new("income", DataType::Float64, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("member", DataType::Boolean, true),
        Field::new("signup", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Int64Array::from(ages)),
            Arc::new(Float64Array::from(incomes)),
            Arc::new(StringArray::from(city_col)),
            Arc::new(BooleanArray::from(members)),
            Arc::new(StringArray::from(signups)),
        ],
    )
    .context("building record batch")?;

    let parquet_path = "sample_data.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {ROWS} rows to {} and {parquet_path}",
        csv_path.display()
    );
    Ok(())
}
