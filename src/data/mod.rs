/// Data layer: core types, loading, and export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (typed columns)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Column>, each Vec<CellValue> + ColumnType
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Table → CSV bytes
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
