/// Data layer: typed tables, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (column types inferred)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  schema + rows of typed Values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  row constraints / projection → new Table
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
