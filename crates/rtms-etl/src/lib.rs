//! RTMS ETL Library
//!
//! One-shot extraction of real-estate transaction records from the
//! paginated open-data XML API into a typed CSV object in S3.
//!
//! # Pipeline
//!
//! 1. [`pagination::PaginationController`] fetches page 1, reads
//!    `totalCount`, and walks pages `1..=N` sequentially
//! 2. [`extract`] flattens every `<item>` into a [`Record`] per the
//!    [`FieldSchema`]
//! 3. [`Table::build`] coerces columns to their declared types
//! 4. [`sink::CsvSink`] writes the table as BOM-prefixed UTF-8 CSV
//!
//! # Example
//!
//! ```no_run
//! use rtms_etl::config::{EtlConfig, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EtlConfig::load("env", "dev", RunConfig::default())?;
//!     let summary = rtms_etl::run_etl(&config).await?;
//!     println!("rows: {}", summary.row_count);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod job;
pub mod pagination;
pub mod record;
pub mod schema;
pub mod sink;
pub mod table;

pub use error::{EtlError, Result};
pub use job::{run_etl, EtlJob, RunSummary};
pub use record::{Record, RecordSet};
pub use schema::{FieldDef, FieldSchema, FieldType};
pub use table::Table;
