//! Weekly pivot report over an "AutoComplete" workbook.
//!
//! The pipeline is `loader` → `aggregate` → `report`, driven by `pivot::run`.

pub mod aggregate;
pub mod cell;
pub mod config;
pub mod error;
pub mod loader;
pub mod pivot;
pub mod report;

pub use aggregate::{WeeklyAggregate, aggregate};
pub use config::PivotConfig;
pub use error::PivotError;
pub use loader::{Row, SourceTable, load_table};
