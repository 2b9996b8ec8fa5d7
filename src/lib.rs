//! Heart attack risk dashboard pipeline.
//!
//! Loads a record set, buckets cholesterol, triglycerides and age, and
//! computes the dashboard's aggregate tables.

pub mod aggregate;
pub mod buckets;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod loader;
pub mod records;

pub use aggregate::{aggregate, Aggregate, AggregationSpec, FixedKey, KeyOrder, Reduction, Row, Value};
pub use dashboard::{build_report, build_report_concurrently, DashboardReport, Panel, PANELS};
pub use error::{DashboardError, Result};
pub use loader::{Dataset, DatasetCache, SourceFormat};
