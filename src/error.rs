use std::path::{Path, PathBuf};

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("cannot load {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("missing required column(s) {missing:?}")]
    Schema { missing: Vec<String> },
    #[error("bucket table {table:?}: {reason}")]
    Bucket { table: String, reason: String },
    #[error("invalid aggregation: {reason}")]
    InvalidSpec { reason: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Task(#[from] tokio::task::JoinError),
}

impl DashboardError {
    pub fn load(path: &Path, reason: impl ToString) -> Self {
        DashboardError::Load {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
