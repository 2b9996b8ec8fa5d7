use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::info;
use polars::prelude::*;
use polars_io::parquet::ParquetWriter;
use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::dashboard::DashboardReport;
use crate::error::Result;
use crate::loader::{self, Dataset};

pub static REPORT_FILE_NAME: &str = "report.json";
pub static SNAPSHOT_FILE_NAME: &str = "enriched.parquet";

#[derive(Serialize)]
struct TableRecord<'a> {
    key: &'a str,
    value: Option<f64>,
}

#[derive(Serialize)]
struct ScalarRecord {
    value: Option<f64>,
}

pub fn write_report_json<P: AsRef<Path>>(path: P, report: &DashboardReport) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

/// One `<panel id>.csv` per panel in `dir`.
pub fn write_panel_tables<P: AsRef<Path>>(dir: P, report: &DashboardReport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(report.panels.len());
    for panel in &report.panels {
        let path = dir.join(format!("{}.csv", panel.id));
        let mut writer = csv::Writer::from_path(&path)?;
        match &panel.result {
            Aggregate::Scalar { value } => writer.serialize(ScalarRecord {
                value: value.as_f64(),
            })?,
            Aggregate::Table { rows } => {
                for row in rows {
                    writer.serialize(TableRecord {
                        key: &row.key,
                        value: row.value.as_f64(),
                    })?;
                }
            }
        }
        writer.flush()?;
        written.push(path);
    }
    Ok(written)
}

pub fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path.as_ref())?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

/// The enriched record set: source columns plus derived categories.
pub fn write_snapshot<P: AsRef<Path>>(path: P, dataset: &Dataset) -> Result<()> {
    let mut df = dataset.frame().clone();
    write_parquet(path, &mut df)
}

/// Copies the raw source file into `dir` under its own file name.
pub fn copy_source<P: AsRef<Path>>(dir: P, dataset: &Dataset) -> Result<Option<PathBuf>> {
    let source = match dataset.source() {
        Some(source) => source,
        None => return Ok(None),
    };
    let name = match source.file_name() {
        Some(name) => name,
        None => return Ok(None),
    };
    let bytes = loader::source_bytes(source)?;
    let target = dir.as_ref().join(name);
    fs::write(&target, bytes)?;
    info!("copied source {:?} to {:?}", source, target);
    Ok(Some(target))
}
