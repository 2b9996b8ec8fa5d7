use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info};
use polars::prelude::*;
use polars_io::parquet::ParquetReader;

use crate::config::{BucketTable, BUCKET_TABLES};
use crate::error::{DashboardError, Result};
use crate::records::HeartRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
    Spreadsheet,
}

impl SourceFormat {
    pub fn infer(path: &Path) -> Option<SourceFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "parquet" => Some(SourceFormat::Parquet),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(SourceFormat::Spreadsheet),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "text/csv",
            SourceFormat::Parquet => "application/vnd.apache.parquet",
            SourceFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| DashboardError::load(path, e))?;

    CsvReader::new(file)
        .has_header(true)
        .finish()
        .map_err(|e| DashboardError::load(path, e))
}

pub fn read_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| DashboardError::load(path, e))?;

    ParquetReader::new(file)
        .finish()
        .map_err(|e| DashboardError::load(path, e))
}

/// Reads the first worksheet of a workbook. The first row is the header.
pub fn read_spreadsheet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| DashboardError::load(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DashboardError::load(path, "workbook has no worksheets"))?
        .map_err(|e| DashboardError::load(path, e))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => header_names(row),
        None => return Err(DashboardError::load(path, "worksheet is empty")),
    };

    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); header.len()];
    for row in rows {
        for (index, column) in columns.iter_mut().enumerate() {
            column.push(row.get(index).map(Cell::from).unwrap_or(Cell::Empty));
        }
    }

    let series: Vec<Series> = header
        .iter()
        .zip(columns.iter())
        .map(|(name, cells)| column_from_cells(name, cells))
        .collect();
    DataFrame::new(series).map_err(|e| DashboardError::load(path, e))
}

/// Header cells as column names. Blank headers are named by position.
fn header_names(row: &[Data]) -> Vec<String> {
    row.iter()
        .enumerate()
        .map(|(index, cell)| {
            let name = cell.to_string();
            if name.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(value) => Cell::Number(*value as f64),
            Data::Float(value) => Cell::Number(*value),
            Data::Bool(value) => Cell::Number(if *value { 1.0 } else { 0.0 }),
            Data::String(value) if value.trim().is_empty() => Cell::Empty,
            Data::String(value) => Cell::Text(value.clone()),
            Data::Empty | Data::Error(_) => Cell::Empty,
            other => Cell::Text(other.to_string()),
        }
    }
}

/// A column is numeric when every non-empty cell is a number, text otherwise.
fn column_from_cells(name: &str, cells: &[Cell]) -> Series {
    let numeric = cells
        .iter()
        .all(|cell| !matches!(cell, Cell::Text(_)));
    if numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Cell::Number(value) => Some(*value),
                _ => None,
            })
            .collect();
        Series::new(name, values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|cell| match cell {
                Cell::Number(value) => Some(value.to_string()),
                Cell::Text(value) => Some(value.clone()),
                Cell::Empty => None,
            })
            .collect();
        Series::new(name, values)
    }
}

pub fn read_source<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DashboardError::load(path, "file not found"));
    }
    match SourceFormat::infer(path) {
        Some(SourceFormat::Csv) => read_csv(path),
        Some(SourceFormat::Parquet) => read_parquet(path),
        Some(SourceFormat::Spreadsheet) => read_spreadsheet(path),
        None => Err(DashboardError::load(path, "unsupported file format")),
    }
}

/// Raw bytes of the source file, for the download affordance.
pub fn source_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| DashboardError::load(path, e))
}

pub fn validate_schema(df: &DataFrame) -> Result<()> {
    let present = df.get_column_names();
    let missing: Vec<String> = HeartRecord::required_columns()
        .into_iter()
        .filter(|name| !present.contains(name))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashboardError::Schema { missing })
    }
}

/// Casts every column the pipeline reads to its working dtype.
pub fn normalize(mut df: DataFrame) -> Result<DataFrame> {
    for (name, dtype) in HeartRecord::raw_columns() {
        let series = df.column(name)?.cast(&dtype)?;
        df.with_column(series)?;
    }
    Ok(df)
}

/// Appends one label column per bucket table.
pub fn derive_categories(df: DataFrame, tables: &[BucketTable]) -> Result<DataFrame> {
    let mut lf = df.lazy();
    for table in tables {
        let bucketer = table.bucketer()?;
        debug!("bucketing {:?} into {:?}", table.source, table.target);
        lf = lf.with_column(
            col(table.source)
                .apply(
                    move |s: Series| bucketer.bucket_series(&s).map(Some),
                    GetOutput::from_type(DataType::Utf8),
                )
                .alias(table.target),
        );
    }
    Ok(lf.collect()?)
}

/// The loaded record set: source columns plus the derived categories.
/// Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    frame: DataFrame,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let df = read_source(path)?;
        info!("read {} rows from {:?}", df.height(), path);
        let mut dataset = Dataset::from_frame(df)?;
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    pub fn from_frame(df: DataFrame) -> Result<Self> {
        // Bucket tables are checked before any record is touched.
        for table in BUCKET_TABLES.iter() {
            table.bucketer()?;
        }
        validate_schema(&df)?;
        let df = normalize(df)?;
        let frame = derive_categories(df, &BUCKET_TABLES)?;
        Ok(Dataset {
            source: None,
            frame,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Loaded datasets keyed by canonical source path. Each file is read at most
/// once per cache, however the caller spells its path; callers share the
/// returned handle.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<Dataset>>,
    aliases: HashMap<PathBuf, PathBuf>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Dataset>> {
        let path = path.as_ref();
        let canonical = match self.aliases.get(path) {
            Some(canonical) => canonical.clone(),
            None => {
                if !path.exists() {
                    return Err(DashboardError::load(path, "file not found"));
                }
                let canonical = fs::canonicalize(path).map_err(|e| DashboardError::load(path, e))?;
                self.aliases.insert(path.to_path_buf(), canonical.clone());
                canonical
            }
        };
        if let Some(dataset) = self.entries.get(&canonical) {
            debug!("cache hit for {:?}", canonical);
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(Dataset::load(&canonical)?);
        self.entries.insert(canonical, Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
