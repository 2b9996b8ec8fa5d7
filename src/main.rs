use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgAction, Parser};
use env_logger::{Builder, Env};
use heart_risk_dashboard::export::{self, REPORT_FILE_NAME, SNAPSHOT_FILE_NAME};
use heart_risk_dashboard::{build_report, build_report_concurrently, DatasetCache, Result};
use log::{debug, info, LevelFilter};
use sysinfo::{ProcessExt, System, SystemExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Computes the heart attack risk dashboard tables", long_about = None)]
struct Args {
    /// Source spreadsheet (.xlsx, .csv or .parquet)
    #[arg(default_value = "data.xlsx")]
    input: PathBuf,
    /// Directory the report and panel tables are written to
    #[arg(short, long, default_value = "data/output")]
    output: PathBuf,
    /// Verbose level
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Compute panels concurrently
    #[arg(long)]
    parallel: bool,
    /// Also write the enriched dataset as parquet
    #[arg(long)]
    snapshot: bool,
    /// Also copy the raw source file next to the report
    #[arg(long)]
    copy_source: bool,
}

fn monitor_memory() -> u64 {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(_) => return 0,
    };
    let mut system = System::new();
    system.refresh_process(pid);
    system.process(pid).map(|process| process.memory()).unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let env = Env::new().filter("DASHBOARD_LOG");
    Builder::new()
        .filter(Some("heart_risk_dashboard"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", args);

    let start_time = Instant::now();
    let start_memory = monitor_memory();

    let mut cache = DatasetCache::new();
    let dataset = cache.get_or_load(&args.input)?;

    let report = if args.parallel {
        build_report_concurrently(dataset.clone()).await?
    } else {
        build_report(&dataset)?
    };

    fs::create_dir_all(&args.output)?;
    export::write_report_json(args.output.join(REPORT_FILE_NAME), &report)?;
    let tables = export::write_panel_tables(args.output.join("panels"), &report)?;
    info!("wrote report and {} panel tables to {:?}", tables.len(), args.output);

    if args.snapshot {
        export::write_snapshot(args.output.join(SNAPSHOT_FILE_NAME), &dataset)?;
    }
    if args.copy_source {
        export::copy_source(&args.output, &dataset)?;
    }

    let end_memory = monitor_memory();
    let duration = start_time.elapsed();

    info!("Time elapsed: {:?}", duration);
    info!("Memory used: {} bytes", end_memory.saturating_sub(start_memory));

    Ok(())
}
