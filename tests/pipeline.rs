use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use heart_risk_dashboard::aggregate::{aggregate, Value};
use heart_risk_dashboard::dashboard::panel;
use heart_risk_dashboard::export;
use heart_risk_dashboard::records::CHOLESTEROL_CATEGORY;
use heart_risk_dashboard::{
    build_report, build_report_concurrently, DashboardError, Dataset, DatasetCache,
};
use tempfile::TempDir;

const HEADER: &str =
    "Patient ID,Age,Sex,Cholesterol,Triglycerides,Smoking,Country,Continent,Hemisphere,Heart Attack Risk";

fn write_csv(dir: &TempDir, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut contents = String::from(HEADER);
    for row in rows {
        contents.push('\n');
        contents.push_str(row);
    }
    contents.push('\n');
    fs::write(&path, contents).unwrap();
    path
}

fn sample(dir: &TempDir) -> PathBuf {
    write_csv(
        dir,
        "patients.csv",
        &[
            "A1,95,Male,150,120,0,China,Asia,Northern Hemisphere,1",
            "A2,90,Female,210,180,0,India,Asia,Northern Hemisphere,0",
            "A3,45,Male,260,600,1,Brazil,South America,Southern Hemisphere,1",
            "A4,33,Male,,300,1,Japan,Asia,Northern Hemisphere,1",
            "A5,61,Female,239,,0,Japan,Asia,Northern Hemisphere,0",
        ],
    )
}

fn load(path: &Path) -> Dataset {
    Dataset::load(path).unwrap()
}

#[test]
fn derived_columns_are_appended() {
    let dir = TempDir::new().unwrap();
    let dataset = load(&sample(&dir));
    let df = dataset.frame();
    assert_eq!(df.height(), 5);
    assert_eq!(df.width(), 13);
    assert!(df.column("Patient ID").is_ok());

    let categories: Vec<Option<&str>> = df
        .column(CHOLESTEROL_CATEGORY)
        .unwrap()
        .utf8()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        categories,
        vec![
            Some("Normal"),
            Some("Borderline High"),
            Some("High"),
            None,
            Some("Borderline High")
        ]
    );
}

#[test]
fn cholesterol_counts_cover_every_known_value() {
    let dir = TempDir::new().unwrap();
    let dataset = load(&sample(&dir));
    let spec = &panel("cholesterol_levels").unwrap().aggregation;
    let result = aggregate(&dataset, spec).unwrap();

    let total: f64 = result.rows().iter().filter_map(|row| row.value.as_f64()).sum();
    assert_eq!(total, 4.0);
    assert_eq!(result.get("Normal"), Some(Value::Count(1)));
    assert_eq!(result.get("Borderline High"), Some(Value::Count(2)));
    assert_eq!(result.get("High"), Some(Value::Count(1)));
}

#[test]
fn three_cholesterol_levels_one_each() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "three.csv",
        &[
            "B1,40,Male,150,100,0,China,Asia,Northern Hemisphere,0",
            "B2,40,Male,210,100,0,China,Asia,Northern Hemisphere,0",
            "B3,40,Male,260,100,0,China,Asia,Northern Hemisphere,0",
        ],
    );
    let dataset = load(&path);
    let result = aggregate(&dataset, &panel("cholesterol_levels").unwrap().aggregation).unwrap();
    let counts: Vec<(&str, Value)> = result.rows().iter().map(|row| (row.key.as_str(), row.value)).collect();
    assert_eq!(
        counts,
        vec![
            ("Normal", Value::Count(1)),
            ("Borderline High", Value::Count(1)),
            ("High", Value::Count(1)),
        ]
    );
}

#[test]
fn smokers_risk_sums_per_flag() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "smokers.csv",
        &[
            "C1,40,Male,150,100,0,China,Asia,Northern Hemisphere,1",
            "C2,40,Male,150,100,0,China,Asia,Northern Hemisphere,0",
            "C3,40,Male,150,100,1,China,Asia,Northern Hemisphere,1",
        ],
    );
    let dataset = load(&path);
    let result = aggregate(&dataset, &panel("smoker_risk").unwrap().aggregation).unwrap();
    assert_eq!(result.get("Non-Smoker"), Some(Value::Sum(1.0)));
    assert_eq!(result.get("Smoker"), Some(Value::Sum(1.0)));
}

#[test]
fn asian_countries_are_always_six_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "asia.csv",
        &[
            "D1,40,Male,150,100,0,China,Asia,Northern Hemisphere,1",
            "D2,40,Male,150,100,0,India,Asia,Northern Hemisphere,1",
            "D3,40,Male,150,100,0,Japan,Asia,Northern Hemisphere,0",
            "D4,40,Male,150,100,0,Thailand,Asia,Northern Hemisphere,1",
            "D5,40,Male,150,100,0,Germany,Europe,Northern Hemisphere,1",
        ],
    );
    let dataset = load(&path);
    let result = aggregate(&dataset, &panel("asian_country_risk").unwrap().aggregation).unwrap();
    let keys: Vec<&str> = result.rows().iter().map(|row| row.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["South Korea", "Thailand", "China", "Vietnam", "Japan", "India"]
    );
    let zeros = result
        .rows()
        .iter()
        .filter(|row| row.value == Value::Sum(0.0))
        .count();
    // South Korea and Vietnam are absent, Japan is present with no risk.
    assert_eq!(zeros, 3);
    assert_eq!(result.get("Germany"), None);
}

#[test]
fn age_groups_in_chronological_order() {
    let dir = TempDir::new().unwrap();
    let dataset = load(&sample(&dir));
    let result = aggregate(&dataset, &panel("age_group_risk").unwrap().aggregation).unwrap();
    let keys: Vec<&str> = result.rows().iter().map(|row| row.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["21-30", "31-40", "41-50", "51-60", "61-70", "71-80", "81-90", "91+"]
    );
    assert_eq!(result.get("91+"), Some(Value::Sum(1.0)));
    assert_eq!(result.get("81-90"), Some(Value::Sum(0.0)));
    assert_eq!(result.get("31-40"), Some(Value::Sum(1.0)));
    assert_eq!(result.get("41-50"), Some(Value::Sum(1.0)));
}

#[test]
fn triglyceride_means_skip_missing_categories() {
    let dir = TempDir::new().unwrap();
    let dataset = load(&sample(&dir));
    let result = aggregate(&dataset, &panel("triglycerides_risk").unwrap().aggregation).unwrap();
    assert_eq!(result.get("Normal"), Some(Value::Mean(Some(1.0))));
    assert_eq!(result.get("Borderline"), Some(Value::Mean(Some(0.0))));
    assert_eq!(result.get("High"), Some(Value::Mean(Some(1.0))));
    assert_eq!(result.get("Very High"), Some(Value::Mean(Some(1.0))));
}

#[test]
fn aggregation_order_does_not_matter() {
    let dir = TempDir::new().unwrap();
    let dataset = load(&sample(&dir));
    let countries = &panel("asian_country_risk").unwrap().aggregation;
    let smokers = &panel("smoker_risk").unwrap().aggregation;

    let countries_first = aggregate(&dataset, countries).unwrap();
    let smokers_second = aggregate(&dataset, smokers).unwrap();
    let smokers_first = aggregate(&dataset, smokers).unwrap();
    let countries_second = aggregate(&dataset, countries).unwrap();

    assert_eq!(countries_first, countries_second);
    assert_eq!(smokers_first, smokers_second);
}

#[test]
fn full_report_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let first = serde_json::to_vec(&build_report(&load(&path)).unwrap()).unwrap();
    let second = serde_json::to_vec(&build_report(&load(&path)).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_report_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let dataset = Arc::new(load(&sample(&dir)));
    let sequential = build_report(&dataset).unwrap();
    let concurrent = build_report_concurrently(Arc::clone(&dataset)).await.unwrap();
    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent.panels.len(), 11);
    assert_eq!(concurrent.records, 5);
}

#[test]
fn report_headline_numbers() {
    let dir = TempDir::new().unwrap();
    let report = build_report(&load(&sample(&dir))).unwrap();
    assert_eq!(
        report.panel("total_candidates").unwrap().result,
        heart_risk_dashboard::Aggregate::Scalar { value: Value::Count(5) }
    );
    assert_eq!(
        report.panel("patients_at_risk").unwrap().result,
        heart_risk_dashboard::Aggregate::Scalar { value: Value::Sum(3.0) }
    );

    let gender = &report.panel("gender_distribution").unwrap().result;
    let keys: Vec<&str> = gender.rows().iter().map(|row| row.key.as_str()).collect();
    assert_eq!(keys, vec!["Male", "Female"]);

    let continents = &report.panel("continent_risk").unwrap().result;
    let keys: Vec<&str> = continents.rows().iter().map(|row| row.key.as_str()).collect();
    assert_eq!(keys, vec!["Asia", "South America"]);
    assert_eq!(continents.get("Asia"), Some(Value::Sum(2.0)));

    let hemispheres = &report.panel("hemisphere_risk").unwrap().result;
    assert_eq!(hemispheres.get("Northern Hemisphere"), Some(Value::Sum(2.0)));
    assert_eq!(hemispheres.get("Southern Hemisphere"), Some(Value::Sum(1.0)));
}

#[test]
fn cache_loads_each_path_once() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let mut cache = DatasetCache::new();
    let first = cache.get_or_load(&path).unwrap();
    fs::remove_file(&path).unwrap();
    let second = cache.get_or_load(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn cache_treats_path_spellings_as_one_file() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let dotted = dir.path().join(".").join("patients.csv");
    let mut cache = DatasetCache::new();
    let first = cache.get_or_load(&path).unwrap();
    let second = cache.get_or_load(&dotted).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn missing_required_column_is_a_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.csv");
    fs::write(&path, "Age,Sex,Cholesterol\n40,Male,150\n").unwrap();
    match Dataset::load(&path) {
        Err(DashboardError::Schema { missing }) => {
            assert!(missing.contains(&"Heart Attack Risk".to_string()));
            assert!(missing.contains(&"Triglycerides".to_string()));
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
}

#[test]
fn missing_or_unsupported_file_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Dataset::load(dir.path().join("data.xlsx")),
        Err(DashboardError::Load { .. })
    ));

    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not a table").unwrap();
    assert!(matches!(Dataset::load(&notes), Err(DashboardError::Load { .. })));
}

#[test]
fn snapshot_round_trips_through_parquet() {
    let dir = TempDir::new().unwrap();
    let dataset = load(&sample(&dir));
    let snapshot = dir.path().join(export::SNAPSHOT_FILE_NAME);
    export::write_snapshot(&snapshot, &dataset).unwrap();

    let reloaded = load(&snapshot);
    assert_eq!(
        build_report(&reloaded).unwrap().panels,
        build_report(&dataset).unwrap().panels
    );
}

#[test]
fn source_is_copied_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let dataset = load(&path);
    let out = TempDir::new().unwrap();
    let copied = export::copy_source(out.path(), &dataset).unwrap().unwrap();
    assert_eq!(fs::read(copied).unwrap(), fs::read(&path).unwrap());
}
