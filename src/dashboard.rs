use std::path::PathBuf;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, info};
use serde::Serialize;

use crate::aggregate::{aggregate, Aggregate, AggregationSpec};
use crate::config::{self, CHOLESTEROL_BUCKETS, TRIGLYCERIDES_BUCKETS};
use crate::error::Result;
use crate::loader::Dataset;
use crate::records;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Metric,
    Bar,
    Pie,
    Line,
}

#[derive(Debug, Clone)]
pub struct PanelSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub chart: ChartKind,
    pub aggregation: AggregationSpec,
}

lazy_static! {
    pub static ref PANELS: Vec<PanelSpec> = vec![
        PanelSpec {
            id: "total_candidates",
            title: "Total Candidates",
            chart: ChartKind::Metric,
            aggregation: AggregationSpec::count(),
        },
        PanelSpec {
            id: "patients_at_risk",
            title: "Patients at Risk of Heart Attack",
            chart: ChartKind::Metric,
            aggregation: AggregationSpec::sum(records::HEART_ATTACK_RISK),
        },
        PanelSpec {
            id: "gender_distribution",
            title: "Gender-Wise Risk",
            chart: ChartKind::Pie,
            aggregation: AggregationSpec::distribution().by(records::SEX),
        },
        PanelSpec {
            id: "cholesterol_levels",
            title: "Cholesterol Level Amongst Population",
            chart: ChartKind::Bar,
            aggregation: AggregationSpec::count()
                .by(records::CHOLESTEROL_CATEGORY)
                .ordered(CHOLESTEROL_BUCKETS.fixed_keys()),
        },
        PanelSpec {
            id: "asian_country_risk",
            title: "Risk of Heart Attack in Asian Countries",
            chart: ChartKind::Bar,
            aggregation: AggregationSpec::sum(records::HEART_ATTACK_RISK)
                .by(records::COUNTRY)
                .ordered(config::asian_country_keys()),
        },
        PanelSpec {
            id: "triglycerides_risk",
            title: "Heart Attack Risk by Triglycerides Level",
            chart: ChartKind::Line,
            aggregation: AggregationSpec::mean(records::HEART_ATTACK_RISK)
                .by(records::TRIGLYCERIDES_CATEGORY)
                .ordered(TRIGLYCERIDES_BUCKETS.fixed_keys()),
        },
        PanelSpec {
            id: "cholesterol_share",
            title: "Risk by Cholesterol Level",
            chart: ChartKind::Pie,
            aggregation: AggregationSpec::distribution().by(records::CHOLESTEROL_CATEGORY),
        },
        PanelSpec {
            id: "continent_risk",
            title: "Continent-wise Risk of Heart Attack",
            chart: ChartKind::Line,
            aggregation: AggregationSpec::sum(records::HEART_ATTACK_RISK).by(records::CONTINENT),
        },
        PanelSpec {
            id: "smoker_risk",
            title: "Risk among Smokers",
            chart: ChartKind::Pie,
            aggregation: AggregationSpec::sum(records::HEART_ATTACK_RISK)
                .by(records::SMOKING)
                .ordered(config::smoking_keys()),
        },
        PanelSpec {
            id: "age_group_risk",
            title: "Age Wise Risk",
            chart: ChartKind::Bar,
            aggregation: AggregationSpec::sum(records::HEART_ATTACK_RISK)
                .by(records::AGE_GROUP)
                .ordered(config::AGE_BUCKETS.fixed_keys()),
        },
        PanelSpec {
            id: "hemisphere_risk",
            title: "Hemisphere-wise Risk of Heart Attack",
            chart: ChartKind::Bar,
            aggregation: AggregationSpec::sum(records::HEART_ATTACK_RISK).by(records::HEMISPHERE),
        },
    ];
}

pub fn panel(id: &str) -> Option<&'static PanelSpec> {
    PANELS.iter().find(|panel| panel.id == id)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub id: String,
    pub title: String,
    pub chart: ChartKind,
    pub result: Aggregate,
}

impl Panel {
    fn compute(spec: &PanelSpec, dataset: &Dataset) -> Result<Panel> {
        debug!("computing panel {}", spec.id);
        Ok(Panel {
            id: spec.id.to_string(),
            title: spec.title.to_string(),
            chart: spec.chart,
            result: aggregate(dataset, &spec.aggregation)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub source: Option<PathBuf>,
    pub records: usize,
    pub panels: Vec<Panel>,
}

impl DashboardReport {
    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.iter().find(|panel| panel.id == id)
    }
}

/// Computes every panel in order on the calling thread.
pub fn build_report(dataset: &Dataset) -> Result<DashboardReport> {
    let panels = PANELS
        .iter()
        .map(|spec| Panel::compute(spec, dataset))
        .collect::<Result<Vec<_>>>()?;
    info!("computed {} panels over {} records", panels.len(), dataset.len());
    Ok(DashboardReport {
        source: dataset.source().map(|path| path.to_path_buf()),
        records: dataset.len(),
        panels,
    })
}

/// Computes each panel on its own blocking task. Panels only read the shared
/// dataset, so the report matches `build_report`.
pub async fn build_report_concurrently(dataset: Arc<Dataset>) -> Result<DashboardReport> {
    let handles: Vec<_> = PANELS
        .iter()
        .map(|spec| {
            let dataset = Arc::clone(&dataset);
            tokio::task::spawn_blocking(move || Panel::compute(spec, &dataset))
        })
        .collect();

    let mut panels = Vec::with_capacity(handles.len());
    for handle in handles {
        panels.push(handle.await??);
    }
    info!(
        "computed {} panels concurrently over {} records",
        panels.len(),
        dataset.len()
    );
    Ok(DashboardReport {
        source: dataset.source().map(|path| path.to_path_buf()),
        records: dataset.len(),
        panels,
    })
}
