use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::YearSource;
use crate::fetch::{HttpClient, read_source};
use crate::output::{write_json, write_table};
use crate::parser::parse_segments;
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::dataset::SegmentDataset;
use crate::pipeline::derive::derive_metrics;
use crate::pipeline::qualify::qualify_connections;
use crate::pipeline::types::{AggregatedRecord, AggregatedRow, ConnectionKey, DerivedRecord, DerivedRow};

pub const PASSED_CONNECTIONS_FILE: &str = "passed_connections.csv";
pub const AGGREGATED_FILE: &str = "aggregated_connections.csv";
pub const METRICS_FILE: &str = "connections_with_metrics.csv";
pub const REPORT_FILE: &str = "pipeline_report.json";

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub generated_at: DateTime<Utc>,
    pub threshold: u64,
    pub records_per_year: BTreeMap<i32, usize>,
    pub candidates: usize,
    pub qualified: usize,
    pub exclusions: BTreeMap<&'static str, usize>,
    pub aggregated_rows: usize,
}

/// Every table a run produces, computed in full before anything is written.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub qualified: BTreeSet<ConnectionKey>,
    pub aggregated: Vec<AggregatedRow>,
    pub derived: Vec<DerivedRow>,
    pub report: PipelineReport,
}

/// Reads and validates every yearly source. Any failure aborts the run.
pub async fn load_dataset<C: HttpClient>(client: &C, sources: &[YearSource]) -> Result<SegmentDataset> {
    let mut years = Vec::with_capacity(sources.len());

    for source in sources {
        let bytes = read_source(client, &source.source)
            .await
            .with_context(|| format!("loading {} source", source.year))?;
        let year = parse_segments(&bytes, &source.source, source.year)?;
        info!(
            year = source.year,
            source = %source.source,
            records = year.records.len(),
            "Loaded yearly source"
        );
        years.push(year);
    }

    Ok(SegmentDataset::new(years))
}

/// Qualifies, aggregates and derives metrics for `dataset`.
#[tracing::instrument(skip(dataset), fields(records = dataset.record_count()))]
pub fn run_pipeline(dataset: &SegmentDataset, threshold: u64) -> PipelineOutput {
    let qualification = qualify_connections(dataset, threshold);
    let aggregated = aggregate(dataset, &qualification.qualified);
    let derived = derive_metrics(&aggregated);

    let report = PipelineReport {
        generated_at: Utc::now(),
        threshold,
        records_per_year: dataset
            .years()
            .iter()
            .map(|y| (y.year, y.records.len()))
            .collect(),
        candidates: qualification.candidates,
        qualified: qualification.qualified.len(),
        exclusions: qualification.exclusions,
        aggregated_rows: aggregated.len(),
    };

    PipelineOutput {
        qualified: qualification.qualified,
        aggregated,
        derived,
        report,
    }
}

/// Paths of the artifacts written by [`write_artifacts`].
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub passed_connections: PathBuf,
    pub aggregated: PathBuf,
    pub metrics: PathBuf,
    pub report: PathBuf,
}

/// Writes the qualifying connections, aggregated and derived tables and the run report.
pub fn write_artifacts(output_dir: &Path, output: &PipelineOutput) -> Result<ArtifactPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let paths = ArtifactPaths {
        passed_connections: output_dir.join(PASSED_CONNECTIONS_FILE),
        aggregated: output_dir.join(AGGREGATED_FILE),
        metrics: output_dir.join(METRICS_FILE),
        report: output_dir.join(REPORT_FILE),
    };

    write_table(&paths.passed_connections, output.qualified.iter())?;
    write_table(
        &paths.aggregated,
        output.aggregated.iter().map(AggregatedRecord::from),
    )?;
    write_table(&paths.metrics, output.derived.iter().map(DerivedRecord::from))?;
    write_json(&paths.report, &output.report)?;

    info!(
        output_dir = %output_dir.display(),
        qualified = output.qualified.len(),
        aggregated_rows = output.aggregated.len(),
        "Artifacts written"
    );

    Ok(paths)
}
