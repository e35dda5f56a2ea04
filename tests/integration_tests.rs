use connection_forecast::config::YearSource;
use connection_forecast::fetch::BasicClient;
use connection_forecast::forecast::ModelKind;
use connection_forecast::forecast::batch::forecast_connections;
use connection_forecast::forecast::ForecastSettings;
use connection_forecast::output::read_table;
use connection_forecast::parser::parse_segments;
use connection_forecast::pipeline::runner::{
    AGGREGATED_FILE, METRICS_FILE, PASSED_CONNECTIONS_FILE, load_dataset, run_pipeline,
    write_artifacts,
};
use connection_forecast::pipeline::types::{ConnectionKey, DerivedRecord, DerivedRow};
use std::path::{Path, PathBuf};

const HEADER: &str = "AIRLINE_ID,UNIQUE_CARRIER_ENTITY,ORIGIN,DEST,AIRCRAFT_TYPE,YEAR,MONTH,PASSENGERS,DEPARTURES_PERFORMED,SEATS,DISTANCE\n";

fn row(entity: &str, origin: &str, dest: &str, year: i32, month: u32, pax: u64, deps: u64, seats: u64) -> String {
    format!("19393,{entity},{origin},{dest},612,{year},{month},{pax}.00,{deps}.00,{seats}.00,1000.00\n")
}

/// One yearly table:
/// - CUN-BWI: every month split over two rows, qualifies
/// - CUN-JFK: 2023 has July twice and no August
/// - MEX-LAX: 50 passengers per flight
/// - LHR-JFK: only flown in 2023
fn year_table(year: i32) -> String {
    let mut csv = HEADER.to_string();
    for month in 1..=12 {
        csv += &row("01033", "CUN", "BWI", year, month, 600, 3, 700);
        csv += &row("01033", "CUN", "BWI", year, month, 400 + month as u64, 2, 500);

        let jfk_month = if year == 2023 && month == 8 { 7 } else { month };
        csv += &row("01033", "CUN", "JFK", year, jfk_month, 1000, 5, 1200);

        csv += &row("01033", "MEX", "LAX", year, month, 50, 1, 100);
        if year == 2023 {
            csv += &row("01033", "LHR", "JFK", year, month, 5000, 10, 6000);
        }
    }
    csv
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("connection_forecast_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_sources(dir: &Path) -> Vec<YearSource> {
    [2022, 2023, 2024]
        .into_iter()
        .map(|year| {
            let path = dir.join(format!("T_T100I_SEGMENT_ALL_CARRIER_{year}.csv"));
            std::fs::write(&path, year_table(year)).unwrap();
            YearSource {
                year,
                source: path.display().to_string(),
            }
        })
        .collect()
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = scratch_dir("full_pipeline");
    let sources = write_sources(&dir);

    let dataset = load_dataset(&BasicClient::new(), &sources).await.unwrap();
    let output = run_pipeline(&dataset, 100);
    let out_dir = dir.join("output");
    write_artifacts(&out_dir, &output).unwrap();

    let passed: Vec<ConnectionKey> = read_table(&out_dir.join(PASSED_CONNECTIONS_FILE)).unwrap();
    assert_eq!(passed.len(), 1);
    assert_eq!(passed[0].origin, "CUN");
    assert_eq!(passed[0].dest, "BWI");
    assert_eq!(passed[0].carrier_entity, "01033");

    assert_eq!(output.report.candidates, 3);
    assert_eq!(output.report.exclusions.get("missing_months"), Some(&1));
    assert_eq!(output.report.exclusions.get("below_threshold"), Some(&1));

    let metrics: Vec<DerivedRecord> = read_table(&out_dir.join(METRICS_FILE)).unwrap();
    assert_eq!(metrics.len(), 36);
    let march = metrics
        .iter()
        .find(|r| r.year == 2023 && r.month == 3)
        .unwrap();
    assert_eq!(march.passengers, 1003);
    assert_eq!(march.departures_performed, 5);
    assert_eq!(march.seats, 1200);
    assert_eq!(march.pax_per_flight, Some(200));
    assert!((march.load_factor.unwrap() - 1003.0 / 1200.0).abs() < 1e-9);
    assert_eq!(march.distance, 2000.0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_reruns_write_identical_tables() {
    let dir = scratch_dir("idempotent");
    let sources = write_sources(&dir);
    let client = BasicClient::new();

    let first = dir.join("first");
    let second = dir.join("second");
    for out in [&first, &second] {
        let dataset = load_dataset(&client, &sources).await.unwrap();
        write_artifacts(out, &run_pipeline(&dataset, 100)).unwrap();
    }

    for file in [PASSED_CONNECTIONS_FILE, AGGREGATED_FILE, METRICS_FILE] {
        assert_eq!(
            std::fs::read(first.join(file)).unwrap(),
            std::fs::read(second.join(file)).unwrap(),
            "{file} differs between runs"
        );
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_split_rows_conserve_passengers() {
    let years: Vec<_> = [2022, 2023, 2024]
        .into_iter()
        .map(|year| parse_segments(year_table(year).as_bytes(), "inline", year).unwrap())
        .collect();
    let dataset = connection_forecast::pipeline::dataset::SegmentDataset::new(years);
    let output = run_pipeline(&dataset, 100);

    let raw: u64 = dataset
        .records()
        .filter(|r| output.qualified.contains(&r.key()))
        .map(|r| r.passengers)
        .sum();
    let aggregated: u64 = output.aggregated.iter().map(|r| r.totals.passengers).sum();
    assert_eq!(raw, aggregated);
    assert_eq!(output.aggregated.len(), output.qualified.len() * 36);
}

#[test]
fn test_stricter_threshold_only_shrinks_the_passing_set() {
    let years: Vec<_> = [2022, 2023, 2024]
        .into_iter()
        .map(|year| parse_segments(year_table(year).as_bytes(), "inline", year).unwrap())
        .collect();
    let dataset = connection_forecast::pipeline::dataset::SegmentDataset::new(years);

    let lenient = run_pipeline(&dataset, 50).qualified;
    let strict = run_pipeline(&dataset, 100).qualified;
    let impossible = run_pipeline(&dataset, 1000).qualified;

    assert_eq!(lenient.len(), 2);
    assert!(strict.is_subset(&lenient));
    assert!(impossible.is_empty());
}

#[tokio::test]
async fn test_forecast_from_written_metrics() {
    let dir = scratch_dir("forecast");
    let sources = write_sources(&dir);

    let dataset = load_dataset(&BasicClient::new(), &sources).await.unwrap();
    write_artifacts(&dir, &run_pipeline(&dataset, 100)).unwrap();

    let rows: Vec<DerivedRow> = read_table::<DerivedRecord>(&dir.join(METRICS_FILE))
        .unwrap()
        .into_iter()
        .map(DerivedRow::from)
        .collect();
    let settings = ForecastSettings {
        holdout_year: 2024,
        horizon: 12,
        min_training_months: 24,
    };
    let batch = forecast_connections(&rows, ModelKind::HoltWinters, &settings);

    assert_eq!(batch.outcomes.len(), 1);
    assert_eq!(batch.successes(), 1);
    let run = batch.outcomes[0].1.run().unwrap();
    assert_eq!(run.training_months, 24);
    assert_eq!(run.actual.len(), 12);
    assert!(batch.overall.metrics.is_some());

    std::fs::remove_dir_all(&dir).unwrap();
}
