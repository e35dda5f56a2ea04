//! CLI entry point for the connection forecasting tool.
//!
//! Provides subcommands for qualifying connections from the yearly segment
//! tables, forecasting their traffic, exploring routes and uploading the
//! resulting artifacts to S3.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use connection_forecast::{
    config::PipelineConfig,
    dashboard::{RouteSelection, build_view, render_table, route_options},
    fetch::{BasicClient, DOWNLOAD_TIMEOUT},
    forecast::{ForecastSettings, ModelKind, batch::FORECAST_RESULTS_FILE, batch::forecast_connections},
    output::{print_json, print_pretty, read_table, write_table},
    pipeline::runner::{METRICS_FILE, load_dataset, run_pipeline, write_artifacts},
    pipeline::types::{DerivedRecord, DerivedRow},
    publish::publish,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "connection_forecast")]
#[command(about = "Qualify airline connections and forecast their passenger traffic", long_about = None)]
struct Cli {
    /// JSON run configuration; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Overrides the configured output directory
    #[arg(short = 'd', long, global = true)]
    output_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the yearly tables, qualify connections and write the derived tables
    Qualify {
        /// Minimum ceiling-summed passengers per flight in every month
        #[arg(short = 'k', long)]
        threshold: Option<u64>,
    },
    /// Forecast every qualifying connection and score it against the holdout year
    Forecast {
        #[arg(short, long, value_enum, default_value_t = ModelKind::HoltWinters)]
        model: ModelKind,
    },
    /// Show the series, statistics and forecast of one route or of all flights
    Explore {
        /// ALL or ORIGIN_DEST, e.g. CUN_BWI
        #[arg(short, long, default_value = "ALL")]
        route: RouteSelection,

        /// Only offer routes averaging at least this many passengers per month
        #[arg(long, default_value_t = 5000.0)]
        min_avg_passengers: f64,

        #[arg(short, long, value_enum, default_value_t = ModelKind::LinearRegression)]
        model: ModelKind,

        /// Print the view as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Upload the output directory's artifacts to S3
    Publish {
        /// S3 bucket name to upload to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: String,

        /// Key prefix inside the bucket
        #[arg(long, default_value = "")]
        prefix: String,

        /// Gzip compress artifacts before uploading
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/connection_forecast.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("connection_forecast.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    run(cli)
        .await
        .inspect_err(|e| error!(error = %format!("{e:#}"), "Run failed"))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    let output_dir = PathBuf::from(&config.output_dir);

    match cli.command {
        Commands::Qualify { threshold } => {
            if let Some(k) = threshold {
                config.threshold = k;
            }
            config.validate()?;
            print_pretty(&config);

            let client = BasicClient::with_timeout(DOWNLOAD_TIMEOUT)?;
            let dataset = load_dataset(&client, &config.sources).await?;
            let output = run_pipeline(&dataset, config.threshold);
            write_artifacts(&output_dir, &output)?;
            print_json(&output.report)?;
        }
        Commands::Forecast { model } => {
            let settings = ForecastSettings::from_config(&config)?;
            let rows = load_metrics(&output_dir)?;

            let batch = forecast_connections(&rows, model, &settings);
            let path = output_dir.join(FORECAST_RESULTS_FILE);
            write_table(&path, batch.records())?;

            info!(
                model = %model,
                connections = batch.outcomes.len(),
                succeeded = batch.successes(),
                path = %path.display(),
                "Forecast results written"
            );
            match &batch.overall.metrics {
                Some(metrics) => info!(model = %model, %metrics, "Overall accuracy"),
                None => warn!(model = %model, "No connection could be forecast"),
            }
            print_json(&batch.overall)?;
        }
        Commands::Explore {
            route,
            min_avg_passengers,
            model,
            json,
        } => {
            let settings = ForecastSettings::from_config(&config)?;
            let rows = load_metrics(&output_dir)?;

            let options = route_options(&rows, min_avg_passengers);
            info!(
                min_avg_passengers,
                routes = options.len() - 1,
                "Routes available"
            );
            if !options.iter().any(|o| o.selection == route) {
                bail!(
                    "route {route} is not available with a minimum of {min_avg_passengers} passengers per month"
                );
            }

            let view = build_view(&rows, &route, model, &settings);
            if json {
                print_json(&view)?;
            } else {
                info!("\n{}", render_table(&view));
            }
        }
        Commands::Publish {
            s3_bucket,
            prefix,
            gzip,
        } => {
            let aws = aws_config::load_from_env().await;
            let client = aws_sdk_s3::Client::new(&aws);
            info!(bucket = %s3_bucket, gzip, "S3 upload enabled");

            let manifest = publish(&client, &s3_bucket, &prefix, &output_dir, gzip).await?;
            print_pretty(&manifest);
        }
    }

    Ok(())
}

/// Reads the derived metrics table written by `qualify`.
fn load_metrics(output_dir: &Path) -> Result<Vec<DerivedRow>> {
    let path = output_dir.join(METRICS_FILE);
    let records: Vec<DerivedRecord> = read_table(&path)
        .with_context(|| format!("run `qualify` first to create {}", path.display()))?;
    Ok(records.into_iter().map(DerivedRow::from).collect())
}
