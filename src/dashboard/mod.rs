//! Route exploration over the derived metrics table.
//!
//! Selects either every connection or one origin/destination pair, builds its
//! gap-filled monthly passenger series and overlays a holdout forecast.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::str::FromStr;

use crate::error::InvalidRoute;
use crate::forecast::{ForecastOutcome, ForecastSettings, ModelKind, MonthlySeries, forecast_series};
use crate::pipeline::types::{DerivedRow, YearMonth};
use crate::stats::SummaryStats;

pub const ALL_ROUTES: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteSelection {
    All,
    Route { origin: String, dest: String },
}

impl RouteSelection {
    pub fn route(origin: &str, dest: &str) -> Self {
        RouteSelection::Route {
            origin: origin.to_string(),
            dest: dest.to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            RouteSelection::All => "All flights".to_string(),
            RouteSelection::Route { origin, dest } => format!("{origin} → {dest}"),
        }
    }

    fn includes(&self, row: &DerivedRow) -> bool {
        match self {
            RouteSelection::All => true,
            RouteSelection::Route { origin, dest } => {
                row.key().origin == *origin && row.key().dest == *dest
            }
        }
    }
}

impl fmt::Display for RouteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSelection::All => f.write_str(ALL_ROUTES),
            RouteSelection::Route { origin, dest } => write!(f, "{origin}_{dest}"),
        }
    }
}

impl FromStr for RouteSelection {
    type Err = InvalidRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(ALL_ROUTES) {
            return Ok(RouteSelection::All);
        }
        match trimmed.split_once('_') {
            Some((origin, dest))
                if !origin.is_empty() && !dest.is_empty() && !dest.contains('_') =>
            {
                Ok(RouteSelection::route(origin, dest))
            }
            _ => Err(InvalidRoute(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteOption {
    pub selection: RouteSelection,
    pub label: String,
    /// Mean passengers over the route's rows; `None` for the ALL entry.
    pub mean_passengers: Option<f64>,
}

/// ALL first, then each route whose mean passengers per row reaches
/// `min_avg_passengers`, ordered by origin and destination.
pub fn route_options(rows: &[DerivedRow], min_avg_passengers: f64) -> Vec<RouteOption> {
    let mut routes: BTreeMap<(&str, &str), (u64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = routes
            .entry((row.key().origin.as_str(), row.key().dest.as_str()))
            .or_default();
        entry.0 += row.passengers();
        entry.1 += 1;
    }

    let mut options = vec![RouteOption {
        selection: RouteSelection::All,
        label: RouteSelection::All.label(),
        mean_passengers: None,
    }];
    for ((origin, dest), (passengers, count)) in routes {
        let mean = passengers as f64 / count as f64;
        if mean >= min_avg_passengers {
            let selection = RouteSelection::route(origin, dest);
            options.push(RouteOption {
                label: selection.label(),
                selection,
                mean_passengers: Some(mean),
            });
        }
    }
    options
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub selection: RouteSelection,
    pub title: String,
    pub model: ModelKind,
    /// Monthly passengers, missing months as zero.
    pub series: Vec<(YearMonth, f64)>,
    pub stats: Option<SummaryStats>,
    pub outcome: ForecastOutcome,
}

pub fn build_view(
    rows: &[DerivedRow],
    selection: &RouteSelection,
    model: ModelKind,
    settings: &ForecastSettings,
) -> DashboardView {
    let selected: Vec<&DerivedRow> = rows.iter().filter(|r| selection.includes(r)).collect();
    let series = match selection {
        RouteSelection::All => MonthlySeries::total(selected.iter().copied()),
        RouteSelection::Route { origin, dest } => {
            MonthlySeries::for_route(selected.iter().copied(), origin, dest)
        }
    }
    .fill_gaps();

    let stats = SummaryStats::from_rows(&series.values(), selected.iter().copied());
    let outcome = forecast_series(&series, model.model().as_ref(), settings);

    DashboardView {
        selection: selection.clone(),
        title: format!("Passengers: {}", selection.label()),
        model,
        series: series.points().to_vec(),
        stats,
        outcome,
    }
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}"))
}

/// Plain text rendering of a view: the series with its forecast column,
/// then statistics and accuracy.
pub fn render_table(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", view.title, view.model);

    let forecast: BTreeMap<YearMonth, f64> = view
        .outcome
        .run()
        .map(|run| run.forecast.iter().copied().collect())
        .unwrap_or_default();

    let _ = writeln!(out, "{:<8} {:>12} {:>12}", "month", "passengers", "forecast");
    let mut months: Vec<YearMonth> = view.series.iter().map(|(p, _)| *p).collect();
    months.extend(forecast.keys().filter(|p| view.series.last().is_none_or(|(l, _)| *p > l)));
    let observed: BTreeMap<YearMonth, f64> = view.series.iter().copied().collect();
    for period in months {
        let _ = writeln!(
            out,
            "{:<8} {:>12} {:>12}",
            period.to_string(),
            observed.get(&period).map_or_else(String::new, |v| format!("{v:.0}")),
            forecast.get(&period).map_or_else(String::new, |v| format!("{v:.0}")),
        );
    }

    out.push('\n');
    match &view.stats {
        Some(stats) => {
            let _ = writeln!(out, "Mean passengers     {:.0}", stats.mean_passengers);
            let _ = writeln!(
                out,
                "Min/Max passengers  {:.0} / {:.0}",
                stats.min_passengers, stats.max_passengers
            );
            let _ = writeln!(out, "Standard deviation  {}", optional(stats.stddev_passengers, 0));
            let _ = writeln!(out, "Mean load factor    {}", optional(stats.mean_load_factor, 3));
        }
        None => out.push_str("No traffic for this selection\n"),
    }

    out.push('\n');
    match view.outcome.run() {
        Some(run) => {
            let _ = writeln!(out, "{}", run.metrics);
        }
        None => {
            let _ = writeln!(
                out,
                "No forecast: {}",
                view.outcome.reason().unwrap_or_default()
            );
        }
    }
    out
}
