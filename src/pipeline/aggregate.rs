use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::pipeline::dataset::SegmentDataset;
use crate::pipeline::types::{AggregatedRow, ConnectionKey, TrafficTotals, YearMonth};

/// Collapses the raw rows of qualified connections into one row per
/// (connection, year, month), summing every traffic measure.
///
/// Output is sorted by connection, then chronologically.
#[tracing::instrument(skip_all, fields(qualified = qualified.len()))]
pub fn aggregate(dataset: &SegmentDataset, qualified: &BTreeSet<ConnectionKey>) -> Vec<AggregatedRow> {
    let mut groups: BTreeMap<(ConnectionKey, YearMonth), TrafficTotals> = BTreeMap::new();
    let mut source_rows = 0usize;

    for record in dataset.records() {
        let key = record.key();
        if !qualified.contains(&key) {
            continue;
        }
        source_rows += 1;
        groups
            .entry((key, YearMonth::new(record.year, record.month)))
            .or_default()
            .add(record);
    }

    let rows: Vec<AggregatedRow> = groups
        .into_iter()
        .map(|((key, period), totals)| AggregatedRow {
            key,
            period,
            totals,
        })
        .collect();

    info!(source_rows, aggregated_rows = rows.len(), "Aggregation complete");
    rows
}
