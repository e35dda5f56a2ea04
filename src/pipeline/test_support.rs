use crate::pipeline::dataset::{SegmentDataset, YearDataset};
use crate::pipeline::types::RawSegmentRecord;
use serde::Serialize;

pub(crate) fn record(
    origin: &str,
    dest: &str,
    year: i32,
    month: u32,
    passengers: u64,
    departures: u64,
    seats: u64,
) -> RawSegmentRecord {
    RawSegmentRecord {
        airline_id: 19393,
        carrier_entity: "11033".to_string(),
        origin: origin.to_string(),
        dest: dest.to_string(),
        aircraft_type: 612,
        year,
        month,
        passengers,
        departures_performed: departures,
        seats,
        departures_scheduled: departures as f64,
        payload: 0.0,
        freight: 0.0,
        mail: 0.0,
        distance: 1000.0,
        ramp_to_ramp: 0.0,
        air_time: 0.0,
    }
}

/// Twelve identical monthly rows for one connection.
pub(crate) fn full_year(
    origin: &str,
    dest: &str,
    year: i32,
    passengers: u64,
    departures: u64,
    seats: u64,
) -> Vec<RawSegmentRecord> {
    (1..=12)
        .map(|m| record(origin, dest, year, m, passengers, departures, seats))
        .collect()
}

pub(crate) fn three_years(records: Vec<RawSegmentRecord>) -> SegmentDataset {
    let years = [2022, 2023, 2024]
        .into_iter()
        .map(|year| YearDataset {
            year,
            source_name: format!("test_{year}"),
            records: records.iter().filter(|r| r.year == year).cloned().collect(),
        })
        .collect();
    SegmentDataset::new(years)
}

/// Header line the csv crate derives from one serialized row.
pub(crate) fn serialized_header<T: Serialize>(row: T) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.serialize(row).unwrap();
    let bytes = writer.into_inner().unwrap();
    String::from_utf8(bytes).unwrap().lines().next().unwrap().to_string()
}
