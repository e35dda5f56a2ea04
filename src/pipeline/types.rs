//! Record types passed between the pipeline stages.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::output::TableRow;

/// One row of a BTS T-100 segment table.
///
/// Column names follow the source schema. Unknown columns are ignored and the
/// optional measures default to zero when absent or empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegmentRecord {
    #[serde(rename = "AIRLINE_ID", deserialize_with = "trimmed")]
    pub airline_id: u32,
    /// Opaque text: leading zeros and letters are part of the identity.
    #[serde(rename = "UNIQUE_CARRIER_ENTITY")]
    pub carrier_entity: String,
    #[serde(rename = "ORIGIN")]
    pub origin: String,
    #[serde(rename = "DEST")]
    pub dest: String,
    #[serde(rename = "AIRCRAFT_TYPE", deserialize_with = "trimmed")]
    pub aircraft_type: u32,
    #[serde(rename = "YEAR", deserialize_with = "trimmed")]
    pub year: i32,
    #[serde(rename = "MONTH", deserialize_with = "trimmed")]
    pub month: u32,

    #[serde(rename = "PASSENGERS", deserialize_with = "count")]
    pub passengers: u64,
    #[serde(rename = "DEPARTURES_PERFORMED", deserialize_with = "count")]
    pub departures_performed: u64,
    #[serde(rename = "SEATS", deserialize_with = "count")]
    pub seats: u64,

    #[serde(rename = "DEPARTURES_SCHEDULED", default, deserialize_with = "measure")]
    pub departures_scheduled: f64,
    #[serde(rename = "PAYLOAD", default, deserialize_with = "measure")]
    pub payload: f64,
    #[serde(rename = "FREIGHT", default, deserialize_with = "measure")]
    pub freight: f64,
    #[serde(rename = "MAIL", default, deserialize_with = "measure")]
    pub mail: f64,
    #[serde(rename = "DISTANCE", default, deserialize_with = "measure")]
    pub distance: f64,
    #[serde(rename = "RAMP_TO_RAMP", default, deserialize_with = "measure")]
    pub ramp_to_ramp: f64,
    #[serde(rename = "AIR_TIME", default, deserialize_with = "measure")]
    pub air_time: f64,
}

impl RawSegmentRecord {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            airline_id: self.airline_id,
            carrier_entity: self.carrier_entity.clone(),
            origin: self.origin.clone(),
            dest: self.dest.clone(),
            aircraft_type: self.aircraft_type,
        }
    }

    /// True when the record belongs to `key`, without allocating a key.
    pub fn matches(&self, key: &ConnectionKey) -> bool {
        self.airline_id == key.airline_id
            && self.aircraft_type == key.aircraft_type
            && self.carrier_entity == key.carrier_entity
            && self.origin == key.origin
            && self.dest == key.dest
    }
}

/// Accepts `250` as well as `250.00`, rejecting negative or fractional values.
pub(crate) fn parse_count(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return Ok(value);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| format!("`{trimmed}` is not a count"))?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(format!("`{trimmed}` is not a non-negative whole number"));
    }
    Ok(value as u64)
}

/// Numeric identity columns may carry padding; text columns are kept verbatim.
fn trimmed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim().parse().map_err(serde::de::Error::custom)
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_count(&raw).map_err(serde::de::Error::custom)
}

fn measure<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| serde::de::Error::custom(format!("`{trimmed}` is not a number")))
}

/// Identity of a service pattern, independent of year and month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionKey {
    #[serde(rename = "AIRLINE_ID")]
    pub airline_id: u32,
    #[serde(rename = "UNIQUE_CARRIER_ENTITY")]
    pub carrier_entity: String,
    #[serde(rename = "ORIGIN")]
    pub origin: String,
    #[serde(rename = "DEST")]
    pub dest: String,
    #[serde(rename = "AIRCRAFT_TYPE")]
    pub aircraft_type: u32,
}

impl TableRow for ConnectionKey {
    const COLUMNS: &'static [&'static str] = &[
        "AIRLINE_ID",
        "UNIQUE_CARRIER_ENTITY",
        "ORIGIN",
        "DEST",
        "AIRCRAFT_TYPE",
    ];
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {}->{} ({})",
            self.airline_id, self.carrier_entity, self.origin, self.dest, self.aircraft_type
        )
    }
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn succ(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Summed traffic of every raw row in one (connection, year, month) group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficTotals {
    pub passengers: u64,
    pub departures_performed: u64,
    pub seats: u64,
    pub departures_scheduled: f64,
    pub payload: f64,
    pub freight: f64,
    pub mail: f64,
    pub distance: f64,
    pub ramp_to_ramp: f64,
    pub air_time: f64,
}

impl TrafficTotals {
    pub fn add(&mut self, record: &RawSegmentRecord) {
        self.passengers += record.passengers;
        self.departures_performed += record.departures_performed;
        self.seats += record.seats;
        self.departures_scheduled += record.departures_scheduled;
        self.payload += record.payload;
        self.freight += record.freight;
        self.mail += record.mail;
        self.distance += record.distance;
        self.ramp_to_ramp += record.ramp_to_ramp;
        self.air_time += record.air_time;
    }
}

/// One row per (connection, year, month).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub key: ConnectionKey,
    pub period: YearMonth,
    pub totals: TrafficTotals,
}

/// An aggregated row plus its descriptive metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub row: AggregatedRow,
    /// `floor(passengers / departures)`, `None` when nothing departed.
    pub pax_per_flight: Option<u64>,
    /// `passengers / seats` clipped to `[0, 1]`, `None` when no seats were offered.
    pub load_factor: Option<f64>,
}

impl DerivedRow {
    pub fn key(&self) -> &ConnectionKey {
        &self.row.key
    }

    pub fn period(&self) -> YearMonth {
        self.row.period
    }

    pub fn passengers(&self) -> u64 {
        self.row.totals.passengers
    }
}

/// Flat CSV shape of [`AggregatedRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    #[serde(rename = "AIRLINE_ID")]
    pub airline_id: u32,
    #[serde(rename = "UNIQUE_CARRIER_ENTITY")]
    pub carrier_entity: String,
    #[serde(rename = "ORIGIN")]
    pub origin: String,
    #[serde(rename = "DEST")]
    pub dest: String,
    #[serde(rename = "AIRCRAFT_TYPE")]
    pub aircraft_type: u32,
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "MONTH")]
    pub month: u32,
    #[serde(rename = "PASSENGERS")]
    pub passengers: u64,
    #[serde(rename = "DEPARTURES_PERFORMED")]
    pub departures_performed: u64,
    #[serde(rename = "SEATS")]
    pub seats: u64,
    #[serde(rename = "DEPARTURES_SCHEDULED")]
    pub departures_scheduled: f64,
    #[serde(rename = "PAYLOAD")]
    pub payload: f64,
    #[serde(rename = "FREIGHT")]
    pub freight: f64,
    #[serde(rename = "MAIL")]
    pub mail: f64,
    #[serde(rename = "DISTANCE")]
    pub distance: f64,
    #[serde(rename = "RAMP_TO_RAMP")]
    pub ramp_to_ramp: f64,
    #[serde(rename = "AIR_TIME")]
    pub air_time: f64,
}

impl TableRow for AggregatedRecord {
    const COLUMNS: &'static [&'static str] = &[
        "AIRLINE_ID",
        "UNIQUE_CARRIER_ENTITY",
        "ORIGIN",
        "DEST",
        "AIRCRAFT_TYPE",
        "YEAR",
        "MONTH",
        "PASSENGERS",
        "DEPARTURES_PERFORMED",
        "SEATS",
        "DEPARTURES_SCHEDULED",
        "PAYLOAD",
        "FREIGHT",
        "MAIL",
        "DISTANCE",
        "RAMP_TO_RAMP",
        "AIR_TIME",
    ];
}

impl From<&AggregatedRow> for AggregatedRecord {
    fn from(row: &AggregatedRow) -> Self {
        let t = &row.totals;
        Self {
            airline_id: row.key.airline_id,
            carrier_entity: row.key.carrier_entity.clone(),
            origin: row.key.origin.clone(),
            dest: row.key.dest.clone(),
            aircraft_type: row.key.aircraft_type,
            year: row.period.year,
            month: row.period.month,
            passengers: t.passengers,
            departures_performed: t.departures_performed,
            seats: t.seats,
            departures_scheduled: t.departures_scheduled,
            payload: t.payload,
            freight: t.freight,
            mail: t.mail,
            distance: t.distance,
            ramp_to_ramp: t.ramp_to_ramp,
            air_time: t.air_time,
        }
    }
}

impl From<AggregatedRecord> for AggregatedRow {
    fn from(r: AggregatedRecord) -> Self {
        Self {
            key: ConnectionKey {
                airline_id: r.airline_id,
                carrier_entity: r.carrier_entity,
                origin: r.origin,
                dest: r.dest,
                aircraft_type: r.aircraft_type,
            },
            period: YearMonth::new(r.year, r.month),
            totals: TrafficTotals {
                passengers: r.passengers,
                departures_performed: r.departures_performed,
                seats: r.seats,
                departures_scheduled: r.departures_scheduled,
                payload: r.payload,
                freight: r.freight,
                mail: r.mail,
                distance: r.distance,
                ramp_to_ramp: r.ramp_to_ramp,
                air_time: r.air_time,
            },
        }
    }
}

/// Flat CSV shape of [`DerivedRow`]. Undefined metrics are empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    #[serde(rename = "AIRLINE_ID")]
    pub airline_id: u32,
    #[serde(rename = "UNIQUE_CARRIER_ENTITY")]
    pub carrier_entity: String,
    #[serde(rename = "ORIGIN")]
    pub origin: String,
    #[serde(rename = "DEST")]
    pub dest: String,
    #[serde(rename = "AIRCRAFT_TYPE")]
    pub aircraft_type: u32,
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "MONTH")]
    pub month: u32,
    #[serde(rename = "PASSENGERS")]
    pub passengers: u64,
    #[serde(rename = "DEPARTURES_PERFORMED")]
    pub departures_performed: u64,
    #[serde(rename = "SEATS")]
    pub seats: u64,
    #[serde(rename = "DEPARTURES_SCHEDULED")]
    pub departures_scheduled: f64,
    #[serde(rename = "PAYLOAD")]
    pub payload: f64,
    #[serde(rename = "FREIGHT")]
    pub freight: f64,
    #[serde(rename = "MAIL")]
    pub mail: f64,
    #[serde(rename = "DISTANCE")]
    pub distance: f64,
    #[serde(rename = "RAMP_TO_RAMP")]
    pub ramp_to_ramp: f64,
    #[serde(rename = "AIR_TIME")]
    pub air_time: f64,
    #[serde(rename = "PAX_PER_FLIGHT")]
    pub pax_per_flight: Option<u64>,
    #[serde(rename = "LOAD_FACTOR")]
    pub load_factor: Option<f64>,
}

impl TableRow for DerivedRecord {
    const COLUMNS: &'static [&'static str] = &[
        "AIRLINE_ID",
        "UNIQUE_CARRIER_ENTITY",
        "ORIGIN",
        "DEST",
        "AIRCRAFT_TYPE",
        "YEAR",
        "MONTH",
        "PASSENGERS",
        "DEPARTURES_PERFORMED",
        "SEATS",
        "DEPARTURES_SCHEDULED",
        "PAYLOAD",
        "FREIGHT",
        "MAIL",
        "DISTANCE",
        "RAMP_TO_RAMP",
        "AIR_TIME",
        "PAX_PER_FLIGHT",
        "LOAD_FACTOR",
    ];
}

impl From<&DerivedRow> for DerivedRecord {
    fn from(derived: &DerivedRow) -> Self {
        let base = AggregatedRecord::from(&derived.row);
        Self {
            airline_id: base.airline_id,
            carrier_entity: base.carrier_entity,
            origin: base.origin,
            dest: base.dest,
            aircraft_type: base.aircraft_type,
            year: base.year,
            month: base.month,
            passengers: base.passengers,
            departures_performed: base.departures_performed,
            seats: base.seats,
            departures_scheduled: base.departures_scheduled,
            payload: base.payload,
            freight: base.freight,
            mail: base.mail,
            distance: base.distance,
            ramp_to_ramp: base.ramp_to_ramp,
            air_time: base.air_time,
            pax_per_flight: derived.pax_per_flight,
            load_factor: derived.load_factor,
        }
    }
}

impl From<DerivedRecord> for DerivedRow {
    fn from(r: DerivedRecord) -> Self {
        let base = AggregatedRecord {
            airline_id: r.airline_id,
            carrier_entity: r.carrier_entity,
            origin: r.origin,
            dest: r.dest,
            aircraft_type: r.aircraft_type,
            year: r.year,
            month: r.month,
            passengers: r.passengers,
            departures_performed: r.departures_performed,
            seats: r.seats,
            departures_scheduled: r.departures_scheduled,
            payload: r.payload,
            freight: r.freight,
            mail: r.mail,
            distance: r.distance,
            ramp_to_ramp: r.ramp_to_ramp,
            air_time: r.air_time,
        };
        Self {
            row: base.into(),
            pax_per_flight: r.pax_per_flight,
            load_factor: r.load_factor,
        }
    }
}
