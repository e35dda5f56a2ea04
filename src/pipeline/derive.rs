use crate::pipeline::types::{AggregatedRow, DerivedRow};

/// Floor of passengers per departure. `None` when there were no departures.
pub fn pax_per_flight(passengers: u64, departures: u64) -> Option<u64> {
    (departures > 0).then(|| passengers / departures)
}

/// Passengers over seats clipped to `[0, 1]`. `None` when no seats were offered.
pub fn load_factor(passengers: u64, seats: u64) -> Option<f64> {
    if seats == 0 {
        return None;
    }
    Some((passengers as f64 / seats as f64).clamp(0.0, 1.0))
}

pub fn derive_metrics(rows: &[AggregatedRow]) -> Vec<DerivedRow> {
    rows.iter()
        .map(|row| DerivedRow {
            pax_per_flight: pax_per_flight(row.totals.passengers, row.totals.departures_performed),
            load_factor: load_factor(row.totals.passengers, row.totals.seats),
            row: row.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::qualify::per_flight_ceil;
    use crate::pipeline::types::{ConnectionKey, TrafficTotals, YearMonth};

    fn aggregated(passengers: u64, departures: u64, seats: u64) -> AggregatedRow {
        AggregatedRow {
            key: ConnectionKey {
                airline_id: 19393,
                carrier_entity: "11033".to_string(),
                origin: "CUN".to_string(),
                dest: "BWI".to_string(),
                aircraft_type: 612,
            },
            period: YearMonth::new(2022, 1),
            totals: TrafficTotals {
                passengers,
                departures_performed: departures,
                seats,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_reporting_uses_floor_while_gating_uses_ceiling() {
        let derived = derive_metrics(&[aggregated(250, 3, 300)]);
        let reported = derived[0].pax_per_flight;
        let gated = per_flight_ceil(250, 3);

        assert_eq!(reported, Some(83));
        assert_eq!(gated, Some(84));
        assert_ne!(reported, gated);
    }

    #[test]
    fn test_zero_departures_yield_no_pax_per_flight() {
        let derived = derive_metrics(&[aggregated(100, 0, 150)]);
        assert_eq!(derived[0].pax_per_flight, None);
        assert!(derived[0].load_factor.is_some());
    }

    #[test]
    fn test_load_factor_is_clipped() {
        assert_eq!(load_factor(1300, 1200), Some(1.0));
        assert_eq!(load_factor(0, 1200), Some(0.0));
        assert_eq!(load_factor(10, 0), None);

        let lf = load_factor(1000, 1200).unwrap();
        assert!((lf - 0.8333).abs() < 1e-3);
    }

    #[test]
    fn test_load_factor_bound_holds_for_all_rows() {
        let rows = vec![
            aggregated(1000, 5, 1200),
            aggregated(5000, 5, 1200),
            aggregated(0, 5, 1200),
        ];
        for derived in derive_metrics(&rows) {
            let lf = derived.load_factor.unwrap();
            assert!((0.0..=1.0).contains(&lf));
        }
    }
}
