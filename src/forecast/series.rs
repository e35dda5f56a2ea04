use serde::Serialize;
use std::collections::BTreeMap;

use crate::pipeline::types::{ConnectionKey, DerivedRow, YearMonth};

/// Monthly passenger totals in chronological order, one point per month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySeries {
    points: Vec<(YearMonth, f64)>,
}

impl MonthlySeries {
    /// Builds a series, summing values that share a month.
    pub fn from_points(points: impl IntoIterator<Item = (YearMonth, f64)>) -> Self {
        let mut by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
        for (period, value) in points {
            *by_month.entry(period).or_default() += value;
        }
        Self {
            points: by_month.into_iter().collect(),
        }
    }

    fn passengers<'a>(rows: impl IntoIterator<Item = &'a DerivedRow>) -> Self {
        Self::from_points(
            rows.into_iter()
                .map(|r| (r.period(), r.passengers() as f64)),
        )
    }

    pub fn for_connection<'a>(
        rows: impl IntoIterator<Item = &'a DerivedRow>,
        key: &ConnectionKey,
    ) -> Self {
        Self::passengers(rows.into_iter().filter(|r| r.key() == key))
    }

    /// Sum over every connection flying `origin` to `dest`.
    pub fn for_route<'a>(
        rows: impl IntoIterator<Item = &'a DerivedRow>,
        origin: &str,
        dest: &str,
    ) -> Self {
        Self::passengers(
            rows.into_iter()
                .filter(|r| r.key().origin == origin && r.key().dest == dest),
        )
    }

    /// Sum over all connections.
    pub fn total<'a>(rows: impl IntoIterator<Item = &'a DerivedRow>) -> Self {
        Self::passengers(rows)
    }

    /// Inserts zero-valued points for months missing between the first and last.
    pub fn fill_gaps(&self) -> Self {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return self.clone();
        };

        let known: BTreeMap<YearMonth, f64> = self.points.iter().copied().collect();
        let mut points = Vec::new();
        let mut period = first.0;
        while period <= last.0 {
            points.push((period, known.get(&period).copied().unwrap_or(0.0)));
            period = period.succ();
        }
        Self { points }
    }

    /// Training window (years before `holdout_year`) and holdout window (`holdout_year`).
    pub fn split(&self, holdout_year: i32) -> (MonthlySeries, MonthlySeries) {
        let training = self
            .points
            .iter()
            .copied()
            .filter(|(p, _)| p.year < holdout_year)
            .collect();
        let holdout = self
            .points
            .iter()
            .copied()
            .filter(|(p, _)| p.year == holdout_year)
            .collect();
        (Self { points: training }, Self { points: holdout })
    }

    pub fn points(&self) -> &[(YearMonth, f64)] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn months(&self) -> Vec<YearMonth> {
        self.points.iter().map(|(p, _)| *p).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_month(&self) -> Option<YearMonth> {
        self.points.last().map(|(p, _)| *p)
    }

    /// True when consecutive points are consecutive calendar months.
    pub fn is_contiguous(&self) -> bool {
        self.points.windows(2).all(|w| w[0].0.succ() == w[1].0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::derive::derive_metrics;
    use crate::pipeline::types::{AggregatedRow, TrafficTotals};

    fn series(points: &[(i32, u32, f64)]) -> MonthlySeries {
        MonthlySeries::from_points(points.iter().map(|&(y, m, v)| (YearMonth::new(y, m), v)))
    }

    #[test]
    fn test_points_are_sorted_and_summed() {
        let s = series(&[(2023, 2, 5.0), (2022, 12, 1.0), (2023, 2, 7.0)]);
        assert_eq!(
            s.points(),
            &[(YearMonth::new(2022, 12), 1.0), (YearMonth::new(2023, 2), 12.0)]
        );
    }

    #[test]
    fn test_fill_gaps_inserts_zero_months() {
        let s = series(&[(2022, 11, 1.0), (2023, 2, 2.0)]).fill_gaps();
        assert_eq!(s.values(), vec![1.0, 0.0, 0.0, 2.0]);
        assert!(s.is_contiguous());
    }

    #[test]
    fn test_split_on_holdout_year() {
        let points: Vec<(i32, u32, f64)> = [2022, 2023, 2024]
            .iter()
            .flat_map(|&y| (1..=12).map(move |m| (y, m, 1.0)))
            .collect();
        let (training, holdout) = series(&points).split(2024);

        assert_eq!(training.len(), 24);
        assert_eq!(holdout.len(), 12);
        assert_eq!(training.last_month(), Some(YearMonth::new(2023, 12)));
        assert_eq!(holdout.months()[0], YearMonth::new(2024, 1));
    }

    fn derived(rows: &[(&str, &str, &str, u32, u64)]) -> Vec<DerivedRow> {
        let aggregated: Vec<AggregatedRow> = rows
            .iter()
            .map(|&(entity, origin, dest, month, passengers)| AggregatedRow {
                key: ConnectionKey {
                    airline_id: 19393,
                    carrier_entity: entity.to_string(),
                    origin: origin.to_string(),
                    dest: dest.to_string(),
                    aircraft_type: 612,
                },
                period: YearMonth::new(2023, month),
                totals: TrafficTotals {
                    passengers,
                    departures_performed: 1,
                    seats: passengers,
                    ..Default::default()
                },
            })
            .collect();
        derive_metrics(&aggregated)
    }

    #[test]
    fn test_connection_route_and_total_series() {
        let rows = derived(&[
            ("01033", "CUN", "BWI", 1, 100),
            ("01033", "CUN", "BWI", 2, 110),
            ("01044", "CUN", "BWI", 1, 40),
            ("01033", "AMS", "ORD", 1, 7),
            ("01033", "AMS", "ORD", 3, 9),
        ]);

        let connection = MonthlySeries::for_connection(&rows, rows[0].key());
        assert_eq!(connection.values(), vec![100.0, 110.0]);

        let route = MonthlySeries::for_route(&rows, "CUN", "BWI");
        assert_eq!(route.values(), vec![140.0, 110.0]);

        let total = MonthlySeries::total(&rows);
        assert_eq!(total.months().len(), 3);
        assert_eq!(total.values(), vec![147.0, 110.0, 9.0]);
        assert_eq!(MonthlySeries::for_route(&rows, "BWI", "CUN").len(), 0);
    }
}
