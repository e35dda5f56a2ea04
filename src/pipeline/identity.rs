//! Connection identity: the candidate pool and per-year grouping by key.

use std::collections::{BTreeSet, HashMap};

use crate::pipeline::dataset::YearDataset;
use crate::pipeline::types::{ConnectionKey, RawSegmentRecord};

/// Every distinct connection appearing in the anchor year.
///
/// Membership only requires appearing in `anchor`; qualification decides the rest.
pub fn candidate_keys(anchor: &YearDataset) -> BTreeSet<ConnectionKey> {
    anchor.records.iter().map(RawSegmentRecord::key).collect()
}

/// One year's records grouped by connection.
#[derive(Debug)]
pub struct ConnectionIndex<'a> {
    year: i32,
    groups: HashMap<ConnectionKey, Vec<&'a RawSegmentRecord>>,
}

impl<'a> ConnectionIndex<'a> {
    pub fn build(dataset: &'a YearDataset) -> Self {
        let mut groups: HashMap<ConnectionKey, Vec<&'a RawSegmentRecord>> = HashMap::new();
        for record in &dataset.records {
            groups.entry(record.key()).or_default().push(record);
        }
        Self {
            year: dataset.year,
            groups,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Records of `key` in this year, empty when the connection did not fly.
    pub fn rows(&self, key: &ConnectionKey) -> &[&'a RawSegmentRecord] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn connection_count(&self) -> usize {
        self.groups.len()
    }
}
