use crate::pipeline::types::RawSegmentRecord;

/// All records of one yearly source.
#[derive(Debug, Clone, PartialEq)]
pub struct YearDataset {
    pub year: i32,
    pub source_name: String,
    pub records: Vec<RawSegmentRecord>,
}

/// The yearly datasets of a run, in evaluation order. The first is the anchor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentDataset {
    years: Vec<YearDataset>,
}

impl SegmentDataset {
    pub fn new(years: Vec<YearDataset>) -> Self {
        Self { years }
    }

    /// The year whose connections form the candidate pool.
    pub fn anchor(&self) -> Option<&YearDataset> {
        self.years.first()
    }

    pub fn years(&self) -> &[YearDataset] {
        &self.years
    }

    pub fn records(&self) -> impl Iterator<Item = &RawSegmentRecord> {
        self.years.iter().flat_map(|y| y.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.years.iter().map(|y| y.records.len()).sum()
    }
}
