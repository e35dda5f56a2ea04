//! CSV parser for yearly T-100 segment tables.

use flate2::read::GzDecoder;
use std::io::Read;

use crate::error::InputError;
use crate::pipeline::dataset::YearDataset;
use crate::pipeline::types::RawSegmentRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decodes one yearly table, gunzipping it first when it is gzip-compressed.
///
/// # Errors
///
/// Fails on the first row that does not deserialize, has a month outside
/// 1-12, or whose `YEAR` differs from `expected_year`. An empty table is an
/// error as well.
pub fn parse_segments(
    bytes: &[u8],
    source_name: &str,
    expected_year: i32,
) -> Result<YearDataset, InputError> {
    let decompressed;
    let body: &[u8] = if bytes.starts_with(&GZIP_MAGIC) {
        let mut buf = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut buf)
            .map_err(|e| InputError::Unreadable {
                source_name: source_name.to_string(),
                message: format!("gzip: {e}"),
            })?;
        decompressed = buf;
        &decompressed
    } else {
        bytes
    };

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(body);
    let mut records = Vec::new();

    for (index, result) in rdr.deserialize::<RawSegmentRecord>().enumerate() {
        let row = index as u64 + 1;
        let record = result.map_err(|e| InputError::MalformedRow {
            source_name: source_name.to_string(),
            row,
            message: e.to_string(),
        })?;

        if !(1..=12).contains(&record.month) {
            return Err(InputError::MonthOutOfRange {
                source_name: source_name.to_string(),
                row,
                month: record.month,
            });
        }
        if record.year != expected_year {
            return Err(InputError::YearMismatch {
                source_name: source_name.to_string(),
                row,
                expected: expected_year,
                found: record.year,
            });
        }

        records.push(record);
    }

    if records.is_empty() {
        return Err(InputError::Empty {
            source_name: source_name.to_string(),
        });
    }

    Ok(YearDataset {
        year: expected_year,
        source_name: source_name.to_string(),
        records,
    })
}
