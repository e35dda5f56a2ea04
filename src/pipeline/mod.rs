//! Connection qualification and aggregation pipeline.
//!
//! Raw segment records are grouped by connection, qualified for complete
//! above-threshold service in every year, aggregated into one row per
//! connection and month, and enriched with per-flight and load-factor metrics.
//! Each stage is a pure function of the previous stage's full output.

pub mod aggregate;
pub mod dataset;
pub mod derive;
pub mod identity;
pub mod qualify;
pub mod runner;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
