//! On-disk formats.
//!
//! - [`interval_file`] - the indexed interval file read by
//!   [`IntervalFileSource`](crate::source::IntervalFileSource)
//! - [`bed`] - BED text import, the usual input to [`IntervalFileWriter`]

pub mod bed;
pub mod interval_file;

pub use bed::{parse_bed, read_bed};
pub use interval_file::{IntervalFileWriter, WriteSummary};
