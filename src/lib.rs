pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod formats;
#[cfg(feature = "server")]
pub mod handlers;
pub mod index;
pub mod range;
pub mod range_set;
pub mod record;
pub mod source;
pub mod types;

pub use cache::{CacheOptions, CachingRecordSource, RecordCache};
pub use cancel::Cancellation;
pub use config::Config;
pub use error::{Error, Result};
pub use range::Range;
pub use range_set::RangeSet;
pub use record::{IntervalRecord, PointRecord, Record, RecordFilter, RecordKind, Strand};
pub use types::Resolution;
