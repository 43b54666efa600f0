//! Record source abstraction.
//!
//! A [`RecordSource`] turns `(reference, range, resolution)` queries into
//! start-ordered record lists. Slow sources (SQL tables, remote files) are
//! wrapped in a [`CachingRecordSource`](crate::cache::CachingRecordSource),
//! which implements the same trait and so can stand in for the source it wraps.
//!
//! # Implementations
//!
//! - [`MemorySource`] - records held in memory
//! - [`IntervalFileSource`] - indexed interval files on local disk
//!
//! # Example
//!
//! ```no_run
//! use trackcache::source::{IntervalFileSource, RecordSource};
//! use trackcache::{Range, Resolution};
//!
//! # async fn run() -> trackcache::Result<()> {
//! let source = IntervalFileSource::open("genes.tcx").await?;
//! let records = source
//!     .records("chr1", Range::new(10_000, 20_000)?, Resolution::High, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod interval_file;
mod memory;

pub use interval_file::IntervalFileSource;
pub use memory::MemorySource;

use crate::record::{Record, RecordFilter};
use crate::{Range, Resolution, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// A queryable store of records, organised by reference sequence.
#[async_trait]
pub trait RecordSource: Send + Sync {
    type Record: Record;

    /// Names of references this source has data for.
    async fn reference_names(&self) -> Result<BTreeSet<String>>;

    /// Records intersecting `range` on `reference`, ordered by start, then
    /// end. Records sharing both keep a stable order from call to call.
    ///
    /// A reference the source knows nothing about yields an empty list.
    async fn records(
        &self,
        reference: &str,
        range: Range,
        resolution: Resolution,
        filter: Option<&RecordFilter<Self::Record>>,
    ) -> Result<Vec<Self::Record>>;

    /// Where the data comes from.
    fn uri(&self) -> String;

    /// Names of the columns records carry, if the source has a schema.
    fn column_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Records whose name matches `name`, across all references.
    async fn lookup(&self, _name: &str) -> Result<Vec<Self::Record>> {
        Ok(Vec::new())
    }

    /// Release backing resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn passes<R>(filter: Option<&RecordFilter<R>>, record: &R) -> bool {
    filter.is_none_or(|f| f(record))
}
