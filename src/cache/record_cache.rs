use crate::cancel::Cancellation;
use crate::range_set::RangeSet;
use crate::record::{Record, RecordFilter, RecordKind};
use crate::source::RecordSource;
use crate::{Error, Range, Resolution, Result};
use std::collections::BTreeMap;

/// Cached records for one `(reference, resolution)` pair of a backing source.
///
/// Tracks which positions have been fetched and fetches each position at most
/// once. Coverage and stashed records only ever grow.
#[derive(Debug)]
pub struct RecordCache<R: Record> {
    reference: String,
    resolution: Resolution,
    covered: RangeSet,
    stash: Stash<R>,
    fetches: u64,
}

impl<R: Record> RecordCache<R> {
    pub fn new(reference: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            reference: reference.into(),
            resolution,
            covered: RangeSet::new(),
            stash: Stash::for_kind(R::KIND),
            fetches: 0,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn covered(&self) -> &RangeSet {
        &self.covered
    }

    /// Number of sub-range fetches issued to the backing source so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Number of distinct records held.
    pub fn stashed(&self) -> usize {
        self.stash.len()
    }

    /// Records intersecting `query`, fetching only the parts not yet covered.
    ///
    /// `filter` is handed to the backing source for newly fetched ranges. It is
    /// not applied to records that were already cached, so callers should use
    /// the same filter for the lifetime of a cache.
    ///
    /// If a fetch fails or `cancel` fires, ranges fetched earlier in this call
    /// stay covered and only the remainder is fetched on retry.
    pub async fn records<S>(
        &mut self,
        source: &S,
        query: Range,
        filter: Option<&RecordFilter<R>>,
        cancel: &Cancellation,
    ) -> Result<Vec<R>>
    where
        S: RecordSource<Record = R> + ?Sized,
    {
        let missing = self.covered.missing_from(query);

        for range in missing {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            tracing::debug!(
                "fetching {}:{} at {} for query {}",
                self.reference,
                range,
                self.resolution,
                query
            );

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = source.records(&self.reference, range, self.resolution, filter) => result,
            };
            let fetched = fetched.inspect_err(|e| {
                tracing::warn!("fetch of {}:{} failed: {}", self.reference, range, e);
            })?;

            // A record reaching into an already covered range was stashed by
            // the fetch that covered it.
            for record in fetched {
                if !self.covered.intersects(record.span()) {
                    self.stash.insert(record);
                }
            }
            self.covered.mark_covered(range);
            self.fetches += 1;
        }

        Ok(self.stash.collect(query))
    }
}

/// Fetched records, keyed for range retrieval.
#[derive(Debug)]
enum Stash<R> {
    /// Keyed by position.
    Position(BTreeMap<u64, Vec<R>>),
    /// Keyed by `(start, end)`. `widest` is the longest span stored, which
    /// bounds how far left of a query an intersecting record can start.
    Interval {
        records: BTreeMap<(u64, u64), Vec<R>>,
        widest: u64,
    },
}

impl<R: Record> Stash<R> {
    fn for_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Point => Stash::Position(BTreeMap::new()),
            RecordKind::Interval => Stash::Interval {
                records: BTreeMap::new(),
                widest: 0,
            },
        }
    }

    /// Records sharing a key keep their arrival order.
    fn insert(&mut self, record: R) {
        let span = record.span();
        let bucket = match self {
            Stash::Position(records) => records.entry(span.from()).or_default(),
            Stash::Interval { records, widest } => {
                *widest = (*widest).max(span.width());
                records.entry((span.from(), span.to())).or_default()
            }
        };
        bucket.push(record);
    }

    fn collect(&self, query: Range) -> Vec<R> {
        match self {
            Stash::Position(records) => records
                .range(query.from()..=query.to())
                .flat_map(|(_, bucket)| bucket.iter().cloned())
                .collect(),
            Stash::Interval { records, widest } => {
                if records.is_empty() {
                    return Vec::new();
                }
                let lowest_start = query.from().saturating_sub(widest.saturating_sub(1));
                records
                    .range((lowest_start, 0)..=(query.to(), u64::MAX))
                    .filter(|((_, end), _)| *end >= query.from())
                    .flat_map(|(_, bucket)| bucket.iter().cloned())
                    .collect()
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Stash::Position(records) => records.values().map(Vec::len).sum(),
            Stash::Interval { records, .. } => records.values().map(Vec::len).sum(),
        }
    }
}
