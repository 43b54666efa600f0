//! Range-coverage caching in front of a slow record source.
//!
//! [`CachingRecordSource`] keeps one [`RecordCache`] per `(reference,
//! resolution)` pair, created the first time that pair is queried. Each cache
//! remembers which sub-ranges it has fetched; a new query only asks the backing
//! source for the gaps, so panning back and forth over a region costs one fetch
//! per position, not one per query.
//!
//! Sub-caches are never invalidated: the backing source is assumed not to
//! change while it is wrapped. By default the set of sub-caches is unbounded,
//! growing for as long as the source is open; [`CacheOptions::max_keys`] caps
//! it, evicting whole sub-caches when exceeded.

mod record_cache;

pub use record_cache::RecordCache;

use crate::cancel::Cancellation;
use crate::record::RecordFilter;
use crate::source::RecordSource;
use crate::{Range, Resolution, Result};
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub reference: String,
    pub resolution: Resolution,
}

impl CacheKey {
    pub fn new(reference: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            reference: reference.into(),
            resolution,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reference, self.resolution)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Maximum number of `(reference, resolution)` sub-caches kept alive.
    /// `None` keeps every sub-cache for the life of the source.
    pub max_keys: Option<u64>,
}

type SharedCache<R> = Arc<Mutex<RecordCache<R>>>;

/// Caching decorator over a [`RecordSource`].
///
/// Implements [`RecordSource`] itself, with the same record type, so callers
/// can use it wherever they would use the wrapped source. Only `records` is
/// cached; every other operation passes straight through.
///
/// Calls for the same `(reference, resolution)` are serialized; calls for
/// different pairs proceed independently.
pub struct CachingRecordSource<S: RecordSource> {
    source: Arc<S>,
    caches: Cache<CacheKey, SharedCache<S::Record>>,
    options: CacheOptions,
}

impl<S: RecordSource> CachingRecordSource<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(Arc::new(source), CacheOptions::default())
    }

    pub fn with_options(source: Arc<S>, options: CacheOptions) -> Self {
        let mut builder = Cache::builder();
        if let Some(max_keys) = options.max_keys {
            builder = builder.max_capacity(max_keys);
        }
        Self {
            source,
            caches: builder.build(),
            options,
        }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Like [`RecordSource::records`], aborting with
    /// [`Error::Cancelled`](crate::Error::Cancelled) once `cancel` fires.
    ///
    /// Cancellation is checked before each sub-fetch and raced against the
    /// sub-fetch in flight.
    pub async fn records_cancellable(
        &self,
        reference: &str,
        range: Range,
        resolution: Resolution,
        filter: Option<&RecordFilter<S::Record>>,
        cancel: &Cancellation,
    ) -> Result<Vec<S::Record>> {
        let cache = self.cache_for(reference, resolution).await;
        let mut cache = cache.lock().await;
        cache
            .records(self.source.as_ref(), range, filter, cancel)
            .await
    }

    /// Ranges already fetched for `(reference, resolution)`, or `None` if that
    /// pair has never been queried.
    pub async fn covered(&self, reference: &str, resolution: Resolution) -> Option<Vec<Range>> {
        let cache = self
            .caches
            .get(&CacheKey::new(reference, resolution))
            .await?;
        let cache = cache.lock().await;
        Some(cache.covered().ranges().to_vec())
    }

    /// Number of live sub-caches.
    pub async fn cached_keys(&self) -> u64 {
        self.caches.run_pending_tasks().await;
        self.caches.entry_count()
    }

    async fn cache_for(&self, reference: &str, resolution: Resolution) -> SharedCache<S::Record> {
        let key = CacheKey::new(reference, resolution);
        let label = key.to_string();
        self.caches
            .get_with(key, async move {
                tracing::debug!("creating record cache for {}", label);
                Arc::new(Mutex::new(RecordCache::new(reference, resolution)))
            })
            .await
    }
}

#[async_trait]
impl<S: RecordSource> RecordSource for CachingRecordSource<S> {
    type Record = S::Record;

    async fn reference_names(&self) -> Result<BTreeSet<String>> {
        self.source.reference_names().await
    }

    async fn records(
        &self,
        reference: &str,
        range: Range,
        resolution: Resolution,
        filter: Option<&RecordFilter<S::Record>>,
    ) -> Result<Vec<S::Record>> {
        self.records_cancellable(reference, range, resolution, filter, &Cancellation::new())
            .await
    }

    fn uri(&self) -> String {
        self.source.uri()
    }

    fn column_names(&self) -> Vec<String> {
        self.source.column_names()
    }

    async fn lookup(&self, name: &str) -> Result<Vec<S::Record>> {
        self.source.lookup(name).await
    }

    async fn close(&self) -> Result<()> {
        self.source.close().await
    }
}
