mod records;
mod service_info;
mod tracks;

pub use records::{get_records, lookup_records};
pub use service_info::service_info;
pub use tracks::{get_references, list_tracks};

use crate::cache::{CacheOptions, CachingRecordSource};
use crate::formats::interval_file::EXTENSION;
use crate::source::IntervalFileSource;
use crate::{Error, Result};
use axum::{Router, routing::get};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// An interval file behind its record cache.
pub type Track = CachingRecordSource<IntervalFileSource>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tracks: Arc<TrackRegistry>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, options: CacheOptions) -> Self {
        Self {
            tracks: Arc::new(TrackRegistry::new(data_dir, options)),
        }
    }
}

/// Interval files in a directory, opened on first use and kept open with their
/// caches for the life of the server.
pub struct TrackRegistry {
    data_dir: PathBuf,
    options: CacheOptions,
    open: RwLock<HashMap<String, Arc<Track>>>,
}

impl TrackRegistry {
    pub fn new(data_dir: PathBuf, options: CacheOptions) -> Self {
        Self {
            data_dir,
            options,
            open: RwLock::new(HashMap::new()),
        }
    }

    pub fn cache_options(&self) -> &CacheOptions {
        &self.options
    }

    /// Ids of the interval files in the data directory, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Track>> {
        if let Some(track) = self.open.read().await.get(id) {
            return Ok(track.clone());
        }

        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(Error::InvalidInput(format!("invalid track id: {}", id)));
        }
        let path = self.data_dir.join(format!("{}.{}", id, EXTENSION));
        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::NotFound(id.to_string()));
        }

        let source = IntervalFileSource::open(&path).await?;
        let mut open = self.open.write().await;
        // Another request may have opened it while this one was reading.
        let track = open
            .entry(id.to_string())
            .or_insert_with(|| {
                Arc::new(CachingRecordSource::with_options(
                    Arc::new(source),
                    self.options.clone(),
                ))
            })
            .clone();
        Ok(track)
    }
}

/// Build the service router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/service-info", get(service_info))
        .route("/tracks", get(list_tracks))
        .route("/tracks/:id/references", get(get_references))
        .route("/tracks/:id/records", get(get_records))
        .route("/tracks/:id/lookup", get(lookup_records))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
