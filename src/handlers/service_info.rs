use super::AppState;
use crate::types::{Resolution, ServiceInfo};
use axum::{Json, extract::State};

pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "trackcache".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Indexed genomic interval tracks with range-coverage caching".to_string(),
        resolutions: Resolution::ALL.to_vec(),
        max_cached_keys: state.tracks.cache_options().max_keys,
    })
}
