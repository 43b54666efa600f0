use super::AppState;
use crate::Result;
use crate::source::RecordSource;
use crate::types::{ReferenceList, TrackList};
use axum::{
    Json,
    extract::{Path, State},
};

pub async fn list_tracks(State(state): State<AppState>) -> Result<Json<TrackList>> {
    let tracks = state.tracks.list().await?;
    Ok(Json(TrackList { tracks }))
}

pub async fn get_references(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReferenceList>> {
    let track = state.tracks.get(&id).await?;
    let references = track.reference_names().await?.into_iter().collect();

    Ok(Json(ReferenceList {
        track: id,
        uri: track.uri(),
        columns: track.column_names(),
        references,
    }))
}
