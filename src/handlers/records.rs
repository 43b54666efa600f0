use super::AppState;
use crate::record::IntervalRecord;
use crate::source::RecordSource;
use crate::types::{LookupQuery, LookupResponse, RecordsQuery, RecordsResponse};
use crate::{Error, Range, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use noodles::core::Region;

pub async fn get_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse<IntervalRecord>>> {
    let (reference, range) = resolve_region(&query)?;
    let resolution = query.resolution.unwrap_or_default();

    let track = state.tracks.get(&id).await?;
    let records = track.records(&reference, range, resolution, None).await?;

    Ok(Json(RecordsResponse {
        track: id,
        reference_name: reference,
        start: range.from(),
        end: range.to(),
        resolution,
        records,
    }))
}

pub async fn lookup_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse<IntervalRecord>>> {
    if query.name.trim().is_empty() {
        return Err(Error::InvalidInput("name must not be empty".to_string()));
    }
    let track = state.tracks.get(&id).await?;
    let records = track.lookup(&query.name).await?;

    Ok(Json(LookupResponse {
        track: id,
        name: query.name,
        records,
    }))
}

/// Reference and 1-based closed range named by the query. A missing start or
/// end leaves that side of the range open.
fn resolve_region(query: &RecordsQuery) -> Result<(String, Range)> {
    let (reference, start, end) = match (&query.region, &query.reference_name) {
        (Some(region), _) => {
            let parsed: Region = region
                .parse()
                .map_err(|e| Error::InvalidInput(format!("invalid region {:?}: {}", region, e)))?;
            let name: &[u8] = parsed.name().as_ref();
            let interval = parsed.interval();
            (
                String::from_utf8_lossy(name).into_owned(),
                interval.start().map(|p| usize::from(p) as u64),
                interval.end().map(|p| usize::from(p) as u64),
            )
        }
        (None, Some(reference)) => (reference.clone(), query.start, query.end),
        (None, None) => {
            return Err(Error::InvalidInput(
                "referenceName or region is required".to_string(),
            ));
        }
    };

    let start = start.unwrap_or(1);
    if start == 0 {
        return Err(Error::InvalidRange("start is 1-based and must be positive".to_string()));
    }
    let range = Range::new(start, end.unwrap_or(u64::MAX))?;
    Ok((reference, range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(region: Option<&str>, reference: Option<&str>, start: Option<u64>, end: Option<u64>) -> RecordsQuery {
        RecordsQuery {
            region: region.map(String::from),
            reference_name: reference.map(String::from),
            start,
            end,
            resolution: None,
        }
    }

    #[test]
    fn test_region_string() {
        let (reference, range) = resolve_region(&query(Some("chr1:100-200"), None, None, None)).unwrap();
        assert_eq!(reference, "chr1");
        assert_eq!(range, Range::new(100, 200).unwrap());
    }

    #[test]
    fn test_reference_without_bounds_is_whole_reference() {
        let (reference, range) = resolve_region(&query(None, Some("chrX"), None, None)).unwrap();
        assert_eq!(reference, "chrX");
        assert_eq!((range.from(), range.to()), (1, u64::MAX));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = resolve_region(&query(None, Some("chr1"), Some(500), Some(100))).unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)));
    }

    #[test]
    fn test_zero_start_rejected() {
        let err = resolve_region(&query(None, Some("chr1"), Some(0), Some(100))).unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let err = resolve_region(&query(None, None, Some(1), Some(100))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
