use serde::{Deserialize, Serialize};
use std::fmt;

/// Zoom level a query is made at. Part of the cache key, since a source may
/// serve pre-aggregated data at coarser resolutions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    VeryLow,
    Low,
    Medium,
    #[default]
    High,
    VeryHigh,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::VeryLow,
        Resolution::Low,
        Resolution::Medium,
        Resolution::High,
        Resolution::VeryHigh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::VeryLow => "very_low",
            Resolution::Low => "low",
            Resolution::Medium => "medium",
            Resolution::High => "high",
            Resolution::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters for record requests.
///
/// Either `region` (`chr1:100-200`) or `referenceName` with optional
/// `start`/`end` (1-based, inclusive).
#[derive(Debug, Deserialize, Default)]
pub struct RecordsQuery {
    pub region: Option<String>,
    #[serde(rename = "referenceName")]
    pub reference_name: Option<String>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse<R> {
    pub track: String,
    #[serde(rename = "referenceName")]
    pub reference_name: String,
    pub start: u64,
    pub end: u64,
    pub resolution: Resolution,
    pub records: Vec<R>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse<R> {
    pub track: String,
    pub name: String,
    pub records: Vec<R>,
}

#[derive(Debug, Serialize)]
pub struct TrackList {
    pub tracks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceList {
    pub track: String,
    pub uri: String,
    pub columns: Vec<String>,
    pub references: Vec<String>,
}

/// Service description returned from `/` and `/service-info`.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub resolutions: Vec<Resolution>,
    #[serde(rename = "maxCachedKeys", skip_serializing_if = "Option::is_none")]
    pub max_cached_keys: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_names_match_serde() {
        for resolution in Resolution::ALL {
            let json = serde_json::to_string(&resolution).unwrap();
            assert_eq!(json, format!("\"{}\"", resolution.as_str()));
        }
    }

    #[test]
    fn test_resolution_ordering() {
        assert!(Resolution::VeryLow < Resolution::VeryHigh);
        assert_eq!(Resolution::default(), Resolution::High);
    }
}
