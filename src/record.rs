//! Records returned by sources and the capability tag that decides how they are stashed.

use crate::range::Range;
use serde::Serialize;
use std::fmt;

/// How a record type is keyed in the cache stash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Single-position or continuous data, keyed by position.
    Point,
    /// Features with extent, keyed by `(start, end)`.
    Interval,
}

/// One genomic data item.
pub trait Record: Clone + PartialEq + Send + Sync + 'static {
    const KIND: RecordKind;

    /// Positions the record occupies on its reference.
    fn span(&self) -> Range;
}

/// Predicate applied by sources while fetching.
pub type RecordFilter<R> = dyn Fn(&R) -> bool + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
    #[default]
    #[serde(rename = ".")]
    Unknown,
}

impl Strand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            "." => Some(Strand::Unknown),
            _ => None,
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Strand::Forward => b'+',
            Strand::Reverse => b'-',
            Strand::Unknown => b'.',
        }
    }

    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'+' => Some(Strand::Forward),
            b'-' => Some(Strand::Reverse),
            b'.' => Some(Strand::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_byte() as char)
    }
}

/// A feature with extent, e.g. one BED line. Coordinates are 1-based and closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRecord {
    pub reference: String,
    pub start: u64,
    pub end: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub strand: Strand,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl IntervalRecord {
    pub fn new(reference: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            reference: reference.into(),
            start,
            end,
            name: None,
            score: None,
            strand: Strand::Unknown,
            extra: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }
}

impl Record for IntervalRecord {
    const KIND: RecordKind = RecordKind::Interval;

    /// A record whose end lies before its start spans its start position only.
    fn span(&self) -> Range {
        Range::new_unchecked(self.start, self.end.max(self.start))
    }
}

/// A value at a single position (coverage, signal).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub reference: String,
    pub position: u64,
    pub value: f32,
}

impl PointRecord {
    pub fn new(reference: impl Into<String>, position: u64, value: f32) -> Self {
        Self {
            reference: reference.into(),
            position,
            value,
        }
    }
}

impl Record for PointRecord {
    const KIND: RecordKind = RecordKind::Point;

    fn span(&self) -> Range {
        Range::point(self.position)
    }
}
