use super::{RecordSource, passes};
use crate::record::{Record, RecordFilter};
use crate::{Range, Resolution, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// Records held in memory, grouped by reference and sorted by start, then end.
pub struct MemorySource<R: Record> {
    name: String,
    records: HashMap<String, Vec<R>>,
}

impl<R: Record> MemorySource<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: HashMap::new(),
        }
    }

    pub fn insert(&mut self, reference: impl Into<String>, record: R) {
        let records = self.records.entry(reference.into()).or_default();
        let key = (record.span().from(), record.span().to());
        let at = records.partition_point(|r| (r.span().from(), r.span().to()) <= key);
        records.insert(at, record);
    }

    pub fn with_records(
        mut self,
        reference: impl Into<String>,
        records: impl IntoIterator<Item = R>,
    ) -> Self {
        let reference = reference.into();
        for record in records {
            self.insert(reference.clone(), record);
        }
        self
    }

    /// Every record on `reference`, in `(start, end)` order.
    pub fn all(&self, reference: &str) -> &[R] {
        self.records.get(reference).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl<R: Record> RecordSource for MemorySource<R> {
    type Record = R;

    async fn reference_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.records.keys().cloned().collect())
    }

    async fn records(
        &self,
        reference: &str,
        range: Range,
        _resolution: Resolution,
        filter: Option<&RecordFilter<R>>,
    ) -> Result<Vec<R>> {
        let records = self.all(reference);
        // Nothing at or beyond this point starts inside the range.
        let end = records.partition_point(|r| r.span().from() <= range.to());
        Ok(records[..end]
            .iter()
            .filter(|r| r.span().intersects(&range) && passes(filter, r))
            .cloned()
            .collect())
    }

    fn uri(&self) -> String {
        format!("memory://{}", self.name)
    }
}
