use super::{RecordSource, passes};
use crate::formats::interval_file::{self, FileHeader, PREAMBLE_LEN};
use crate::index::{IndexEntry, IntervalSearchTree, codec};
use crate::record::{IntervalRecord, RecordFilter};
use crate::{Error, Range, Resolution, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Interval records served from an indexed interval file.
///
/// The header and every reference's search tree are read and validated when the
/// file is opened; a corrupt file fails here rather than at query time. Queries
/// search the tree and then read only the matching records.
pub struct IntervalFileSource {
    path: PathBuf,
    columns: Vec<String>,
    trees: HashMap<String, IntervalSearchTree>,
    data_offset: u64,
    data_len: u64,
    file: Mutex<Option<File>>,
}

impl IntervalFileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        let file_len = file.metadata().await?.len();

        let mut preamble = read_at(&mut file, 0, PREAMBLE_LEN).await?;
        let header_len = interval_file::decode_preamble(&mut preamble)?;
        if (PREAMBLE_LEN + header_len) as u64 > file_len {
            return Err(Error::Format(format!(
                "header length {} exceeds file size {}",
                header_len, file_len
            )));
        }
        let mut header_bytes = read_at(&mut file, PREAMBLE_LEN as u64, header_len).await?;
        let header = FileHeader::decode(&mut header_bytes)?;

        let data_end = header.data_offset.checked_add(header.data_len);
        if data_end.is_none_or(|end| end > file_len) {
            return Err(Error::Format(format!(
                "data section {}+{} exceeds file size {}",
                header.data_offset, header.data_len, file_len
            )));
        }

        let mut trees = HashMap::with_capacity(header.references.len());
        for (name, tree_offset) in &header.references {
            if tree_offset.saturating_add(4) > header.data_offset {
                return Err(Error::Format(format!(
                    "tree for {} starts at {}, past the data section",
                    name, tree_offset
                )));
            }
            let mut count_bytes = read_at(&mut file, *tree_offset, 4).await?;
            let node_count = codec::decode_node_count(&mut count_bytes)?;

            let tree_len = (node_count as u64).saturating_mul(codec::NODE_LEN as u64);
            if tree_offset + 4 + tree_len > header.data_offset {
                return Err(Error::Format(format!(
                    "tree for {} declares {} nodes, overrunning the data section",
                    name, node_count
                )));
            }
            let mut node_bytes = read_at(&mut file, tree_offset + 4, tree_len as usize).await?;
            let tree = codec::decode_nodes(&mut node_bytes, node_count, header.data_len)
                .map_err(|e| match e {
                    Error::Format(msg) => Error::Format(format!("reference {}: {}", name, msg)),
                    other => other,
                })?;

            if trees.insert(name.clone(), tree).is_some() {
                return Err(Error::Format(format!("reference {} listed twice", name)));
            }
        }

        tracing::info!(
            "opened interval file {:?}: {} references",
            path,
            trees.len()
        );

        Ok(Self {
            path,
            columns: header.columns,
            trees,
            data_offset: header.data_offset,
            data_len: header.data_len,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of indexed records on `reference`.
    pub fn record_count(&self, reference: &str) -> usize {
        self.trees.get(reference).map_or(0, IntervalSearchTree::len)
    }

    async fn read_entries(
        &self,
        reference: &str,
        entries: &[IndexEntry],
        mut keep: impl FnMut(&IntervalRecord) -> bool + Send,
    ) -> Result<Vec<IntervalRecord>> {
        let mut guard = self.file.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| Error::Closed(self.path.display().to_string()))?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            // Payloads were checked against the data length at open.
            let room = self.data_len.saturating_sub(entry.payload);
            if room < 4 {
                return Err(Error::Format(format!(
                    "record at {} has no room for its length",
                    entry.payload
                )));
            }
            let offset = self.data_offset + entry.payload;
            let mut len_bytes = read_at(file, offset, 4).await?;
            let len = interval_file::decode_record_len(&mut len_bytes)?;
            if len as u64 > room - 4 {
                return Err(Error::Format(format!(
                    "record at {} declares {} bytes, overrunning the data section",
                    entry.payload, len
                )));
            }
            let mut body = read_at(file, offset + 4, len).await?;
            let record = interval_file::decode_record_body(reference, &mut body)?;
            if (record.start, record.end) != (entry.interval.from(), entry.interval.to()) {
                return Err(Error::Format(format!(
                    "record at {} spans {}-{}, index says {}",
                    entry.payload, record.start, record.end, entry.interval
                )));
            }
            if keep(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for IntervalFileSource {
    type Record = IntervalRecord;

    async fn reference_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.trees.keys().cloned().collect())
    }

    async fn records(
        &self,
        reference: &str,
        range: Range,
        _resolution: Resolution,
        filter: Option<&RecordFilter<IntervalRecord>>,
    ) -> Result<Vec<IntervalRecord>> {
        let Some(tree) = self.trees.get(reference) else {
            return Ok(Vec::new());
        };
        let hits = tree.search(range);
        if hits.is_empty() {
            return Ok(Vec::new());
        }
        self.read_entries(reference, &hits, |r| passes(filter, r)).await
    }

    fn uri(&self) -> String {
        std::path::absolute(&self.path)
            .ok()
            .and_then(|p| url::Url::from_file_path(p).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    async fn lookup(&self, name: &str) -> Result<Vec<IntervalRecord>> {
        let mut references: Vec<&String> = self.trees.keys().collect();
        references.sort();

        let mut found = Vec::new();
        for reference in references {
            let entries = self.trees[reference].entries();
            found.extend(
                self.read_entries(reference, &entries, |r| {
                    r.name
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .await?,
            );
        }
        Ok(found)
    }

    async fn close(&self) -> Result<()> {
        if self.file.lock().await.take().is_some() {
            tracing::debug!("closed interval file {:?}", self.path);
        }
        Ok(())
    }
}

async fn read_at(file: &mut File, offset: u64, len: usize) -> Result<Bytes> {
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::Format(format!(
            "unexpected end of file reading {} bytes at {}",
            len, offset
        )),
        _ => Error::Io(e),
    })?;
    Ok(Bytes::from(buf))
}
