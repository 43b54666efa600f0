//! The persisted interval file: header, one search tree per reference, and a
//! data section of length-prefixed records.
//!
//! ```text
//! magic "TCIX" | version u16 | header length u32
//! header:  columns (u16 n, strings) | references (u32 n, name + tree offset u64)
//!          | data offset u64 | data length u64
//! trees:   one tree section per reference, see `index::codec`
//! data:    (u32 length, record body)*
//! ```
//!
//! Strings are a u16 byte length followed by UTF-8. Payload offsets stored in
//! the trees are relative to the start of the data section.

use crate::index::{IndexEntry, IntervalSearchTree, codec};
use crate::record::{IntervalRecord, Record, Strand};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub const MAGIC: &[u8; 4] = b"TCIX";
pub const VERSION: u16 = 1;
/// Magic, version and header length.
pub const PREAMBLE_LEN: usize = 4 + 2 + 4;

/// Conventional file extension for interval files.
pub const EXTENSION: &str = "tcx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub columns: Vec<String>,
    /// Reference name and absolute offset of its tree section.
    pub references: Vec<(String, u64)>,
    pub data_offset: u64,
    pub data_len: u64,
}

impl FileHeader {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u16(checked_u16(self.columns.len(), "column count")?);
        for column in &self.columns {
            put_string(buf, column)?;
        }
        buf.put_u32(self.references.len() as u32);
        for (name, tree_offset) in &self.references {
            put_string(buf, name)?;
            buf.put_u64(*tree_offset);
        }
        buf.put_u64(self.data_offset);
        buf.put_u64(self.data_len);
        Ok(())
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let column_count = get_u16(buf, "column count")?;
        let columns = (0..column_count)
            .map(|_| get_string(buf))
            .collect::<Result<Vec<_>>>()?;

        let reference_count = get_u32(buf, "reference count")?;
        let mut references = Vec::new();
        for _ in 0..reference_count {
            let name = get_string(buf)?;
            let offset = get_u64(buf, "tree offset")?;
            references.push((name, offset));
        }

        let data_offset = get_u64(buf, "data offset")?;
        let data_len = get_u64(buf, "data length")?;

        Ok(Self {
            columns,
            references,
            data_offset,
            data_len,
        })
    }
}

/// Check magic and version, returning the header length that follows.
pub fn decode_preamble<B: Buf>(buf: &mut B) -> Result<usize> {
    if buf.remaining() < PREAMBLE_LEN {
        return Err(Error::Format("file too short for header".to_string()));
    }
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(Error::Format("not an interval file (bad magic)".to_string()));
    }
    let version = buf.get_u16();
    if version != VERSION {
        return Err(Error::Format(format!("unsupported version {}", version)));
    }
    Ok(buf.get_u32() as usize)
}

pub fn encode_record<B: BufMut>(record: &IntervalRecord, buf: &mut B) -> Result<()> {
    let mut body = BytesMut::new();
    body.put_u64(record.start);
    body.put_u64(record.end);
    match &record.name {
        Some(name) => {
            body.put_u8(1);
            put_string(&mut body, name)?;
        }
        None => body.put_u8(0),
    }
    match record.score {
        Some(score) => {
            body.put_u8(1);
            body.put_f32(score);
        }
        None => body.put_u8(0),
    }
    body.put_u8(record.strand.to_byte());
    body.put_u16(checked_u16(record.extra.len(), "extra column count")?);
    for field in &record.extra {
        put_string(&mut body, field)?;
    }

    buf.put_u32(body.len() as u32);
    buf.put(body);
    Ok(())
}

/// Length of the record body announced by its prefix.
pub fn decode_record_len<B: Buf>(buf: &mut B) -> Result<usize> {
    Ok(get_u32(buf, "record length")? as usize)
}

pub fn decode_record_body<B: Buf>(reference: &str, buf: &mut B) -> Result<IntervalRecord> {
    let start = get_u64(buf, "record start")?;
    let end = get_u64(buf, "record end")?;
    let name = match get_u8(buf, "name flag")? {
        0 => None,
        _ => Some(get_string(buf)?),
    };
    let score = match get_u8(buf, "score flag")? {
        0 => None,
        _ => {
            if buf.remaining() < 4 {
                return Err(truncated("score"));
            }
            Some(buf.get_f32())
        }
    };
    let strand_byte = get_u8(buf, "strand")?;
    let strand = Strand::from_byte(strand_byte)
        .ok_or_else(|| Error::Format(format!("invalid strand byte {:#04x}", strand_byte)))?;
    let extra_count = get_u16(buf, "extra column count")?;
    let extra = (0..extra_count)
        .map(|_| get_string(buf))
        .collect::<Result<Vec<_>>>()?;

    Ok(IntervalRecord {
        reference: reference.to_string(),
        start,
        end,
        name,
        score,
        strand,
        extra,
    })
}

/// Summary of a written file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub references: usize,
    pub records: usize,
    pub bytes: usize,
}

/// Collects interval records and writes them as an indexed interval file.
#[derive(Debug, Default)]
pub struct IntervalFileWriter {
    columns: Vec<String>,
    records: BTreeMap<String, Vec<IntervalRecord>>,
}

impl IntervalFileWriter {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, record: IntervalRecord) -> Result<()> {
        if record.start == 0 || record.end < record.start {
            return Err(Error::InvalidRange(format!(
                "{}:{}-{}",
                record.reference, record.start, record.end
            )));
        }
        self.records
            .entry(record.reference.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = IntervalRecord>) -> Result<()> {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    pub fn into_bytes(mut self) -> Result<Bytes> {
        let mut data = BytesMut::new();
        let mut trees = Vec::with_capacity(self.records.len());

        for (reference, records) in self.records.iter_mut() {
            // Stable: equal intervals stay in input order.
            records.sort_by_key(|r| (r.start, r.end));
            let mut entries = Vec::with_capacity(records.len());
            for record in records.iter() {
                entries.push(IndexEntry {
                    interval: record.span(),
                    payload: data.len() as u64,
                });
                encode_record(record, &mut data)?;
            }
            trees.push((reference.clone(), IntervalSearchTree::build(entries)));
        }

        // Offsets are fixed width, so a placeholder header has the final length.
        let mut header = FileHeader {
            columns: self.columns.clone(),
            references: trees.iter().map(|(name, _)| (name.clone(), 0)).collect(),
            data_offset: 0,
            data_len: data.len() as u64,
        };
        let mut probe = BytesMut::new();
        header.encode(&mut probe)?;
        let header_len = probe.len();

        let mut offset = (PREAMBLE_LEN + header_len) as u64;
        for ((_, tree_offset), (_, tree)) in header.references.iter_mut().zip(&trees) {
            *tree_offset = offset;
            offset += codec::encoded_len(tree.len()) as u64;
        }
        header.data_offset = offset;

        let mut out = BytesMut::with_capacity(offset as usize + data.len());
        out.put_slice(MAGIC);
        out.put_u16(VERSION);
        out.put_u32(header_len as u32);
        header.encode(&mut out)?;
        for (_, tree) in &trees {
            codec::encode_tree(tree, &mut out);
        }
        debug_assert_eq!(out.len() as u64, header.data_offset);
        out.put(data);

        Ok(out.freeze())
    }

    pub async fn write(self, path: impl AsRef<Path>) -> Result<WriteSummary> {
        let references = self.records.len();
        let records = self.records.values().map(Vec::len).sum();
        let bytes = self.into_bytes()?;

        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        tracing::debug!(
            "wrote {} records over {} references to {:?}",
            records,
            references,
            path.as_ref()
        );

        Ok(WriteSummary {
            references,
            records,
            bytes: bytes.len(),
        })
    }
}

fn truncated(what: &str) -> Error {
    Error::Format(format!("truncated while reading {}", what))
}

fn checked_u16(n: usize, what: &str) -> Result<u16> {
    u16::try_from(n).map_err(|_| Error::InvalidInput(format!("{} {} exceeds {}", what, n, u16::MAX)))
}

fn put_string<B: BufMut>(buf: &mut B, s: &str) -> Result<()> {
    buf.put_u16(checked_u16(s.len(), "string length")?);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn get_string<B: Buf>(buf: &mut B) -> Result<String> {
    let len = get_u16(buf, "string length")? as usize;
    if buf.remaining() < len {
        return Err(truncated("string"));
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Format("string is not UTF-8".to_string()))
}

fn get_u8<B: Buf>(buf: &mut B, what: &str) -> Result<u8> {
    if buf.remaining() < 1 {
        return Err(truncated(what));
    }
    Ok(buf.get_u8())
}

fn get_u16<B: Buf>(buf: &mut B, what: &str) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(truncated(what));
    }
    Ok(buf.get_u16())
}

fn get_u32<B: Buf>(buf: &mut B, what: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(truncated(what));
    }
    Ok(buf.get_u32())
}

fn get_u64<B: Buf>(buf: &mut B, what: &str) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(truncated(what));
    }
    Ok(buf.get_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> IntervalRecord {
        IntervalRecord::new("chr2", 1001, 1500)
            .with_name("BRCA2")
            .with_score(850.0)
            .with_strand(Strand::Reverse)
    }

    #[test]
    fn test_record_body_decodes() {
        let mut record = sample_record();
        record.extra = vec!["thick".to_string(), "255,0,0".to_string()];
        let mut buf = BytesMut::new();
        encode_record(&record, &mut buf).unwrap();

        let mut bytes = buf.freeze();
        let len = decode_record_len(&mut bytes).unwrap();
        assert_eq!(len, bytes.remaining());
        assert_eq!(decode_record_body("chr2", &mut bytes).unwrap(), record);
    }

    #[test]
    fn test_bad_strand_rejected() {
        let mut buf = BytesMut::new();
        encode_record(&IntervalRecord::new("chr1", 1, 2), &mut buf).unwrap();
        // length(4) start(8) end(8) name flag(1) score flag(1) -> strand at 22
        buf[22] = b'x';
        let mut bytes = buf.freeze();
        decode_record_len(&mut bytes).unwrap();
        assert!(matches!(decode_record_body("chr1", &mut bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_layout_offsets() {
        let mut writer = IntervalFileWriter::new(vec!["name".to_string()]);
        writer
            .extend([
                IntervalRecord::new("chr1", 10, 20),
                IntervalRecord::new("chr1", 5, 8),
                sample_record(),
            ])
            .unwrap();
        let bytes = writer.into_bytes().unwrap();

        let mut buf = bytes.clone();
        let header_len = decode_preamble(&mut buf).unwrap();
        let header = FileHeader::decode(&mut buf.copy_to_bytes(header_len)).unwrap();

        assert_eq!(header.columns, vec!["name".to_string()]);
        let names: Vec<&str> = header.references.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["chr1", "chr2"]);
        assert_eq!(header.references[0].1 as usize, PREAMBLE_LEN + header_len);
        assert_eq!(
            header.data_offset + header.data_len,
            bytes.len() as u64
        );
    }

    #[test]
    fn test_push_rejects_zero_start() {
        let mut writer = IntervalFileWriter::default();
        assert!(matches!(
            writer.push(IntervalRecord::new("chr1", 0, 10)),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = Bytes::from_static(b"BAM\x01\x00\x01\x00\x00\x00\x00");
        assert!(matches!(decode_preamble(&mut buf), Err(Error::Format(_))));
    }
}
