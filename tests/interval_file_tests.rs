use tempfile::TempDir;
use trackcache::formats::IntervalFileWriter;
use trackcache::formats::interval_file::{EXTENSION, FileHeader, decode_preamble};
use trackcache::source::{IntervalFileSource, RecordSource};
use trackcache::{CachingRecordSource, Error, IntervalRecord, Range, Resolution, Strand};

fn genes() -> Vec<IntervalRecord> {
    vec![
        IntervalRecord::new("chr1", 11_874, 14_409)
            .with_name("DDX11L1")
            .with_strand(Strand::Forward),
        IntervalRecord::new("chr1", 14_404, 29_570)
            .with_name("WASH7P")
            .with_strand(Strand::Reverse),
        IntervalRecord::new("chr1", 69_091, 70_008)
            .with_name("OR4F5")
            .with_score(960.0)
            .with_strand(Strand::Forward),
        IntervalRecord::new("chr2", 38_814, 46_870).with_name("FAM110C"),
        IntervalRecord::new("chrX", 100_000, 200_000).with_name("wash7p"),
    ]
}

async fn write_genes(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join(format!("genes.{}", EXTENSION));
    let mut writer = IntervalFileWriter::new(vec!["name".to_string(), "score".to_string()]);
    writer.extend(genes()).unwrap();
    let summary = writer.write(&path).await.unwrap();
    assert_eq!(summary.references, 3);
    assert_eq!(summary.records, 5);
    path
}

fn r(from: u64, to: u64) -> Range {
    Range::new(from, to).unwrap()
}

#[tokio::test]
async fn test_write_open_query() {
    let dir = TempDir::new().unwrap();
    let source = IntervalFileSource::open(write_genes(&dir).await).await.unwrap();

    let records = source
        .records("chr1", r(14_000, 15_000), Resolution::High, None)
        .await
        .unwrap();
    let names: Vec<_> = records.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, vec!["DDX11L1", "WASH7P"]);
    assert_eq!(records[0].strand, Strand::Forward);
    assert_eq!(records[0].reference, "chr1");

    let or4f5 = source
        .records("chr1", r(70_008, 70_008), Resolution::High, None)
        .await
        .unwrap();
    assert_eq!(or4f5.len(), 1);
    assert_eq!(or4f5[0].score, Some(960.0));

    assert_eq!(source.record_count("chr1"), 3);
    let references: Vec<_> = source.reference_names().await.unwrap().into_iter().collect();
    assert_eq!(references, vec!["chr1", "chr2", "chrX"]);
}

#[tokio::test]
async fn test_unknown_reference_is_empty() {
    let dir = TempDir::new().unwrap();
    let source = IntervalFileSource::open(write_genes(&dir).await).await.unwrap();

    let records = source
        .records("chr22", r(1, 1_000_000), Resolution::High, None)
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_columns_and_uri() {
    let dir = TempDir::new().unwrap();
    let source = IntervalFileSource::open(write_genes(&dir).await).await.unwrap();

    assert_eq!(source.column_names(), vec!["name", "score"]);
    let uri = source.uri();
    assert!(uri.starts_with("file://"), "{}", uri);
    assert!(uri.ends_with("genes.tcx"), "{}", uri);
}

#[tokio::test]
async fn test_lookup_ignores_case() {
    let dir = TempDir::new().unwrap();
    let source = IntervalFileSource::open(write_genes(&dir).await).await.unwrap();

    let found = source.lookup("WASH7P").await.unwrap();
    let places: Vec<_> = found.iter().map(|r| (r.reference.as_str(), r.start)).collect();
    assert_eq!(places, vec![("chr1", 14_404), ("chrX", 100_000)]);

    assert!(source.lookup("BRCA1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reads_after_close_fail() {
    let dir = TempDir::new().unwrap();
    let source = IntervalFileSource::open(write_genes(&dir).await).await.unwrap();

    source.close().await.unwrap();
    source.close().await.unwrap();
    let err = source
        .records("chr1", r(1, 100_000), Resolution::High, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Closed(_)));
}

#[tokio::test]
async fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = IntervalFileSource::open(dir.path().join("absent.tcx"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_corrupt_files_rejected_at_open() {
    let dir = TempDir::new().unwrap();
    let good = tokio::fs::read(write_genes(&dir).await).await.unwrap();

    let mut bad_magic = good.clone();
    bad_magic[0] = b'X';

    let truncated = good[..good.len() / 2].to_vec();

    let mut huge_header = good.clone();
    huge_header[6..10].copy_from_slice(&u32::MAX.to_be_bytes());

    for (name, bytes) in [
        ("bad_magic", bad_magic),
        ("truncated", truncated),
        ("huge_header", huge_header),
        ("empty", Vec::new()),
    ] {
        let path = dir.path().join(format!("{}.tcx", name));
        tokio::fs::write(&path, bytes).await.unwrap();
        let err = IntervalFileSource::open(&path).await.err().unwrap();
        assert!(matches!(err, Error::Format(_)), "{}: {:?}", name, err);
    }
}

#[tokio::test]
async fn test_corrupt_records_rejected_at_read() {
    let dir = TempDir::new().unwrap();
    let good = tokio::fs::read(write_genes(&dir).await).await.unwrap();

    let mut buf = &good[..];
    let header_len = decode_preamble(&mut buf).unwrap();
    let header = FileHeader::decode(&mut &buf[..header_len]).unwrap();
    // The first record written is chr1's first, DDX11L1.
    let first = header.data_offset as usize;

    let mut huge_record = good.clone();
    huge_record[first..first + 4].copy_from_slice(&u32::MAX.to_be_bytes());

    let mut moved_record = good.clone();
    moved_record[first + 4..first + 12].copy_from_slice(&20_000u64.to_be_bytes());

    for (name, bytes) in [("huge_record", huge_record), ("moved_record", moved_record)] {
        let path = dir.path().join(format!("{}.tcx", name));
        tokio::fs::write(&path, bytes).await.unwrap();
        let source = IntervalFileSource::open(&path).await.unwrap();

        let err = source
            .records("chr1", r(11_874, 11_874), Resolution::High, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{}: {:?}", name, err);

        let untouched = source
            .records("chr2", r(1, 100_000), Resolution::High, None)
            .await
            .unwrap();
        assert_eq!(untouched.len(), 1, "{}", name);
    }
}

#[tokio::test]
async fn test_cached_file_source_matches_direct() {
    let dir = TempDir::new().unwrap();
    let path = write_genes(&dir).await;
    let direct = IntervalFileSource::open(&path).await.unwrap();
    let cached = CachingRecordSource::new(IntervalFileSource::open(&path).await.unwrap());

    for query in [r(1, 20_000), r(10_000, 80_000), r(14_405, 14_405), r(1, 100_000)] {
        let expected = direct.records("chr1", query, Resolution::High, None).await.unwrap();
        let got = cached.records("chr1", query, Resolution::High, None).await.unwrap();
        assert_eq!(got, expected, "query {}", query);
    }
    assert_eq!(
        cached.covered("chr1", Resolution::High).await,
        Some(vec![r(1, 100_000)])
    );
}
