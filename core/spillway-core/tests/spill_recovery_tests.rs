// Spill Recovery Integration Tests
//
// 종단 간 통합 테스트: Spiller → 스필 파일 → SpilledFilesStream → AsynchronousBlockStream

use spillway_core::spill::varint::write_var_int;
use spillway_core::storage::EncryptionPath;
use spillway_core::{
    AsynchronousBlockStream, BlockInputStream, EncryptedFileProvider, EncryptionConfig,
    FileProvider, LimitBlockStream, PlainFileProvider, SpillCompression, SpillConfig,
    SpilledFileWriter, SpilledFilesStream, Spiller, SpillwayError, StreamStatistics, read_all,
};

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

// ─── Helpers ────────────────────────────────────────────

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
    ]))
}

fn make_batch(start: i64, rows: i64) -> RecordBatch {
    let ids: Vec<i64> = (start..start + rows).collect();
    let names: Vec<Option<String>> = ids
        .iter()
        .map(|i| if i % 5 == 0 { None } else { Some(format!("row-{}", i)) })
        .collect();
    let scores: Vec<Option<f64>> = ids.iter().map(|i| Some(*i as f64 / 4.0)).collect();
    RecordBatch::try_new(
        schema(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(Float64Array::from(scores)),
        ],
    )
    .unwrap()
}

fn ids(blocks: &[RecordBatch]) -> Vec<i64> {
    blocks
        .iter()
        .flat_map(|b| {
            b.column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap()
                .values()
                .to_vec()
        })
        .collect()
}

fn write_file(
    path: PathBuf,
    provider: &dyn FileProvider,
    codec: SpillCompression,
    version: i64,
    blocks: &[RecordBatch],
) -> PathBuf {
    let mut writer = SpilledFileWriter::create(&path, schema(), provider, codec, version).unwrap();
    for b in blocks {
        writer.write(b).unwrap();
    }
    writer.finish().unwrap()
}

// ═══════════════════════════════════════════════════════════
// SpilledFilesStream
// ═══════════════════════════════════════════════════════════

/// 2, 0, 3 블록 파일 → 정확히 5 블록 후 종료
#[test]
fn test_files_with_empty_middle_yield_five_blocks() {
    let dir = tempdir().unwrap();
    let codec = SpillCompression::default();
    let files = vec![
        write_file(dir.path().join("a"), &PlainFileProvider, codec, 2, &[make_batch(0, 3), make_batch(3, 3)]),
        write_file(dir.path().join("b"), &PlainFileProvider, codec, 2, &[]),
        write_file(
            dir.path().join("c"),
            &PlainFileProvider,
            codec,
            2,
            &[make_batch(6, 1), make_batch(7, 2), make_batch(9, 4)],
        ),
    ];

    let mut stream = SpilledFilesStream::new(files, schema(), PlainFileProvider::shared(), 2);
    let mut blocks = Vec::new();
    while let Some(block) = stream.read().unwrap() {
        blocks.push(block);
    }

    assert_eq!(blocks.len(), 5);
    assert_eq!(ids(&blocks), (0..13).collect::<Vec<_>>());
    assert!(stream.read().unwrap().is_none());
}

/// 버전 혼합 파일 세트: 모든 지원 버전을 하나의 스트림으로 읽기
#[test]
fn test_mixed_versions_in_one_set() {
    let dir = tempdir().unwrap();
    let codec = SpillCompression::None;
    let files = vec![
        write_file(dir.path().join("v1"), &PlainFileProvider, codec, 1, &[make_batch(0, 4)]),
        write_file(dir.path().join("v2"), &PlainFileProvider, codec, 2, &[make_batch(4, 4)]),
    ];

    let mut stream = SpilledFilesStream::new(files, schema(), PlainFileProvider::shared(), 2)
        .with_compression(codec);
    let blocks = read_all(&mut stream).unwrap();
    assert_eq!(blocks, vec![make_batch(0, 4), make_batch(4, 4)]);
}

/// max_supported 미만 리더는 v2 파일 거부, 이전 파일 블록은 유효
#[test]
fn test_reader_limited_to_version_one_rejects_version_two() {
    let dir = tempdir().unwrap();
    let codec = SpillCompression::default();
    let files = vec![
        write_file(dir.path().join("old"), &PlainFileProvider, codec, 1, &[make_batch(0, 2)]),
        write_file(dir.path().join("new"), &PlainFileProvider, codec, 2, &[make_batch(2, 2)]),
    ];

    let mut stream = SpilledFilesStream::new(files, schema(), PlainFileProvider::shared(), 1);
    let first = stream.read().unwrap().unwrap();
    let err = stream.read().unwrap_err();
    assert_eq!(
        err.to_string(),
        "spill file is not supported, max supported version 1, file version 2"
    );
    assert_eq!(ids(&[first]), vec![0, 1]);
}

/// max + 1 버전 파일: 열 때 실패, 그 파일에서는 블록 0개
#[test]
fn test_future_version_file_fails_on_open() {
    let dir = tempdir().unwrap();
    let codec = SpillCompression::default();
    let good = write_file(dir.path().join("good"), &PlainFileProvider, codec, 2, &[make_batch(0, 5)]);

    let future = dir.path().join("future");
    let mut sink = codec
        .compress(
            PlainFileProvider
                .open_write(&future, &EncryptionPath::for_file(&future))
                .unwrap(),
        )
        .unwrap();
    write_var_int(3, &mut sink).unwrap();
    sink.write_all(&[0u8; 64]).unwrap();
    sink.finish().unwrap();

    let mut stream = SpilledFilesStream::new(vec![good, future], schema(), PlainFileProvider::shared(), 2);
    assert_eq!(stream.read().unwrap().unwrap().num_rows(), 5);
    assert!(matches!(
        stream.read(),
        Err(SpillwayError::UnsupportedSpillVersion { max_supported: 2, file_version: 3 })
    ));
    assert!(matches!(stream.read(), Err(SpillwayError::Poisoned(_))));
}

/// 손상된 파일: 디코드 오류로 실패 (fail-fast)
#[test]
fn test_corrupted_file_fails_fast() {
    let dir = tempdir().unwrap();
    let codec = SpillCompression::None;
    let path = write_file(dir.path().join("c"), &PlainFileProvider, codec, 2, &[make_batch(0, 50)]);
    let mut bytes = std::fs::read(&path).unwrap();
    let keep = bytes.len() / 2;
    bytes.truncate(keep);
    std::fs::write(&path, bytes).unwrap();

    let mut stream = SpilledFilesStream::new(vec![path], schema(), PlainFileProvider::shared(), 2)
        .with_compression(codec);
    assert!(matches!(stream.read(), Err(SpillwayError::Decode(_))));
}

/// 암호화 + 압축 파일 왕복
#[test]
fn test_encrypted_compressed_round_trip() {
    let dir = tempdir().unwrap();
    let codec = SpillCompression::zstd(3).unwrap();
    let provider = EncryptedFileProvider::shared(EncryptionConfig::from_key([42u8; 32]));
    let blocks = vec![make_batch(0, 100), make_batch(100, 1)];
    let path = write_file(dir.path().join("enc"), provider.as_ref(), codec, 2, &blocks);

    let raw = std::fs::read(&path).unwrap();
    assert!(!raw.windows(6).any(|w| w == b"row-11"));

    let mut stream = SpilledFilesStream::new(vec![path.clone()], schema(), provider, 2)
        .with_compression(codec);
    assert_eq!(read_all(&mut stream).unwrap(), blocks);

    // Wrong key: authentication fails before any block is decoded.
    let other = EncryptedFileProvider::shared(EncryptionConfig::from_key([1u8; 32]));
    let mut stream = SpilledFilesStream::new(vec![path], schema(), other, 2).with_compression(codec);
    assert!(matches!(stream.read(), Err(SpillwayError::Encryption(_))));
}

// ═══════════════════════════════════════════════════════════
// Spiller + AsynchronousBlockStream
// ═══════════════════════════════════════════════════════════

/// 스필 → 복원 → 비동기 프리페치 파이프라인
#[test]
fn test_restore_through_async_prefetch() {
    spillway_core::logging::init_test();
    let root = tempdir().unwrap();
    let config = SpillConfig::default().with_spill_dir(root.path());
    let mut spiller = Spiller::new(config, "agg", schema(), 1, PlainFileProvider::shared()).unwrap();
    spiller.spill_blocks(0, &[make_batch(0, 10), make_batch(10, 10)]).unwrap();
    spiller.spill_blocks(0, &[]).unwrap();
    spiller.spill_blocks(0, &[make_batch(20, 5)]).unwrap();

    let mut stream = AsynchronousBlockStream::new(Box::new(spiller.restore(0).unwrap()));
    stream.read_prefix().unwrap();
    let mut blocks = Vec::new();
    loop {
        while !stream.poll(Duration::from_millis(5)).unwrap() {}
        match stream.read().unwrap() {
            Some(block) => blocks.push(block),
            None => break,
        }
    }
    stream.read_suffix().unwrap();

    assert_eq!(ids(&blocks), (0..25).collect::<Vec<_>>());

    let stats = StreamStatistics::collect(&stream);
    assert_eq!(stats[0].kind, "Asynchronous");
    assert_eq!(stats[0].outbound_rows, 25);
    assert_eq!(stats[1].kind, "SpilledFiles");
    assert_eq!(stats[1].outbound_blocks, 3);
}

/// LIMIT으로 조기 종료: 스필 리더를 중간에 버려도 파일은 Spiller가 정리
#[test]
fn test_early_abandon_under_limit() {
    let mut spiller =
        Spiller::new(SpillConfig::default(), "join", schema(), 1, PlainFileProvider::shared()).unwrap();
    for i in 0..4 {
        spiller.spill_blocks(0, &[make_batch(i * 10, 10)]).unwrap();
    }
    let files = spiller.spilled_files(0).unwrap().to_vec();

    let restored = spiller.restore(0).unwrap();
    let mut limited = LimitBlockStream::new(Box::new(AsynchronousBlockStream::new(Box::new(restored))), 15, 0);
    let blocks = read_all(&mut limited).unwrap();
    assert_eq!(ids(&blocks), (0..15).collect::<Vec<_>>());
    drop(limited);

    // Reader never deletes; the owner does.
    assert!(files.iter().all(|f| f.exists()));
    drop(spiller);
    assert!(files.iter().all(|f| !f.exists()));
}
