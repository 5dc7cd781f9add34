//! End-to-end target behavior: round-trips through the local mirror and
//! the in-memory remote store, compressed and uncompressed, whole-file
//! and chunked.

use std::sync::Arc;

use emberflow_store::{MemoryStore, ObjectStore, StoreConfig, StoreTarget};
use emberflow_targets::{
    BoolCodec, ColumnCodec, ColumnTypes, CsvOptions, CsvTarget, Column, Frame, IntCodec,
    TimestampCodec, TypedCsvTarget, Value, DEFAULT_CHUNK_SIZE,
};
use tempfile::tempdir;

fn local_target(root: &std::path::Path, uri: &str, compressed: bool) -> CsvTarget {
    CsvTarget::from_uri(
        uri,
        StoreConfig::local(root),
        Arc::new(MemoryStore::new()),
        compressed,
    )
    .unwrap()
}

fn sample_types() -> ColumnTypes {
    let mut types = ColumnTypes::new();
    types.insert("active".to_string(), Arc::new(BoolCodec) as Arc<dyn ColumnCodec>);
    types.insert("count".to_string(), Arc::new(IntCodec) as Arc<dyn ColumnCodec>);
    types.insert(
        "seen_at".to_string(),
        Arc::new(TimestampCodec) as Arc<dyn ColumnCodec>,
    );
    types
}

fn sample_frame() -> Frame {
    Frame::try_new(vec![
        Column::new("active", vec![Value::Bool(true), Value::Bool(false), Value::Null]),
        Column::new("count", vec![Value::Int(10), Value::Int(-3), Value::Int(0)]),
        Column::new(
            "seen_at",
            vec![
                Value::Str("2024-06-01T12:30:00Z".into()),
                Value::Str("1970-01-01T00:00:00Z".into()),
                Value::Null,
            ],
        ),
        Column::new(
            "label",
            vec![Value::Str("a".into()), Value::Str("b".into()), Value::Str("c".into())],
        ),
    ])
    .unwrap()
}

#[test]
fn test_typed_round_trip_uncompressed() {
    let root = tempdir().unwrap();
    let target = TypedCsvTarget::new(
        local_target(root.path(), "s3://bucket/data.csv", false),
        sample_types(),
    );

    let frame = sample_frame();
    target.write_typed(&frame).unwrap();
    assert_eq!(target.read_typed().unwrap(), frame);
}

#[test]
fn test_typed_round_trip_compressed() {
    let root = tempdir().unwrap();
    let target = TypedCsvTarget::new(
        local_target(root.path(), "s3://bucket/data.csv.gz", true),
        sample_types(),
    );

    let frame = sample_frame();
    target.write_typed(&frame).unwrap();
    assert_eq!(target.read_typed().unwrap(), frame);

    // The mirrored file really is a gzip stream.
    let raw = std::fs::read(root.path().join("bucket/data.csv.gz")).unwrap();
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);
}

#[test]
fn test_compression_transparency() {
    let root = tempdir().unwrap();
    let frame = sample_frame();

    let plain = TypedCsvTarget::new(
        local_target(root.path(), "s3://bucket/plain.csv", false),
        sample_types(),
    );
    let gzipped = TypedCsvTarget::new(
        local_target(root.path(), "s3://bucket/gzipped.csv.gz", true),
        sample_types(),
    );

    plain.write_typed(&frame).unwrap();
    gzipped.write_typed(&frame).unwrap();

    assert_eq!(plain.read_typed().unwrap(), gzipped.read_typed().unwrap());
}

#[test]
fn test_single_cell_example() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://some_bucket/some_file.csv", false);

    let frame = Frame::try_new(vec![Column::new("a", vec![Value::Int(1)])]).unwrap();
    target.write_frame(&frame).unwrap();

    let read = target.read_frame().unwrap();
    assert_eq!(read, frame);
    assert_eq!(read.column("a").unwrap().values, vec![Value::Int(1)]);
}

#[test]
fn test_write_rows_with_header() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://bucket/tuples.csv", false);

    let header = vec!["id".to_string(), "name".to_string()];
    let rows = vec![
        vec!["1".to_string(), "alpha".to_string()],
        vec!["2".to_string(), "beta".to_string()],
    ];
    target.write_rows(&rows, Some(&header)).unwrap();

    let contents = std::fs::read_to_string(root.path().join("bucket/tuples.csv")).unwrap();
    assert_eq!(contents, "id,name\n1,alpha\n2,beta\n");
}

#[test]
fn test_write_rows_compressed_headerless() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://bucket/tuples.csv.gz", true);

    let rows = vec![vec!["1".to_string()], vec!["2".to_string()]];
    target.write_rows(&rows, None).unwrap();

    let options = CsvOptions::new().has_header(false);
    let frame = target.read_frame_with(&options).unwrap();
    assert_eq!(frame.num_rows(), 2);
    assert_eq!(
        frame.column("0").unwrap().values,
        vec![Value::Int(1), Value::Int(2)]
    );
}

#[test]
fn test_chunked_read_matches_full_read() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://bucket/chunked.csv", false);

    let n = 7;
    let frame = Frame::try_new(vec![
        Column::new("i", (0..n).map(Value::Int).collect()),
        Column::new("sq", (0..n).map(|v| Value::Int(v * v)).collect()),
    ])
    .unwrap();
    target.write_frame(&frame).unwrap();

    for chunk_size in [1usize, 2, 3, 7, 10] {
        let options = CsvOptions::new().chunk_size(chunk_size);
        let chunks: Vec<Frame> = target
            .read_chunks_with(&options)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let expected = (n as usize).div_ceil(chunk_size);
        assert_eq!(chunks.len(), expected, "chunk_size {chunk_size}");
        assert!(chunks
            .iter()
            .all(|c| c.num_rows() <= chunk_size));
        assert_eq!(Frame::concat(&chunks).unwrap(), frame);
    }
}

#[test]
fn test_default_chunk_size_avoids_header_ambiguity() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://bucket/default_chunks.csv", false);

    let frame = Frame::try_new(vec![Column::new("a", vec![Value::Int(1), Value::Int(2), Value::Int(3)])]).unwrap();
    target.write_frame(&frame).unwrap();

    let chunks = target.read_chunks().unwrap();
    assert_eq!(chunks.chunk_size(), DEFAULT_CHUNK_SIZE);
    let chunks: Vec<Frame> = chunks.collect::<Result<_, _>>().unwrap();
    assert_eq!(chunks.len(), 2);
}

#[test]
fn test_typed_chunked_read_decodes_every_chunk() {
    let root = tempdir().unwrap();
    let target = TypedCsvTarget::new(
        local_target(root.path(), "s3://bucket/typed_chunks.csv.gz", true),
        sample_types(),
    );

    let frame = sample_frame();
    target.write_typed(&frame).unwrap();

    let chunks: Vec<Frame> = target
        .read_typed_chunks()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(Frame::concat(&chunks).unwrap(), frame);
}

#[test]
fn test_remote_round_trip_without_local_root() {
    let store = Arc::new(MemoryStore::new());
    let target = CsvTarget::new(
        StoreTarget::from_uri(
            "s3://bucket/remote.csv.gz",
            StoreConfig::remote(),
            Arc::clone(&store) as Arc<dyn ObjectStore>,
        )
        .unwrap(),
        true,
    );

    let frame = Frame::try_new(vec![Column::new("a", vec![Value::Int(1), Value::Int(2)])]).unwrap();
    target.write_frame(&frame).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(target.read_frame().unwrap(), frame);
}

#[test]
fn test_invalid_mode_rejected_before_storage() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://bucket/file.csv", false);

    let err = target.open("a").unwrap_err();
    assert!(err.to_string().contains("Unsupported open mode"));
    assert!(!root.path().join("bucket").exists());
}

#[test]
fn test_dtype_mismatch_surfaces_parse_error() {
    let root = tempdir().unwrap();
    let plain = local_target(root.path(), "s3://bucket/bad.csv", false);
    plain
        .write_rows(
            &[vec!["x".to_string(), "oops".to_string()]],
            Some(&["label".to_string(), "count".to_string()]),
        )
        .unwrap();

    let typed = TypedCsvTarget::new(
        local_target(root.path(), "s3://bucket/bad.csv", false),
        sample_types(),
    );
    let err = typed.read_typed().unwrap_err();
    assert!(matches!(err, emberflow_targets::TargetError::Parse { .. }));
}

#[test]
fn test_read_options_merge_per_call() {
    let root = tempdir().unwrap();
    let target = local_target(root.path(), "s3://bucket/semi.csv", false)
        .with_write_options(CsvOptions::new().delimiter(b';'))
        .with_read_options(CsvOptions::new().delimiter(b';'));

    let frame = Frame::try_new(vec![
        Column::new("a", vec![Value::Int(1)]),
        Column::new("b", vec![Value::Int(2)]),
    ])
    .unwrap();
    target.write_frame(&frame).unwrap();

    let contents = std::fs::read_to_string(root.path().join("bucket/semi.csv")).unwrap();
    assert_eq!(contents, "a;b\n1;2\n");

    // Per-call override wins over the target default.
    let comma_read = target
        .read_frame_with(&CsvOptions::new().delimiter(b','))
        .unwrap();
    assert_eq!(comma_read.num_columns(), 1);

    assert_eq!(target.read_frame().unwrap(), frame);
}
