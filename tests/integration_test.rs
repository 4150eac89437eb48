use qrfile::collect::{collect_all, CollectOptions};
use qrfile::emit::{emit_all, EmitError, EmitOptions};
use qrfile::reassemble::{materialize, validate, ValidateError};
use qrfile::record::{RecordLayout, HEADER_WIDTH};
use qrfile::symbol::{SymbolCodec, SymbolError, TextCodec};
use qrfile::{encode_file, restore_file, split, verify_file, Error, Source};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn small_layout() -> RecordLayout {
    RecordLayout::new(HEADER_WIDTH + 16).unwrap()
}

fn emit_opts() -> EmitOptions {
    EmitOptions { layout: small_layout(), jobs: 4, ..EmitOptions::default() }
}

fn collect_opts() -> CollectOptions {
    CollectOptions { layout: small_layout(), jobs: 4, ..CollectOptions::default() }
}

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn roundtrip(data: &[u8]) -> Vec<u8> {
    let dir = tempdir().unwrap();
    let set = split(&hex::encode(data), &small_layout()).unwrap();
    emit_all(set, dir.path(), &TextCodec, &emit_opts()).unwrap();
    let (set, _) = collect_all(dir.path(), &TextCodec, &collect_opts()).unwrap();
    materialize(&validate(set).unwrap()).unwrap()
}

#[test]
fn test_roundtrip_sizes() {
    for len in [0usize, 1, 7, 8, 9, 100, 1000] {
        let data = sample(len);
        assert_eq!(roundtrip(&data), data, "length {len}");
    }
}

#[test]
fn test_file_roundtrip_default_layout() {
    let dir   = tempdir().unwrap();
    let input = dir.path().join("input.bin");
    let data  = sample(5000);
    fs::write(&input, &data).unwrap();

    let images = dir.path().join("img_dir");
    let report = encode_file(&input, &images, &TextCodec, &EmitOptions::default()).unwrap();
    // 10000 hex characters over 1548 per record.
    assert_eq!(report.artifacts.len(), 7);

    let output = dir.path().join("output_dir/result");
    restore_file(&Source::Directory(images), &output, &TextCodec, &CollectOptions::default()).unwrap();
    assert_eq!(fs::read(&output).unwrap(), data);
}

#[test]
fn test_restore_from_explicit_files_in_reverse_order() {
    let dir   = tempdir().unwrap();
    let input = dir.path().join("input.bin");
    fs::write(&input, sample(40)).unwrap();
    let images = dir.path().join("imgs");
    let report = encode_file(&input, &images, &TextCodec, &emit_opts()).unwrap();

    let mut files: Vec<_> = report.artifacts.iter().map(|a| a.path.clone()).collect();
    files.reverse();
    let output = dir.path().join("restored");
    restore_file(&Source::Files(files), &output, &TextCodec, &collect_opts()).unwrap();
    assert_eq!(fs::read(&output).unwrap(), sample(40));
}

#[test]
fn test_missing_artifact_is_incomplete() {
    let dir = tempdir().unwrap();
    let set = split(&hex::encode(sample(30)), &small_layout()).unwrap();
    emit_all(set, dir.path(), &TextCodec, &emit_opts()).unwrap();
    fs::remove_file(dir.path().join("img_2.txt")).unwrap();

    let (set, _) = collect_all(dir.path(), &TextCodec, &collect_opts()).unwrap();
    assert_eq!(
        validate(set).unwrap_err(),
        ValidateError::IncompleteSet { expected: 4, found: 3 },
    );
}

#[test]
fn test_corrupted_artifact_is_dropped_then_rejected() {
    let dir = tempdir().unwrap();
    let set = split(&hex::encode(sample(30)), &small_layout()).unwrap();
    emit_all(set, dir.path(), &TextCodec, &emit_opts()).unwrap();
    let victim = dir.path().join("img_1.txt");
    let text = fs::read_to_string(&victim).unwrap();
    fs::write(&victim, &text[..text.len() - 1]).unwrap();

    let (set, report) = collect_all(dir.path(), &TextCodec, &collect_opts()).unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.decoded(), 3);
    assert!(matches!(validate(set), Err(ValidateError::IncompleteSet { .. })));
}

#[test]
fn test_duplicate_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let set = split(&hex::encode(sample(20)), &small_layout()).unwrap();
    emit_all(set, dir.path(), &TextCodec, &emit_opts()).unwrap();
    // A second scan of chunk 0 under another matching name.
    fs::copy(dir.path().join("img_0.txt"), dir.path().join("img_00.txt")).unwrap();

    let (set, _) = collect_all(dir.path(), &TextCodec, &collect_opts()).unwrap();
    assert_eq!(validate(set).unwrap_err(), ValidateError::DuplicateElement { index: 0 });
}

#[test]
fn test_unrelated_files_are_ignored() {
    let dir = tempdir().unwrap();
    let set = split(&hex::encode(sample(20)), &small_layout()).unwrap();
    emit_all(set, dir.path(), &TextCodec, &emit_opts()).unwrap();
    fs::write(dir.path().join("README.txt"), "not a chunk").unwrap();
    fs::write(dir.path().join("img_0.bak"), "not a chunk either").unwrap();

    let (set, report) = collect_all(dir.path(), &TextCodec, &collect_opts()).unwrap();
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.failed(), 0);
    assert_eq!(materialize(&validate(set).unwrap()).unwrap(), sample(20));
}

#[test]
fn test_emit_is_idempotent() {
    let dir = tempdir().unwrap();
    let payload = hex::encode(sample(50));
    let read_all = |dir: &Path| -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
        names.sort();
        names.iter().map(|p| fs::read_to_string(p).unwrap()).collect()
    };

    let first = emit_all(split(&payload, &small_layout()).unwrap(), dir.path(), &TextCodec, &emit_opts()).unwrap();
    let before = read_all(dir.path());
    let second = emit_all(split(&payload, &small_layout()).unwrap(), dir.path(), &TextCodec, &emit_opts()).unwrap();
    assert_eq!(before, read_all(dir.path()));

    let digests = |r: &qrfile::EmitReport| r.artifacts.iter().map(|a| a.record_digest.clone()).collect::<Vec<_>>();
    assert_eq!(digests(&first), digests(&second));
}

struct BrokenEncoder;

impl SymbolCodec for BrokenEncoder {
    fn name(&self) -> &'static str { "broken" }
    fn extension(&self) -> &str { "png" }
    fn encode(&self, _: &str) -> Result<Vec<u8>, SymbolError> {
        Err(SymbolError::Encode("capacity exceeded".into()))
    }
    fn decode(&self, _: &[u8]) -> Result<String, SymbolError> {
        Err(SymbolError::Decode("no symbol found".into()))
    }
}

#[test]
fn test_every_failure_is_reported() {
    let dir = tempdir().unwrap();
    let set = split(&hex::encode(sample(30)), &small_layout()).unwrap();
    let err = emit_all(set, dir.path(), &BrokenEncoder, &emit_opts()).unwrap_err();
    let EmitError::Aggregated(agg) = err else { panic!("expected aggregated error") };
    assert_eq!(agg.failed_indices(), vec![0, 1, 2, 3]);
    let message = agg.to_string();
    assert!(message.starts_with("4 of 4 chunk(s) failed"));
    assert!(message.contains("chunk 3: Encoder failed: capacity exceeded"));
}

#[test]
fn test_verify_cleans_up_scratch() {
    let dir   = tempdir().unwrap();
    let input = dir.path().join("input.bin");
    fs::write(&input, sample(777)).unwrap();
    let v = verify_file(&input, &TextCodec, &emit_opts()).unwrap();
    assert_eq!(v.bytes, 777);
    assert!(!v.emit.artifacts.is_empty());
    let scratch = v.emit.artifacts[0].path.parent().unwrap().to_path_buf();
    assert!(!scratch.exists());
}

#[test]
fn test_restore_with_undecodable_images_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("img_0.png"), b"\x89PNG not really").unwrap();
    let err = restore_file(
        &Source::Directory(dir.path().to_path_buf()),
        &dir.path().join("out"),
        &BrokenEncoder,
        &collect_opts(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Collect(qrfile::CollectError::NoElementsExtracted { dispatched: 1, .. })));
    assert!(!dir.path().join("out").exists());
}
