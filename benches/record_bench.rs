use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qrfile::record::{decode_record, encode_record, RecordLayout};
use qrfile::reassemble::{materialize, validate};
use qrfile::split;

fn bench_split(c: &mut Criterion) {
    let payload = hex::encode(vec![0x5au8; 1024 * 1024]);
    let layout  = RecordLayout::default();

    c.bench_function("split_1mb", |b| b.iter(|| split(black_box(&payload), &layout).unwrap()));
}

fn bench_records(c: &mut Criterion) {
    let layout = RecordLayout::default();
    let set    = split(&hex::encode(vec![7u8; 64 * 1024]), &layout).unwrap();
    let texts: Vec<String> = set.iter().map(|ch| encode_record(ch, &layout)).collect();

    c.bench_function("encode_records_64kb", |b| {
        b.iter(|| set.iter().map(|ch| encode_record(black_box(ch), &layout)).count())
    });

    c.bench_function("decode_records_64kb", |b| {
        b.iter(|| texts.iter().map(|t| decode_record(black_box(t), &layout).unwrap()).count())
    });
}

fn bench_reassemble(c: &mut Criterion) {
    let layout = RecordLayout::default();
    let mut set = split(&hex::encode(vec![3u8; 1024 * 1024]), &layout).unwrap();
    set.chunks.reverse();

    c.bench_function("validate_materialize_1mb", |b| {
        b.iter(|| materialize(&validate(black_box(set.clone())).unwrap()).unwrap())
    });
}

criterion_group!(benches, bench_split, bench_records, bench_reassemble);
criterion_main!(benches);
