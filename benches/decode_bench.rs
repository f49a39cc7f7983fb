use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mixread::io_stream::decode_header;
use mixread::{file_id, PublicKey};
use std::io::Cursor;

fn plain_header(files: u16) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, 0x00, 0x00];
    out.extend_from_slice(&files.to_le_bytes());
    out.extend_from_slice(&(u32::from(files) * 64).to_le_bytes());
    for i in 0..u32::from(files) {
        out.extend_from_slice(&file_id(&format!("file_{i}.shp")).to_le_bytes());
        out.extend_from_slice(&(i * 64).to_le_bytes());
        out.extend_from_slice(&64u32.to_le_bytes());
    }
    out
}

fn bench_hash(c: &mut Criterion) {
    c.bench_function("file_id_short", |b| b.iter(|| file_id(black_box("rules.ini"))));
    c.bench_function("file_id_long", |b| {
        b.iter(|| file_id(black_box("a-rather-long-sound-effect-name-for-hashing.aud")))
    });
}

fn bench_decode(c: &mut Criterion) {
    let key = PublicKey::westwood();
    let bytes = plain_header(4096);

    c.bench_function("decode_plain_4096_records", |b| {
        b.iter(|| {
            let mut cur = Cursor::new(black_box(&bytes));
            decode_header(&mut cur, &key).unwrap()
        })
    });
}

criterion_group!(benches, bench_hash, bench_decode);
criterion_main!(benches);
