/// Digest and table codec benchmarks
/// Measures LOB digesting per algorithm, cell text encoding and Merkle hashing
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use siard_archive::{
    application::{filters::DiscardSink, ports::DatabaseHandler},
    entities::{Cell, DatabaseStructure, Row, SchemaStructure, TableStructure, Type},
    infrastructure::{
        merkle::{MerkleConfig, MerkleOutput, MerkleTreeFilter},
        storage::{ContentHasher, InMemoryProvider},
        xml::codec,
    },
    value_objects::DigestAlgorithm,
};
use std::collections::HashSet;
use std::io::{sink, Cursor};
use std::sync::Arc;
use std::time::Duration;

fn patterned(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn digest_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("lob_digest");
    group.measurement_time(Duration::from_secs(10));

    for size in [1024, 64 * 1024, 1024 * 1024, 10 * 1024 * 1024].iter() {
        let size = *size;
        let data = patterned(size);
        group.throughput(Throughput::Bytes(size as u64));

        for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha1, DigestAlgorithm::Sha256] {
            group.bench_with_input(
                BenchmarkId::new(algorithm.to_string(), size),
                &data,
                |b, data| b.iter(|| std::hint::black_box(ContentHasher::digest(algorithm, data))),
            );
        }

        // Streaming path used when externalized LOBs are written
        group.bench_with_input(BenchmarkId::new("stream_md5", size), &data, |b, data| {
            b.iter(|| {
                ContentHasher::digest_stream(DigestAlgorithm::Md5, Cursor::new(data.as_slice()))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn codec_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_codec");

    let plain = "The quick brown fox jumps over the lazy dog. ".repeat(100);
    let escaped = "a  <b> & \\ \u{1} c   ".repeat(200);
    for (name, text) in [("plain", &plain), ("escaped", &escaped)] {
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", name), text, |b, text| {
            b.iter(|| codec::encode(text))
        });
        let encoded = codec::encode(text);
        group.bench_with_input(BenchmarkId::new("decode", name), &encoded, |b, encoded| {
            b.iter(|| codec::decode(encoded))
        });
    }

    group.finish();
}

fn merkle_structure() -> DatabaseStructure {
    DatabaseStructure::new("bench").with_schema(
        SchemaStructure::new("s").with_table(
            TableStructure::new("t")
                .with_column("id", Type::integer(), false)
                .with_column("name", Type::varchar(64), true)
                .with_column("data", Type::blob(), true),
        ),
    )
}

fn merkle_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_tree");
    let structure = Arc::new(merkle_structure());

    for rows in [100u64, 1000] {
        group.throughput(Throughput::Elements(rows));
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            b.iter(|| {
                let mut filter = MerkleTreeFilter::new(
                    MerkleConfig::default(),
                    MerkleOutput::Writer(Box::new(sink())),
                    Box::new(DiscardSink),
                )
                .unwrap();
                filter.init_database().unwrap();
                filter.set_ignored_schemas(HashSet::new());
                filter.handle_structure(Arc::clone(&structure)).unwrap();
                filter.handle_data_open_schema("s").unwrap();
                filter.handle_data_open_table("s.t").unwrap();
                for i in 1..=rows {
                    let cells = vec![
                        Cell::simple(format!("s.t.id.{}", i), i.to_string()),
                        Cell::simple(format!("s.t.name.{}", i), format!("name {}", i)),
                        Cell::binary(
                            format!("s.t.data.{}", i),
                            Box::new(InMemoryProvider::new(patterned(256))),
                        ),
                    ];
                    filter.handle_data_row(Row::new(i, cells)).unwrap();
                }
                filter.handle_data_close_table("s.t").unwrap();
                filter.handle_data_close_schema("s").unwrap();
                filter.finish_database().unwrap();
                std::hint::black_box(filter.top_hash().map(str::to_string))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, digest_benchmarks, codec_benchmarks, merkle_benchmarks);
criterion_main!(benches);
