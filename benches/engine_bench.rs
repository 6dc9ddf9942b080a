//! Benchmarks for emulator mutation and read throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tabletkv::mutation::Mutation;
use tabletkv::read::RowSet;
use tabletkv::store::GcRule;
use tabletkv::{Emulator, InstanceKey};

fn ns() -> InstanceKey {
    InstanceKey::new("proj", "instance").unwrap()
}

fn seeded_emulator(rows: usize) -> Emulator {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "bench").unwrap();
    emulator
        .create_column_family(&ns(), "bench", "data", GcRule::default())
        .unwrap();
    for i in 0..rows {
        emulator
            .apply(
                &ns(),
                "bench",
                format!("row-{:06}", i).as_bytes(),
                &[Mutation::SetCell {
                    family: "data".to_string(),
                    qualifier: b"payload".to_vec(),
                    timestamp_micros: 1,
                    value: vec![0u8; 64],
                }],
            )
            .unwrap();
    }
    emulator
}

fn engine_benchmarks(c: &mut Criterion) {
    c.bench_function("apply_single_cell", |b| {
        let emulator = seeded_emulator(0);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            emulator
                .apply(
                    &ns(),
                    "bench",
                    format!("row-{}", i % 1024).as_bytes(),
                    &[Mutation::SetCell {
                        family: "data".to_string(),
                        qualifier: b"payload".to_vec(),
                        timestamp_micros: i as i64,
                        value: vec![0u8; 64],
                    }],
                )
                .unwrap();
        });
    });

    c.bench_function("scan_10k_rows", |b| {
        let emulator = seeded_emulator(10_000);
        b.iter(|| {
            let count = emulator
                .read_rows(&ns(), "bench", &RowSet::all(), None, 0)
                .unwrap()
                .count();
            black_box(count);
        });
    });
}

criterion_group!(benches, engine_benchmarks);
criterion_main!(benches);
