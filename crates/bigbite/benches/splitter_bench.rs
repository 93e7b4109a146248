//! 🏎️ How fast do objects turn into records, alone and through the whole pipeline?

use std::hint::black_box;
use std::sync::Arc;

use bigbite::backends::{InMemoryRemote, InMemorySink};
use bigbite::{RunConfig, harvest, split_records};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

/// 📜 `lines` log-ish lines of roughly 100 bytes, `\r\n` every so often for realism.
fn an_object(lines: usize) -> Vec<u8> {
    let mut the_body = Vec::with_capacity(lines * 100);
    for i in 0..lines {
        the_body.extend_from_slice(
            format!("2024-06-01T12:00:{:02}Z level=info worker={} msg=\"request served\" bytes={}", i % 60, i % 8, i * 17)
                .as_bytes(),
        );
        the_body.extend_from_slice(if i % 10 == 0 { b"\r\n" } else { b"\n" });
    }
    the_body
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_records");
    for lines in [100usize, 10_000, 100_000] {
        let the_body = an_object(lines);
        group.throughput(Throughput::Bytes(the_body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &the_body, |b, body| {
            b.iter(|| {
                let the_records = split_records(black_box(body)).map(|records| records.count());
                black_box(the_records)
            })
        });
    }
    group.finish();
}

fn bench_harvest(c: &mut Criterion) {
    let Ok(runtime) = tokio::runtime::Builder::new_multi_thread().enable_all().build() else {
        return;
    };
    let mut the_remote = InMemoryRemote::new();
    let the_keys: Vec<String> = (0..64).map(|i| format!("logs/{i:03}")).collect();
    for key in &the_keys {
        the_remote = the_remote.object(key.clone(), an_object(500));
    }
    let the_remote = the_remote.page(the_keys);

    let mut group = c.benchmark_group("harvest_in_memory");
    group.throughput(Throughput::Elements(64 * 500));
    for workers in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.to_async(&runtime).iter(|| {
                let the_config = RunConfig::new(
                    Arc::new(the_remote.clone()),
                    Arc::new(InMemorySink::new()),
                    "bench",
                    "logs/",
                )
                .with_workers(workers);
                async move { black_box(harvest(the_config).await.map(|r| r.records_written)) }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_split, bench_harvest);
criterion_main!(benches);
