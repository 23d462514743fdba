//! Screen reconstruction benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pilotfish::reconstruct;

fn bench_reconstruct_plain(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");

    // Plain line-oriented output
    let plain = "service started on port 8080\n".repeat(500);
    group.throughput(Throughput::Bytes(plain.len() as u64));

    group.bench_function("plain_lines", |b| {
        b.iter(|| black_box(reconstruct(black_box(&plain))))
    });

    group.finish();
}

fn bench_reconstruct_redraw_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");

    // A full-screen redraw loop: clear, home, styled status line, all
    // separated by bare carriage returns
    let mut redraw = String::new();
    for i in 0..200 {
        redraw.push_str(&format!(
            "\x1b[2J\x1b[H\x1b[1;32mStatus\x1b[0m: frame {i}\rcpu \x1b[31m{:>3}%\x1b[0m\r",
            i % 100
        ));
    }
    group.throughput(Throughput::Bytes(redraw.len() as u64));

    group.bench_function("redraw_stream", |b| {
        b.iter(|| black_box(reconstruct(black_box(&redraw))))
    });

    group.finish();
}

fn bench_reconstruct_flattened_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");

    // A concatenated table dump: the worst case for row recovery
    let mut table = String::from("╔══════════════════════════════╗");
    for i in 0..100 {
        table.push_str(&format!("║ {:012x}  svc-{i:<4}  Up {i} min ", i * 7919));
    }
    table.push_str("╚══════════════════════════════╝");
    group.throughput(Throughput::Bytes(table.len() as u64));

    group.bench_function("flattened_table", |b| {
        b.iter(|| black_box(reconstruct(black_box(&table))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_reconstruct_plain,
    bench_reconstruct_redraw_stream,
    bench_reconstruct_flattened_table
);
criterion_main!(benches);
