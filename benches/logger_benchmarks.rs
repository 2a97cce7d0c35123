//! Criterion benchmarks for rust_kvlog

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_kvlog::prelude::*;
use rust_kvlog::Record;
use std::io;

fn discard_sink(broker: &Broker, formatter: impl Formatter + 'static) -> Sink {
    let sink = broker.sink_to(&Destination::new(io::sink()), formatter);
    sink.start();
    sink
}

// ============================================================================
// Record Merge Benchmarks
// ============================================================================

fn bench_record_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_merge");

    for size in [4usize, 16, 64] {
        let pairs: Vec<Pair> = (0..size)
            .map(|i| Pair::new(format!("key{}", i % (size / 2).max(1)), i as i64))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pairs, |b, pairs| {
            b.iter(|| Record::from_pairs(black_box(pairs), &TimestampFormat::default()));
        });
    }

    group.finish();
}

// ============================================================================
// Formatter Benchmarks
// ============================================================================

fn bench_formatters(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatters");
    group.throughput(Throughput::Elements(1));

    let pairs = vec![
        Pair::new("service", "billing"),
        Pair::new("msg", "invoice sent to customer"),
        Pair::new("amount", 129.95),
        Pair::new("attempt", 3),
        Pair::new("ok", true),
    ];
    let record = Record::from_pairs(&pairs, &TimestampFormat::default());

    let mut logfmt = LogfmtFormatter::new();
    group.bench_function("logfmt", |b| {
        b.iter(|| {
            logfmt.begin();
            for field in record.fields() {
                logfmt.pair(field);
            }
            black_box(logfmt.finish())
        });
    });

    let mut json = JsonFormatter::new();
    group.bench_function("json", |b| {
        b.iter(|| {
            json.begin();
            for field in record.fields() {
                json.pair(field);
            }
            black_box(json.finish())
        });
    });

    group.finish();
}

// ============================================================================
// End-to-end Logging Benchmarks
// ============================================================================

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    group.throughput(Throughput::Elements(1));

    for sinks in [1usize, 4] {
        let broker = Broker::new();
        let _sinks: Vec<Sink> = (0..sinks)
            .map(|_| discard_sink(&broker, LogfmtFormatter::new()))
            .collect();
        let mut logger = broker.logger();
        logger.with(["service", "bench"]);

        group.bench_function(BenchmarkId::new("sinks", sinks), |b| {
            b.iter(|| logger.log(args!["msg", black_box("hello"), "n", 42]));
        });
    }

    group.finish();
}

fn bench_filtered(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered");
    group.throughput(Throughput::Elements(1));

    let broker = Broker::new();
    let sink = discard_sink(&broker, LogfmtFormatter::new());
    sink.without_key(["debug"]).with_int_range("status", 399, 600);
    let mut logger = broker.logger();

    group.bench_function("rejected_negative", |b| {
        b.iter(|| logger.log(args!["debug", true, "status", 500]));
    });

    group.bench_function("accepted", |b| {
        b.iter(|| logger.log(args!["status", black_box(503)]));
    });

    group.bench_function("no_running_sinks", |b| {
        sink.stop();
        b.iter(|| logger.log(args!["status", 503]));
        sink.start();
    });

    group.finish();
}

fn bench_lazy_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("lazy_values");
    group.throughput(Throughput::Elements(1));

    let broker = Broker::new();
    let _sink = discard_sink(&broker, JsonFormatter::new());
    let mut logger = broker.logger();
    logger.with(args![
        "expensive",
        LazyValue::new(|| (0..32).map(|i| i.to_string()).collect::<Vec<_>>().join(","))
    ]);

    group.bench_function("context_lazy", |b| {
        b.iter(|| logger.log(["msg", "tick"]));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_record_merge,
    bench_formatters,
    bench_broadcast,
    bench_filtered,
    bench_lazy_values,
);
criterion_main!(benches);
