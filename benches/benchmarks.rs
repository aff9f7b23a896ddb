use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use tincan_flow::{ControlFlowOptions, DerivableExt, Memo, Signal};

fn signal_creation_benchmark(c: &mut Criterion) {
    c.bench_function("signal_creation", |b| {
        b.iter(|| {
            let signal: Signal<i32> = Signal::new(black_box(42));
            signal
        });
    });
}

fn signal_read_benchmark(c: &mut Criterion) {
    let signal: Signal<i32> = Signal::new(42);

    c.bench_function("signal_read", |b| {
        b.iter(|| {
            black_box(signal.value());
        });
    });
}

fn signal_write_benchmark(c: &mut Criterion) {
    let signal: Signal<i32> = Signal::new(0);

    c.bench_function("signal_write", |b| {
        let mut i = 0;
        b.iter(|| {
            signal.set(black_box(i));
            i += 1;
        });
    });
}

fn memo_computation_benchmark(c: &mut Criterion) {
    let a: Signal<i32> = Signal::new(5);
    let b: Signal<i32> = Signal::new(10);

    let sum = Memo::new({
        let a = a.clone();
        let b = b.clone();
        move || a.value().unwrap_or_default() + b.value().unwrap_or_default()
    });

    c.bench_function("memo_computation", |b| {
        b.iter(|| {
            black_box(sum.value());
        });
    });
}

fn control_flow_read_benchmark(c: &mut Criterion) {
    let base: Signal<i32> = Signal::new(42);
    let mut group = c.benchmark_group("control_flow_read");

    let direct = base.control_flow(ControlFlowOptions::new());
    group.bench_function("disconnected", |b| {
        b.iter(|| black_box(direct.value()));
    });

    let cached = base.control_flow(ControlFlowOptions::new());
    let _guard = cached.watch(|_| {});
    group.bench_function("connected", |b| {
        b.iter(|| black_box(cached.value()));
    });
    group.finish();
}

fn control_flow_forward_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_flow_forward");

    for flow_count in [1, 10, 100].iter() {
        let base: Signal<usize> = Signal::new(0);
        let guards: Vec<_> = (0..*flow_count)
            .map(|_| {
                base.control_flow(ControlFlowOptions::new().skip_first(true))
                    .watch(|_| {
                        // Empty subscriber
                    })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(flow_count),
            flow_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    i += 1;
                    base.set(black_box(i));
                });
            },
        );
        drop(guards);
    }
    group.finish();
}

criterion_group!(
    benches,
    signal_creation_benchmark,
    signal_read_benchmark,
    signal_write_benchmark,
    memo_computation_benchmark,
    control_flow_read_benchmark,
    control_flow_forward_benchmark,
);
criterion_main!(benches);
