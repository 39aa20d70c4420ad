//! Benchmarks for member dispatch under both access strategies.
//!
//! Compares the per-call cost of:
//! - Reflective invocation (descriptor walk and argument conversion on every call)
//! - Generated invocation (cached trampoline, conversion plan resolved once)
//! - Field reads, which share one code path across strategies
//! - Direct calls as the baseline

extern crate typescope;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use typescope::prelude::*;

#[derive(Default, Clone)]
struct Workload {
    total: i64,
}

impl Workload {
    fn accumulate(&mut self, amount: i64) -> i64 {
        self.total += amount;
        self.total
    }
}

impl Reflected for Workload {
    fn type_info() -> TypeInfo {
        TypeInfo::resolve::<Workload>(|| {
            TypeBuilder::<Workload>::new("Workload")
                .allocatable()
                .field(
                    "total",
                    |w: &Workload| &w.total,
                    |w: &mut Workload| &mut w.total,
                )
                .method("accumulate", Workload::accumulate)
                .build()
        })
    }
}

/// Benchmark the baseline: a direct method call with no access layer at all.
fn bench_direct_call(c: &mut Criterion) {
    let mut workload = Workload::default();

    c.bench_function("invoke_direct_baseline", |b| {
        b.iter(|| black_box(workload.accumulate(black_box(1))));
    });
}

/// Benchmark invocation through the reflective strategy.
fn bench_reflective_invoke(c: &mut Criterion) {
    let access = reflect::<Workload>();
    let accumulate = access.method("accumulate").expect("method registered");
    let mut workload = Workload::default();

    c.bench_function("invoke_reflective", |b| {
        b.iter(|| {
            let result = accumulate
                .invoke(Some(&mut workload), vec![Value::new(black_box(1i64))])
                .expect("invocation succeeds");
            black_box(result)
        });
    });
}

/// Benchmark invocation through the generated strategy once the trampoline is warm.
fn bench_generated_invoke(c: &mut Criterion) {
    let access = unreflect::<Workload>();
    let accumulate = access.method("accumulate").expect("method registered");
    let mut workload = Workload::default();

    // Warm the trampoline so the one-time compilation cost stays out of the measurement.
    accumulate
        .invoke(Some(&mut workload), vec![Value::new(1i64)])
        .expect("warmup succeeds");

    c.bench_function("invoke_generated", |b| {
        b.iter(|| {
            let result = accumulate
                .invoke(Some(&mut workload), vec![Value::new(black_box(1i64))])
                .expect("invocation succeeds");
            black_box(result)
        });
    });
}

/// Benchmark a field read, which both strategies serve through the same raw path.
fn bench_field_get(c: &mut Criterion) {
    let access = reflect::<Workload>();
    let total = access.field("total").expect("field registered");
    let workload = Workload { total: 42 };

    c.bench_function("field_get", |b| {
        b.iter(|| {
            let value = total.get(black_box(&workload)).expect("read succeeds");
            black_box(value)
        });
    });
}

criterion_group!(
    benches,
    bench_direct_call,
    bench_reflective_invoke,
    bench_generated_invoke,
    bench_field_get
);
criterion_main!(benches);
