use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use reflex_ml::models::{CombinedKernel, GaussianKernel, LinearKernel};
use reflex_ml::observe::ParameterObserverHistory;
use reflex_ml::prelude::*;
use std::sync::Arc;

fn bench_observe(c: &mut Criterion) {
    let kernel = GaussianKernel::new().unwrap();
    let weights = Array1::<f64>::zeros(256);

    c.bench_function("observe_without_subscribers", |b| {
        b.iter(|| {
            kernel
                .observe(black_box(1), "weights", "Weight vector", &weights)
                .unwrap();
        })
    });

    kernel.subscribe(Arc::new(ParameterObserverHistory::with_filter(["none"])));
    c.bench_function("observe_with_subscriber", |b| {
        b.iter(|| {
            kernel
                .observe(black_box(1), "weights", "Weight vector", &weights)
                .unwrap();
        })
    });
}

fn bench_clone(c: &mut Criterion) {
    let combined = CombinedKernel::new().unwrap();
    for i in 0..8 {
        let sub = if i % 2 == 0 {
            ObjectRef::new(GaussianKernel::with_width(1.0 + i as f64).unwrap())
        } else {
            ObjectRef::new(LinearKernel::new().unwrap())
        };
        combined.append(sub, 1.0).unwrap();
    }

    c.bench_function("deep_clone_combined_kernel", |b| {
        b.iter(|| black_box(combined.clone_object(ParameterProperties::ALL).unwrap()))
    });

    c.bench_function("equals_combined_kernel", |b| {
        let copy = combined.clone_object(ParameterProperties::ALL).unwrap();
        b.iter(|| black_box(copy.equals(&combined)))
    });
}

criterion_group!(benches, bench_observe, bench_clone);
criterion_main!(benches);
