use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sema_group::Group;

const WEIGHTED_SIZE: usize = 64;

fn bench_uncontended(c: &mut Criterion) {
    let mut g = c.benchmark_group("uncontended");

    g.bench_function("reserve_free_wait", |b| {
        let group = Group::default();
        b.iter(|| {
            group.reserve();
            group.free();
            group.wait();
        });
    });

    g.bench_function("try_reserve_free", |b| {
        let group = Group::new(1);
        b.iter(|| {
            assert!(group.try_reserve_n(1));
            group.free_n(1);
        });
    });

    g.bench_function("wait_empty", |b| {
        let group = Group::default();
        b.iter(|| group.wait());
    });

    g.finish();
}

fn bench_weighted(c: &mut Criterion) {
    let mut g = c.benchmark_group("weighted_reserve_free");

    for weight in [1, WEIGHTED_SIZE / 2, WEIGHTED_SIZE] {
        g.bench_with_input(BenchmarkId::from_parameter(weight), &weight, |b, &weight| {
            let group = Group::new(WEIGHTED_SIZE);
            b.iter(|| {
                assert!(group.reserve_n(None, weight));
                group.free_n(weight);
            });
        });
    }

    g.finish();
}

criterion_group!(benches, bench_uncontended, bench_weighted);
criterion_main!(benches);
