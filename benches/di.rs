use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_lifecycle::*;
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = Container::new();
    container.register::<u64, _, _>(Lifetime::Singleton, || 42u64).unwrap();

    // Prime the singleton
    let _ = container.resolve::<u64>(None).unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = container.resolve::<u64>(None).unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let container = Container::new();
                container
                    .register::<ExpensiveToCreate, _, _>(Lifetime::Singleton, || ExpensiveToCreate {
                        data: (0..1000).collect(),
                    })
                    .unwrap();
                container
            },
            |container| {
                let v = container.resolve::<ExpensiveToCreate>(None).unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_transient_with_dependencies(c: &mut Criterion) {
    struct Config {
        port: u16,
    }
    struct Repository {
        config: Arc<Config>,
    }
    struct Handler {
        repo: Arc<Repository>,
    }

    let container = Container::new();
    container
        .register::<Config, _, _>(Lifetime::Singleton, || Config { port: 8080 })
        .unwrap();
    container
        .register::<Repository, _, _>(Lifetime::Transient, |config: Arc<Config>| Repository { config })
        .unwrap();
    container
        .register::<Handler, _, _>(Lifetime::Transient, |repo: Arc<Repository>| Handler { repo })
        .unwrap();

    c.bench_function("transient_chain_depth_3", |b| {
        b.iter(|| {
            let handler = container.resolve::<Handler>(None).unwrap();
            black_box(handler.repo.config.port);
        })
    });
}

fn bench_scoped_in_context(c: &mut Criterion) {
    struct RequestState {
        data: Vec<u8>,
    }

    let mut group = c.benchmark_group("scoped");

    let container = Container::new();
    container
        .register::<RequestState, _, _>(Lifetime::Scoped, || RequestState { data: vec![0; 1024] })
        .unwrap();

    let ctx = container.new_context();
    let _ = container.resolve::<RequestState>(Some(&ctx)).unwrap();

    group.bench_function("cached_hit", |b| {
        b.iter(|| {
            let v = container.resolve::<RequestState>(Some(&ctx)).unwrap();
            black_box(v.data.len());
        })
    });

    group.bench_function("context_create_resolve_remove", |b| {
        b.iter(|| {
            let ctx = container.new_context();
            let v = container.resolve::<RequestState>(Some(&ctx)).unwrap();
            black_box(v.data.len());
            container.remove_context(&ctx).unwrap();
        })
    });

    group.finish();
}

fn bench_context_shutdown(c: &mut Criterion) {
    struct Hook;

    impl LifecycleListener for Hook {
        fn end_lifecycle(&self, _token: Option<&CancellationToken>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    let mut group = c.benchmark_group("context_shutdown");

    for &instances in &[1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("listeners", instances), &instances, |b, &instances| {
            b.iter_batched(
                || {
                    let ctx = LifecycleContext::new();
                    for i in 0..instances {
                        ctx.set_instance(&format!("hook-{i}"), Instance::listening(Arc::new(Hook)))
                            .unwrap();
                    }
                    ctx
                },
                |ctx| {
                    let errors = ctx.shutdown(None);
                    black_box(errors.len());
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    let container = Container::new();
    container.register::<u64, _, _>(Lifetime::Singleton, || 42u64).unwrap();

    // Prime the singleton
    let _ = container.resolve::<u64>(None).unwrap();

    for &thread_count in &[1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("singleton_threads", thread_count),
            &thread_count,
            |b, &threads| {
                b.iter_custom(|iters| {
                    let start = std::time::Instant::now();
                    crossbeam_utils::thread::scope(|s| {
                        for _ in 0..threads {
                            let container = &container;
                            s.spawn(move |_| {
                                for _ in 0..iters / threads as u64 {
                                    let v = container.resolve::<u64>(None).unwrap();
                                    black_box(v);
                                }
                            });
                        }
                    })
                    .unwrap();
                    start.elapsed()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    micro_benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_transient_with_dependencies,
    bench_scoped_in_context,
    bench_context_shutdown,
    bench_contention
);

criterion_main!(micro_benches);
