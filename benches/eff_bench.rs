//! Benchmarks for the effect core: program construction, handler
//! dispatch, batching, and deep chains.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use effrow::effects::list::{from_vec, run_list, ListEffect};
use effrow::effects::state::{get, modify, run_state, StateEffect};
use effrow::effects::writer::{run_writer, tell, WriterEffect};
use effrow::prelude::*;

fn benchmark_pure(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("eff_pure");

    group.bench_function("pure_i32", |bencher| {
        bencher.iter(|| {
            let program: Eff<NoFx, i32> = Eff::pure(black_box(42));
            black_box(run(program))
        });
    });

    group.finish();
}

fn benchmark_flat_map_chain(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("eff_flat_map_chain");

    for chain_length in [10, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chain_length),
            &chain_length,
            |bencher, &length| {
                bencher.iter(|| {
                    type App = Fx![StateEffect<i64>];
                    let mut program: Eff<App, ()> = Eff::pure(());
                    for _ in 0..length {
                        program = program.then(modify(|x: i64| x + 1));
                    }
                    black_box(run(run_state(program, 0)))
                });
            },
        );
    }

    group.finish();
}

fn benchmark_writer_batch(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("eff_writer_batch");

    for width in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |bencher, &width| {
            bencher.iter(|| {
                type App = Fx![WriterEffect<i64>];
                let programs: Vec<Eff<App, ()>> = (0..width).map(|index| tell(index)).collect();
                black_box(run(run_writer(sequence(programs).map(|_| ()))))
            });
        });
    }

    group.finish();
}

fn benchmark_two_effect_interleaving(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("eff_interleaved_handlers");

    group.bench_function("writer_and_state_100", |bencher| {
        bencher.iter(|| {
            type App = Fx![WriterEffect<i64>, StateEffect<i64>];
            let mut program: Eff<App, ()> = Eff::pure(());
            for index in 0..100 {
                program = program.then(tell(index)).then(modify(move |x: i64| x + 1));
            }
            black_box(run(run_state(run_writer(program), 0)))
        });
    });

    group.finish();
}

fn benchmark_list_search(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("eff_list_search");

    group.bench_function("cartesian_3x3x3", |bencher| {
        bencher.iter(|| {
            type App = Fx![ListEffect];
            let program: Eff<App, i32> = from_vec(vec![1, 2, 3]).flat_map(|x: i32| {
                from_vec(vec![10, 20, 30]).flat_map(move |y: i32| {
                    from_vec(vec![100, 200, 300]).map(move |z: i32| x + y + z)
                })
            });
            black_box(run(run_list(program)))
        });
    });

    group.finish();
}

fn benchmark_reader_ask(criterion: &mut Criterion) {
    use effrow::effects::reader::{ask, run_reader, ReaderEffect};

    let mut group = criterion.benchmark_group("eff_reader");

    group.bench_function("ask_product", |bencher| {
        bencher.iter(|| {
            type App = Fx![ReaderEffect<i64>];
            let program: Eff<App, (i64, i64)> = ask().product(ask());
            black_box(run(run_reader(program, black_box(7))))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_pure,
    benchmark_flat_map_chain,
    benchmark_writer_batch,
    benchmark_two_effect_interleaving,
    benchmark_list_search,
    benchmark_reader_ask,
);
criterion_main!(benches);
