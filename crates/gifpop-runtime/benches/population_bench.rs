use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use gifpop_runtime::{simulation::run_fixed_step, GifPopParams, GifPopulation};

fn calibrated(n: u64, bino_rand: bool) -> GifPopulation {
    let params = GifPopParams {
        n,
        bino_rand,
        i_e: 150.0,
        ..Default::default()
    };
    let mut pop = GifPopulation::with_seed(params, 1234).expect("bench population");
    pop.calibrate(0.1).expect("bench calibration");
    pop
}

fn bench_population_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("gif_pop_update");
    let steps = 1000usize;
    group.throughput(Throughput::Elements(steps as u64));

    for &n in &[100u64, 10_000u64] {
        for &(label, bino) in &[("binomial", true), ("poisson", false)] {
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &n| {
                b.iter_batched(
                    || calibrated(n, bino),
                    |mut pop| {
                        let _events = pop.update(0, 0, steps).unwrap();
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("gif_pop_engine");
    // Short duration to keep benches fast in CI
    let dt_ns = 100_000; // 0.1 ms
    let duration_ns = 20_000_000; // 20 ms

    for &pops in &[1usize, 4usize, 8usize] {
        group.bench_with_input(BenchmarkId::new("unconnected", pops), &pops, |b, &pops| {
            b.iter(|| {
                let params = vec![GifPopParams::default(); pops];
                let _res = run_fixed_step(params, dt_ns, duration_ns, Some(1234)).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_population_update, bench_engine);
criterion_main!(benches);
