use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pathsel::colgen::{BranchingSet, DualPrices, Pricer, DEFAULT_COLUMNS};
use pathsel::problem::{pair_count, Goal, Instance, Route};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_instance(nodes: usize, routes: usize, rng: &mut ChaCha8Rng) -> Instance {
    let routes = (0..routes)
        .map(|_| {
            let source = rng.gen_range(0..nodes);
            let destination = rng.gen_range(0..nodes);
            let length = rng.gen_range(1..=nodes / 4 + 1);
            let crossed: Vec<usize> = (0..length).map(|_| rng.gen_range(0..nodes)).collect();
            Route::new(source, destination, crossed.into_iter().chain([source, destination]))
        })
        .collect();
    Instance::new(nodes, routes).unwrap()
}

fn random_duals(nodes: usize, density: f64, rng: &mut ChaCha8Rng) -> DualPrices {
    let values = (0..nodes + pair_count(nodes))
        .map(|_| if rng.gen_bool(density) { rng.gen_range(0.0..1.0) } else { 0.0 })
        .collect();
    DualPrices::new(values, nodes, pair_count(nodes))
}

fn bench_pricing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing");
    let mut rng = ChaCha8Rng::seed_from_u64(1863947);

    for &nodes in &[20, 50, 100] {
        let instance = random_instance(nodes, nodes * 10, &mut rng);
        let duals = random_duals(nodes, 0.1, &mut rng);
        let active = BTreeSet::new();
        let branching = BranchingSet::new();

        for goal in [Goal::Cover, Goal::OneId] {
            group.bench_with_input(
                BenchmarkId::new(goal.to_string(), nodes),
                &duals,
                |b, duals| {
                    let mut pricer = Pricer::new(&instance, goal);
                    b.iter(|| {
                        pricer.price(
                            black_box(duals),
                            &active,
                            &branching,
                            DEFAULT_COLUMNS,
                        )
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pricing);
criterion_main!(benches);
