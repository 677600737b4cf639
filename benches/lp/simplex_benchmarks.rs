use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pathsel::lp::simplex::{minimize, CoveringProgram};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// Random unit-cost set cover: every row gets at least one non-zero.
fn random_cover(rows: usize, cols: usize, rng: &mut ChaCha8Rng) -> CoveringProgram<f64> {
    let constraints = (0..rows)
        .map(|_| {
            let mut row: Vec<f64> = (0..cols)
                .map(|_| if rng.gen_bool(0.2) { 1.0 } else { 0.0 })
                .collect();
            row[rng.gen_range(0..cols)] = 1.0;
            row
        })
        .collect();
    CoveringProgram {
        objective: vec![1.0; cols],
        constraints,
        rhs: vec![1.0; rows],
    }
}

fn bench_simplex(c: &mut Criterion) {
    let mut group = c.benchmark_group("covering_simplex");
    let mut rng = ChaCha8Rng::seed_from_u64(1863947);

    for &size in &[10, 50, 100] {
        let program = random_cover(size * 2, size, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(size), &program, |b, program| {
            b.iter(|| minimize(black_box(program), None))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_simplex);
criterion_main!(benches);
