use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use foodclub_logit::affinity::AffinityTables;
use foodclub_logit::design_matrix::{DesignSpec, build_design_matrix};
use foodclub_logit::history::assemble_history;
use foodclub_logit::long_format::expand_long_format;
use foodclub_logit::round_record::RawRound;

fn synthetic_rounds(count: u32, seed: u64) -> Vec<RawRound> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count)
        .map(|round| {
            let mut ids: Vec<u8> = (1..=20).collect();
            ids.shuffle(&mut rng);
            let pirates = ids.chunks(4).map(|c| c.to_vec()).collect();
            let foods = (0..5)
                .map(|_| (0..10).map(|_| rng.gen_range(1..=40u8)).collect())
                .collect();
            let odds = |rng: &mut StdRng| -> Vec<Vec<f64>> {
                (0..5)
                    .map(|_| {
                        let mut tuple = vec![1.0];
                        tuple.extend((0..4).map(|_| f64::from(rng.gen_range(2..=13u8))));
                        tuple
                    })
                    .collect()
            };
            let opening_odds = odds(&mut rng);
            let current_odds = odds(&mut rng);
            let winners = (0..5).map(|_| Some(rng.gen_range(1..=4u8))).collect();
            RawRound {
                round,
                pirates,
                foods: Some(foods),
                opening_odds,
                current_odds,
                winners: Some(winners),
            }
        })
        .collect()
}

fn bench_assemble_history(c: &mut Criterion) {
    let rounds = synthetic_rounds(2000, 7);
    let tables = AffinityTables::standard();
    c.bench_function("assemble_history_2000_rounds", |b| {
        b.iter(|| {
            let rows = assemble_history(black_box(&rounds), tables).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_long_and_design(c: &mut Criterion) {
    let rounds = synthetic_rounds(2000, 11);
    let wide = assemble_history(&rounds, AffinityTables::standard()).unwrap();
    let spec = DesignSpec::default();

    c.bench_function("expand_long_format_10000_matches", |b| {
        b.iter(|| {
            let long = expand_long_format(black_box(&wide)).unwrap();
            black_box(long.len());
        })
    });

    let long = expand_long_format(&wide).unwrap();
    c.bench_function("build_design_matrix_40000_rows", |b| {
        b.iter(|| {
            let matrix = build_design_matrix(black_box(&long), &spec).unwrap();
            black_box(matrix.n_rows());
        })
    });
}

criterion_group!(benches, bench_assemble_history, bench_long_and_design);
criterion_main!(benches);
