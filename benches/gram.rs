use criterion::{criterion_group, criterion_main, Criterion};

use basil::gram::{build_gram, Metric};
use basil::matrix::RationalMatrix;
use num_bigint::BigInt;
use num_rational::BigRational;

fn r(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

/// A 3-cube's facet normals in homogeneous coordinates: 6 rows, 4 columns.
fn cube_matrix() -> RationalMatrix {
    let mut rows = Vec::new();
    for axis in 0..3 {
        for sign in [1i64, -1i64] {
            let mut row = vec![r(1, 1), r(0, 1), r(0, 1), r(0, 1)];
            row[axis + 1] = r(sign, 1);
            rows.push(row);
        }
    }
    RationalMatrix::from_rows(rows)
}

pub fn benchmark(c: &mut Criterion) {
    let m = cube_matrix();
    c.bench_function("gram_augmented_q_cube", |b| {
        b.iter(|| build_gram(&m, Metric::AugmentedQ, true).unwrap())
    });
    c.bench_function("gram_raw_cube", |b| {
        b.iter(|| build_gram(&m, Metric::Raw, true).unwrap())
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
