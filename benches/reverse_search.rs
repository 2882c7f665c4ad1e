use criterion::{criterion_group, criterion_main, Criterion};

use basil::driver::{DfsOptions, Driver, Mode};
use basil::parse_problem;

fn cube_input() -> String {
    "\
H-representation
begin
6 4 rational
1 1 0 0
1 -1 0 0
1 0 1 0
1 0 -1 0
1 0 0 1
1 0 0 -1
end
symmetry auto
gram auto
"
    .to_string()
}

pub fn benchmark(c: &mut Criterion) {
    let input = cube_input();
    c.bench_function("reverse_search_cube_vertices", |b| {
        b.iter(|| {
            let problem = parse_problem(&input).unwrap();
            let options = DfsOptions { mode: Mode::PolytopeH, ..DfsOptions::default() };
            Driver::new(&problem, options).unwrap().run().unwrap()
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
