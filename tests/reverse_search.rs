//! End-to-end scenarios from the concrete-examples list: unit square,
//! regular tetrahedron, cross-polytope, asymmetric pentagon, and
//! `basisLimit` truncation.

use basil::driver::{DfsOptions, Driver, Mode};
use basil::parse_problem;
use rstest::rstest;
use test_log::test;

fn run_text(input: &str, options: DfsOptions) -> basil::Report {
    let problem = parse_problem(input).unwrap();
    Driver::new(&problem, options).unwrap().run().unwrap()
}

#[test]
fn test_unit_square_has_one_vertex_orbit() {
    let input = "\
H-representation
begin
4 3 rational
0 1 0
1 -1 0
0 0 1
1 0 -1
end
symmetry begin
2 1, 4 3
1 3, 2 4
symmetry end
";
    let options = DfsOptions { mode: Mode::PolytopeH, ..DfsOptions::default() };
    let report = run_text(input, options);
    assert_eq!(report.dimension, 2);
    assert_eq!(report.num_vertex_orbits(), 1);
    assert_eq!(report.basis_orbit_count, 1);
    assert_eq!(report.num_ray_orbits(), 0);
    assert!(report.is_finished);
}

#[test]
fn test_regular_tetrahedron_v_mode_has_one_vertex_orbit() {
    let input = "\
V-representation
begin
4 4 rational
1 1 0 0
1 0 1 0
1 0 0 1
1 0 0 0
end
symmetry begin
2 1 3 4
1 3 2 4
symmetry end
";
    let options = DfsOptions { mode: Mode::PolytopeV, ..DfsOptions::default() };
    let report = run_text(input, options);
    assert_eq!(report.dimension, 3);
    assert_eq!(report.num_vertex_orbits(), 1);
    assert_eq!(report.basis_orbit_count, 1);
    assert_eq!(report.num_ray_orbits(), 0);
}

#[test]
fn test_cross_polytope_order_48_symmetry_has_one_vertex_orbit() {
    let input = "\
H-representation
begin
8 4 rational
1 1 1 1
1 1 1 -1
1 1 -1 1
1 1 -1 -1
1 -1 1 1
1 -1 1 -1
1 -1 -1 1
1 -1 -1 -1
end
symmetry auto
gram auto
";
    let options = DfsOptions { mode: Mode::PolytopeH, ..DfsOptions::default() };
    let report = run_text(input, options);
    assert_eq!(report.dimension, 3);
    assert_eq!(report.num_vertex_orbits(), 1);
    assert!(report.is_finished);
}

#[test]
fn test_asymmetric_pentagon_assume_no_symmetry_has_five_vertex_orbits() {
    // Convex pentagon with vertices (0,0), (1,0), (1,1), (0.6,1.4), (0,1):
    // no reflection or rotation symmetry (perturbing the apex off the
    // square's midline breaks the mirror symmetry a symmetric "house"
    // shape would otherwise have).
    let input = "\
H-representation
begin
5 3 rational
0 0 1
1 -1 0
2 -1 -1
3 2 -3
0 1 0
end
symmetry auto
";
    let options = DfsOptions { mode: Mode::PolytopeH, assume_no_symmetry: true, ..DfsOptions::default() };
    let report = run_text(input, options);
    assert_eq!(report.num_vertex_orbits(), 5);
    assert_eq!(report.basis_orbit_count, 5);
}

#[test]
fn test_basis_limit_zero_truncates_immediately() {
    let input = "\
H-representation
begin
8 4 rational
1 1 1 1
1 1 1 -1
1 1 -1 1
1 1 -1 -1
1 -1 1 1
1 -1 1 -1
1 -1 -1 1
1 -1 -1 -1
end
symmetry auto
";
    let options = DfsOptions { mode: Mode::PolytopeH, basis_limit: 0, ..DfsOptions::default() };
    let report = run_text(input, options);
    assert!(!report.is_finished);
    assert_eq!(report.num_vertex_orbits(), 0);
    assert_eq!(report.basis_orbit_count, 0);
}

#[test]
fn test_one_dimensional_segment_has_two_vertex_orbits() {
    let input = "\
H-representation
begin
2 2 rational
0 1
1 -1
end
symmetry auto
";
    let options = DfsOptions { mode: Mode::PolytopeH, assume_no_symmetry: true, ..DfsOptions::default() };
    let report = run_text(input, options);
    assert_eq!(report.dimension, 1);
    assert_eq!(report.num_vertex_orbits(), 2);
    assert_eq!(report.basis_orbit_count, 1);
}

#[test]
fn test_empty_symmetry_group_matches_assume_no_symmetry() {
    let input = "\
H-representation
begin
4 3 rational
0 1 0
1 -1 0
0 0 1
1 0 -1
end
symmetry begin
symmetry end
";
    let with_empty_group = run_text(
        input,
        DfsOptions { mode: Mode::PolytopeH, ..DfsOptions::default() },
    );
    let without_symmetry = run_text(
        input,
        DfsOptions { mode: Mode::PolytopeH, assume_no_symmetry: true, ..DfsOptions::default() },
    );
    assert_eq!(with_empty_group.num_vertex_orbits(), without_symmetry.num_vertex_orbits());
    assert_eq!(with_empty_group.basis_orbit_count, without_symmetry.basis_orbit_count);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
fn test_parallel_driver_matches_single_threaded_orbit_counts(#[case] num_threads: usize) {
    use basil::driver::ParallelDriver;

    let input = "\
H-representation
begin
8 4 rational
1 1 1 1
1 1 1 -1
1 1 -1 1
1 1 -1 -1
1 -1 1 1
1 -1 1 -1
1 -1 -1 1
1 -1 -1 -1
end
symmetry auto
gram auto
";
    let problem = parse_problem(input).unwrap();
    let options = DfsOptions {
        mode: Mode::PolytopeH,
        num_threads,
        ..DfsOptions::default()
    };
    let report = ParallelDriver::new(&problem, options).unwrap().run().unwrap();
    assert_eq!(report.num_vertex_orbits(), 1);
    assert!(report.is_finished);
}
