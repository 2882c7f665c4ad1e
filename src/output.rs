//! Rendering: the canonical text form of a parsed `Problem` (used by
//! `--preprocess-only` and for round-trip testing), the human-readable
//! summary of a `Report`, and its JSON form.

use std::fmt::Write as _;

use crate::driver::Report;
use crate::error::BasilError;
use crate::gram::Metric;
use crate::parse::{GramSource, Problem, Representation, SymmetrySource};

/// Re-emits `problem` in the §6 grammar. Parsing this output reproduces the
/// same matrix, linearity set, and symmetry/gram sources (structural
/// equality, not necessarily byte-identical whitespace).
pub fn pretty_print_problem(problem: &Problem) -> String {
    let mut out = String::new();
    for c in &problem.comments {
        let _ = writeln!(out, "{c}");
    }
    if let Some(name) = &problem.name {
        let _ = writeln!(out, "{name}");
    }
    let _ = writeln!(
        out,
        "{}",
        match problem.representation {
            Representation::H => "H-representation",
            Representation::V => "V-representation",
            Representation::A => "A-representation",
        }
    );
    if !problem.linearity.is_empty() {
        let idxs: Vec<String> = problem.linearity.iter().map(|i| (i + 1).to_string()).collect();
        let _ = writeln!(out, "linearity {} {}", idxs.len(), idxs.join(" "));
    }

    let _ = writeln!(out, "begin");
    let _ = writeln!(out, "{} {} rational", problem.matrix.nrows(), problem.matrix.ncols());
    for row in problem.matrix.rows() {
        let rendered: Vec<String> = row
            .iter()
            .map(|x| {
                if x.is_integer() {
                    x.numer().to_string()
                } else {
                    format!("{}/{}", x.numer(), x.denom())
                }
            })
            .collect();
        let _ = writeln!(out, "{}", rendered.join(" "));
    }
    let _ = writeln!(out, "end");

    match &problem.symmetry {
        SymmetrySource::Auto => {
            let _ = writeln!(out, "symmetry auto");
        }
        SymmetrySource::Explicit(generators) => {
            let _ = writeln!(out, "symmetry begin");
            for g in generators {
                let cycles = g.as_slice();
                let rendered: Vec<String> = cycles.iter().map(|&i| (i + 1).to_string()).collect();
                let _ = writeln!(out, " {}", rendered.join(" "));
            }
            let _ = writeln!(out, "symmetry end");
        }
    }

    match &problem.gram {
        GramSource::None => {
            let _ = writeln!(out, "gram none");
        }
        GramSource::Auto => {
            let _ = writeln!(out, "gram auto");
        }
        GramSource::Metric(m) => {
            let keyword = match m {
                Metric::Q => "q",
                Metric::Raw => "no-augment",
                Metric::Euclidean => "euclidean",
                Metric::AugmentedQ => "auto",
            };
            let _ = writeln!(out, "gram {keyword}");
        }
        GramSource::Explicit(rows) => {
            let _ = writeln!(out, "gram begin");
            for row in rows {
                let rendered: Vec<String> = row.iter().map(|x| x.to_string()).collect();
                let _ = writeln!(out, " {}", rendered.join(" "));
            }
            let _ = writeln!(out, "gram end");
        }
    }

    out
}

/// Human-readable rendering of a completed run: dimension, initial cobasis,
/// the minimised generator set actually used, and the three orbit lists.
pub fn pretty_print_report(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "dimension: {}", report.dimension);
    let _ = writeln!(out, "initial cobasis: {:?}", report.initial_cobasis);
    let _ = writeln!(out, "generators used: {}", report.generators_used.len());
    for g in &report.generators_used {
        let _ = writeln!(out, "  {g:?}");
    }
    let _ = writeln!(out, "basis orbits: {}", report.basis_orbit_count);
    let _ = writeln!(out, "vertex orbits: {}", report.vertex_orbits.len());
    for v in &report.vertex_orbits {
        let _ = writeln!(
            out,
            "  coords={:?} incidence={:?} cobases={}",
            v.coords, v.incidence, v.cobasis_count
        );
    }
    let _ = writeln!(out, "ray orbits: {}", report.ray_orbits.len());
    for r in &report.ray_orbits {
        let _ = writeln!(out, "  direction={:?} incidence={:?}", r.coords, r.incidence);
    }
    let _ = writeln!(out, "finished: {}", report.is_finished);
    let _ = writeln!(out, "elapsed: {:?}", report.elapsed);
    out
}

pub fn to_json(report: &Report) -> Result<String, BasilError> {
    serde_json::to_string_pretty(report).map_err(|e| BasilError::Kernel(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn test_pretty_print_round_trips_matrix_and_linearity() {
        let input = "\
square
H-representation
linearity 1 1
begin
2 2 rational
1/2 0
3 -1
end
";
        let problem = parse(input).unwrap();
        let rendered = pretty_print_problem(&problem);
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(problem.matrix, reparsed.matrix);
        assert_eq!(problem.linearity, reparsed.linearity);
    }
}
