//! Driver configuration: every flag enumerated in the reverse-search
//! component design, gathered into one serializable struct so the CLI and
//! library callers build it the same way.

use serde::{Deserialize, Serialize};

/// Which ratio-test rule and sign handling the driver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// H-representation polytope: constraint rows are halfspace
    /// inequalities, all-ratio test.
    PolytopeH,
    /// V-representation polytope: constraint rows are generators (vertices
    /// and rays), dualized before the same all-ratio test applies.
    PolytopeV,
    /// Hyperplane arrangement: chambers instead of vertices, unsigned Gram
    /// labels, arrangement-ratio test.
    Arrangement,
}

impl Mode {
    /// The `Gram`-construction / automorphism-search mode this DFS mode maps
    /// onto (§4.1/§4.2 distinguish only polytope vs. arrangement).
    pub fn gram_mode(self) -> crate::gram::Mode {
        match self {
            Mode::PolytopeH | Mode::PolytopeV => crate::gram::Mode::Polytope,
            Mode::Arrangement => crate::gram::Mode::Arrangement,
        }
    }

    /// Whether the augmented-Q-metric construction should pair augmenting
    /// rows with their negation.
    pub fn signed_augment(self) -> bool {
        matches!(self, Mode::PolytopeH | Mode::PolytopeV)
    }
}

/// Every recognised DFS option (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfsOptions {
    pub mode: Mode,
    /// Cap on orbit representatives before early termination. `0` returns
    /// immediately with an empty, unfinished report.
    pub basis_limit: usize,
    /// LRU cobasis-cache capacity.
    pub cache_size: usize,
    /// When a new basis defines a vertex symmetric to an already-seen one,
    /// prune all pivots emanating from that basis instead of only this one.
    pub dual_facet_trick: bool,
    /// Toggle Gram fingerprinting. When off, `candidate_vertices_by` /
    /// `candidate_bases_by` degrade to scanning every stored orbit.
    pub gram_vec: bool,
    /// Expand symmetry search to setwise stabilizers when ordinary image
    /// search fails to confirm equivalence.
    pub stab_search: bool,
    /// Restrict to lexicographic pivots. Documented as unsafe: its output
    /// does not satisfy the orbit-coverage invariant (§9).
    pub lex_only: bool,
    /// Maximum number of distinct halfspaces the fundamental domain may
    /// accumulate before the driver stops growing it.
    pub fund_domain_limit: usize,
    /// Bypass all group queries entirely (the group is still parsed and
    /// reported, but never consulted during the search).
    pub assume_no_symmetry: bool,
    /// Emit an `info!` progress line every this-many work items processed.
    /// `0` disables progress reporting.
    pub progress_interval: usize,
    /// Parse and re-emit the canonical form, then return without pivoting.
    pub preprocess_only: bool,
    /// Number of worker threads for the parallel variant. `1` degrades to
    /// (but does not literally call) the single-threaded variant's logic.
    pub num_threads: usize,
}

impl Default for DfsOptions {
    fn default() -> Self {
        Self {
            mode: Mode::PolytopeH,
            basis_limit: usize::MAX,
            cache_size: 10_000,
            dual_facet_trick: false,
            gram_vec: true,
            stab_search: false,
            lex_only: false,
            fund_domain_limit: 10_000,
            assume_no_symmetry: false,
            progress_interval: 0,
            preprocess_only: false,
            num_threads: 1,
        }
    }
}
