//! The narrow surface the reverse-search driver needs from the permutation
//! group backend: build a group from a Gram fingerprint's automorphisms,
//! then answer set-image and stabilizer queries against it.

use crate::gram::{GramMatrix, Mode};
use crate::group::permutation::Permutation;
use crate::group::sgs::{automorphisms_of_labels, PermGroup};
use crate::index_set::IndexSet;

pub struct SymmetryOracle {
    group: PermGroup,
    degree: usize,
}

impl SymmetryOracle {
    pub fn new(group: PermGroup) -> Self {
        let degree = group.degree();
        Self { group, degree }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn group(&self) -> &PermGroup {
        &self.group
    }

    /// Computes the full automorphism group of a Gram fingerprint: the
    /// group of permutations of `{0..g.n()}` under which the label matrix
    /// is invariant.
    ///
    /// In polytope mode this is simply the automorphism group of the
    /// (permlib-canonicalised) label matrix. In arrangement mode, signs
    /// must be respected during the search but discarded from the result
    /// (rows represent unsigned hyperplanes): automorphisms are searched for
    /// on the sign-doubled matrix (`g.sign_double()`, pairing each row `i`
    /// with its negation `n+i`), and each resulting degree-`2n` generator is
    /// lifted back to degree `n` only if its cycles consistently pair up
    /// positive/negative rows — i.e. `p(2i)` and `p(2i+1)` always land in the
    /// same pair. Generators whose cycles mix sign-classes inconsistently
    /// are dropped (§4.2, §9 open question).
    pub fn from_gram_matrix(g: &GramMatrix, mode: Mode) -> PermGroup {
        match mode {
            Mode::Polytope => {
                let canon = g.permlib_canon();
                let labels = to_label_rows(&canon);
                let generators = automorphisms_of_labels(&labels);
                PermGroup::from_generators(generators, canon.n())
            }
            Mode::Arrangement => {
                let doubled = g.sign_double().permlib_canon();
                let labels = to_label_rows(&doubled);
                let generators: Vec<Permutation> = automorphisms_of_labels(&labels)
                    .into_iter()
                    .filter_map(|p| lift_arrangement_generator(&p, g.n()))
                    .collect();
                PermGroup::from_generators(generators, g.n())
            }
        }
    }

    /// Returns a permutation `g` with `g(x) == y`, or `None` if `x` and `y`
    /// are not in the same orbit under the incidence-set action. Returns
    /// `None` immediately when the sets differ in size, and the identity
    /// when both are empty.
    pub fn find_image(&self, x: &IndexSet, y: &IndexSet) -> Option<Permutation> {
        self.group.find_image(x, y)
    }

    pub fn find_image_in_stabilizer(
        &self,
        ground: &IndexSet,
        x: &IndexSet,
        y: &IndexSet,
    ) -> Option<Permutation> {
        self.group.find_image_in_stabilizer(ground, x, y)
    }

    pub fn minimal_generators(&self) -> Vec<Permutation> {
        self.group.minimal_generators()
    }

    pub fn shrink_to_degree(&self, m: usize) -> PermGroup {
        self.group.shrink_to_degree(m)
    }
}

fn to_label_rows(g: &GramMatrix) -> Vec<Vec<i64>> {
    (0..g.n()).map(|i| (0..g.n()).map(|j| g.get(i, j)).collect()).collect()
}

/// Lifts a degree-`2n` sign-doubled automorphism back to degree `n`, or
/// returns `None` if its cycles mix sign-classes (pair `(2i, 2i+1)` does not
/// map onto a single pair under `p`).
fn lift_arrangement_generator(p: &Permutation, n: usize) -> Option<Permutation> {
    let mut mapping = vec![0usize; n];
    for i in 0..n {
        let a = p.apply(2 * i);
        let b = p.apply(2 * i + 1);
        if a / 2 != b / 2 {
            return None;
        }
        mapping[i] = a / 2;
    }
    Some(Permutation::new(mapping))
}

/// Verification mode for the open question in §9: checks the lifted
/// arrangement-automorphism group's order against `|Aut(sign_double(Γ))| /
/// 2^n`, the order it would have if every sign-doubled automorphism lifted
/// cleanly. A strict inequality means some automorphisms were dropped by
/// `lift_arrangement_generator`'s sign-consistency filter.
pub fn verify_arrangement_order(g: &GramMatrix) -> (usize, usize) {
    let doubled = g.sign_double().permlib_canon();
    let labels = to_label_rows(&doubled);
    let full_order = PermGroup::from_generators(automorphisms_of_labels(&labels), doubled.n()).order();
    let lifted_order = SymmetryOracle::from_gram_matrix(g, Mode::Arrangement).order();
    (lifted_order, full_order / (1usize << g.n()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::RationalMatrix;
    use num_bigint::BigInt;
    use num_rational::BigRational;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_square_automorphism_group_has_order_eight() {
        let m = RationalMatrix::from_rows(vec![
            vec![r(1, 1), r(0, 1)],
            vec![r(0, 1), r(1, 1)],
            vec![r(-1, 1), r(0, 1)],
            vec![r(0, 1), r(-1, 1)],
        ]);
        let gram = GramMatrix::construct(&crate::metric::inner_product_matrix(&m));
        let group = SymmetryOracle::from_gram_matrix(&gram, Mode::Polytope);
        assert_eq!(group.order(), 8);
    }

    #[test]
    fn test_arrangement_mode_lifts_sign_consistent_generators() {
        // 3 lines through the origin in general position: the sign-doubled
        // automorphism search should at least recover the identity and be
        // liftable (order divides the unsigned automorphism count).
        let m = RationalMatrix::from_rows(vec![
            vec![r(1, 1), r(0, 1)],
            vec![r(0, 1), r(1, 1)],
        ]);
        let gram = GramMatrix::construct(&crate::metric::inner_product_matrix(&m));
        let group = SymmetryOracle::from_gram_matrix(&gram, Mode::Arrangement);
        assert!(group.order() >= 1);
        let (lifted, bound) = verify_arrangement_order(&gram);
        assert!(lifted <= bound);
    }

    #[test]
    fn test_find_image_empty_sets_is_identity() {
        let gram = GramMatrix::construct(&RationalMatrix::from_rows(vec![vec![r(1, 1)]]));
        let group = SymmetryOracle::from_gram_matrix(&gram, Mode::Polytope);
        let oracle = SymmetryOracle::new(group);
        let empty = IndexSet::empty();
        assert_eq!(
            oracle.find_image(&empty, &empty),
            Some(Permutation::identity(oracle.degree()))
        );
    }
}
