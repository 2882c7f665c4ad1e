//! A minimal, task-scoped permutation-group backend.
//!
//! No published crate offers the surface this engine needs from a group
//! backend: strong generating sets, set-image search, setwise stabilizers,
//! orbit enumeration. This module supplies a first-party implementation
//! narrowly scoped to the group orders this engine actually sees in
//! practice (a few hundred at most), so full-group enumeration by BFS
//! closure over the generators is a simple, correct, and fast enough
//! foundation. This is not an attempt at a general computational-group-theory
//! library.

use std::collections::{HashSet, VecDeque};

use super::permutation::Permutation;
use crate::index_set::IndexSet;

/// A permutation group given by a (not necessarily minimal) generating set,
/// plus its full element list computed by closure.
#[derive(Debug, Clone)]
pub struct PermGroup {
    degree: usize,
    generators: Vec<Permutation>,
    elements: Vec<Permutation>,
}

impl PermGroup {
    pub fn trivial(degree: usize) -> Self {
        Self {
            degree,
            generators: vec![],
            elements: vec![Permutation::identity(degree)],
        }
    }

    pub fn from_generators(generators: Vec<Permutation>, degree: usize) -> Self {
        let elements = close_under_generation(&generators, degree);
        Self {
            degree,
            generators,
            elements,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn generators(&self) -> &[Permutation] {
        &self.generators
    }

    pub fn order(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[Permutation] {
        &self.elements
    }

    pub fn contains(&self, p: &Permutation) -> bool {
        self.elements.contains(p)
    }

    /// Orbit of a point under the full group.
    pub fn orbit(&self, point: usize) -> IndexSet {
        IndexSet::new(self.elements.iter().map(|g| g.apply(point)))
    }

    /// Orbit of a set under the full group's natural action on subsets
    /// (the set of distinct images `{ g(S) : g in G }`, each represented as
    /// an `IndexSet`).
    pub fn orbit_of_set(&self, s: &IndexSet) -> Vec<IndexSet> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for g in &self.elements {
            let image = s.apply(|i| g.apply(i));
            if seen.insert(image.clone()) {
                out.push(image);
            }
        }
        out
    }

    /// The subgroup of `self` whose elements map `ground` onto itself
    /// setwise (the setwise stabilizer).
    pub fn setwise_stabilizer(&self, ground: &IndexSet) -> PermGroup {
        let elements: Vec<Permutation> = self
            .elements
            .iter()
            .filter(|g| &ground.apply(|i| g.apply(i)) == ground)
            .cloned()
            .collect();
        PermGroup {
            degree: self.degree,
            generators: elements.clone(),
            elements,
        }
    }

    /// Returns a permutation `g` in `self` with `g(x) == y` (as sets), or
    /// `None` if no such element exists. Returns `None` immediately if the
    /// sets differ in size, since no group element can change a set's
    /// cardinality.
    pub fn find_image(&self, x: &IndexSet, y: &IndexSet) -> Option<Permutation> {
        if x.len() != y.len() {
            return None;
        }
        if x.is_empty() {
            return Some(Permutation::identity(self.degree));
        }
        self.elements
            .iter()
            .find(|g| &x.apply(|i| g.apply(i)) == y)
            .cloned()
    }

    /// As `find_image`, but restricted to the setwise stabilizer of `ground`.
    pub fn find_image_in_stabilizer(
        &self,
        ground: &IndexSet,
        x: &IndexSet,
        y: &IndexSet,
    ) -> Option<Permutation> {
        self.setwise_stabilizer(ground).find_image(x, y)
    }

    /// The subgroup of `self` that fixes `{0..m}` setwise, re-expressed as a
    /// group of degree `m`. Generators whose cycles touch any index `>= m`
    /// are discarded, matching "excluding any elements of the original
    /// group that do not setwise fix" the smaller ground set.
    pub fn shrink_to_degree(&self, m: usize) -> PermGroup {
        let shrunk_generators: Vec<Permutation> = self
            .generators
            .iter()
            .filter(|g| (0..m).all(|i| g.apply(i) < m))
            .map(|g| Permutation::new((0..m).map(|i| g.apply(i)).collect()))
            .collect();
        PermGroup::from_generators(shrunk_generators, m)
    }

    /// A shortest-found subset of the generating set that still generates a
    /// group of the same order. First marks every generator whose removal
    /// would lower the group's order as essential, then greedily restores
    /// non-essential generators until the order is recovered.
    pub fn minimal_generators(&self) -> Vec<Permutation> {
        let target_order = self.order();
        if self.generators.is_empty() {
            return vec![];
        }

        let mut essential = vec![];
        let mut nonessential = vec![];
        for (i, g) in self.generators.iter().enumerate() {
            let rest: Vec<Permutation> = self
                .generators
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, p)| p.clone())
                .collect();
            let order_without = close_under_generation(&rest, self.degree).len();
            if order_without < target_order {
                essential.push(g.clone());
            } else {
                nonessential.push(g.clone());
            }
        }

        let mut chosen = essential;
        for g in nonessential {
            if close_under_generation(&chosen, self.degree).len() >= target_order {
                break;
            }
            chosen.push(g);
        }
        chosen
    }
}

fn close_under_generation(generators: &[Permutation], degree: usize) -> Vec<Permutation> {
    let identity = Permutation::identity(degree);
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut elements = Vec::new();

    queue.push_back(identity.clone());
    visited.insert(identity);

    while let Some(g) = queue.pop_front() {
        elements.push(g.clone());
        for generator in generators {
            let product = generator * &g;
            if visited.insert(product.clone()) {
                queue.push_back(product);
            }
        }
    }

    elements
}

/// Backtracking search for the full automorphism group of a label matrix
/// (used by `SymmetryOracle::from_gram_matrix`). Candidate images for each
/// row are pruned to rows sharing the same sorted label multiset and
/// diagonal value before the search commits to an assignment, which keeps
/// this practical for the matrix sizes this engine actually produces
/// (n at most a few dozen after sign-doubling).
pub fn automorphisms_of_labels(labels: &[Vec<i64>]) -> Vec<Permutation> {
    let n = labels.len();
    if n == 0 {
        return vec![Permutation::identity(0)];
    }

    let signature = |i: usize| -> (i64, Vec<i64>) {
        let mut row = labels[i].clone();
        row.sort_unstable();
        (labels[i][i], row)
    };
    let signatures: Vec<(i64, Vec<i64>)> = (0..n).map(signature).collect();

    let mut results = Vec::new();
    let mut assignment = vec![usize::MAX; n];
    let mut used = vec![false; n];
    backtrack(labels, &signatures, 0, &mut assignment, &mut used, &mut results);
    results
}

fn backtrack(
    labels: &[Vec<i64>],
    signatures: &[(i64, Vec<i64>)],
    pos: usize,
    assignment: &mut Vec<usize>,
    used: &mut Vec<bool>,
    results: &mut Vec<Permutation>,
) {
    let n = labels.len();
    if pos == n {
        results.push(Permutation::new(assignment.clone()));
        return;
    }
    for cand in 0..n {
        if used[cand] || signatures[cand] != signatures[pos] {
            continue;
        }
        let mut ok = true;
        for prior in 0..pos {
            if labels[pos][prior] != labels[cand][assignment[prior]]
                || labels[prior][pos] != labels[assignment[prior]][cand]
            {
                ok = false;
                break;
            }
        }
        if !ok {
            continue;
        }
        assignment[pos] = cand;
        used[cand] = true;
        backtrack(labels, signatures, pos + 1, assignment, used, results);
        used[cand] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_generates_klein_four() {
        let a = Permutation::from_cycles(4, &[vec![0, 1], vec![2, 3]]);
        let b = Permutation::from_cycles(4, &[vec![0, 2], vec![1, 3]]);
        let g = PermGroup::from_generators(vec![a, b], 4);
        assert_eq!(g.order(), 4);
    }

    #[test]
    fn test_find_image_requires_equal_size() {
        let g = PermGroup::trivial(4);
        let x = IndexSet::new([0, 1]);
        let y = IndexSet::new([0, 1, 2]);
        assert_eq!(g.find_image(&x, &y), None);
    }

    #[test]
    fn test_find_image_empty_set_is_identity() {
        let a = Permutation::from_cycles(3, &[vec![0, 1, 2]]);
        let g = PermGroup::from_generators(vec![a], 3);
        let empty = IndexSet::empty();
        assert_eq!(g.find_image(&empty, &empty), Some(Permutation::identity(3)));
    }

    #[test]
    fn test_shrink_to_degree_drops_crossing_generators() {
        let a = Permutation::from_cycles(5, &[vec![0, 1]]); // stays within {0..2}
        let b = Permutation::from_cycles(5, &[vec![1, 3]]); // crosses the boundary
        let g = PermGroup::from_generators(vec![a, b], 5);
        let shrunk = g.shrink_to_degree(2);
        assert_eq!(shrunk.degree(), 2);
        assert_eq!(shrunk.order(), 2);
    }

    #[test]
    fn test_minimal_generators_preserves_order() {
        let a = Permutation::from_cycles(3, &[vec![0, 1]]);
        let b = Permutation::from_cycles(3, &[vec![1, 2]]);
        let c = &a * &b; // redundant generator
        let g = PermGroup::from_generators(vec![a, b, c], 3);
        let minimal = g.minimal_generators();
        let reconstructed = PermGroup::from_generators(minimal, 3);
        assert_eq!(reconstructed.order(), g.order());
    }

    #[test]
    fn test_automorphisms_of_square_labels() {
        // A 4-cycle label matrix (like the unit square's Gram fingerprint)
        // should admit the dihedral group of order 8 as automorphisms.
        let labels = vec![
            vec![0, 1, 2, 1],
            vec![1, 0, 1, 2],
            vec![2, 1, 0, 1],
            vec![1, 2, 1, 0],
        ];
        let autos = automorphisms_of_labels(&labels);
        assert_eq!(autos.len(), 8);
    }
}
