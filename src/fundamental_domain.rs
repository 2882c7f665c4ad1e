//! Fundamental-domain construction: the halfspace system that picks out one
//! representative per symmetry orbit among points of the ambient space.

use std::collections::HashSet;

use num_rational::BigRational;
use num_traits::{Signed, Zero};

use crate::group::Permutation;
use crate::index_set::IndexSet;
use crate::matrix::{Coordinates, RationalMatrix};

/// A polyhedron (intersection of halfspaces `p . x >= 0`) that tiles the
/// ambient space under the action of a symmetry group: each orbit of points
/// has exactly one representative inside (boundary admitted).
#[derive(Debug, Clone)]
pub struct FundamentalDomain {
    constraints: Vec<Vec<BigRational>>,
    q_inv: RationalMatrix,
}

impl FundamentalDomain {
    pub fn new(q_inv: RationalMatrix) -> Self {
        Self {
            constraints: Vec::new(),
            q_inv,
        }
    }

    pub fn dim(&self) -> usize {
        self.q_inv.ncols()
    }

    pub fn size(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[Vec<BigRational>] {
        &self.constraints
    }

    /// `true` iff `p_i . x >= 0` for every stored constraint (non-strict:
    /// points on the boundary are admitted).
    pub fn is_inside(&self, x: &Coordinates) -> bool {
        self.constraints
            .iter()
            .all(|p| RationalMatrix::dot(p, x.as_slice()) >= BigRational::zero())
    }

    /// Adds the halfspace whose bounding hyperplane perpendicular-bisects
    /// segment `ab` (in the `Q`-metric), oriented so `a` is included and `b`
    /// is excluded. The constraint vector is normalized by dividing through
    /// by the absolute value of its first nonzero entry, so that two
    /// constraints differing only by a positive scalar factor are stored
    /// identically.
    pub fn add_constraint(&mut self, a: &Coordinates, b: &Coordinates) {
        let diff: Vec<BigRational> = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| x - y)
            .collect();
        let bisector = row_mat_mul(&diff, &self.q_inv);
        self.constraints.push(leading_unit(&bisector));
    }

    /// Builds the fundamental domain from a seed vertex: for each generator,
    /// transforms the seed by the basis-change matrix carrying the seed's
    /// basis to the generator's image of that basis, and (when the image
    /// differs from the seed and has not been seen before) adds the
    /// perpendicular-bisector constraint separating the seed from its image.
    ///
    /// `a` is the constraint matrix in homogeneous coordinates (leading
    /// column `1`); the seed's basis row set is `seed_basis`, a subset of
    /// `{0..a.nrows()}`.
    pub fn build_from_seed(
        &mut self,
        seed: &Coordinates,
        seed_basis: &IndexSet,
        a: &RationalMatrix,
        generators: &[Permutation],
    ) {
        let n = a.nrows();
        let plane_row = n; // the virtual x_0 = 1 hyperplane, appended below

        let mut aa_rows: Vec<Vec<BigRational>> = a.rows().cloned().collect();
        let mut plane = vec![BigRational::zero(); a.ncols()];
        plane[0] = num_traits::One::one();
        aa_rows.push(plane);
        let aa = RationalMatrix::from_rows(aa_rows);

        let mut row_basis = seed_basis.clone();
        row_basis.insert(plane_row);
        let b = match aa.select_rows(&row_basis).try_inverse() {
            Ok(inv) => inv,
            Err(_) => return,
        };

        let mut seen_images: HashSet<Coordinates> = HashSet::new();
        for g in generators {
            let mut p_basis = seed_basis.apply(|i| g.apply(i));
            p_basis.insert(plane_row);
            let t = b.mul(&aa.select_rows(&p_basis));

            let image = mat_vec_mul(&t, seed.as_slice());
            let image = Coordinates(image);
            if &image == seed {
                continue;
            }
            if seen_images.insert(image.clone()) {
                self.add_constraint(seed, &image);
            }
        }
    }
}

fn row_mat_mul(v: &[BigRational], m: &RationalMatrix) -> Vec<BigRational> {
    (0..m.ncols())
        .map(|j| {
            (0..m.nrows())
                .fold(BigRational::zero(), |acc, i| acc + v[i].clone() * m.get(i, j))
        })
        .collect()
}

fn mat_vec_mul(m: &RationalMatrix, v: &[BigRational]) -> Vec<BigRational> {
    (0..m.nrows()).map(|i| RationalMatrix::dot(m.row(i), v)).collect()
}

/// Scales `v` so the first nonzero entry has absolute value `1`, leaving the
/// zero vector unchanged.
fn leading_unit(v: &[BigRational]) -> Vec<BigRational> {
    match v.iter().find(|x| !x.is_zero()) {
        None => v.to_vec(),
        Some(pivot) => {
            let scale = pivot.abs();
            v.iter().map(|x| x / &scale).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_is_inside_admits_boundary() {
        let q_inv = RationalMatrix::identity(2);
        let mut domain = FundamentalDomain::new(q_inv);
        domain.constraints.push(vec![r(1, 1), r(0, 1)]);
        let x = Coordinates(vec![r(0, 1), r(5, 1)]);
        assert!(domain.is_inside(&x));
    }

    #[test]
    fn test_add_constraint_normalizes_leading_entry() {
        let q_inv = RationalMatrix::identity(2);
        let mut domain = FundamentalDomain::new(q_inv);
        let a = Coordinates(vec![r(2, 1), r(0, 1)]);
        let b = Coordinates(vec![r(-2, 1), r(0, 1)]);
        domain.add_constraint(&a, &b);
        assert_eq!(domain.constraints()[0][0], r(1, 1));
    }

    #[test]
    fn test_leading_unit_handles_zero_vector() {
        let v = vec![r(0, 1), r(0, 1)];
        assert_eq!(leading_unit(&v), v);
    }
}
