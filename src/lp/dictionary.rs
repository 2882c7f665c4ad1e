//! The basis/cobasis bookkeeping for one LP dictionary state.
//!
//! Unlike a textbook simplex tableau, nothing here is updated incrementally:
//! every query re-derives what it needs from the current basis index set by
//! inverting the relevant submatrix of the augmented constraint matrix. That
//! trades pivot-time efficiency for a much smaller surface to get right,
//! which is the right trade for a dense-tableau stand-in that exists only to
//! drive the reverse-search contract (first basis, pivot, ratio test,
//! cobasis extraction) rather than to be a fast LP solver.

use num_rational::BigRational;
use num_traits::Signed;

use crate::error::BasilError;
use crate::index_set::IndexSet;
use crate::matrix::{Coordinates, RationalMatrix};

/// Result of a ratio test along the edge obtained by relaxing one basis row.
pub enum EdgeResult {
    /// The edge is bounded; pivoting `leaving` out for `entering` reaches
    /// the next vertex.
    Pivot { entering: usize },
    /// The edge runs off to infinity in direction `direction` (a ray).
    Unbounded { direction: Vec<BigRational> },
}

/// The current basis/cobasis partition of `{0..n}` (the constraint row
/// indices), sized `d - 1` where `d` is the homogeneous ambient dimension.
#[derive(Debug, Clone)]
pub struct Dictionary {
    basis: IndexSet,
    cobasis: IndexSet,
}

impl Dictionary {
    pub fn new(basis: IndexSet, n: usize) -> Self {
        let cobasis = IndexSet::new((0..n).filter(|i| !basis.contains(*i)));
        Self { basis, cobasis }
    }

    pub fn basis(&self) -> &IndexSet {
        &self.basis
    }

    pub fn cobasis(&self) -> &IndexSet {
        &self.cobasis
    }

    fn row_basis(&self, plane_row: usize) -> IndexSet {
        let mut rb = self.basis.clone();
        rb.insert(plane_row);
        rb
    }

    fn basis_inverse(
        &self,
        aug: &RationalMatrix,
        plane_row: usize,
    ) -> Result<RationalMatrix, BasilError> {
        aug.select_rows(&self.row_basis(plane_row)).try_inverse()
    }

    /// The unique point with every basis row tight and `x0 = 1` (the virtual
    /// plane row), read off as the column of the basis inverse at the
    /// plane row's position.
    pub fn coordinates(
        &self,
        aug: &RationalMatrix,
        plane_row: usize,
    ) -> Result<Coordinates, BasilError> {
        let rb = self.row_basis(plane_row);
        let inv = self.basis_inverse(aug, plane_row)?;
        let pos = rb.iter().position(|i| i == plane_row).expect("plane row always present");
        let col = (0..inv.nrows()).map(|r| inv.get(r, pos).clone()).collect();
        Ok(Coordinates(col))
    }

    /// The determinant of the basis (+ plane row) submatrix.
    pub fn determinant(&self, aug: &RationalMatrix, plane_row: usize) -> BigRational {
        aug.select_rows(&self.row_basis(plane_row)).determinant()
    }

    /// The basic direction associated with relaxing `leaving`: the unique
    /// vector `v` with `B v = e_pos`, where `pos` is `leaving`'s position in
    /// the basis-plus-plane row set. Moving `x + t*v` keeps every other
    /// basis row tight while `leaving`'s row value changes linearly in `t`.
    fn edge_direction(
        &self,
        aug: &RationalMatrix,
        plane_row: usize,
        leaving: usize,
    ) -> Result<Vec<BigRational>, BasilError> {
        let rb = self.row_basis(plane_row);
        let inv = self.basis_inverse(aug, plane_row)?;
        let pos = rb
            .iter()
            .position(|i| i == leaving)
            .ok_or_else(|| BasilError::OutOfRange(format!("{leaving} is not in the current basis")))?;
        Ok((0..inv.nrows()).map(|r| inv.get(r, pos).clone()).collect())
    }

    /// Minimum-ratio test along the edge obtained by relaxing `leaving`:
    /// among cobasis rows whose value decreases along the edge direction,
    /// picks the one that reaches zero first (ties broken by smallest row
    /// index, for determinism). Returns `Unbounded` if no such row exists.
    pub fn ratio_test(
        &self,
        a: &RationalMatrix,
        aug: &RationalMatrix,
        plane_row: usize,
        leaving: usize,
        x: &Coordinates,
    ) -> Result<EdgeResult, BasilError> {
        let direction = self.edge_direction(aug, plane_row, leaving)?;

        let mut best: Option<(BigRational, usize)> = None;
        for c in self.cobasis.iter() {
            let slope = RationalMatrix::dot(a.row(c), &direction);
            if !slope.is_negative() {
                continue;
            }
            let value = RationalMatrix::dot(a.row(c), x.as_slice());
            let ratio = -(&value) / &slope;
            best = match best {
                None => Some((ratio, c)),
                Some((r, idx)) if ratio < r || (ratio == r && c < idx) => Some((ratio, c)),
                other => other,
            };
        }

        Ok(match best {
            Some((_, entering)) => EdgeResult::Pivot { entering },
            None => EdgeResult::Unbounded { direction },
        })
    }

    /// Exchanges `leaving` for `entering` between basis and cobasis.
    pub fn pivot(&mut self, leaving: usize, entering: usize) {
        self.basis.remove(leaving);
        self.basis.insert(entering);
        self.cobasis.remove(entering);
        self.cobasis.insert(leaving);
    }
}
