//! The LP kernel: owns the constraint matrix, the virtual `x0 = 1` plane
//! row, and the current dictionary, and exposes exactly the operations the
//! reverse-search driver consumes.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::error::BasilError;
use crate::index_set::IndexSet;
use crate::lp::dictionary::{Dictionary, EdgeResult};
use crate::matrix::{Coordinates, RationalMatrix};

#[derive(Debug, Clone)]
pub struct LpKernel {
    a: RationalMatrix,
    aug: RationalMatrix,
    plane_row: usize,
    dict: Dictionary,
}

impl LpKernel {
    /// Builds a kernel over constraint matrix `a` (n rows, d homogeneous
    /// columns), selecting an initial basis of size `d - 1` that includes
    /// every row in `linearity` (rows the caller has declared must stay
    /// tight throughout the search).
    pub fn new(a: RationalMatrix, linearity: &IndexSet) -> Result<Self, BasilError> {
        let n = a.nrows();
        let d = a.ncols();
        let plane_row = n;

        let mut plane = vec![BigRational::zero(); d];
        plane[0] = BigRational::one();
        let mut aug_rows: Vec<Vec<BigRational>> = a.rows().cloned().collect();
        aug_rows.push(plane);
        let aug = RationalMatrix::from_rows(aug_rows);

        let basis = find_first_basis(&aug, plane_row, n, d, linearity)?;
        let dict = Dictionary::new(basis, n);
        Ok(Self { a, aug, plane_row, dict })
    }

    /// Adopts a caller-supplied basis (e.g. one read back from a prior run)
    /// instead of searching for one.
    pub fn with_basis(a: RationalMatrix, basis: IndexSet) -> Result<Self, BasilError> {
        let n = a.nrows();
        let d = a.ncols();
        if basis.len() != d - 1 {
            return Err(BasilError::OutOfRange(format!(
                "basis must have {} elements, got {}",
                d - 1,
                basis.len()
            )));
        }
        let plane_row = n;
        let mut plane = vec![BigRational::zero(); d];
        plane[0] = BigRational::one();
        let mut aug_rows: Vec<Vec<BigRational>> = a.rows().cloned().collect();
        aug_rows.push(plane);
        let aug = RationalMatrix::from_rows(aug_rows);
        let dict = Dictionary::new(basis, n);
        let kernel = Self { a, aug, plane_row, dict };
        kernel.coordinates()?; // validate invertibility eagerly
        Ok(kernel)
    }

    pub fn basis(&self) -> &IndexSet {
        self.dict.basis()
    }

    pub fn cobasis(&self) -> &IndexSet {
        self.dict.cobasis()
    }

    pub fn coordinates(&self) -> Result<Coordinates, BasilError> {
        self.dict.coordinates(&self.aug, self.plane_row)
    }

    /// The numerator of the basis determinant (an integer whenever the
    /// constraint matrix's entries are, which holds for every input this
    /// engine parses).
    pub fn determinant(&self) -> BigInt {
        self.dict.determinant(&self.aug, self.plane_row).numer().clone()
    }

    /// The set of constraint rows tight at the current vertex.
    pub fn incidence_set(&self) -> Result<IndexSet, BasilError> {
        let x = self.coordinates()?;
        Ok(IndexSet::new(
            (0..self.a.nrows()).filter(|&i| RationalMatrix::dot(self.a.row(i), x.as_slice()).is_zero()),
        ))
    }

    pub fn ratio_test(&self, leaving: usize) -> Result<EdgeResult, BasilError> {
        let x = self.coordinates()?;
        self.dict.ratio_test(&self.a, &self.aug, self.plane_row, leaving, &x)
    }

    pub fn pivot(&mut self, leaving: usize, entering: usize) -> Result<(), BasilError> {
        self.dict.pivot(leaving, entering);
        self.coordinates().map(|_| ())
    }
}

fn find_first_basis(
    aug: &RationalMatrix,
    plane_row: usize,
    n: usize,
    d: usize,
    linearity: &IndexSet,
) -> Result<IndexSet, BasilError> {
    let target = d - 1;
    let mut basis = IndexSet::empty();
    let mut rows: Vec<Vec<BigRational>> = vec![aug.row(plane_row).to_vec()];

    for i in linearity.iter() {
        if basis.len() >= target {
            break;
        }
        if !try_add_row(aug, i, &mut basis, &mut rows) {
            return Err(BasilError::Kernel(format!(
                "linearity row {i} is linearly dependent on prior rows"
            )));
        }
    }

    for i in 0..n {
        if basis.len() == target {
            break;
        }
        if basis.contains(i) {
            continue;
        }
        try_add_row(aug, i, &mut basis, &mut rows);
    }

    if basis.len() != target {
        return Err(BasilError::Kernel(
            "no initial basis found: constraint matrix has insufficient rank".to_string(),
        ));
    }
    Ok(basis)
}

fn try_add_row(
    aug: &RationalMatrix,
    i: usize,
    basis: &mut IndexSet,
    rows: &mut Vec<Vec<BigRational>>,
) -> bool {
    let mut candidate = rows.clone();
    candidate.push(aug.row(i).to_vec());
    if is_independent(&candidate) {
        basis.insert(i);
        *rows = candidate;
        true
    } else {
        false
    }
}

/// Gaussian-elimination rank check: `true` iff `rows` are linearly
/// independent.
fn is_independent(rows: &[Vec<BigRational>]) -> bool {
    let mut work = rows.to_vec();
    let ncols = work.first().map_or(0, |r| r.len());
    let mut pivot_row = 0;
    for col in 0..ncols {
        if pivot_row >= work.len() {
            break;
        }
        if let Some(r) = (pivot_row..work.len()).find(|&r| !work[r][col].is_zero()) {
            work.swap(pivot_row, r);
            let pivot = work[pivot_row][col].clone();
            for rr in 0..work.len() {
                if rr == pivot_row || work[rr][col].is_zero() {
                    continue;
                }
                let factor = &work[rr][col] / &pivot;
                for c in col..ncols {
                    let sub = &factor * &work[pivot_row][c];
                    work[rr][c] -= sub;
                }
            }
            pivot_row += 1;
        }
    }
    pivot_row == work.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt as I;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(I::from(n), I::from(d))
    }

    fn unit_square() -> RationalMatrix {
        // x >= 0, 1 - x >= 0, y >= 0, 1 - y >= 0, homogeneous columns (x0, x, y).
        RationalMatrix::from_rows(vec![
            vec![r(0, 1), r(1, 1), r(0, 1)],
            vec![r(1, 1), r(-1, 1), r(0, 1)],
            vec![r(0, 1), r(0, 1), r(1, 1)],
            vec![r(1, 1), r(0, 1), r(-1, 1)],
        ])
    }

    #[test]
    fn test_first_basis_finds_a_vertex() {
        let kernel = LpKernel::new(unit_square(), &IndexSet::empty()).unwrap();
        let coords = kernel.coordinates().unwrap();
        assert_eq!(coords.as_slice()[0], r(1, 1));
    }

    #[test]
    fn test_pivot_moves_to_adjacent_vertex() {
        let mut kernel = LpKernel::new(unit_square(), &IndexSet::empty()).unwrap();
        let leaving = *kernel.basis().iter().next().unwrap();
        match kernel.ratio_test(leaving).unwrap() {
            EdgeResult::Pivot { entering } => {
                kernel.pivot(leaving, entering).unwrap();
                let coords = kernel.coordinates().unwrap();
                assert_eq!(coords.as_slice()[0], r(1, 1));
            }
            EdgeResult::Unbounded { .. } => panic!("unit square has no unbounded edges"),
        }
    }

    #[test]
    fn test_incidence_set_matches_tight_rows() {
        let kernel = LpKernel::new(unit_square(), &IndexSet::empty()).unwrap();
        let inc = kernel.incidence_set().unwrap();
        assert!(inc.len() >= 2);
    }
}
