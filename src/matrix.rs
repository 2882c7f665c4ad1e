use std::ops::Index;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::error::BasilError;
use crate::index_set::IndexSet;

/// Dense row-major matrix of exact rationals.
///
/// The constraint matrix is `n x d` for arbitrary `n, d` and its entries must
/// stay exact: a floating-point Gram fingerprint would defeat the whole point
/// of the symmetry oracle's dictionary-lookup fast path. A flat `Vec` of rows
/// over `BigRational` keeps every arithmetic step exact at the cost of
/// fixed-size SIMD-friendly storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalMatrix {
    rows: Vec<Vec<BigRational>>,
    ncols: usize,
}

impl RationalMatrix {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            rows: vec![vec![BigRational::zero(); ncols]; nrows],
            ncols,
        }
    }

    pub fn from_rows(rows: Vec<Vec<BigRational>>) -> Self {
        let ncols = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == ncols));
        Self { rows, ncols }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn row(&self, i: usize) -> &[BigRational] {
        &self.rows[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &Vec<BigRational>> {
        self.rows.iter()
    }

    pub fn get(&self, i: usize, j: usize) -> &BigRational {
        &self.rows[i][j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: BigRational) {
        self.rows[i][j] = value;
    }

    /// Returns the submatrix selecting the rows in `s`, preserving `s`'s
    /// canonical (ascending) order.
    pub fn select_rows(&self, s: &IndexSet) -> Self {
        Self::from_rows(s.iter().map(|i| self.rows[i].clone()).collect())
    }

    /// Inner product of two rows.
    pub fn dot(a: &[BigRational], b: &[BigRational]) -> BigRational {
        a.iter()
            .zip(b.iter())
            .fold(BigRational::zero(), |acc, (x, y)| acc + x * y)
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.ncols, self.nrows());
        for i in 0..self.nrows() {
            for j in 0..self.ncols {
                out.set(j, i, self.get(i, j).clone());
            }
        }
        out
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        assert_eq!(self.ncols, rhs.nrows());
        let mut out = Self::zeros(self.nrows(), rhs.ncols);
        for i in 0..self.nrows() {
            for j in 0..rhs.ncols {
                let mut acc = BigRational::zero();
                for k in 0..self.ncols {
                    acc += self.get(i, k) * rhs.get(k, j);
                }
                out.set(i, j, acc);
            }
        }
        out
    }

    pub fn identity(n: usize) -> Self {
        let mut out = Self::zeros(n, n);
        for i in 0..n {
            out.set(i, i, BigRational::one());
        }
        out
    }

    /// Gauss-Jordan inversion over exact rationals. Returns
    /// `BasilError::NonInvertibleMatrix` naming the row at which a pivot
    /// could not be found (the Q-metric construction is the only caller that
    /// can hit this).
    pub fn try_inverse(&self) -> Result<Self, BasilError> {
        let n = self.nrows();
        assert_eq!(n, self.ncols, "try_inverse requires a square matrix");

        let mut work = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            // Find a nonzero pivot in this column at or below `col`.
            let pivot_row = (col..n).find(|&r| !work.get(r, col).is_zero());
            let pivot_row = match pivot_row {
                Some(r) => r,
                None => return Err(BasilError::NonInvertibleMatrix(col)),
            };
            if pivot_row != col {
                work.rows.swap(pivot_row, col);
                inv.rows.swap(pivot_row, col);
            }

            let pivot = work.get(col, col).clone();
            for j in 0..n {
                work.rows[col][j] = &work.rows[col][j] / &pivot;
                inv.rows[col][j] = &inv.rows[col][j] / &pivot;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work.get(r, col).clone();
                if factor.is_zero() {
                    continue;
                }
                for j in 0..n {
                    let sub = &factor * &work.rows[col][j];
                    work.rows[r][j] -= sub;
                    let sub_inv = &factor * &inv.rows[col][j];
                    inv.rows[r][j] -= sub_inv;
                }
            }
        }

        Ok(inv)
    }

    pub fn determinant(&self) -> BigRational {
        let n = self.nrows();
        assert_eq!(n, self.ncols);
        let mut work = self.clone();
        let mut det = BigRational::one();
        for col in 0..n {
            let pivot_row = (col..n).find(|&r| !work.get(r, col).is_zero());
            let pivot_row = match pivot_row {
                Some(r) => r,
                None => return BigRational::zero(),
            };
            if pivot_row != col {
                work.rows.swap(pivot_row, col);
                det = -det;
            }
            let pivot = work.get(col, col).clone();
            det *= &pivot;
            for r in (col + 1)..n {
                let factor = work.get(r, col) / &pivot;
                if factor.is_zero() {
                    continue;
                }
                for j in col..n {
                    let sub = &factor * &work.rows[col][j];
                    work.rows[r][j] -= sub;
                }
            }
        }
        det
    }
}

impl Index<(usize, usize)> for RationalMatrix {
    type Output = BigRational;

    fn index(&self, (i, j): (usize, usize)) -> &BigRational {
        &self.rows[i][j]
    }
}

/// A vertex or ray coordinate vector. The leading entry is `1` for a vertex
/// and `0` for a ray direction, so vertices and rays share one representation
/// throughout the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinates(pub Vec<BigRational>);

impl Coordinates {
    pub fn is_ray(&self) -> bool {
        self.0.first().map_or(false, |x| x.is_zero())
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[BigRational] {
        &self.0
    }
}

/// Reduces a non-zero fractional vector coefficient to an exact integer
/// denominator common multiple, used when emitting "nice" printed forms.
pub fn common_denominator(values: &[BigRational]) -> BigInt {
    values
        .iter()
        .fold(BigInt::one(), |acc, v| num_integer::lcm(acc, v.denom().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::BigRational;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_inverse() {
        let m = RationalMatrix::from_rows(vec![
            vec![r(2, 1), r(0, 1)],
            vec![r(0, 1), r(4, 1)],
        ]);
        let inv = m.try_inverse().unwrap();
        assert_eq!(inv.get(0, 0), &r(1, 2));
        assert_eq!(inv.get(1, 1), &r(1, 4));
    }

    #[test]
    fn test_singular_matrix_errors() {
        let m = RationalMatrix::from_rows(vec![
            vec![r(1, 1), r(1, 1)],
            vec![r(2, 1), r(2, 1)],
        ]);
        assert!(m.try_inverse().is_err());
    }

    #[test]
    fn test_determinant() {
        let m = RationalMatrix::from_rows(vec![
            vec![r(1, 1), r(2, 1)],
            vec![r(3, 1), r(4, 1)],
        ]);
        assert_eq!(m.determinant(), r(-2, 1));
    }
}
