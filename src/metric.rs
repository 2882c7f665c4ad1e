//! Distance metrics for exact-rational `d`-space, used to build the square
//! inner-product matrix that `gram::GramMatrix::construct` labels.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::BasilError;
use crate::matrix::RationalMatrix;

/// A multiprecision radical fraction `n * sqrt(r) / d`, normalized so `r` is
/// squarefree and `gcd(n, d) == 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Radical {
    pub n: BigInt,
    pub r: BigInt,
    pub d: BigInt,
}

impl Radical {
    pub fn new(n: BigInt, r: BigInt, d: BigInt) -> Self {
        let mut x = Self { n, r, d };
        x.normalize();
        x
    }

    pub fn zero() -> Self {
        Self::new(BigInt::zero(), BigInt::one(), BigInt::one())
    }

    /// Normalizes the rational part to lowest terms (keeps sign on `n`) and
    /// squeezes perfect-square factors out of `r` into `n`.
    fn normalize(&mut self) {
        if self.n.is_zero() {
            self.r = BigInt::one();
            self.d = BigInt::one();
            return;
        }
        // Extract the largest perfect-square factor of r by trial division;
        // r is assumed small enough (bounded by products of squared input
        // coefficients) for this to be practical.
        let mut r = self.r.clone();
        let mut factor_out = BigInt::one();
        let mut p = BigInt::from(2);
        while &p * &p <= r {
            let mut count = 0u32;
            while (&r % &p).is_zero() {
                r /= &p;
                count += 1;
            }
            if count > 0 {
                factor_out *= p.pow(count / 2);
                if count % 2 == 1 {
                    r *= &p;
                }
            }
            p += BigInt::one();
        }
        self.r = r;
        self.n *= factor_out;

        let g = self.n.gcd(&self.d);
        if !g.is_one() && !g.is_zero() {
            self.n /= &g;
            self.d /= &g;
        }
        if self.d.is_negative() {
            self.d = -&self.d;
            self.n = -&self.n;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.n.is_zero()
    }

    pub fn sign(&self) -> i32 {
        if self.n.is_negative() {
            -1
        } else if self.n.is_zero() {
            0
        } else {
            1
        }
    }

    pub fn neg(&self) -> Self {
        Self::new(-&self.n, self.r.clone(), self.d.clone())
    }

    /// True iff `self == -other` as exact values (same radical, opposite
    /// signed rational part).
    pub fn is_negation_of(&self, other: &Self) -> bool {
        self.r == other.r && self.n == -&other.n && self.d == other.d
    }
}

/// Computes the inner-product matrix `P[i][j] = dot(M[i], M[j])`.
pub fn inner_product_matrix(m: &RationalMatrix) -> RationalMatrix {
    let n = m.nrows();
    let mut out = RationalMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            out.set(i, j, RationalMatrix::dot(m.row(i), m.row(j)));
        }
    }
    out
}

/// Computes `Q = sum_i outer(M[i], M[i])`.
pub fn q_matrix(m: &RationalMatrix) -> RationalMatrix {
    let d = m.ncols();
    let mut q = RationalMatrix::zeros(d, d);
    for row in m.rows() {
        for a in 0..d {
            if row[a].is_zero() {
                continue;
            }
            for b in 0..d {
                let term = &row[a] * &row[b];
                let cur = q.get(a, b).clone();
                q.set(a, b, cur + term);
            }
        }
    }
    q
}

/// `M Q^-1 M^T`, the Q-metric inner product matrix preserving
/// affine-independent angle information.
pub fn q_metric_matrix(m: &RationalMatrix) -> Result<RationalMatrix, BasilError> {
    let q = q_matrix(m);
    let q_inv = q.try_inverse()?;
    Ok(transformed_inner_product_matrix(m, &q_inv))
}

/// `P[i][j] = dot(M[i] * T, M[j])`.
pub fn transformed_inner_product_matrix(m: &RationalMatrix, t: &RationalMatrix) -> RationalMatrix {
    let mt = m.mul(t);
    let n = m.nrows();
    let mut out = RationalMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            out.set(i, j, RationalMatrix::dot(mt.row(i), m.row(j)));
        }
    }
    out
}

/// Augments `M` with extra rows orthogonal to all existing rows so the
/// combined matrix has full column rank. When `aug_signed` is true, each
/// augmenting row is paired with its negation (polytope mode); otherwise
/// augmenting rows stand alone (arrangement mode).
pub fn orthogonal_augment(m: &RationalMatrix, aug_signed: bool) -> RationalMatrix {
    let d = m.ncols();
    let mut basis: Vec<Vec<BigRational>> = m.rows().cloned().collect();
    let mut extra = Vec::new();

    for k in 0..d {
        let mut candidate = vec![BigRational::zero(); d];
        candidate[k] = BigRational::one();
        let projected = gram_schmidt_reject(&candidate, &basis);
        if !is_zero_vec(&projected) {
            basis.push(projected.clone());
            extra.push(projected);
        }
    }

    let mut rows: Vec<Vec<BigRational>> = m.rows().cloned().collect();
    for row in &extra {
        rows.push(row.clone());
        if aug_signed {
            rows.push(row.iter().map(|x| -x).collect());
        }
    }
    RationalMatrix::from_rows(rows)
}

fn gram_schmidt_reject(v: &[BigRational], basis: &[Vec<BigRational>]) -> Vec<BigRational> {
    let mut result = v.to_vec();
    for b in basis {
        let denom = RationalMatrix::dot(b, b);
        if denom.is_zero() {
            continue;
        }
        let numer = RationalMatrix::dot(&result, b);
        let coeff = &numer / &denom;
        for (r, bi) in result.iter_mut().zip(b.iter()) {
            *r -= &coeff * bi;
        }
    }
    result
}

fn is_zero_vec(v: &[BigRational]) -> bool {
    v.iter().all(|x| x.is_zero())
}

/// `P[i][j] = dot(M[i], M[j]) / (||M[i]|| * ||M[j]||)`, expressed exactly as
/// normalized radicals (`n * sqrt(r) / d`).
pub fn normalized_inner_product_matrix(m: &RationalMatrix) -> Vec<Vec<Radical>> {
    let n = m.nrows();
    let sq_norms: Vec<BigRational> = (0..n).map(|i| RationalMatrix::dot(m.row(i), m.row(i))).collect();

    let mut out = vec![vec![Radical::zero(); n]; n];
    for i in 0..n {
        for j in 0..n {
            let dot = RationalMatrix::dot(m.row(i), m.row(j));
            if dot.is_zero() {
                continue;
            }
            // dot / sqrt(sq_norms[i] * sq_norms[j])
            // Write dot = p/q (BigRational); denom^2 = sq_norms[i]*sq_norms[j] = a/b.
            // value = (p/q) / sqrt(a/b) = p*sqrt(b) / (q*sqrt(a)) = p*sqrt(a*b) / (q*a)
            let a = &sq_norms[i] * &sq_norms[j];
            let (a_n, a_d) = (a.numer().clone(), a.denom().clone());
            let (p, q) = (dot.numer().clone(), dot.denom().clone());
            // value = p * sqrt(a_n * a_d) / (q * a_n), since sqrt(a_n/a_d) = sqrt(a_n*a_d)/a_d
            let radicand = &a_n * &a_d;
            let denom = &q * &a_n;
            out[i][j] = Radical::new(p, radicand, denom);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_radical_normalizes_square_factors() {
        // sqrt(8) = 2*sqrt(2)
        let rad = Radical::new(BigInt::from(1), BigInt::from(8), BigInt::from(1));
        assert_eq!(rad.r, BigInt::from(2));
        assert_eq!(rad.n, BigInt::from(2));
    }

    #[test]
    fn test_radical_negation() {
        let a = Radical::new(BigInt::from(3), BigInt::from(5), BigInt::from(2));
        let b = a.neg();
        assert!(a.is_negation_of(&b));
    }

    #[test]
    fn test_q_metric_unit_square() {
        let m = RationalMatrix::from_rows(vec![
            vec![r(1, 1), r(0, 1)],
            vec![r(0, 1), r(1, 1)],
        ]);
        let q = q_metric_matrix(&m).unwrap();
        assert_eq!(q.get(0, 0), &r(1, 1));
        assert_eq!(q.get(0, 1), &r(0, 1));
    }

    #[test]
    fn test_orthogonal_augment_full_rank() {
        let m = RationalMatrix::from_rows(vec![vec![r(1, 1), r(0, 1)]]);
        let augmented = orthogonal_augment(&m, false);
        assert_eq!(augmented.nrows(), 2);
    }
}
