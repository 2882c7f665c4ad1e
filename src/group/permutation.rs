use std::ops::Mul;

/// A permutation of `{0..degree}`, stored as its image mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permutation {
    mapping: Vec<usize>,
}

impl Permutation {
    pub fn new(mapping: Vec<usize>) -> Self {
        debug_assert!({
            let mut sorted = mapping.clone();
            sorted.sort_unstable();
            sorted.iter().enumerate().all(|(i, &v)| i == v)
        });
        Self { mapping }
    }

    pub fn identity(degree: usize) -> Self {
        Self::new((0..degree).collect())
    }

    /// Builds a permutation from disjoint cycles, e.g. `[[0, 1], [2, 3]]`
    /// for `(0 1)(2 3)`. Points not mentioned are fixed.
    pub fn from_cycles(degree: usize, cycles: &[Vec<usize>]) -> Self {
        let mut mapping: Vec<usize> = (0..degree).collect();
        for cycle in cycles {
            if cycle.is_empty() {
                continue;
            }
            for window in 0..cycle.len() {
                let from = cycle[window];
                let to = cycle[(window + 1) % cycle.len()];
                mapping[from] = to;
            }
        }
        Self::new(mapping)
    }

    pub fn degree(&self) -> usize {
        self.mapping.len()
    }

    pub fn apply(&self, i: usize) -> usize {
        self.mapping[i]
    }

    pub fn is_identity(&self) -> bool {
        self.mapping.iter().enumerate().all(|(i, &v)| i == v)
    }

    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.degree()];
        for (i, &j) in self.mapping.iter().enumerate() {
            inv[j] = i;
        }
        Self::new(inv)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.mapping
    }
}

impl Mul for &Permutation {
    type Output = Permutation;

    /// `(self * rhs).apply(i) == self.apply(rhs.apply(i))`, i.e. `rhs` is
    /// applied first.
    fn mul(self, rhs: &Permutation) -> Permutation {
        assert_eq!(self.degree(), rhs.degree());
        let mapping = (0..self.degree()).map(|i| self.apply(rhs.apply(i))).collect();
        Permutation::new(mapping)
    }
}

impl Mul for Permutation {
    type Output = Permutation;

    fn mul(self, rhs: Permutation) -> Permutation {
        &self * &rhs
    }
}

#[cfg(test)]
mod tests {
    use super::Permutation;

    #[test]
    fn test_apply_and_inverse() {
        let p = Permutation::new(vec![1, 2, 0]);
        assert_eq!(p.apply(0), 1);
        assert_eq!(p.inverse(), Permutation::new(vec![2, 0, 1]));
        assert_eq!((p.clone() * p.inverse()), Permutation::identity(3));
    }

    #[test]
    fn test_from_cycles() {
        let p = Permutation::from_cycles(4, &[vec![0, 1], vec![2, 3]]);
        assert_eq!(p, Permutation::new(vec![1, 0, 3, 2]));
    }
}
