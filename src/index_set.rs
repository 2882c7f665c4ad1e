use std::fmt;

/// A subset of `{0..n}`, stored in ascending order.
///
/// Input and output are 1-indexed; internally everything is 0-indexed, and
/// `IndexSet` is the single place that enforces canonical ascending ordering
/// on iteration, so that two `IndexSet`s built from the same mathematical set
/// always compare and hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexSet {
    indices: Vec<usize>,
}

impl IndexSet {
    /// Builds an `IndexSet` from an arbitrary iterable, sorting and
    /// deduplicating as it goes.
    pub fn new<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut indices: Vec<usize> = iter.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn empty() -> Self {
        Self { indices: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, i: usize) -> bool {
        self.indices.binary_search(&i).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn insert(&mut self, i: usize) -> bool {
        match self.indices.binary_search(&i) {
            Ok(_) => false,
            Err(pos) => {
                self.indices.insert(pos, i);
                true
            }
        }
    }

    pub fn remove(&mut self, i: usize) -> bool {
        match self.indices.binary_search(&i) {
            Ok(pos) => {
                self.indices.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Set union.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.indices.iter().copied().chain(other.indices.iter().copied()))
    }

    /// Set difference (`self - other`).
    pub fn difference(&self, other: &Self) -> Self {
        Self::new(self.indices.iter().copied().filter(|i| !other.contains(*i)))
    }

    /// Set intersection.
    pub fn intersection(&self, other: &Self) -> Self {
        Self::new(self.indices.iter().copied().filter(|i| other.contains(*i)))
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.indices.iter().all(|i| other.contains(*i))
    }

    /// Applies a permutation (given as `image(i)`) elementwise, re-sorting
    /// the result. Used by `SymmetryOracle::find_image` candidates and by
    /// the Gram restriction machinery.
    pub fn apply<F: Fn(usize) -> usize>(&self, image: F) -> Self {
        Self::new(self.indices.iter().map(|&i| image(i)))
    }
}

impl fmt::Display for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, i) in self.indices.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            // Re-surface 1-indexing for human-readable output.
            write!(f, "{}", i + 1)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<usize> for IndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a IndexSet {
    type Item = usize;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::IndexSet;

    #[test]
    fn test_canonical_ordering() {
        let a = IndexSet::new([3, 1, 2, 1]);
        let b = IndexSet::new([1, 2, 3]);
        assert_eq!(a, b);
        assert_eq!(a.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_set_ops() {
        let a = IndexSet::new([1, 2, 3]);
        let b = IndexSet::new([2, 3, 4]);
        assert_eq!(a.union(&b), IndexSet::new([1, 2, 3, 4]));
        assert_eq!(a.difference(&b), IndexSet::new([1]));
        assert_eq!(a.intersection(&b), IndexSet::new([2, 3]));
        assert!(IndexSet::new([2, 3]).is_subset(&a));
    }

    #[test]
    fn test_apply_permutation() {
        let s = IndexSet::new([0, 1, 2]);
        // permutation (0 1 2) -> (1 2 0)
        let image = |i: usize| (i + 1) % 3;
        assert_eq!(s.apply(image), IndexSet::new([0, 1, 2]));
    }
}
