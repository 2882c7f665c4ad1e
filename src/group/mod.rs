//! Permutation-group backend: basic permutation arithmetic, a group-closure
//! implementation for set-image and stabilizer queries, and the oracle that
//! wraps both for the driver.

mod oracle;
mod permutation;
mod sgs;

pub use oracle::SymmetryOracle;
pub use permutation::Permutation;
pub use sgs::{automorphisms_of_labels, PermGroup};
