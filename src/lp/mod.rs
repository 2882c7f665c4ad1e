//! A dense-tableau LP dictionary/pivot kernel, scoped to exactly the
//! operations the reverse-search driver needs: first basis, pivot, ratio
//! test, and cobasis extraction.

mod dictionary;
mod kernel;

pub use dictionary::EdgeResult;
pub use kernel::LpKernel;
