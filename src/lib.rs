pub mod driver;
pub mod error;
pub mod fundamental_domain;
pub mod gram;
pub mod group;
pub mod index_set;
pub mod lp;
pub mod matrix;
pub mod metric;
pub mod orbit_store;
pub mod output;
pub mod parse;

pub use driver::{run, DfsOptions, Driver, Mode, OrbitRecord, ParallelDriver, Report};
pub use error::BasilError;
pub use gram::GramMatrix;
pub use parse::{parse as parse_problem, Problem};
