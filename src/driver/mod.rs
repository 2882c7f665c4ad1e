//! The reverse-search driver: single-threaded and parallel variants sharing
//! one configuration type and one result type.

mod config;
mod parallel;
mod report;
mod single;

pub use config::{DfsOptions, Mode};
pub use parallel::ParallelDriver;
pub use report::{OrbitRecord, Report};
pub use single::Driver;

use crate::error::BasilError;
use crate::parse::Problem;

/// Runs the reverse search with `options`, dispatching to the single- or
/// multi-threaded driver depending on `options.num_threads`.
pub fn run(problem: &Problem, options: DfsOptions) -> Result<Report, BasilError> {
    if options.num_threads <= 1 {
        Driver::new(problem, options)?.run()
    } else {
        ParallelDriver::new(problem, options)?.run()
    }
}
