//! The driver's result type: one canonical representative per orbit of
//! bases, vertices, and rays, plus the generators actually used and whether
//! the run completed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::index_set::IndexSet;
use crate::matrix::Coordinates;

/// One vertex- or ray-orbit representative as reported to the caller
/// (detached from the `Rc<VertexData>` graph the driver keeps internally).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitRecord {
    pub coords: Vec<String>,
    pub incidence: Vec<usize>,
    pub cobasis_count: usize,
    pub representative_cobasis: Vec<usize>,
}

impl OrbitRecord {
    pub(crate) fn from_vertex(
        coords: &Coordinates,
        incidence: &IndexSet,
        representative_cobasis: &IndexSet,
        cobasis_count: usize,
    ) -> Self {
        Self {
            coords: coords.as_slice().iter().map(|x| x.to_string()).collect(),
            incidence: incidence.iter().map(|i| i + 1).collect(),
            cobasis_count,
            representative_cobasis: representative_cobasis.iter().map(|i| i + 1).collect(),
        }
    }
}

/// The structured result of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub dimension: usize,
    pub initial_cobasis: Vec<usize>,
    pub generators_used: Vec<Vec<usize>>,
    pub vertex_orbits: Vec<OrbitRecord>,
    pub basis_orbit_count: usize,
    pub ray_orbits: Vec<OrbitRecord>,
    pub is_finished: bool,
    #[serde(skip, default)]
    pub elapsed: Duration,
}

impl Report {
    pub fn num_vertex_orbits(&self) -> usize {
        self.vertex_orbits.len()
    }

    pub fn num_ray_orbits(&self) -> usize {
        self.ray_orbits.len()
    }
}
