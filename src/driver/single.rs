//! The single-threaded reverse-search driver: depth-first exploration of the
//! basis-edge graph with LIFO backtracking, invariant-then-image orbit
//! deduplication, and optional fundamental-domain pruning.
//!
//! Naming note: `LpKernel::basis()` is the set of rows *tight* at the
//! current vertex — what the distilled spec and glossary call the
//! "cobasis" (the LP-textbook convention the spec's glossary cites).
//! `LpKernel::cobasis()` is its complement. This module always means "tight
//! row set" when it says cobasis, matching the spec text, even though the
//! underlying `Dictionary` type names the field `basis` for the more common
//! textbook sense of "basic (non-tight) variables".

use std::rc::Rc;
use std::time::Instant;

use log::{debug, info};

use crate::driver::config::DfsOptions;
use crate::driver::report::{OrbitRecord, Report};
use crate::error::BasilError;
use crate::fundamental_domain::FundamentalDomain;
use crate::gram::GramMatrix;
use crate::group::{Permutation, SymmetryOracle};
use crate::index_set::IndexSet;
use crate::lp::{EdgeResult, LpKernel};
use crate::matrix::{Coordinates, RationalMatrix};
use crate::metric::q_matrix;
use crate::orbit_store::{OrbitStore, VertexData};
use crate::parse::Problem;

/// A queued pivot: backtrack the kernel to `cobasis_before`, then apply
/// `(leaving, entering)` before enumerating its outgoing edges.
struct WorkItem {
    cobasis_before: IndexSet,
    leaving: usize,
    entering: usize,
}

pub struct Driver {
    kernel: LpKernel,
    a: RationalMatrix,
    gram: Option<GramMatrix>,
    oracle: Option<SymmetryOracle>,
    domain: FundamentalDomain,
    store: OrbitStore,
    options: DfsOptions,
    path_stack: Vec<(usize, usize)>,
    work_stack: Vec<WorkItem>,
    items_processed: usize,
}

impl Driver {
    pub fn new(problem: &Problem, options: DfsOptions) -> Result<Self, BasilError> {
        let a = problem.matrix.clone();
        let kernel = LpKernel::new(a.clone(), &problem.linearity)?;

        let gram = if options.gram_vec {
            Some(problem.build_gram(options.mode.signed_augment())?)
        } else {
            None
        };

        let oracle = if options.assume_no_symmetry {
            None
        } else {
            let group = problem.resolve_group(gram.as_ref(), options.mode.gram_mode())?;
            Some(SymmetryOracle::new(group))
        };

        let augmented = crate::metric::orthogonal_augment(&a, options.mode.signed_augment());
        let q_inv = q_matrix(&augmented).try_inverse()?;

        Ok(Self {
            kernel,
            a,
            gram,
            oracle,
            domain: FundamentalDomain::new(q_inv),
            store: OrbitStore::new(options.cache_size),
            options,
            path_stack: Vec::new(),
            work_stack: Vec::new(),
            items_processed: 0,
        })
    }

    pub fn run(mut self) -> Result<Report, BasilError> {
        let start = Instant::now();
        let dimension = self.a.ncols().saturating_sub(1);

        if self.options.basis_limit == 0 {
            return Ok(Report {
                dimension,
                initial_cobasis: vec![],
                generators_used: vec![],
                vertex_orbits: vec![],
                basis_orbit_count: 0,
                ray_orbits: vec![],
                is_finished: false,
                elapsed: start.elapsed(),
            });
        }

        let initial_cobasis = self.kernel.basis().clone();

        if self.options.preprocess_only {
            return Ok(Report {
                dimension,
                initial_cobasis: initial_cobasis.iter().map(|i| i + 1).collect(),
                generators_used: vec![],
                vertex_orbits: vec![],
                basis_orbit_count: 0,
                ray_orbits: vec![],
                is_finished: true,
                elapsed: start.elapsed(),
            });
        }

        self.register_current_vertex(&initial_cobasis)?;
        self.push_new_edges(&initial_cobasis)?;

        while let Some(item) = self.work_stack.pop() {
            if self.store.basis_orbit_count() >= self.options.basis_limit {
                break;
            }
            self.backtrack_to(&item.cobasis_before)?;
            self.apply_pivot(item.leaving, item.entering)?;
            let cobasis = self.kernel.basis().clone();
            self.push_new_edges(&cobasis)?;

            self.items_processed += 1;
            if self.options.progress_interval > 0
                && self.items_processed % self.options.progress_interval == 0
            {
                info!(
                    "processed {} work items: {} vertex orbits, {} basis orbits, {} ray orbits",
                    self.items_processed,
                    self.store.vertex_orbit_count(),
                    self.store.basis_orbit_count(),
                    self.store.ray_orbits().len()
                );
            }
        }

        let is_finished = self.work_stack.is_empty();
        let generators_used: Vec<Vec<usize>> = self
            .oracle
            .as_ref()
            .map(|o| {
                o.minimal_generators()
                    .iter()
                    .map(|p| p.as_slice().iter().map(|&i| i + 1).collect())
                    .collect()
            })
            .unwrap_or_default();

        let vertex_orbits: Vec<OrbitRecord> = self
            .store
            .vertex_orbits()
            .map(|v| {
                let rep = v.cobases.borrow().iter().next().cloned().unwrap_or_default();
                OrbitRecord::from_vertex(&v.coords, &v.incidence, &rep, v.cobasis_count())
            })
            .collect();

        let ray_orbits: Vec<OrbitRecord> = self
            .store
            .ray_orbits()
            .iter()
            .map(|v| {
                let rep = v.cobases.borrow().iter().next().cloned().unwrap_or_default();
                OrbitRecord::from_vertex(&v.coords, &v.incidence, &rep, v.cobasis_count())
            })
            .collect();

        Ok(Report {
            dimension,
            initial_cobasis: initial_cobasis.iter().map(|i| i + 1).collect(),
            generators_used,
            vertex_orbits,
            basis_orbit_count: self.store.basis_orbit_count(),
            ray_orbits,
            is_finished,
            elapsed: start.elapsed(),
        })
    }

    /// Undoes path-stack pivots (each the exact inverse of a previously
    /// applied one) until the kernel's current cobasis equals `target`. This
    /// always converges: every entry on the path stack was pushed by a
    /// strictly earlier `apply_pivot` along the same DFS branch.
    fn backtrack_to(&mut self, target: &IndexSet) -> Result<(), BasilError> {
        while self.kernel.basis() != target {
            let (leaving, entering) = self
                .path_stack
                .pop()
                .expect("path stack exhausted before reaching target cobasis");
            self.kernel.pivot(leaving, entering)?;
        }
        Ok(())
    }

    fn apply_pivot(&mut self, leaving: usize, entering: usize) -> Result<(), BasilError> {
        self.kernel.pivot(leaving, entering)?;
        self.path_stack.push((entering, leaving));
        Ok(())
    }

    fn register_current_vertex(&mut self, cobasis: &IndexSet) -> Result<(), BasilError> {
        let coords = self.kernel.coordinates()?;
        let incidence = self.kernel.incidence_set()?;
        let fingerprint = self.fingerprint(&incidence);
        let vd = Rc::new(VertexData::new(
            coords,
            incidence,
            cobasis.clone(),
            self.kernel.determinant(),
            fingerprint,
        ));
        self.store.add_vertex(vd);
        Ok(())
    }

    fn fingerprint(&self, incidence: &IndexSet) -> GramMatrix {
        match &self.gram {
            Some(g) => g.restrict(incidence).sort_canonical(),
            None => GramMatrix::construct(&RationalMatrix::identity(0)),
        }
    }

    /// Enumerates outgoing edges from `cobasis` (the tight row set just
    /// reached), in the order required for reproducibility: leaving indices
    /// in ascending index-set order, and (since `LpKernel::ratio_test`
    /// already performs a deterministic lexicographic tie-break) a single
    /// entering index per leaving index.
    fn push_new_edges(&mut self, cobasis: &IndexSet) -> Result<(), BasilError> {
        for leaving in cobasis.iter() {
            if self.options.lex_only && leaving != cobasis.iter().next().unwrap_or(leaving) {
                // Lex-only restricts to the lexicographically-first leaving
                // index; documented as unsafe (§9) since it forfeits the
                // orbit-coverage invariant.
                continue;
            }

            match self.kernel.ratio_test(leaving)? {
                EdgeResult::Unbounded { direction } => {
                    self.handle_ray(&direction)?;
                }
                EdgeResult::Pivot { entering } => {
                    self.try_push_edge(cobasis, leaving, entering)?;
                }
            }
        }
        Ok(())
    }

    fn try_push_edge(
        &mut self,
        cobasis: &IndexSet,
        leaving: usize,
        entering: usize,
    ) -> Result<(), BasilError> {
        self.kernel.pivot(leaving, entering)?;
        let new_cobasis = self.kernel.basis().clone();
        let coords = self.kernel.coordinates()?;
        let incidence = self.kernel.incidence_set()?;
        let det = self.kernel.determinant();
        // Pivot straight back: this method never leaves the kernel state
        // advanced past this single forward/backward probe.
        self.kernel.pivot(entering, leaving)?;

        if self.store.cache_insert(new_cobasis.clone()) {
            debug!("prune(cache hit): cobasis {new_cobasis}");
            return Ok(());
        }

        if !self.domain.is_inside(&coords) {
            debug!("prune(outside fundamental domain): cobasis {new_cobasis}");
            return Ok(());
        }

        let fingerprint = self.fingerprint(&incidence);

        if let Some(existing) = self.store.lookup_vertex(&coords) {
            self.classify_same_coords(cobasis, leaving, entering, new_cobasis, existing);
            return Ok(());
        }

        // Different coordinates: check whether this is a symmetric image of
        // an already-known vertex via the invariant-then-image pipeline.
        if let Some(oracle) = &self.oracle {
            let candidates: Vec<Rc<VertexData>> = self
                .store
                .candidate_vertices_by(&fingerprint)
                .iter()
                .filter(|c| c.incidence.len() == incidence.len())
                .cloned()
                .collect();

            for candidate in candidates {
                if let Some(g) = oracle.find_image(&incidence, &candidate.incidence) {
                    self.classify_symmetric_image(
                        cobasis,
                        leaving,
                        entering,
                        new_cobasis,
                        candidate,
                        &g,
                        &coords,
                    );
                    return Ok(());
                }
            }
        }

        // Genuinely new vertex.
        let vd = Rc::new(VertexData::new(coords, incidence, new_cobasis.clone(), det, fingerprint));
        self.store.add_vertex(vd);
        self.work_stack.push(WorkItem {
            cobasis_before: cobasis.clone(),
            leaving,
            entering,
        });
        Ok(())
    }

    /// Same coordinates as an already-registered vertex: register `new_cobasis`
    /// as an additional basis only if it is not already in the same
    /// orbit (under the stabilizer of the vertex's incidence set) as one of
    /// the existing attached bases.
    fn classify_same_coords(
        &mut self,
        cobasis: &IndexSet,
        leaving: usize,
        entering: usize,
        new_cobasis: IndexSet,
        existing: Rc<VertexData>,
    ) {
        let is_new_basis_orbit = match &self.oracle {
            None => !existing.cobases.borrow().contains(&new_cobasis),
            Some(oracle) => {
                let candidates = self
                    .store
                    .candidate_bases_by(&existing.gram_fingerprint, &existing);
                let opts = self.options.stab_search;
                !candidates.iter().any(|c| {
                    if opts {
                        oracle
                            .find_image_in_stabilizer(&existing.incidence, &new_cobasis, c)
                            .is_some()
                    } else {
                        oracle.find_image(&new_cobasis, c).is_some()
                    }
                })
            }
        };

        if is_new_basis_orbit {
            self.store.add_basis(new_cobasis, existing);
            self.work_stack.push(WorkItem {
                cobasis_before: cobasis.clone(),
                leaving,
                entering,
            });
        } else {
            debug!("prune(basis already in orbit): cobasis {{{leaving},{entering}}}");
        }
    }

    /// Different coordinates but equivalent under `g` to `existing`'s
    /// incidence set: either prune entirely (dual-facet trick), grow the
    /// fundamental domain, or fold the new cobasis into `existing`'s orbit,
    /// mapped through `g`.
    fn classify_symmetric_image(
        &mut self,
        cobasis: &IndexSet,
        leaving: usize,
        entering: usize,
        new_cobasis: IndexSet,
        existing: Rc<VertexData>,
        g: &Permutation,
        image_coords: &Coordinates,
    ) {
        if self.options.dual_facet_trick {
            debug!("prune(dual facet trick): cobasis {new_cobasis}");
            return;
        }

        if self.domain.size() < self.options.fund_domain_limit {
            self.domain.add_constraint(&existing.coords, image_coords);
        }

        let mapped_cobasis = new_cobasis.apply(|i| g.apply(i));
        self.classify_same_coords(cobasis, leaving, entering, mapped_cobasis, existing);
    }

    fn handle_ray(&mut self, direction: &[num_rational::BigRational]) -> Result<(), BasilError> {
        let incidence = IndexSet::new((0..self.a.nrows()).filter(|&i| {
            RationalMatrix::dot(self.a.row(i), direction).is_zero()
        }));
        let coords = Coordinates(direction.to_vec());
        let fingerprint = self.fingerprint(&incidence);

        if let Some(oracle) = &self.oracle {
            for candidate in self.store.ray_orbits() {
                if candidate.incidence.len() != incidence.len() {
                    continue;
                }
                if oracle.find_image(&incidence, &candidate.incidence).is_some() {
                    debug!("prune(ray already in orbit): incidence {incidence}");
                    return Ok(());
                }
            }
        } else if self
            .store
            .ray_orbits()
            .iter()
            .any(|c| c.incidence == incidence)
        {
            return Ok(());
        }

        let cobasis = self.kernel.basis().clone();
        let vd = Rc::new(VertexData::new(
            coords,
            incidence,
            cobasis,
            num_bigint::BigInt::from(0),
            fingerprint,
        ));
        self.store.add_ray(vd);
        Ok(())
    }
}
