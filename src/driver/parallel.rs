//! The parallel reverse-search driver: a pool of worker threads, each
//! owning a private `LpKernel`, pulling from a shared work queue and
//! publishing newly discovered orbit representatives through the
//! double-checked local-mirror protocol (§5).
//!
//! Unlike the single-threaded variant's incremental LIFO backtracking
//! (replaying the exact inverse of each path-stack pivot), each worker here
//! reconstructs a work item's starting cobasis directly via
//! `LpKernel::with_basis` — a fresh submatrix inversion rather than a
//! replayed pivot sequence. This trades per-step efficiency for trivial
//! thread-safety: no shared pivot history needs to be replayed, and a
//! worker picking up a work item another thread produced needs nothing
//! beyond that item's `cobasis_before`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
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
use crate::metric::{orthogonal_augment, q_matrix};
use crate::orbit_store::{ConcurrentOrbitStore, ConcurrentVertexData, GlobalList, PublishOutcome};
use crate::parse::Problem;

#[derive(Clone)]
struct WorkItem {
    cobasis_before: IndexSet,
    leaving: usize,
    entering: usize,
}

/// State every worker thread shares via plain `Arc`. Everything but `domain`
/// is fixed after construction; `domain` grows under its own lock as workers
/// discover symmetric images.
struct Shared {
    a: RationalMatrix,
    linearity: IndexSet,
    gram: Option<GramMatrix>,
    oracle: Option<SymmetryOracle>,
    /// Guarded so concurrent `classify_symmetric_image` calls can grow the
    /// domain safely; `is_inside` takes the same lock for a read, which is
    /// cheap since the domain only ever holds a few hundred constraints.
    domain: Mutex<FundamentalDomain>,
    options: DfsOptions,
}

pub struct ParallelDriver {
    shared: Arc<Shared>,
    store: Arc<ConcurrentOrbitStore>,
}

/// One attempt of the double-checked local-mirror publish protocol (§5),
/// generic over the orbit kind (vertex, basis, ray) via the `same` equality
/// predicate. Returns `true` iff `candidate` is new and this call is the one
/// that published it.
fn dedupe_and_publish<T: Clone>(
    list: &GlobalList<T>,
    local_mirror: &mut Vec<T>,
    cursor: &mut usize,
    candidate: T,
    same: impl Fn(&T, &T) -> bool,
) -> bool {
    if local_mirror.iter().any(|x| same(x, &candidate)) {
        return false;
    }
    loop {
        match list.try_publish(*cursor, candidate.clone()) {
            PublishOutcome::Published => {
                local_mirror.push(candidate);
                *cursor += 1;
                return true;
            }
            PublishOutcome::Refresh(tail) => {
                *cursor += tail.len();
                let is_dup = tail.iter().any(|t| same(t, &candidate));
                local_mirror.extend(tail);
                if is_dup {
                    return false;
                }
            }
        }
    }
}

impl ParallelDriver {
    pub fn new(problem: &Problem, options: DfsOptions) -> Result<Self, BasilError> {
        let a = problem.matrix.clone();

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

        let augmented = orthogonal_augment(&a, options.mode.signed_augment());
        let domain_q_inv = q_matrix(&augmented).try_inverse()?;
        let linearity = problem.linearity.clone();

        Ok(Self {
            shared: Arc::new(Shared {
                a,
                linearity,
                gram,
                oracle,
                domain: Mutex::new(FundamentalDomain::new(domain_q_inv)),
                options: options.clone(),
            }),
            store: Arc::new(ConcurrentOrbitStore::new(options.cache_size)),
        })
    }

    pub fn run(self) -> Result<Report, BasilError> {
        let start = Instant::now();
        let dimension = self.shared.a.ncols().saturating_sub(1);

        if self.shared.options.basis_limit == 0 {
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

        let kernel = LpKernel::new(self.shared.a.clone(), &self.shared.linearity)?;
        let initial_cobasis = kernel.basis().clone();

        if self.shared.options.preprocess_only {
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

        let (sender, receiver): (Sender<WorkItem>, Receiver<WorkItem>) = unbounded();
        let outstanding = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        // Register and expand the root vertex on this (the calling) thread
        // before spawning workers, mirroring the single-threaded driver's
        // "first basis" step.
        {
            let mut worker = Worker::new(
                Arc::clone(&self.shared),
                Arc::clone(&self.store),
                sender.clone(),
                Arc::clone(&outstanding),
            );
            worker.register_initial_vertex(&kernel, &initial_cobasis)?;
            worker.push_new_edges(&kernel, &initial_cobasis)?;
        }

        let num_threads = self.shared.options.num_threads.max(1);
        std::thread::scope(|scope| {
            for _ in 0..num_threads {
                let shared = Arc::clone(&self.shared);
                let store = Arc::clone(&self.store);
                let sender = sender.clone();
                let receiver = receiver.clone();
                let outstanding = Arc::clone(&outstanding);
                let cancelled = Arc::clone(&cancelled);
                scope.spawn(move || {
                    run_worker(shared, store, sender, receiver, outstanding, cancelled);
                });
            }
        });

        let is_finished = !cancelled.load(Ordering::SeqCst);

        let generators_used: Vec<Vec<usize>> = self
            .shared
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
            .vertex_list
            .snapshot()
            .iter()
            .map(|v| {
                let rep = v.cobases.snapshot().into_iter().next().unwrap_or_default();
                OrbitRecord::from_vertex(&v.coords, &v.incidence, &rep, v.cobasis_count())
            })
            .collect();

        let ray_orbits: Vec<OrbitRecord> = self
            .store
            .ray_list
            .snapshot()
            .iter()
            .map(|v| {
                let rep = v.cobases.snapshot().into_iter().next().unwrap_or_default();
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
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    shared: Arc<Shared>,
    store: Arc<ConcurrentOrbitStore>,
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    outstanding: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
) {
    let mut worker = Worker::new(shared, store, sender, outstanding);
    loop {
        if cancelled.load(Ordering::SeqCst) {
            return;
        }
        match receiver.recv_timeout(Duration::from_millis(5)) {
            Ok(item) => {
                if worker.store.basis_orbit_count() >= worker.shared.options.basis_limit {
                    cancelled.store(true, Ordering::SeqCst);
                    worker.outstanding.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
                if let Err(e) = worker.process(item) {
                    debug!("worker aborting on error: {e}");
                    cancelled.store(true, Ordering::SeqCst);
                    return;
                }
                worker.outstanding.fetch_sub(1, Ordering::SeqCst);
            }
            Err(RecvTimeoutError::Timeout) => {
                if worker.outstanding.load(Ordering::SeqCst) == 0 {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Per-thread state: its own `LpKernel`-constructing closures (no resident
/// kernel — each work item gets a fresh one via `with_basis`), its local
/// mirrors of the global vertex/ray lists (with cursors), and its local
/// mirrors of each known vertex's cobasis list.
struct Worker {
    shared: Arc<Shared>,
    store: Arc<ConcurrentOrbitStore>,
    sender: Sender<WorkItem>,
    outstanding: Arc<AtomicUsize>,
    local_vertices: Vec<Arc<ConcurrentVertexData>>,
    vertex_cursor: usize,
    local_rays: Vec<Arc<ConcurrentVertexData>>,
    ray_cursor: usize,
    items_processed: usize,
}

impl Worker {
    fn new(
        shared: Arc<Shared>,
        store: Arc<ConcurrentOrbitStore>,
        sender: Sender<WorkItem>,
        outstanding: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            shared,
            store,
            sender,
            outstanding,
            local_vertices: Vec::new(),
            vertex_cursor: 0,
            local_rays: Vec::new(),
            ray_cursor: 0,
            items_processed: 0,
        }
    }

    fn push_work(&self, item: WorkItem) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(item);
    }

    fn fingerprint(&self, incidence: &IndexSet) -> GramMatrix {
        match &self.shared.gram {
            Some(g) => g.restrict(incidence).sort_canonical(),
            None => GramMatrix::construct(&RationalMatrix::identity(0)),
        }
    }

    fn register_initial_vertex(
        &mut self,
        kernel: &LpKernel,
        cobasis: &IndexSet,
    ) -> Result<(), BasilError> {
        let coords = kernel.coordinates()?;
        let incidence = kernel.incidence_set()?;
        let fingerprint = self.fingerprint(&incidence);
        let vd = Arc::new(ConcurrentVertexData::new(
            coords,
            incidence,
            cobasis.clone(),
            kernel.determinant(),
            fingerprint,
        ));
        if dedupe_and_publish(
            &self.store.vertex_list,
            &mut self.local_vertices,
            &mut self.vertex_cursor,
            Arc::clone(&vd),
            |a, b| a.coords == b.coords,
        ) {
            self.store.finalize_vertex(vd);
        }
        Ok(())
    }

    fn process(&mut self, item: WorkItem) -> Result<(), BasilError> {
        let mut kernel = LpKernel::with_basis(self.shared.a.clone(), item.cobasis_before)?;
        kernel.pivot(item.leaving, item.entering)?;
        let cobasis = kernel.basis().clone();
        self.push_new_edges(&kernel, &cobasis)?;
        self.items_processed += 1;
        if self.shared.options.progress_interval > 0
            && self.items_processed % self.shared.options.progress_interval == 0
        {
            info!(
                "[worker] processed {} items: {} vertex orbits, {} ray orbits",
                self.items_processed,
                self.store.vertex_orbit_count(),
                self.store.ray_list.len()
            );
        }
        Ok(())
    }

    fn push_new_edges(&mut self, kernel: &LpKernel, cobasis: &IndexSet) -> Result<(), BasilError> {
        for leaving in cobasis.iter() {
            if self.shared.options.lex_only && leaving != cobasis.iter().next().unwrap_or(leaving) {
                continue;
            }
            match kernel.ratio_test(leaving)? {
                EdgeResult::Unbounded { direction } => self.handle_ray(kernel, &direction)?,
                EdgeResult::Pivot { entering } => {
                    self.try_push_edge(kernel, cobasis, leaving, entering)?
                }
            }
        }
        Ok(())
    }

    fn try_push_edge(
        &mut self,
        kernel: &LpKernel,
        cobasis: &IndexSet,
        leaving: usize,
        entering: usize,
    ) -> Result<(), BasilError> {
        let mut probe = kernel.clone();
        probe.pivot(leaving, entering)?;
        let new_cobasis = probe.basis().clone();
        let coords = probe.coordinates()?;
        let incidence = probe.incidence_set()?;
        let det = probe.determinant();

        if self.store.cache_insert(new_cobasis.clone()) {
            debug!("prune(cache hit): cobasis {new_cobasis}");
            return Ok(());
        }

        if !self.shared.domain.lock().unwrap().is_inside(&coords) {
            debug!("prune(outside fundamental domain): cobasis {new_cobasis}");
            return Ok(());
        }

        let fingerprint = self.fingerprint(&incidence);

        if let Some(existing) = self.store.lookup_vertex(&coords) {
            self.classify_same_coords(cobasis, leaving, entering, new_cobasis, existing);
            return Ok(());
        }

        if let Some(oracle) = &self.shared.oracle {
            let candidates = self.store.candidate_vertices_by(&fingerprint);
            for candidate in candidates.into_iter().filter(|c| c.incidence.len() == incidence.len()) {
                if let Some(g) = oracle.find_image(&incidence, &candidate.incidence) {
                    self.classify_symmetric_image(
                        cobasis, leaving, entering, new_cobasis, candidate, &g, &coords,
                    );
                    return Ok(());
                }
            }
        }

        let vd = Arc::new(ConcurrentVertexData::new(coords, incidence, new_cobasis, det, fingerprint));
        if dedupe_and_publish(
            &self.store.vertex_list,
            &mut self.local_vertices,
            &mut self.vertex_cursor,
            Arc::clone(&vd),
            |a, b| a.coords == b.coords,
        ) {
            self.store.finalize_vertex(vd);
            self.push_work(WorkItem {
                cobasis_before: cobasis.clone(),
                leaving,
                entering,
            });
        }
        Ok(())
    }

    fn classify_same_coords(
        &mut self,
        cobasis: &IndexSet,
        leaving: usize,
        entering: usize,
        new_cobasis: IndexSet,
        existing: Arc<ConcurrentVertexData>,
    ) {
        let mut local_mirror = existing.cobases.snapshot();
        let mut cursor = local_mirror.len();
        let same = |a: &IndexSet, b: &IndexSet| match &self.shared.oracle {
            None => a == b,
            Some(oracle) => {
                if self.shared.options.stab_search {
                    oracle.find_image_in_stabilizer(&existing.incidence, a, b).is_some()
                } else {
                    oracle.find_image(a, b).is_some()
                }
            }
        };
        let is_new = dedupe_and_publish(
            &existing.cobases,
            &mut local_mirror,
            &mut cursor,
            new_cobasis,
            same,
        );
        if is_new {
            self.push_work(WorkItem { cobasis_before: cobasis.clone(), leaving, entering });
        } else {
            debug!("prune(basis already in orbit)");
        }
    }

    fn classify_symmetric_image(
        &mut self,
        cobasis: &IndexSet,
        leaving: usize,
        entering: usize,
        new_cobasis: IndexSet,
        existing: Arc<ConcurrentVertexData>,
        g: &Permutation,
        image_coords: &Coordinates,
    ) {
        if self.shared.options.dual_facet_trick {
            debug!("prune(dual facet trick)");
            return;
        }

        {
            let mut domain = self.shared.domain.lock().unwrap();
            if domain.size() < self.shared.options.fund_domain_limit {
                domain.add_constraint(&existing.coords, image_coords);
            }
        }

        let mapped = new_cobasis.apply(|i| g.apply(i));
        self.classify_same_coords(cobasis, leaving, entering, mapped, existing);
    }

    fn handle_ray(&mut self, kernel: &LpKernel, direction: &[num_rational::BigRational]) -> Result<(), BasilError> {
        let incidence = IndexSet::new(
            (0..self.shared.a.nrows()).filter(|&i| RationalMatrix::dot(self.shared.a.row(i), direction).is_zero()),
        );
        let coords = Coordinates(direction.to_vec());
        let fingerprint = self.fingerprint(&incidence);

        if let Some(oracle) = &self.shared.oracle {
            let dup = self
                .store
                .ray_list
                .snapshot()
                .iter()
                .filter(|c| c.incidence.len() == incidence.len())
                .any(|c| oracle.find_image(&incidence, &c.incidence).is_some());
            if dup {
                return Ok(());
            }
        }

        let vd = Arc::new(ConcurrentVertexData::new(
            coords,
            incidence,
            kernel.basis().clone(),
            num_bigint::BigInt::from(0),
            fingerprint,
        ));
        dedupe_and_publish(
            &self.store.ray_list,
            &mut self.local_rays,
            &mut self.ray_cursor,
            vd,
            |a, b| a.incidence == b.incidence,
        );
        Ok(())
    }
}
