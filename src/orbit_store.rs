//! Registration and lookup of orbit representatives discovered during
//! reverse search: coordinates, bases, and the Gram-fingerprint indices used
//! to prune before ever calling into the symmetry oracle.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use num_bigint::BigInt;

use crate::gram::GramMatrix;
use crate::index_set::IndexSet;
use crate::matrix::Coordinates;

/// Everything known about one discovered vertex (or ray) orbit
/// representative. `cobases` is append-only: new bases realising the same
/// vertex are added but never removed.
#[derive(Debug)]
pub struct VertexData {
    pub coords: Coordinates,
    pub incidence: IndexSet,
    pub cobases: RefCell<BTreeSet<IndexSet>>,
    pub det: BigInt,
    pub gram_fingerprint: GramMatrix,
}

impl VertexData {
    pub fn new(
        coords: Coordinates,
        incidence: IndexSet,
        cobasis: IndexSet,
        det: BigInt,
        gram_fingerprint: GramMatrix,
    ) -> Self {
        let cobases = RefCell::new(BTreeSet::new());
        cobases.borrow_mut().insert(cobasis);
        Self {
            coords,
            incidence,
            cobases,
            det,
            gram_fingerprint,
        }
    }

    pub fn add_cobasis(&self, cobasis: IndexSet) {
        self.cobases.borrow_mut().insert(cobasis);
    }

    pub fn cobasis_count(&self) -> usize {
        self.cobases.borrow().len()
    }
}

/// A bounded least-recently-used set. Lookups and inserts touch the entry's
/// recency; once `capacity` entries are present, the next insert of a new
/// entry evicts the least-recently touched one.
#[derive(Debug)]
pub struct LruSet<T: Clone + Eq + Hash> {
    capacity: usize,
    tick: u64,
    last_use: HashMap<T, u64>,
    order: BTreeMap<u64, T>,
}

impl<T: Clone + Eq + Hash> LruSet<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            last_use: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.last_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_use.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `obj`, making it the most-recently-used entry regardless of
    /// whether it was already present. Returns whether it was present
    /// before this call.
    pub fn insert(&mut self, obj: T) -> bool {
        let was_present = match self.last_use.remove(&obj) {
            Some(old_tick) => {
                self.order.remove(&old_tick);
                true
            }
            None => false,
        };

        if !was_present && self.last_use.len() >= self.capacity {
            let oldest = self.order.iter().next().map(|(&t, obj)| (t, obj.clone()));
            if let Some((tick, obj)) = oldest {
                self.order.remove(&tick);
                self.last_use.remove(&obj);
            }
        }

        self.tick += 1;
        self.order.insert(self.tick, obj.clone());
        self.last_use.insert(obj, self.tick);
        was_present
    }

    /// Looks up `obj`; touches it (making it most-recently-used) on a hit.
    pub fn lookup(&mut self, obj: &T) -> bool {
        match self.last_use.remove(obj) {
            None => false,
            Some(old_tick) => {
                self.order.remove(&old_tick);
                self.tick += 1;
                self.order.insert(self.tick, obj.clone());
                self.last_use.insert(obj.clone(), self.tick);
                true
            }
        }
    }

    pub fn remove(&mut self, obj: &T) -> bool {
        match self.last_use.remove(obj) {
            None => false,
            Some(tick) => {
                self.order.remove(&tick);
                true
            }
        }
    }
}

/// Registration tables for discovered orbit representatives, plus the
/// cobasis cache used as the search's first line of pruning.
pub struct OrbitStore {
    by_coords: HashMap<Coordinates, Rc<VertexData>>,
    by_basis: HashMap<IndexSet, Rc<VertexData>>,
    by_gram_basis: HashMap<GramMatrix, Vec<(IndexSet, Rc<VertexData>)>>,
    by_gram_vertex: HashMap<GramMatrix, Vec<Rc<VertexData>>>,
    cache: LruSet<IndexSet>,
    ray_orbits: Vec<Rc<VertexData>>,
}

impl OrbitStore {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            by_coords: HashMap::new(),
            by_basis: HashMap::new(),
            by_gram_basis: HashMap::new(),
            by_gram_vertex: HashMap::new(),
            cache: LruSet::new(cache_capacity),
            ray_orbits: Vec::new(),
        }
    }

    /// Inserts a freshly discovered vertex if no stored vertex shares its
    /// coordinates, registering every basis in `v.cobases` along the way.
    /// Returns the stored (possibly pre-existing) `VertexData`.
    pub fn add_vertex(&mut self, v: Rc<VertexData>) -> Rc<VertexData> {
        if let Some(existing) = self.by_coords.get(&v.coords) {
            return Rc::clone(existing);
        }
        let cobases: Vec<IndexSet> = v.cobases.borrow().iter().cloned().collect();
        self.by_coords.insert(v.coords.clone(), Rc::clone(&v));
        for b in cobases {
            self.register_basis(b, Rc::clone(&v));
        }
        self.by_gram_vertex
            .entry(v.gram_fingerprint.clone())
            .or_default()
            .push(Rc::clone(&v));
        v
    }

    /// Attaches `b` as an additional basis realising `v`.
    pub fn add_basis(&mut self, b: IndexSet, v: Rc<VertexData>) {
        v.add_cobasis(b.clone());
        self.register_basis(b, v);
    }

    fn register_basis(&mut self, b: IndexSet, v: Rc<VertexData>) {
        self.by_basis.insert(b.clone(), Rc::clone(&v));
        self.by_gram_basis
            .entry(v.gram_fingerprint.clone())
            .or_default()
            .push((b, v));
    }

    pub fn lookup_vertex(&self, coords: &Coordinates) -> Option<Rc<VertexData>> {
        self.by_coords.get(coords).cloned()
    }

    pub fn lookup_basis(&self, basis: &IndexSet) -> Option<Rc<VertexData>> {
        self.by_basis.get(basis).cloned()
    }

    /// Vertex candidates sharing `fingerprint`.
    pub fn candidate_vertices_by(&self, fingerprint: &GramMatrix) -> &[Rc<VertexData>] {
        self.by_gram_vertex.get(fingerprint).map_or(&[], |v| v.as_slice())
    }

    /// Basis candidates sharing `fingerprint`, restricted to those whose
    /// owning vertex has the same incidence count as `vd`.
    pub fn candidate_bases_by(&self, fingerprint: &GramMatrix, vd: &VertexData) -> Vec<IndexSet> {
        self.by_gram_basis
            .get(fingerprint)
            .into_iter()
            .flatten()
            .filter(|(_, owner)| owner.incidence.len() == vd.incidence.len())
            .map(|(b, _)| b.clone())
            .collect()
    }

    /// Inserts `b` into the cobasis cache. Returns whether it was present
    /// before this call.
    pub fn cache_insert(&mut self, b: IndexSet) -> bool {
        self.cache.insert(b)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn add_ray(&mut self, v: Rc<VertexData>) {
        self.ray_orbits.push(v);
    }

    pub fn ray_orbits(&self) -> &[Rc<VertexData>] {
        &self.ray_orbits
    }

    pub fn vertex_orbits(&self) -> impl Iterator<Item = &Rc<VertexData>> {
        self.by_coords.values()
    }

    pub fn vertex_orbit_count(&self) -> usize {
        self.by_coords.len()
    }

    pub fn basis_orbit_count(&self) -> usize {
        self.by_coords.values().map(|v| v.cobasis_count()).sum()
    }
}

/// A `VertexData` for the parallel driver. `cobases` is a `GlobalList`
/// rather than a `RefCell<BTreeSet<_>>` so that registering an additional
/// basis on an existing vertex goes through the same double-checked
/// local-mirror publish protocol as top-level vertex/ray registration
/// (§5), rather than taking a lock across an oracle image search.
#[derive(Debug)]
pub struct ConcurrentVertexData {
    pub coords: Coordinates,
    pub incidence: IndexSet,
    pub cobases: GlobalList<IndexSet>,
    pub det: BigInt,
    pub gram_fingerprint: GramMatrix,
}

impl ConcurrentVertexData {
    pub fn new(
        coords: Coordinates,
        incidence: IndexSet,
        cobasis: IndexSet,
        det: BigInt,
        gram_fingerprint: GramMatrix,
    ) -> Self {
        let cobases = GlobalList::new();
        cobases.try_publish(0, cobasis);
        Self {
            coords,
            incidence,
            cobases,
            det,
            gram_fingerprint,
        }
    }

    pub fn cobasis_count(&self) -> usize {
        self.cobases.len()
    }
}

/// Global, mutex-guarded append-only list used by the parallel driver's
/// double-checked local-mirror publication protocol (§5): a thread first
/// tests its local mirror; on a miss it takes this lock exactly once per
/// attempt, either publishing (if its cursor is current) or harvesting the
/// tail to refresh its mirror and retrying.
pub struct GlobalList<T> {
    items: Mutex<Vec<T>>,
}

impl<T: Clone> GlobalList<T> {
    pub fn new() -> Self {
        Self { items: Mutex::new(Vec::new()) }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    /// One attempt of the publish protocol. `cursor` is the count of global
    /// entries this thread has already folded into `local_mirror`.
    /// Returns `Published` if `candidate` was appended as the new tail entry
    /// (this thread "won" the race), or `Refresh(tail)` if other threads had
    /// already extended the list — the caller must merge `tail` into its
    /// local mirror, re-test `candidate` against it, and retry if still new.
    pub fn try_publish(&self, cursor: usize, candidate: T) -> PublishOutcome<T> {
        let mut guard = self.items.lock().unwrap();
        if cursor == guard.len() {
            guard.push(candidate);
            PublishOutcome::Published
        } else {
            let tail = guard[cursor..].to_vec();
            PublishOutcome::Refresh(tail)
        }
    }
}

impl<T: Clone> Default for GlobalList<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub enum PublishOutcome<T> {
    Published,
    Refresh(Vec<T>),
}

/// Thread-safe counterpart of `OrbitStore`. Each map is guarded by its own
/// `Mutex`; no code path here ever holds two of these locks at once, so the
/// global lock order is "any one region at a time" (§5).
pub struct ConcurrentOrbitStore {
    by_coords: Mutex<HashMap<Coordinates, Arc<ConcurrentVertexData>>>,
    by_basis: Mutex<HashMap<IndexSet, Arc<ConcurrentVertexData>>>,
    by_gram_basis: Mutex<HashMap<GramMatrix, Vec<(IndexSet, Arc<ConcurrentVertexData>)>>>,
    by_gram_vertex: Mutex<HashMap<GramMatrix, Vec<Arc<ConcurrentVertexData>>>>,
    cache: Mutex<LruSet<IndexSet>>,
    pub vertex_list: GlobalList<Arc<ConcurrentVertexData>>,
    pub ray_list: GlobalList<Arc<ConcurrentVertexData>>,
}

impl ConcurrentOrbitStore {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            by_coords: Mutex::new(HashMap::new()),
            by_basis: Mutex::new(HashMap::new()),
            by_gram_basis: Mutex::new(HashMap::new()),
            by_gram_vertex: Mutex::new(HashMap::new()),
            cache: Mutex::new(LruSet::new(cache_capacity)),
            vertex_list: GlobalList::new(),
            ray_list: GlobalList::new(),
        }
    }

    pub fn lookup_vertex(&self, coords: &Coordinates) -> Option<Arc<ConcurrentVertexData>> {
        self.by_coords.lock().unwrap().get(coords).cloned()
    }

    pub fn candidate_vertices_by(&self, fingerprint: &GramMatrix) -> Vec<Arc<ConcurrentVertexData>> {
        self.by_gram_vertex
            .lock()
            .unwrap()
            .get(fingerprint)
            .cloned()
            .unwrap_or_default()
    }

    pub fn candidate_bases_by(
        &self,
        fingerprint: &GramMatrix,
        incidence_len: usize,
    ) -> Vec<IndexSet> {
        self.by_gram_basis
            .lock()
            .unwrap()
            .get(fingerprint)
            .into_iter()
            .flatten()
            .filter(|(_, owner)| owner.incidence.len() == incidence_len)
            .map(|(b, _)| b.clone())
            .collect()
    }

    /// Idempotently registers a freshly-discovered vertex into the canonical
    /// tables (called only after `vertex_list`'s publish protocol confirms
    /// this thread's candidate actually won the race to represent its
    /// orbit).
    pub fn finalize_vertex(&self, v: Arc<ConcurrentVertexData>) {
        let mut by_coords = self.by_coords.lock().unwrap();
        if by_coords.contains_key(&v.coords) {
            return;
        }
        by_coords.insert(v.coords.clone(), Arc::clone(&v));
        drop(by_coords);
        let cobases: Vec<IndexSet> = v.cobases.snapshot();
        for b in cobases {
            self.register_basis(b, Arc::clone(&v));
        }
        self.by_gram_vertex
            .lock()
            .unwrap()
            .entry(v.gram_fingerprint.clone())
            .or_default()
            .push(v);
    }

    pub fn register_basis(&self, b: IndexSet, v: Arc<ConcurrentVertexData>) {
        self.by_basis.lock().unwrap().insert(b.clone(), Arc::clone(&v));
        self.by_gram_basis
            .lock()
            .unwrap()
            .entry(v.gram_fingerprint.clone())
            .or_default()
            .push((b, v));
    }

    /// Returns whether `b` was present before this call.
    pub fn cache_insert(&self, b: IndexSet) -> bool {
        self.cache.lock().unwrap().insert(b)
    }

    pub fn vertex_orbit_count(&self) -> usize {
        self.vertex_list.len()
    }

    pub fn basis_orbit_count(&self) -> usize {
        self.vertex_list
            .snapshot()
            .iter()
            .map(|v| v.cobasis_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gram_stub() -> GramMatrix {
        GramMatrix::construct(&crate::matrix::RationalMatrix::identity(1))
    }

    fn coords(x: i64) -> Coordinates {
        Coordinates(vec![num_rational::BigRational::from_integer(BigInt::from(x))])
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut cache: LruSet<i32> = LruSet::new(2);
        assert!(!cache.insert(1));
        assert!(!cache.insert(2));
        cache.lookup(&1); // touch 1, so 2 becomes the LRU entry
        assert!(!cache.insert(3)); // evicts 2
        assert!(!cache.lookup(&2));
        assert!(cache.lookup(&1));
    }

    #[test]
    fn test_lru_reinsert_reports_present() {
        let mut cache: LruSet<i32> = LruSet::new(4);
        assert!(!cache.insert(1));
        assert!(cache.insert(1));
    }

    #[test]
    fn test_add_vertex_deduplicates_by_coords() {
        let mut store = OrbitStore::new(16);
        let v1 = Rc::new(VertexData::new(
            coords(0),
            IndexSet::new([0, 1]),
            IndexSet::new([0]),
            BigInt::from(1),
            gram_stub(),
        ));
        let v2 = Rc::new(VertexData::new(
            coords(0),
            IndexSet::new([0, 1]),
            IndexSet::new([1]),
            BigInt::from(1),
            gram_stub(),
        ));
        store.add_vertex(v1);
        let stored = store.add_vertex(v2);
        assert_eq!(store.vertex_orbit_count(), 1);
        assert_eq!(stored.cobasis_count(), 1); // v2 was never actually merged in
    }

    #[test]
    fn test_candidate_bases_by_filters_on_incidence_count() {
        let mut store = OrbitStore::new(16);
        let v = Rc::new(VertexData::new(
            coords(0),
            IndexSet::new([0, 1]),
            IndexSet::new([0]),
            BigInt::from(1),
            gram_stub(),
        ));
        store.add_vertex(Rc::clone(&v));
        let candidates = store.candidate_bases_by(&gram_stub(), &v);
        assert_eq!(candidates, vec![IndexSet::new([0])]);
    }

    #[test]
    fn test_global_list_publish_protocol_single_winner() {
        let list: GlobalList<i32> = GlobalList::new();
        match list.try_publish(0, 42) {
            PublishOutcome::Published => {}
            PublishOutcome::Refresh(_) => panic!("first publish should win"),
        }
        assert_eq!(list.len(), 1);
        match list.try_publish(0, 7) {
            PublishOutcome::Refresh(tail) => assert_eq!(tail, vec![42]),
            PublishOutcome::Published => panic!("stale cursor must not publish"),
        }
    }

    #[test]
    fn test_concurrent_store_finalize_vertex_deduplicates() {
        let store = ConcurrentOrbitStore::new(16);
        let v = Arc::new(ConcurrentVertexData::new(
            coords(0),
            IndexSet::new([0, 1]),
            IndexSet::new([0]),
            BigInt::from(1),
            gram_stub(),
        ));
        store.finalize_vertex(Arc::clone(&v));
        store.finalize_vertex(Arc::clone(&v));
        assert!(store.lookup_vertex(&coords(0)).is_some());
    }
}
