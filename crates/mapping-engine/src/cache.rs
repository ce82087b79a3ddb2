//! LRU cache of built mappings.
//!
//! Mappings depend only on the method, the grid geometry and the aligned
//! mesh coordinates, so they are keyed by a fingerprint of exactly those.
//! Entries are never invalidated implicitly; a different mesh placement
//! simply yields a different key.

use lru::LruCache;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::mapping::Mapping;
use exchange_common::{GridGeometry, MappingMethod};
use mesh_codec::Mesh;

/// Content fingerprint of a mapping's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingKey(u64);

impl MappingKey {
    /// Fingerprint `method`, `geometry` and the XY of every vertex of an
    /// aligned mesh, in global triangle order.
    pub fn new(method: MappingMethod, geometry: &GridGeometry, mesh: &Mesh) -> Self {
        let mut hasher = DefaultHasher::new();
        method.hash(&mut hasher);
        geometry.ncols.hash(&mut hasher);
        geometry.nrows.hash(&mut hasher);
        geometry.xllcorner.to_bits().hash(&mut hasher);
        geometry.yllcorner.to_bits().hash(&mut hasher);
        geometry.cellsize.to_bits().hash(&mut hasher);

        mesh.triangle_count().hash(&mut hasher);
        for triangle in mesh.triangles() {
            for v in &triangle.vertices {
                v.x.to_bits().hash(&mut hasher);
                v.y.to_bits().hash(&mut hasher);
            }
        }
        Self(hasher.finish())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
    pub capacity: usize,
}

/// Bounded LRU of shared mappings. Capacity 0 disables caching.
pub struct MappingCache {
    cache: Option<LruCache<MappingKey, Arc<Mapping>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MappingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a mapping, counting a hit or a miss.
    pub fn get(&mut self, key: &MappingKey) -> Option<Arc<Mapping>> {
        match self.cache.as_mut().and_then(|c| c.get(key)) {
            Some(mapping) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(mapping))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a mapping, evicting the least recently used one when full.
    pub fn insert(&mut self, key: MappingKey, mapping: Arc<Mapping>) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        if let Some((old_key, _)) = cache.push(key, mapping) {
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Cached mapping for `key`, or the result of `build` (then cached).
    pub fn get_or_build<F>(&mut self, key: MappingKey, build: F) -> Arc<Mapping>
    where
        F: FnOnce() -> Mapping,
    {
        if let Some(mapping) = self.get(&key) {
            tracing::debug!(key = key.value(), "Mapping cache hit");
            return mapping;
        }

        let mapping = Arc::new(build());
        self.insert(key, Arc::clone(&mapping));
        mapping
    }

    pub fn contains(&self, key: &MappingKey) -> bool {
        self.cache.as_ref().is_some_and(|c| c.contains(key))
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
            capacity: self.cache.as_ref().map_or(0, |c| c.cap().get()),
        }
    }
}

impl Default for MappingCache {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::build_surface;
    use nalgebra::{Point3, Vector2};

    fn mesh() -> Mesh {
        Mesh::from_facets(vec![vec![[
            Point3::new(0.1, 0.1, 0.0),
            Point3::new(0.9, 0.1, 0.0),
            Point3::new(0.1, 0.9, 0.0),
        ]]])
    }

    fn geometry() -> GridGeometry {
        GridGeometry::new(2, 2, 0.0, 0.0, 1.0).unwrap()
    }

    #[test]
    fn test_key_depends_on_inputs() {
        let m = mesh();
        let g = geometry();
        let key = MappingKey::new(MappingMethod::Surface, &g, &m);

        assert_eq!(key, MappingKey::new(MappingMethod::Surface, &g, &m.clone()));
        assert_ne!(key, MappingKey::new(MappingMethod::Barycenter, &g, &m));
        assert_ne!(
            key,
            MappingKey::new(MappingMethod::Surface, &g, &m.translated(Vector2::new(1e-9, 0.0)))
        );
        let other = GridGeometry::new(2, 2, 0.0, 0.0, 2.0).unwrap();
        assert_ne!(key, MappingKey::new(MappingMethod::Surface, &other, &m));
    }

    #[test]
    fn test_get_or_build_reuses_mapping() {
        let m = mesh();
        let g = geometry();
        let key = MappingKey::new(MappingMethod::Surface, &g, &m);
        let mut cache = MappingCache::new(2);

        let mut builds = 0;
        let first = cache.get_or_build(key, || {
            builds += 1;
            build_surface(&m, &g, false)
        });
        let second = cache.get_or_build(key, || {
            builds += 1;
            build_surface(&m, &g, false)
        });

        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_lru_eviction() {
        let g = geometry();
        let mut cache = MappingCache::new(2);
        let keys: Vec<MappingKey> = (0..3)
            .map(|i| {
                let m = mesh().translated(Vector2::new(0.0, i as f64 * 0.01));
                let key = MappingKey::new(MappingMethod::Surface, &g, &m);
                cache.insert(key, Arc::new(build_surface(&m, &g, false)));
                key
            })
            .collect();

        assert!(!cache.contains(&keys[0]));
        assert!(cache.contains(&keys[1]));
        assert!(cache.contains(&keys[2]));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let m = mesh();
        let g = geometry();
        let key = MappingKey::new(MappingMethod::Surface, &g, &m);
        let mut cache = MappingCache::new(0);

        cache.get_or_build(key, || build_surface(&m, &g, false));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().capacity, 0);
    }

    #[test]
    fn test_clear() {
        let m = mesh();
        let g = geometry();
        let key = MappingKey::new(MappingMethod::Surface, &g, &m);
        let mut cache = MappingCache::default();
        cache.get_or_build(key, || build_surface(&m, &g, false));
        cache.clear();
        assert!(cache.is_empty());
    }
}
