//! Uniform spatial grid for bounded collision queries
//!
//! Divides the ground plane into square cells and buckets entities by the
//! cell containing their position. Radius queries visit only the square
//! neighborhood of cells that can hold a match, then run an exact circle test.
//! The grid is cheap to rebuild, so the simulation clears and refills it
//! every tick instead of tracking moves.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::game::constants::spatial::CELL_SIZE;
use crate::game::state::{EntityId, PlayerId};
use crate::util::vec2::Vec2;

/// Initial capacity for grid cells (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 256;

/// Initial capacity for entity vectors within cells
const CELL_INITIAL_CAPACITY: usize = 8;

/// Packed cell key: signed cell x in the high 32 bits, cell z in the low 32
pub type CellKey = i64;

/// Pack two signed cell coordinates into one integer key
#[inline]
pub fn pack_cell_key(cx: i32, cz: i32) -> CellKey {
    ((cx as i64) << 32) | (cz as u32 as i64)
}

/// Inclusive cell span `center ± reach`, clipped to the i32 key space
#[inline]
fn cell_range(center: i32, reach: i64) -> (i32, i32) {
    let lo = (center as i64 - reach).max(i32::MIN as i64);
    let hi = (center as i64 + reach).min(i32::MAX as i64);
    (lo as i32, hi as i32)
}

/// Handle to an entity stored in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialEntityId {
    Player(PlayerId),
    Bullet(EntityId),
    Block(EntityId),
    PowerUp(EntityId),
}

/// Anything with a ground-plane position can be indexed
pub trait Spatial {
    fn spatial_id(&self) -> SpatialEntityId;
    fn position(&self) -> Vec2;
}

/// Entry stored in a grid cell
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry {
    pub id: SpatialEntityId,
    pub position: Vec2,
}

/// Uniform grid spatial index
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// Cell size in world units
    cell_size: f32,
    /// Map from packed cell key to entries in that cell
    cells: HashMap<CellKey, Vec<SpatialEntry>, FxBuildHasher>,
    /// Number of entries currently stored
    len: usize,
}

impl SpatialIndex {
    /// Create an index with the given cell size
    ///
    /// Non-positive or non-finite sizes fall back to the default.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::with_capacity_and_hasher(GRID_INITIAL_CAPACITY, FxBuildHasher),
            len: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of indexed entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop all cell contents
    ///
    /// Cell vectors keep their allocation for the next rebuild.
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.len = 0;
    }

    /// Cell coordinates containing a position
    #[inline]
    fn cell_coords(&self, x: f32, z: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (z / self.cell_size).floor() as i32,
        )
    }

    /// Packed key of the cell containing a position
    #[inline]
    pub fn cell_key(&self, x: f32, z: f32) -> CellKey {
        let (cx, cz) = self.cell_coords(x, z);
        pack_cell_key(cx, cz)
    }

    /// Insert an entity at its current position
    #[inline]
    pub fn insert<E: Spatial + ?Sized>(&mut self, entity: &E) {
        self.insert_at(entity.spatial_id(), entity.position());
    }

    /// Insert an id at an explicit position
    pub fn insert_at(&mut self, id: SpatialEntityId, position: Vec2) {
        let key = self.cell_key(position.x, position.z);
        self.cells
            .entry(key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(SpatialEntry { id, position });
        self.len += 1;
    }

    /// Clear, then insert every entity
    pub fn rebuild<'a, E, I>(&mut self, entities: I)
    where
        E: Spatial + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        self.clear();
        for entity in entities {
            self.insert(entity);
        }
    }

    /// Write every entry within `radius` of `(x, z)` into `buf`
    ///
    /// `buf` is cleared first. Each cell of the neighborhood is visited once,
    /// so no entry is reported twice. Order is unspecified. When the
    /// neighborhood has more cells than the grid has buckets, the occupied
    /// buckets are scanned instead.
    pub fn query_into(&self, x: f32, z: f32, radius: f32, buf: &mut Vec<SpatialEntry>) {
        buf.clear();
        if !(radius >= 0.0) || !x.is_finite() || !z.is_finite() {
            return;
        }

        let radius_sq = radius * radius;
        let mut scan = |cell: &[SpatialEntry]| {
            for entry in cell {
                let dx = entry.position.x - x;
                let dz = entry.position.z - z;
                if dx * dx + dz * dz <= radius_sq {
                    buf.push(*entry);
                }
            }
        };

        // Float-to-int casts saturate, so far positions and huge radii stay
        // representable; the range math is done in i64.
        let reach = (radius / self.cell_size).ceil() as i64;
        let side = reach.saturating_mul(2).saturating_add(1);
        if side.saturating_mul(side) > self.cells.len() as i64 {
            for cell in self.cells.values() {
                scan(cell);
            }
            return;
        }

        let (cx, cz) = self.cell_coords(x, z);
        let (x_lo, x_hi) = cell_range(cx, reach);
        let (z_lo, z_hi) = cell_range(cz, reach);
        for ix in x_lo..=x_hi {
            for iz in z_lo..=z_hi {
                if let Some(cell) = self.cells.get(&pack_cell_key(ix, iz)) {
                    scan(cell);
                }
            }
        }
    }

    /// Ids of every entry within `radius` of `(x, z)`
    pub fn query(&self, x: f32, z: f32, radius: f32) -> Vec<SpatialEntityId> {
        let mut buf = Vec::new();
        self.query_into(x, z, radius, &mut buf);
        buf.into_iter().map(|entry| entry.id).collect()
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialIndexStats {
        let non_empty_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        SpatialIndexStats {
            non_empty_cells,
            total_entities: self.len,
            max_per_cell,
        }
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

/// Statistics about the spatial index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialIndexStats {
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub max_per_cell: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    struct Dot {
        id: u64,
        position: Vec2,
    }

    impl Spatial for Dot {
        fn spatial_id(&self) -> SpatialEntityId {
            SpatialEntityId::Bullet(self.id)
        }
        fn position(&self) -> Vec2 {
            self.position
        }
    }

    fn dot(id: u64, x: f32, z: f32) -> Dot {
        Dot {
            id,
            position: Vec2::new(x, z),
        }
    }

    fn brute_force(dots: &[Dot], x: f32, z: f32, radius: f32) -> HashSet<SpatialEntityId> {
        dots.iter()
            .filter(|d| {
                let dx = d.position.x - x;
                let dz = d.position.z - z;
                dx * dx + dz * dz <= radius * radius
            })
            .map(|d| d.spatial_id())
            .collect()
    }

    #[test]
    fn test_pack_cell_key_distinct_signs() {
        let cells = [(0, 0), (-1, 0), (0, -1), (-1, -1), (-7, 12), (i32::MAX, i32::MIN)];
        let keys: HashSet<_> = cells.iter().map(|&(cx, cz)| pack_cell_key(cx, cz)).collect();
        assert_eq!(keys.len(), cells.len());
    }

    #[test]
    fn test_insert_and_query() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(&dot(1, 150.0, 150.0));

        let results = index.query(150.0, 150.0, 10.0);
        assert_eq!(results, vec![SpatialEntityId::Bullet(1)]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_query_exact_circle_excludes_square_corners() {
        let mut index = SpatialIndex::new(100.0);
        // Inside the 3x3 neighborhood but outside the circle
        index.insert(&dot(1, 90.0, 90.0));
        let results = index.query(0.0, 0.0, 100.0);
        assert!(results.is_empty());
    }

    #[test]
    fn test_query_includes_exact_radius() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(&dot(1, 30.0, 40.0));
        assert_eq!(index.query(0.0, 0.0, 50.0).len(), 1);
        assert!(index.query(0.0, 0.0, 49.9).is_empty());
    }

    #[test]
    fn test_query_spans_multiple_cells() {
        let mut index = SpatialIndex::new(10.0);
        index.insert(&dot(1, 0.0, 0.0));
        index.insert(&dot(2, 45.0, 0.0));
        index.insert(&dot(3, -45.0, 0.0));
        index.insert(&dot(4, 0.0, 60.0));

        let results: HashSet<_> = index.query(0.0, 0.0, 50.0).into_iter().collect();
        assert_eq!(results.len(), 3);
        assert!(!results.contains(&SpatialEntityId::Bullet(4)));
    }

    #[test]
    fn test_no_duplicates_on_cell_boundaries() {
        let mut index = SpatialIndex::new(100.0);
        // Exactly on cell corners and edges
        index.insert(&dot(1, 0.0, 0.0));
        index.insert(&dot(2, 100.0, 0.0));
        index.insert(&dot(3, -100.0, -100.0));
        index.insert(&dot(4, 100.0, 100.0));

        let results = index.query(0.0, 0.0, 200.0);
        let unique: HashSet<_> = results.iter().copied().collect();
        assert_eq!(results.len(), unique.len());
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(&dot(1, 10.0, 10.0));
        index.clear();
        assert!(index.is_empty());
        assert!(index.query(10.0, 10.0, 50.0).is_empty());
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = SpatialIndex::new(100.0);
        let old = vec![dot(1, 0.0, 0.0), dot(2, 10.0, 0.0)];
        index.rebuild(&old);
        assert_eq!(index.len(), 2);

        let new = vec![dot(3, 500.0, 500.0)];
        index.rebuild(&new);
        assert_eq!(index.len(), 1);
        assert!(index.query(0.0, 0.0, 50.0).is_empty());
        assert_eq!(index.query(500.0, 500.0, 1.0), vec![SpatialEntityId::Bullet(3)]);
    }

    #[test]
    fn test_negative_or_invalid_radius_returns_nothing() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(&dot(1, 0.0, 0.0));
        assert!(index.query(0.0, 0.0, -1.0).is_empty());
        assert!(index.query(0.0, 0.0, f32::NAN).is_empty());
        assert_eq!(index.query(0.0, 0.0, 0.0).len(), 1);
    }

    #[test]
    fn test_query_far_coordinates() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(&dot(1, 0.0, 0.0));
        index.insert(&dot(2, 1.0e12, 0.0));
        // Enough occupied cells that the neighborhood walk is used
        for i in 0..12u64 {
            index.insert(&dot(10 + i, 300.0 + i as f32 * 100.0, 0.0));
        }

        assert_eq!(index.query(1.0e12, 0.0, 10.0), vec![SpatialEntityId::Bullet(2)]);
        assert_eq!(index.query(-1.0e12, -1.0e12, 10.0), vec![]);
    }

    #[test]
    fn test_query_huge_radius_scans_occupied_cells() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(&dot(1, 0.0, 0.0));
        index.insert(&dot(2, 950.0, -950.0));
        index.insert(&dot(3, -5_000.0, 20.0));

        let found: HashSet<_> = index.query(0.0, 0.0, f32::MAX).into_iter().collect();
        assert_eq!(found.len(), 3);
        let found: HashSet<_> = index.query(0.0, 0.0, f32::INFINITY).into_iter().collect();
        assert_eq!(found.len(), 3);

        // Large but finite: the exact distance test still applies
        let found = index.query(0.0, 0.0, 2_000.0);
        assert_eq!(found.len(), 2);
        assert!(!found.contains(&SpatialEntityId::Bullet(3)));
    }

    #[test]
    fn test_invalid_cell_size_falls_back_to_default() {
        assert_eq!(SpatialIndex::new(0.0).cell_size(), CELL_SIZE);
        assert_eq!(SpatialIndex::new(-5.0).cell_size(), CELL_SIZE);
        assert_eq!(SpatialIndex::new(f32::NAN).cell_size(), CELL_SIZE);
    }

    #[test]
    fn test_matches_brute_force_random_distributions() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for &cell_size in &[7.0_f32, 25.0, 100.0, 333.0] {
            let dots: Vec<Dot> = (0..400)
                .map(|i| {
                    dot(
                        i,
                        rng.gen_range(-1000.0..1000.0),
                        rng.gen_range(-1000.0..1000.0),
                    )
                })
                .collect();
            let mut index = SpatialIndex::new(cell_size);
            index.rebuild(&dots);

            for _ in 0..100 {
                let x = rng.gen_range(-1100.0..1100.0);
                let z = rng.gen_range(-1100.0..1100.0);
                let radius = rng.gen_range(0.0..400.0);

                let found: HashSet<_> = index.query(x, z, radius).into_iter().collect();
                assert_eq!(
                    found,
                    brute_force(&dots, x, z, radius),
                    "cell_size={} query=({}, {}) r={}",
                    cell_size,
                    x,
                    z,
                    radius
                );
            }
        }
    }

    #[test]
    fn test_matches_brute_force_on_grid_lattice() {
        // Every entity sits exactly on a cell boundary
        let cell_size = 50.0;
        let mut dots = Vec::new();
        let mut id = 0;
        for gx in -6..=6 {
            for gz in -6..=6 {
                dots.push(dot(id, gx as f32 * cell_size, gz as f32 * cell_size));
                id += 1;
            }
        }
        let mut index = SpatialIndex::new(cell_size);
        index.rebuild(&dots);

        for &(x, z, r) in &[
            (0.0, 0.0, 50.0),
            (0.0, 0.0, 100.0),
            (50.0, -50.0, 70.8),
            (25.0, 25.0, 35.36),
            (-150.0, 100.0, 150.0),
        ] {
            let found: HashSet<_> = index.query(x, z, r).into_iter().collect();
            assert_eq!(found, brute_force(&dots, x, z, r), "query=({}, {}) r={}", x, z, r);
        }
    }

    #[test]
    fn test_stats() {
        let mut index = SpatialIndex::new(64.0);
        for i in 0..3 {
            index.insert(&dot(i, 100.0, 100.0));
        }
        index.insert(&dot(3, 500.0, 500.0));

        let stats = index.stats();
        assert_eq!(stats.total_entities, 4);
        assert_eq!(stats.non_empty_cells, 2);
        assert_eq!(stats.max_per_cell, 3);
    }
}
