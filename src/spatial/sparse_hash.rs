//! Sparse hash grid for efficient spatial queries

use ahash::AHashMap;

use crate::core::types::{EntityId, Vec2};

/// Sparse hash grid for neighbor queries over the tick snapshot
///
/// Each cell keeps the position alongside the id so radius filtering never
/// has to look anything up elsewhere.
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<(EntityId, Vec2)>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(0.001),
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push((entity, pos));
    }

    pub fn remove(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.retain(|&(e, _)| e != entity);
        }
    }

    /// Query all entries in the 3x3 neighborhood of `pos`
    pub fn query_neighbors(&self, pos: Vec2) -> impl Iterator<Item = (EntityId, Vec2)> + '_ {
        self.query_rings(pos, 1)
    }

    fn query_rings(&self, pos: Vec2, rings: i32) -> impl Iterator<Item = (EntityId, Vec2)> + '_ {
        let (cx, cy) = self.cell_coord(pos);

        (-rings..=rings).flat_map(move |dx| {
            (-rings..=rings).flat_map(move |dy| {
                self.cells
                    .get(&(cx + dx, cy + dy))
                    .into_iter()
                    .flatten()
                    .copied()
            })
        })
    }

    /// Entities within `radius` of `center` (inclusive), sorted by id
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<(EntityId, Vec2)> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let rings = (f64::from(radius) / f64::from(self.cell_size)).ceil().max(1.0);
        let side = 2.0 * rings + 1.0;
        let radius_sq = radius * radius;
        let within = |&(_, pos): &(EntityId, Vec2)| center.distance_sq(&pos) <= radius_sq;

        // Past this many cells the occupied set is the smaller walk
        let mut found: Vec<(EntityId, Vec2)> = if side * side > self.cells.len() as f64 {
            self.cells.values().flatten().copied().filter(within).collect()
        } else {
            self.query_rings(center, rings as i32).filter(within).collect()
        };
        found.sort_by_key(|(id, _)| *id);
        found
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, entities: impl Iterator<Item = (EntityId, Vec2)>) {
        self.clear();
        for (entity, pos) in entities {
            self.insert(entity, pos);
        }
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }
}
