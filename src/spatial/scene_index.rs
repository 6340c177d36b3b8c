//! Grid partition of the world tracking which entities occupy which cells
//!
//! An active entity sits in exactly the cells overlapped by its bounding
//! box; an inactive one sits in none. Moving an entity only marks it dirty,
//! the cells catch up in `reindex` once per tick.

use crate::core::types::{Aabb, EntityId, Frustum, GridPoint};
use crate::entity::object::GameObject;
use crate::entity::store::EntityStore;
use crate::services::landscape::Landscape;
use crate::spatial::grid::Grid;
use ahash::AHashSet;
use glam::Vec2;

/// Spatial index over the terrain grid
#[derive(Debug, Clone)]
pub struct SceneIndex {
    grid: Grid<Vec<EntityId>>,
}

impl SceneIndex {
    pub fn new(width: usize, height: usize, cell_size: Vec2) -> Self {
        Self {
            grid: Grid::new(width, height, cell_size, Vec2::ZERO),
        }
    }

    /// Index sharing the terrain's cell layout
    pub fn for_landscape(landscape: &dyn Landscape) -> Self {
        let (width, height) = landscape.grid_count();
        Self::new(width, height, landscape.cell_size())
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    pub fn cell_size(&self) -> Vec2 {
        self.grid.cell_size
    }

    /// Cell containing a ground position, may lie outside the grid
    pub fn point_of(&self, position: Vec2) -> GridPoint {
        self.grid.world_to_point(position)
    }

    /// Cells covered by a box on the ground plane, clamped to the grid
    fn cells_of(&self, aabb: &Aabb) -> Vec<GridPoint> {
        let Some((lo, hi)) = self.grid.clamped_range(aabb.min.truncate(), aabb.max.truncate())
        else {
            return Vec::new();
        };
        let mut cells = Vec::with_capacity(((hi.x - lo.x + 1) * (hi.y - lo.y + 1)) as usize);
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                cells.push(GridPoint::new(x, y));
            }
        }
        cells
    }

    /// Insert an entity into the cells of its bounding box
    pub fn activate(&mut self, object: &mut GameObject) {
        if object.spatial.active {
            return;
        }
        let cells = self.cells_of(&object.bounding_box());
        for &p in &cells {
            if let Some(owners) = self.grid.at_mut(p) {
                debug_assert!(
                    !owners.contains(&object.id),
                    "{:?} already indexed in {:?}",
                    object.id,
                    p
                );
                owners.push(object.id);
            }
        }
        object.spatial.cells = cells;
        object.spatial.active = true;
        object.spatial.dirty = false;
    }

    /// Remove an entity from every cell it was recorded in
    pub fn deactivate(&mut self, object: &mut GameObject) {
        if !object.spatial.active {
            return;
        }
        for p in object.spatial.cells.drain(..) {
            if let Some(owners) = self.grid.at_mut(p) {
                owners.retain(|&e| e != object.id);
            }
        }
        object.spatial.active = false;
    }

    /// Re-insert every active entity that moved since the last pass
    pub fn reindex(&mut self, entities: &mut EntityStore) {
        for object in entities.iter_mut() {
            if object.spatial.active && object.spatial.dirty {
                self.deactivate(object);
                self.activate(object);
            }
        }
    }

    /// Entities registered in one cell
    pub fn owners(&self, p: GridPoint) -> &[EntityId] {
        self.grid.at(p).map(Vec::as_slice).unwrap_or(&[])
    }

    fn collect_owners(&self, lo: GridPoint, hi: GridPoint) -> Vec<EntityId> {
        let mut seen = AHashSet::new();
        let mut result = Vec::new();
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                for &id in self.owners(GridPoint::new(x, y)) {
                    if seen.insert(id) {
                        result.push(id);
                    }
                }
            }
        }
        result
    }

    /// Deduplicated owners of every cell overlapping the box, inclusive
    pub fn objects_from_region(&self, aabb: &Aabb) -> Vec<EntityId> {
        match self.grid.clamped_range(aabb.min.truncate(), aabb.max.truncate()) {
            Some((lo, hi)) => self.collect_owners(lo, hi),
            None => Vec::new(),
        }
    }

    /// Active entities whose position lies inside the frustum
    ///
    /// Slow path: scans every entity instead of walking the grid.
    pub fn objects_from_frustum(&self, entities: &EntityStore, frustum: &Frustum) -> Vec<EntityId> {
        entities
            .iter()
            .filter(|o| o.spatial.active && frustum.contains(o.position()))
            .map(|o| o.id)
            .collect()
    }

    /// Owners of the cells under a square of side `2 * radius`
    ///
    /// Cell granularity only, entities may be further away than `radius`.
    pub fn nearby_objects(&self, position: Vec2, radius: f32) -> Vec<EntityId> {
        let r = Vec2::splat(radius.max(0.0));
        match self.grid.clamped_range(position - r, position + r) {
            Some((lo, hi)) => self.collect_owners(lo, hi),
            None => Vec::new(),
        }
    }

    /// Like `nearby_objects`, filtered to a 2D distance of at most `radius`
    pub fn nearby_objects_precise(
        &self,
        entities: &EntityStore,
        position: Vec2,
        radius: f32,
    ) -> Vec<EntityId> {
        self.nearby_objects(position, radius)
            .into_iter()
            .filter(|&id| {
                entities
                    .get(id)
                    .is_some_and(|o| o.position_2d().distance(position) <= radius)
            })
            .collect()
    }

    /// Total number of (cell, entity) registrations
    pub fn registrations(&self) -> usize {
        self.grid.iter().map(|(_, owners)| owners.len()).sum()
    }

    /// Every cell containing `id`, scanned from the grid itself
    pub fn cells_containing(&self, id: EntityId) -> Vec<GridPoint> {
        self.grid
            .iter()
            .filter(|(_, owners)| owners.contains(&id))
            .map(|(p, _)| p)
            .collect()
    }
}
