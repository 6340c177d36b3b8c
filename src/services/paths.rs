//! Path service interface and a straight-line reference implementation
//!
//! Behaviors only need to reserve space for movers, mark building
//! footprints as obstructed and ask for a list of waypoints. The search
//! algorithm behind `query_path` is left to the implementation.

use crate::core::types::{EntityId, GridPoint};
use crate::spatial::enumerator::{GridEnumerator, GridSpace};
use crate::spatial::grid::Grid;
use crate::spatial::outline::Outline;
use ahash::AHashMap;
use glam::Vec2;

/// Shape handle reserving space for a mover
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub radius: f32,
}

/// Movement collaborator consumed by the behavior states
pub trait PathService {
    fn create_brush(&self, radius: f32) -> Brush;

    /// Nearest position to `position` where `brush` fits
    fn find_valid_position(&self, position: Vec2, brush: &Brush) -> Vec2;

    fn add_movable(&mut self, id: EntityId, position: Vec2, brush: Brush);
    fn remove_movable(&mut self, id: EntityId);
    fn update_movable(&mut self, id: EntityId, position: Vec2);

    /// Add one static obstruction to every cell
    fn mark(&mut self, cells: &[GridPoint]);
    /// Remove one static obstruction from every cell
    fn unmark(&mut self, cells: &[GridPoint]);

    fn enumerate_grids_in_circle(&self, center: Vec2, radius: f32) -> Vec<GridPoint>;
    fn enumerate_grids_in_outline(&self, outline: &Outline) -> Vec<GridPoint>;

    fn is_position_obstructed(&self, position: Vec2, include_dynamic: bool) -> bool;
    fn is_grid_obstructed(&self, p: GridPoint, include_dynamic: bool) -> bool;

    /// Waypoints from `start` to `end` (excluding `start`), `None` if unreachable
    fn query_path(&mut self, id: EntityId, start: Vec2, end: Vec2) -> Option<Vec<Vec2>>;
    fn cancel_query(&mut self, id: EntityId);

    fn update(&mut self, dt: f32);
}

#[derive(Debug, Clone, Copy)]
struct Movable {
    position: Vec2,
    brush: Brush,
}

/// Obstruction grid with straight segment routes
///
/// Static obstructions are reference counted per cell so overlapping
/// footprints can be unmarked independently. A route is the direct segment
/// to the destination; it fails when the segment crosses an obstruction,
/// except for the obstruction surrounding the destination itself, where the
/// route stops at the last free sample.
#[derive(Debug, Clone)]
pub struct StraightLinePaths {
    obstructions: Grid<u16>,
    space: GridSpace,
    movables: AHashMap<EntityId, Movable>,
    outstanding: AHashMap<EntityId, Vec2>,
    elapsed: f32,
}

impl StraightLinePaths {
    pub fn new(size: Vec2, resolution: f32) -> Self {
        let width = (size.x / resolution).ceil().max(1.0) as usize;
        let height = (size.y / resolution).ceil().max(1.0) as usize;
        let cell = Vec2::splat(resolution);
        Self {
            obstructions: Grid::new(width, height, cell, Vec2::ZERO),
            space: GridSpace::new(cell, width, height).with_centered_samples(),
            movables: AHashMap::new(),
            outstanding: AHashMap::new(),
            elapsed: 0.0,
        }
    }

    pub fn movable_count(&self) -> usize {
        self.movables.len()
    }

    pub fn is_movable(&self, id: EntityId) -> bool {
        self.movables.contains_key(&id)
    }

    pub fn movable_position(&self, id: EntityId) -> Option<Vec2> {
        self.movables.get(&id).map(|m| m.position)
    }

    /// Destinations of routes handed out and not cancelled
    pub fn outstanding_queries(&self) -> usize {
        self.outstanding.len()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn statically_blocked(&self, p: GridPoint) -> bool {
        match self.obstructions.at(p) {
            Some(&count) => count > 0,
            None => true,
        }
    }

    fn brush_fits(&self, position: Vec2, brush: &Brush) -> bool {
        if self.statically_blocked(self.space.position_to_grid(position)) {
            return false;
        }
        self.enumerate_grids_in_circle(position, brush.radius)
            .into_iter()
            .all(|p| !self.statically_blocked(p))
    }
}

impl PathService for StraightLinePaths {
    fn create_brush(&self, radius: f32) -> Brush {
        Brush {
            radius: radius.max(0.0),
        }
    }

    fn find_valid_position(&self, position: Vec2, brush: &Brush) -> Vec2 {
        if self.brush_fits(position, brush) {
            return position;
        }

        // Search square rings of cells around the start
        let origin = self.space.position_to_grid(position);
        let max_ring = self.space.width.max(self.space.height) as i32;
        for ring in 1..=max_ring {
            let mut best: Option<(f32, Vec2)> = None;
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let p = GridPoint::new(origin.x + dx, origin.y + dy);
                    if !self.obstructions.contains(p) {
                        continue;
                    }
                    let candidate = self.space.grid_to_position(p);
                    if !self.brush_fits(candidate, brush) {
                        continue;
                    }
                    let d = candidate.distance_squared(position);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, candidate));
                    }
                }
            }
            if let Some((_, found)) = best {
                return found;
            }
        }

        position
    }

    fn add_movable(&mut self, id: EntityId, position: Vec2, brush: Brush) {
        self.movables.insert(id, Movable { position, brush });
    }

    fn remove_movable(&mut self, id: EntityId) {
        self.movables.remove(&id);
        self.outstanding.remove(&id);
    }

    fn update_movable(&mut self, id: EntityId, position: Vec2) {
        if let Some(m) = self.movables.get_mut(&id) {
            m.position = position;
        }
    }

    fn mark(&mut self, cells: &[GridPoint]) {
        for &p in cells {
            if let Some(count) = self.obstructions.at_mut(p) {
                *count = count.saturating_add(1);
            }
        }
    }

    fn unmark(&mut self, cells: &[GridPoint]) {
        for &p in cells {
            if let Some(count) = self.obstructions.at_mut(p) {
                debug_assert!(*count > 0, "unmarking free cell {:?}", p);
                *count = count.saturating_sub(1);
            }
        }
    }

    fn enumerate_grids_in_circle(&self, center: Vec2, radius: f32) -> Vec<GridPoint> {
        GridEnumerator::circle(self.space, center, radius).collect()
    }

    fn enumerate_grids_in_outline(&self, outline: &Outline) -> Vec<GridPoint> {
        GridEnumerator::new(self.space, *outline).collect()
    }

    fn is_position_obstructed(&self, position: Vec2, include_dynamic: bool) -> bool {
        if self.statically_blocked(self.space.position_to_grid(position)) {
            return true;
        }
        include_dynamic
            && self
                .movables
                .values()
                .any(|m| m.position.distance(position) < m.brush.radius)
    }

    fn is_grid_obstructed(&self, p: GridPoint, include_dynamic: bool) -> bool {
        if self.statically_blocked(p) {
            return true;
        }
        include_dynamic
            && self
                .movables
                .values()
                .any(|m| self.space.position_to_grid(m.position) == p)
    }

    fn query_path(&mut self, id: EntityId, start: Vec2, end: Vec2) -> Option<Vec<Vec2>> {
        let length = start.distance(end);
        let step = self.space.cell_size.min_element() * 0.5;
        let samples = (length / step).ceil().max(1.0) as usize;

        let mut last_free = start;
        let mut blocked_at: Option<Vec2> = None;
        for i in 1..=samples {
            let sample = start.lerp(end, i as f32 / samples as f32);
            let blocked = self.statically_blocked(self.space.position_to_grid(sample));
            match (blocked, blocked_at) {
                (true, None) => blocked_at = Some(last_free),
                // Left the obstruction again: it was in the way
                (false, Some(_)) => return None,
                (false, None) => last_free = sample,
                (true, Some(_)) => {}
            }
        }

        let destination = blocked_at.unwrap_or(end);
        self.outstanding.insert(id, destination);
        if destination == start {
            Some(Vec::new())
        } else {
            Some(vec![destination])
        }
    }

    fn cancel_query(&mut self, id: EntityId) {
        self.outstanding.remove(&id);
    }

    fn update(&mut self, dt: f32) {
        self.elapsed += dt;
    }
}
