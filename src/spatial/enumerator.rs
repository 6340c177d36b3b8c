//! Footprint rasterization onto grid points
//!
//! Used to find the grid cells covered by a rotated building footprint or a
//! circular brush, for instance when marking static obstructions in the path
//! service.

use crate::core::types::GridPoint;
use crate::services::landscape::Landscape;
use crate::spatial::outline::{world_to_local, Outline};
use glam::Vec2;
use std::collections::VecDeque;

/// Geometry of the grid being rasterized onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpace {
    pub cell_size: Vec2,
    pub width: usize,
    pub height: usize,
    /// Offset from a cell's lower left corner to the point that gets tested
    pub sample_offset: Vec2,
}

impl GridSpace {
    pub fn new(cell_size: Vec2, width: usize, height: usize) -> Self {
        Self {
            cell_size,
            width,
            height,
            sample_offset: Vec2::ZERO,
        }
    }

    /// Terrain grid: grid points sit on cell corners
    pub fn of_landscape(landscape: &dyn Landscape) -> Self {
        let (width, height) = landscape.grid_count();
        Self::new(landscape.cell_size(), width, height)
    }

    /// Test cell centers instead of corners
    pub fn with_centered_samples(mut self) -> Self {
        self.sample_offset = self.cell_size * 0.5;
        self
    }

    pub fn position_to_grid(&self, p: Vec2) -> GridPoint {
        GridPoint::new(
            (p.x / self.cell_size.x).floor() as i32,
            (p.y / self.cell_size.y).floor() as i32,
        )
    }

    pub fn grid_to_position(&self, p: GridPoint) -> Vec2 {
        Vec2::new(p.x as f32 * self.cell_size.x, p.y as f32 * self.cell_size.y) + self.sample_offset
    }
}

/// Iterator over the grid points covered by a footprint
///
/// Every accepted grid point also emits its left, lower and lower-left
/// neighbors (once each), so thin or rotated shapes leave no gaps between
/// accepted samples.
pub struct GridEnumerator {
    space: GridSpace,
    shape: Outline,
    p_min: GridPoint,
    p_max: GridPoint,
    visited: Vec<bool>,
    cursor: GridPoint,
    pending: VecDeque<GridPoint>,
    done: bool,
}

impl GridEnumerator {
    pub fn new(space: GridSpace, shape: Outline) -> Self {
        let mut enumerator = Self {
            space,
            shape,
            p_min: GridPoint::default(),
            p_max: GridPoint::default(),
            visited: Vec::new(),
            cursor: GridPoint::default(),
            pending: VecDeque::new(),
            done: true,
        };

        if matches!(shape, Outline::Empty) || space.width == 0 || space.height == 0 {
            return enumerator;
        }

        let (lo, hi) = shape.bounds();
        let lo = space.position_to_grid(lo);
        let hi = space.position_to_grid(hi);
        let max_x = space.width as i32 - 1;
        let max_y = space.height as i32 - 1;

        if hi.x < 0 || hi.y < 0 || lo.x > max_x || lo.y > max_y {
            return enumerator;
        }

        let p_min = GridPoint::new(lo.x.clamp(0, max_x), lo.y.clamp(0, max_y));
        let p_max = GridPoint::new(hi.x.clamp(p_min.x, max_x), hi.y.clamp(p_min.y, max_y));
        let w = (p_max.x - p_min.x + 1) as usize;
        let h = (p_max.y - p_min.y + 1) as usize;

        enumerator.p_min = p_min;
        enumerator.p_max = p_max;
        enumerator.visited = vec![false; w * h];
        enumerator.cursor = p_min;
        enumerator.done = false;
        enumerator
    }

    /// Rectangle of `size` centered at `position`, rotated around Z
    pub fn rectangle(space: GridSpace, size: Vec2, position: Vec2, rotation: f32) -> Self {
        Self::new(space, Outline::centered_rectangle(size, position, rotation))
    }

    pub fn circle(space: GridSpace, center: Vec2, radius: f32) -> Self {
        Self::new(space, Outline::circle(center, radius))
    }

    fn index(&self, p: GridPoint) -> usize {
        let w = (self.p_max.x - self.p_min.x + 1) as usize;
        (p.y - self.p_min.y) as usize * w + (p.x - self.p_min.x) as usize
    }

    /// Marks `p` visited, returning whether it was new
    fn visit(&mut self, p: GridPoint) -> bool {
        let i = self.index(p);
        if self.visited[i] {
            false
        } else {
            self.visited[i] = true;
            true
        }
    }

    /// Inclusive containment in the shape's local space
    fn accepts(&self, p: GridPoint) -> bool {
        let v = self.space.grid_to_position(p);
        match self.shape {
            Outline::Empty => false,
            Outline::Circle { center, radius } => v.distance_squared(center) <= radius * radius,
            Outline::Rectangle {
                min,
                max,
                position,
                rotation,
            } => {
                let v = world_to_local(v, position, rotation);
                v.x >= min.x && v.x <= max.x && v.y >= min.y && v.y <= max.y
            }
        }
    }

    fn advance_cursor(&mut self) {
        if self.cursor.y < self.p_max.y {
            self.cursor.y += 1;
        } else if self.cursor.x < self.p_max.x {
            self.cursor.x += 1;
            self.cursor.y = self.p_min.y;
        } else {
            self.done = true;
        }
    }
}

impl Iterator for GridEnumerator {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        loop {
            if let Some(p) = self.pending.pop_front() {
                return Some(p);
            }
            if self.done {
                return None;
            }

            let p = self.cursor;
            self.advance_cursor();

            if !self.accepts(p) || !self.visit(p) {
                continue;
            }

            let left = GridPoint::new(p.x - 1, p.y);
            let below = GridPoint::new(p.x, p.y - 1);
            let diagonal = GridPoint::new(p.x - 1, p.y - 1);
            if p.x != self.p_min.x && self.visit(left) {
                self.pending.push_back(left);
            }
            if p.y != self.p_min.y && self.visit(below) {
                self.pending.push_back(below);
            }
            if p.x != self.p_min.x && p.y != self.p_min.y && self.visit(diagonal) {
                self.pending.push_back(diagonal);
            }

            return Some(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    fn space() -> GridSpace {
        GridSpace::new(Vec2::splat(1.0), 20, 20)
    }

    #[test]
    fn test_axis_aligned_rectangle() {
        // Grid points 4..=6 lie inside [4, 6] on both axes
        let cells: Vec<_> =
            GridEnumerator::rectangle(space(), Vec2::new(2.0, 2.0), Vec2::new(5.0, 5.0), 0.0)
                .collect();
        let set: AHashSet<_> = cells.iter().copied().collect();
        assert_eq!(set.len(), cells.len(), "no duplicates");
        for x in 4..=6 {
            for y in 4..=6 {
                assert!(set.contains(&GridPoint::new(x, y)));
            }
        }
        assert_eq!(set.len(), 9);
        assert!(!set.contains(&GridPoint::new(3, 3)));
        assert!(!set.contains(&GridPoint::new(7, 7)));
    }

    #[test]
    fn test_neighbors_close_gaps() {
        // Grid column 4 is not sampled inside [4.5, 6] but its cells overlap the shape
        let shape = Outline::rectangle(Vec2::new(4.5, 4.0), Vec2::new(6.0, 6.0), Vec2::ZERO, 0.0);
        let cells: AHashSet<_> = GridEnumerator::new(space(), shape).collect();
        assert!(cells.contains(&GridPoint::new(5, 5)));
        assert!(cells.contains(&GridPoint::new(4, 5)));
        assert!(cells.contains(&GridPoint::new(4, 4)));
    }

    #[test]
    fn test_thin_rotated_rectangle_has_cells() {
        let cells: Vec<_> = GridEnumerator::rectangle(
            space(),
            Vec2::new(10.0, 0.5),
            Vec2::new(10.0, 10.0),
            std::f32::consts::FRAC_PI_4,
        )
        .collect();
        assert!(!cells.is_empty());
        let set: AHashSet<_> = cells.iter().copied().collect();
        assert_eq!(set.len(), cells.len());
        assert!(set.contains(&GridPoint::new(10, 10)));
    }

    #[test]
    fn test_circle_footprint() {
        let cells: AHashSet<_> =
            GridEnumerator::circle(space(), Vec2::new(10.0, 10.0), 2.0).collect();
        assert!(cells.contains(&GridPoint::new(10, 10)));
        assert!(cells.contains(&GridPoint::new(12, 10)));
        assert!(!cells.contains(&GridPoint::new(13, 10)));
    }

    #[test]
    fn test_clamped_to_grid() {
        let cells: Vec<_> =
            GridEnumerator::circle(space(), Vec2::new(0.0, 0.0), 3.0).collect();
        assert!(cells.iter().all(|p| p.x >= 0 && p.y >= 0 && p.x < 20 && p.y < 20));
        assert!(cells.contains(&GridPoint::new(0, 0)));
    }

    #[test]
    fn test_outside_grid_is_empty() {
        assert_eq!(
            GridEnumerator::circle(space(), Vec2::new(-50.0, -50.0), 3.0).count(),
            0
        );
        assert_eq!(GridEnumerator::new(space(), Outline::Empty).count(), 0);
    }
}
