//! Generic grid for spatial data

use crate::core::types::GridPoint;
use glam::Vec2;

/// Generic 2D grid with configurable cell size
#[derive(Debug, Clone)]
pub struct Grid<T: Clone + Default> {
    pub width: usize,
    pub height: usize,
    pub cell_size: Vec2,
    pub origin: Vec2,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize, cell_size: Vec2, origin: Vec2) -> Self {
        Self {
            width,
            height,
            cell_size,
            origin,
            data: vec![T::default(); width * height],
        }
    }

    #[inline]
    pub fn contains(&self, p: GridPoint) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            Some(&self.data[y * self.width + x])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x < self.width && y < self.height {
            Some(&mut self.data[y * self.width + x])
        } else {
            None
        }
    }

    #[inline]
    pub fn at(&self, p: GridPoint) -> Option<&T> {
        if self.contains(p) {
            self.get(p.x as usize, p.y as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn at_mut(&mut self, p: GridPoint) -> Option<&mut T> {
        if self.contains(p) {
            self.get_mut(p.x as usize, p.y as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Cell containing a world position, may lie outside the grid
    #[inline]
    pub fn world_to_point(&self, pos: Vec2) -> GridPoint {
        GridPoint::new(
            ((pos.x - self.origin.x) / self.cell_size.x).floor() as i32,
            ((pos.y - self.origin.y) / self.cell_size.y).floor() as i32,
        )
    }

    /// Convert world position to cell coordinates, clamped to the grid
    #[inline]
    pub fn world_to_cell(&self, pos: Vec2) -> (usize, usize) {
        let p = self.world_to_point(pos);
        (
            p.x.max(0).min(self.width as i32 - 1) as usize,
            p.y.max(0).min(self.height as i32 - 1) as usize,
        )
    }

    /// Sample grid at world position
    pub fn sample(&self, pos: Vec2) -> Option<&T> {
        let (x, y) = self.world_to_cell(pos);
        self.get(x, y)
    }

    /// Lower left corner of a cell in world coordinates
    pub fn cell_origin(&self, x: i32, y: i32) -> Vec2 {
        Vec2::new(
            self.origin.x + x as f32 * self.cell_size.x,
            self.origin.y + y as f32 * self.cell_size.y,
        )
    }

    /// Cell center in world coordinates
    pub fn cell_center(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            self.origin.x + (x as f32 + 0.5) * self.cell_size.x,
            self.origin.y + (y as f32 + 0.5) * self.cell_size.y,
        )
    }

    /// Inclusive cell range covering a world rectangle, clamped to the grid
    ///
    /// Returns `None` when the rectangle lies completely outside.
    pub fn clamped_range(&self, min: Vec2, max: Vec2) -> Option<(GridPoint, GridPoint)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let lo = self.world_to_point(min);
        let hi = self.world_to_point(max);
        if hi.x < 0 || hi.y < 0 || lo.x >= self.width as i32 || lo.y >= self.height as i32 {
            return None;
        }
        Some((
            GridPoint::new(lo.x.max(0), lo.y.max(0)),
            GridPoint::new(
                hi.x.min(self.width as i32 - 1),
                hi.y.min(self.height as i32 - 1),
            ),
        ))
    }

    /// Iterate every cell with its coordinates
    pub fn iter(&self) -> impl Iterator<Item = (GridPoint, &T)> + '_ {
        let width = self.width;
        self.data.iter().enumerate().map(move |(i, v)| {
            (GridPoint::new((i % width) as i32, (i / width) as i32), v)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid<u8> {
        Grid::new(10, 8, Vec2::splat(4.0), Vec2::ZERO)
    }

    #[test]
    fn test_world_to_cell_clamps() {
        let g = grid();
        assert_eq!(g.world_to_cell(Vec2::new(5.0, 5.0)), (1, 1));
        assert_eq!(g.world_to_cell(Vec2::new(-5.0, 500.0)), (0, 7));
        assert_eq!(g.world_to_point(Vec2::new(-5.0, 0.0)), GridPoint::new(-2, 0));
    }

    #[test]
    fn test_get_set_bounds() {
        let mut g = grid();
        g.set(3, 2, 9);
        assert_eq!(g.get(3, 2), Some(&9));
        assert_eq!(g.at(GridPoint::new(3, 2)), Some(&9));
        assert!(g.get(10, 0).is_none());
        assert!(g.at(GridPoint::new(-1, 0)).is_none());
    }

    #[test]
    fn test_clamped_range() {
        let g = grid();
        let (lo, hi) = g
            .clamped_range(Vec2::new(-10.0, 3.0), Vec2::new(9.0, 100.0))
            .unwrap();
        assert_eq!(lo, GridPoint::new(0, 0));
        assert_eq!(hi, GridPoint::new(2, 7));
        assert!(g
            .clamped_range(Vec2::new(100.0, 100.0), Vec2::new(120.0, 120.0))
            .is_none());
    }

    #[test]
    fn test_cell_geometry() {
        let g = grid();
        assert_eq!(g.cell_origin(2, 1), Vec2::new(8.0, 4.0));
        assert_eq!(g.cell_center(2, 1), Vec2::new(10.0, 6.0));
        assert_eq!(g.iter().count(), 80);
    }
}
