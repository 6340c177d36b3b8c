//! Terrain height and grid service
//!
//! The simulation only needs heights and the mapping between world
//! positions and terrain grid points. Grid point `(x, y)` sits at
//! `(x * cell_size.x, y * cell_size.y)`; the scene index uses the same
//! grid so both agree on cell coordinates.

use crate::core::types::{Aabb, GridPoint};
use crate::spatial::grid::Grid;
use glam::{Vec2, Vec3};

/// Terrain collaborator consumed by the scene index and the picker
pub trait Landscape {
    /// World extent on the ground plane, starting at the origin
    fn size(&self) -> Vec2;

    /// Number of grid points along X and Y
    fn grid_count(&self) -> (usize, usize);

    /// Terrain height stored at a grid point, 0 outside the grid
    fn grid_height(&self, p: GridPoint) -> f32;

    /// Interpolated terrain height at a world position
    fn height(&self, x: f32, y: f32) -> f32;

    /// Bounds of the terrain surface
    fn bounds(&self) -> Aabb;

    fn cell_size(&self) -> Vec2 {
        let (w, h) = self.grid_count();
        let size = self.size();
        Vec2::new(size.x / w.max(1) as f32, size.y / h.max(1) as f32)
    }

    fn position_to_grid(&self, x: f32, y: f32) -> GridPoint {
        let cell = self.cell_size();
        GridPoint::new((x / cell.x).floor() as i32, (y / cell.y).floor() as i32)
    }

    fn grid_to_position(&self, p: GridPoint) -> Vec2 {
        let cell = self.cell_size();
        Vec2::new(p.x as f32 * cell.x, p.y as f32 * cell.y)
    }
}

/// Height field terrain sampled on a regular grid
#[derive(Debug, Clone)]
pub struct HeightField {
    size: Vec2,
    heights: Grid<f32>,
    min_height: f32,
    max_height: f32,
}

impl HeightField {
    /// Flat terrain at height 0
    pub fn flat(size: Vec2, grid_width: usize, grid_height: usize) -> Self {
        let cell = Vec2::new(
            size.x / grid_width.max(1) as f32,
            size.y / grid_height.max(1) as f32,
        );
        Self {
            size,
            heights: Grid::new(grid_width, grid_height, cell, Vec2::ZERO),
            min_height: 0.0,
            max_height: 0.0,
        }
    }

    /// Build from row-major heights (`grid_width * grid_height` values)
    pub fn from_heights(size: Vec2, grid_width: usize, grid_height: usize, heights: &[f32]) -> Self {
        let mut field = Self::flat(size, grid_width, grid_height);
        for (i, &h) in heights.iter().take(grid_width * grid_height).enumerate() {
            field.heights.set(i % grid_width, i / grid_width, h);
        }
        field.refresh_extremes();
        field
    }

    pub fn set_height(&mut self, p: GridPoint, height: f32) {
        if let Some(h) = self.heights.at_mut(p) {
            *h = height;
        }
        self.refresh_extremes();
    }

    fn refresh_extremes(&mut self) {
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for (_, &h) in self.heights.iter() {
            lo = lo.min(h);
            hi = hi.max(h);
        }
        if lo > hi {
            lo = 0.0;
            hi = 0.0;
        }
        self.min_height = lo;
        self.max_height = hi;
    }
}

impl Landscape for HeightField {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn grid_count(&self) -> (usize, usize) {
        (self.heights.width, self.heights.height)
    }

    fn grid_height(&self, p: GridPoint) -> f32 {
        self.heights.at(p).copied().unwrap_or(0.0)
    }

    fn height(&self, x: f32, y: f32) -> f32 {
        let cell = self.heights.cell_size;
        let fx = (x / cell.x).max(0.0);
        let fy = (y / cell.y).max(0.0);
        let x0 = fx.floor() as i32;
        let y0 = fy.floor() as i32;
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let sample = |gx: i32, gy: i32| {
            let gx = gx.min(self.heights.width as i32 - 1).max(0);
            let gy = gy.min(self.heights.height as i32 - 1).max(0);
            self.grid_height(GridPoint::new(gx, gy))
        };

        let h00 = sample(x0, y0);
        let h10 = sample(x0 + 1, y0);
        let h01 = sample(x0, y0 + 1);
        let h11 = sample(x0 + 1, y0 + 1);
        let top = h00 + (h10 - h00) * tx;
        let bottom = h01 + (h11 - h01) * tx;
        top + (bottom - top) * ty
    }

    fn bounds(&self) -> Aabb {
        Aabb::new(
            Vec3::new(0.0, 0.0, self.min_height),
            Vec3::new(self.size.x, self.size.y, self.max_height),
        )
    }
}
