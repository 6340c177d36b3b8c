//! Core type definitions used throughout the codebase

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Unique identifier for entities
///
/// Ids are allocated sequentially by the entity store and never reused,
/// so ordering by id is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Unique identifier for players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn new(id: u8) -> Self {
        Self(id)
    }
}

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Integer coordinates of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// RGBA color used by notifications and debug drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const GOLD: Color = Color::rgb(255, 215, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const WHEAT: Color = Color::rgb(245, 222, 179);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Axis aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box spanning `size` centered on `center` in the XY plane, from `z0` up to `z1`
    pub fn from_center_size(center: Vec2, size: Vec2, z0: f32, z1: f32) -> Self {
        let half = size * 0.5;
        Self {
            min: Vec3::new(center.x - half.x, center.y - half.y, z0),
            max: Vec3::new(center.x + half.x, center.y + half.y, z1),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.z >= self.min.z
            && point.x <= self.max.x
            && point.y <= self.max.y
            && point.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Distance along the ray to the first contact with this box
    ///
    /// Returns 0 when the ray starts inside the box, `None` when it misses.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::MAX;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Half line used for picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Expected to be normalized
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Plane stored as `normal . p + d = 0`, normal pointing inside the volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane through `point` facing along `normal`
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Convex view volume bounded by inward facing planes
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    pub planes: Vec<Plane>,
}

impl Frustum {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    /// Axis aligned box expressed as six planes
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self::new(vec![
            Plane::from_point_normal(aabb.min, Vec3::X),
            Plane::from_point_normal(aabb.min, Vec3::Y),
            Plane::from_point_normal(aabb.min, Vec3::Z),
            Plane::from_point_normal(aabb.max, -Vec3::X),
            Plane::from_point_normal(aabb.max, -Vec3::Y),
            Plane::from_point_normal(aabb.max, -Vec3::Z),
        ])
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }
}
