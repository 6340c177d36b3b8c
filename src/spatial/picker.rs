//! Ray picking against the scene index
//!
//! The ray is marched across the terrain in fixed steps. Only the cells the
//! march passes (and their direct neighbors) are tested, so a pick costs a
//! few dozen bounding box tests regardless of the entity count.

use crate::core::types::{Aabb, EntityId, GridPoint, Ray};
use crate::entity::store::EntityStore;
use crate::services::landscape::Landscape;
use crate::spatial::scene_index::SceneIndex;
use ahash::AHashMap;
use glam::Vec3;

/// Upper bound for hit distances
const MAX_PICK_DISTANCE: f32 = 10000.0;

/// Slack for the containment test, so samples on the boundary stay inside
const BOUNDS_EPSILON: f32 = 0.01;

/// Bitwise key of a ray, used to cache picks within one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RayKey([u32; 6]);

impl From<&Ray> for RayKey {
    fn from(ray: &Ray) -> Self {
        let o = ray.origin;
        let d = ray.direction;
        RayKey([
            o.x.to_bits(),
            o.y.to_bits(),
            o.z.to_bits(),
            d.x.to_bits(),
            d.y.to_bits(),
            d.z.to_bits(),
        ])
    }
}

/// Ray marcher with a per-tick result cache
#[derive(Debug, Clone)]
pub struct Picker {
    precision: f32,
    max_entity_height: f32,
    cache: AHashMap<RayKey, Option<EntityId>>,
}

impl Picker {
    pub fn new(precision: f32, max_entity_height: f32) -> Self {
        Self {
            precision,
            max_entity_height,
            cache: AHashMap::new(),
        }
    }

    /// Drop cached results; called at the start of every tick
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Nearest visible entity hit by the ray, `None` if the terrain or
    /// nothing is hit first
    pub fn pick(
        &mut self,
        ray: &Ray,
        landscape: &dyn Landscape,
        index: &SceneIndex,
        entities: &EntityStore,
    ) -> Option<EntityId> {
        let key = RayKey::from(ray);
        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }
        let hit = self.march(ray, landscape, index, entities);
        self.cache.insert(key, hit);
        hit
    }

    fn march(
        &self,
        ray: &Ray,
        landscape: &dyn Landscape,
        index: &SceneIndex,
        entities: &EntityStore,
    ) -> Option<EntityId> {
        if self.precision <= 0.0 || ray.direction == Vec3::ZERO {
            return None;
        }

        let mut bounds = landscape.bounds();
        bounds.max.z += self.max_entity_height;
        let entry = bounds.intersect_ray(ray)?;

        let slack = Aabb::new(
            bounds.min - Vec3::splat(BOUNDS_EPSILON),
            bounds.max + Vec3::splat(BOUNDS_EPSILON),
        );
        let step = ray.direction * self.precision;
        let mut sample = ray.at(entry);
        let mut last_cell: Option<GridPoint> = None;

        while slack.contains(sample) {
            let terrain = landscape.position_to_grid(sample.x, sample.y);
            if landscape.grid_height(terrain) > sample.z {
                return None;
            }

            let cell = index.point_of(sample.truncate());
            if last_cell != Some(cell) {
                last_cell = Some(cell);
                if let Some(hit) = closest_hit(ray, cell, index, entities) {
                    return Some(hit);
                }
            }

            sample += step;
        }

        None
    }
}

/// Closest visible entity in the 3x3 block around `cell` hit by the ray
fn closest_hit(
    ray: &Ray,
    cell: GridPoint,
    index: &SceneIndex,
    entities: &EntityStore,
) -> Option<EntityId> {
    let mut shortest = MAX_PICK_DISTANCE;
    let mut pick = None;

    for dy in -1..=1 {
        for dx in -1..=1 {
            for &id in index.owners(GridPoint::new(cell.x + dx, cell.y + dy)) {
                let Some(object) = entities.get(id) else {
                    continue;
                };
                if !object.visible {
                    continue;
                }
                if let Some(distance) = object.bounding_box().intersect_ray(ray) {
                    if distance < shortest {
                        shortest = distance;
                        pick = Some(id);
                    }
                }
            }
        }
    }

    pick
}
