//! Game objects: the per-entity record updated every tick

use crate::behavior::Behavior;
use crate::core::types::{Aabb, EntityId, GridPoint, PlayerId};
use crate::entity::kind::EntityKind;
use crate::entity::orders::Orders;
use crate::spatial::outline::Outline;
use crate::state::animation::AnimationPlayer;
use glam::{Vec2, Vec3};

/// Ground footprint relative to the entity's position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Footprint {
    #[default]
    None,
    Circle {
        radius: f32,
    },
    /// Rectangle of `size` centered on the position, rotated with the entity
    Rectangle {
        size: Vec2,
    },
}

/// Combat numbers, all ranges as `(min, max)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatStats {
    pub attack: (f32, f32),
    pub defense: (f32, f32),
    /// Distance band in which targets can be hit
    pub attack_range: (f32, f32),
    /// Seconds between two attacks, also the length of the attack clip
    pub attack_duration: f32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack: (0.0, 0.0),
            defense: (0.0, 0.0),
            attack_range: (0.0, 8.0),
            attack_duration: 2.0,
        }
    }
}

/// Bookkeeping owned by the scene index
#[derive(Debug, Clone, Default)]
pub struct SpatialTag {
    pub active: bool,
    /// Position or shape changed since the last reindex
    pub dirty: bool,
    /// Cells currently holding this entity
    pub cells: Vec<GridPoint>,
}

/// A single entity of the world
#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: EntityId,
    pub class_id: String,
    /// Optional unique name, registered with the entity store
    pub name: Option<String>,
    pub owner: Option<PlayerId>,
    position: Vec3,
    rotation: f32,
    footprint: Footprint,
    /// Height of the bounding box above the position
    pub model_height: f32,
    health: f32,
    pub max_health: f32,
    pub combat: CombatStats,
    pub view_distance: f32,
    /// Movement speed in world units per second
    pub speed: f32,
    pub visible: bool,
    /// Interactive objects are activated in the scene index when added
    pub interactive: bool,
    pub kind: EntityKind,
    pub spatial: SpatialTag,
    /// Path grid cells this entity marked as statically obstructed
    pub obstruction: Vec<GridPoint>,
    pub orders: Orders,
    pub animation: AnimationPlayer,
}

impl GameObject {
    pub fn new(class_id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: EntityId(u32::MAX),
            class_id: class_id.into(),
            name: None,
            owner: None,
            position: Vec3::ZERO,
            rotation: 0.0,
            footprint: Footprint::None,
            model_height: 10.0,
            health: 0.0,
            max_health: 0.0,
            combat: CombatStats::default(),
            view_distance: 100.0,
            speed: 0.0,
            visible: true,
            interactive: true,
            kind,
            spatial: SpatialTag::default(),
            obstruction: Vec::new(),
            orders: Orders::new(),
            animation: AnimationPlayer::new(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets both max and current health
    pub fn with_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self.health = max_health;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_combat(mut self, combat: CombatStats) -> Self {
        self.combat = combat;
        self
    }

    pub fn with_view_distance(mut self, view_distance: f32) -> Self {
        self.view_distance = view_distance;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn position_2d(&self) -> Vec2 {
        self.position.truncate()
    }

    /// Moves the entity, flagging it for the next reindex
    pub fn set_position(&mut self, position: Vec3) {
        if position != self.position {
            self.position = position;
            self.spatial.dirty = true;
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        if rotation != self.rotation {
            self.rotation = rotation;
            self.spatial.dirty = true;
        }
    }

    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    pub fn set_footprint(&mut self, footprint: Footprint) {
        self.footprint = footprint;
        self.spatial.dirty = true;
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Writes health clamped to `[0, max_health]`
    ///
    /// Dead entities stay dead. Returns `true` when this write killed the
    /// entity, in which case the caller runs the on-die hook.
    pub fn set_health(&mut self, value: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health = value.clamp(0.0, self.max_health.max(0.0));
        self.max_health > 0.0 && self.health <= 0.0
    }

    /// Replace max health and heal to full; only for objects not yet in a world
    pub fn reset_health(&mut self, max_health: f32) {
        self.max_health = max_health;
        self.health = max_health.max(0.0);
    }

    /// Entities without max health are indestructible
    pub fn is_alive(&self) -> bool {
        self.health > 0.0 || self.max_health <= 0.0
    }

    pub fn is_character(&self) -> bool {
        self.kind.is_character()
    }

    /// Ground outline placed at the current position and rotation
    pub fn outline(&self) -> Outline {
        let center = self.position_2d();
        match self.footprint {
            Footprint::None => Outline::Empty,
            Footprint::Circle { radius } => Outline::circle(center, radius),
            Footprint::Rectangle { size } => {
                Outline::centered_rectangle(size, center, self.rotation)
            }
        }
    }

    /// World bounding box: outline bounds on the ground, model height up
    pub fn bounding_box(&self) -> Aabb {
        let (lo, hi) = match self.footprint {
            Footprint::None => (self.position_2d(), self.position_2d()),
            _ => self.outline().bounds(),
        };
        Aabb::new(
            lo.extend(self.position.z),
            hi.extend(self.position.z + self.model_height),
        )
    }

    /// Whether `other` is within reach of this entity's outline
    pub fn reached(&self, target: &GameObject) -> bool {
        target.outline().distance_to(self.position_2d()) < self.outline().radius()
    }

    pub fn state(&self) -> Option<&Behavior> {
        self.orders.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::kind::WorkerData;

    fn worker() -> GameObject {
        GameObject::new("Follower", EntityKind::Worker(WorkerData::default()))
            .with_footprint(Footprint::Circle { radius: 2.0 })
            .with_health(100.0)
            .with_position(Vec3::new(10.0, 10.0, 0.0))
    }

    #[test]
    fn test_health_clamps_and_reports_death() {
        let mut w = worker();
        assert!(!w.set_health(500.0));
        assert_eq!(w.health(), 100.0);
        assert!(w.set_health(-20.0));
        assert_eq!(w.health(), 0.0);
        assert!(!w.is_alive());
    }

    #[test]
    fn test_dead_cannot_revive() {
        let mut w = worker();
        w.set_health(0.0);
        assert!(!w.set_health(50.0));
        assert!(!w.is_alive());
    }

    #[test]
    fn test_no_max_health_is_alive() {
        let tree = GameObject::new("Tree", EntityKind::Prop);
        assert!(tree.is_alive());
    }

    #[test]
    fn test_set_position_marks_dirty() {
        let mut w = worker();
        w.spatial.dirty = false;
        w.set_position(Vec3::new(10.0, 10.0, 0.0));
        assert!(!w.spatial.dirty);
        w.set_position(Vec3::new(11.0, 10.0, 0.0));
        assert!(w.spatial.dirty);
    }

    #[test]
    fn test_bounding_box_from_footprint() {
        let mut w = worker();
        w.model_height = 6.0;
        let bb = w.bounding_box();
        assert_eq!(bb.min, Vec3::new(8.0, 8.0, 0.0));
        assert_eq!(bb.max, Vec3::new(12.0, 12.0, 6.0));
    }

    #[test]
    fn test_reached_uses_owner_radius() {
        let w = worker();
        let near = GameObject::new("Tree", EntityKind::Prop)
            .with_footprint(Footprint::Circle { radius: 1.0 })
            .with_position(Vec3::new(12.5, 10.0, 0.0));
        let far = near.clone().with_position(Vec3::new(20.0, 10.0, 0.0));
        assert!(w.reached(&near));
        assert!(!w.reached(&far));
    }
}
