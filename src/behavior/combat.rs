//! Melee combat component used by the attack behavior
//!
//! `cast` starts a swing when the cooldown allows it. The hit lands when the
//! attack clip reports `TriggerId::AttackHit`, at which point damage is
//! rolled and applied through the context.

use crate::core::types::EntityId;
use crate::entity::object::GameObject;
use crate::entity::store::EntityStore;
use crate::simulation::context::SimContext;
use crate::state::AnimationClip;
use rand::Rng;
use tracing::debug;

/// Uniform sample from a `(min, max)` range
pub fn sample_range<R: Rng>(rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Damage of one hit with attack `a` against defense `d`
///
/// Defense scales the hit down to 40% at most; buildings take half.
pub fn hit_damage(attack: f32, defense: f32, versus_building: bool) -> f32 {
    if attack <= 0.0 {
        return 0.0;
    }
    let damage = attack * (0.4 + (1.0 - defense / attack).clamp(0.0, 1.0) * 0.6);
    if versus_building {
        damage * 0.5
    } else {
        damage
    }
}

#[derive(Debug, Clone, Default)]
pub struct Combat {
    /// Seconds until the next swing may start
    cooldown: f32,
    /// Target of the swing in flight
    pending: Option<EntityId>,
}

impl Combat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }

    pub fn pending(&self) -> Option<EntityId> {
        self.pending
    }

    pub fn update(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Target exists, is alive and visible and is not the owner
    pub fn can_attack(entities: &EntityStore, owner: EntityId, target: Option<EntityId>) -> bool {
        match target.and_then(|t| entities.get(t)) {
            Some(t) => t.id != owner && t.is_alive() && t.visible,
            None => false,
        }
    }

    /// Border distance to the target falls within the owner's attack range
    pub fn in_range(owner: &GameObject, target: &GameObject) -> bool {
        let distance =
            (target.outline().distance_to(owner.position_2d()) - owner.outline().radius()).max(0.0);
        let (min, max) = owner.combat.attack_range;
        distance >= min && distance <= max
    }

    fn within_range(entities: &EntityStore, owner: EntityId, target: EntityId) -> bool {
        match (entities.get(owner), entities.get(target)) {
            (Some(o), Some(t)) => Self::in_range(o, t),
            _ => false,
        }
    }

    /// Start a swing at `target` if ready and possible; returns whether it started
    pub fn cast(&mut self, owner: EntityId, target: Option<EntityId>, ctx: &mut SimContext<'_>) -> bool {
        let Some(target) = target else {
            return false;
        };
        if !self.is_ready()
            || !Self::can_attack(ctx.entities, owner, Some(target))
            || !Self::within_range(ctx.entities, owner, target)
        {
            return false;
        }
        let target_position = ctx.entities.get(target).map(|t| t.position_2d());
        let Some(object) = ctx.entities.get_mut(owner) else {
            return false;
        };
        if let Some(to) = target_position {
            let facing = to - object.position_2d();
            if facing.length_squared() > 0.0 {
                object.set_rotation(facing.y.atan2(facing.x));
            }
        }
        let duration = object.combat.attack_duration;
        object.animation.play(AnimationClip::attack(duration));
        self.cooldown = duration;
        self.pending = Some(target);
        true
    }

    /// Drop the swing in flight; its hit will not land
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// The swing in flight lands
    pub fn hit(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        let Some(target) = self.pending.take() else {
            return;
        };
        if !Self::can_attack(ctx.entities, owner, Some(target)) {
            return;
        }
        let (Some(attacker), Some(defender)) = (ctx.entities.get(owner), ctx.entities.get(target))
        else {
            return;
        };
        let attack = attacker.combat.attack;
        let defense = defender.combat.defense;
        let versus_building = defender.kind.is_building();

        let a = sample_range(&mut *ctx.rng, attack);
        let d = sample_range(&mut *ctx.rng, defense);
        let damage = hit_damage(a, d, versus_building);
        debug!("{:?} hits {:?} for {:.1}", owner, target, damage);
        ctx.apply_damage(owner, target, damage);
    }
}
