//! Idle: wait for commands, attack opponents that come into view

use crate::behavior::attack::Attack;
use crate::behavior::Behavior;
use crate::core::types::EntityId;
use crate::simulation::context::SimContext;
use crate::state::{AnimationClip, State, StateResult};
use ordered_float::OrderedFloat;
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Idle {
    /// Seconds until the next scan
    timer: f32,
    started: bool,
}

impl Idle {
    pub fn new(timer: f32) -> Self {
        Self {
            timer,
            started: false,
        }
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    /// Nearest live, visible opponent within view distance
    fn scan(owner: EntityId, ctx: &SimContext<'_>) -> Option<EntityId> {
        let object = ctx.entities.get(owner)?;
        let position = object.position_2d();
        ctx.index
            .nearby_objects_precise(ctx.entities, position, object.view_distance)
            .into_iter()
            .filter(|&id| id != owner && ctx.is_opponent(owner, id))
            .filter_map(|id| ctx.entities.get(id))
            .filter(|o| o.is_alive() && o.visible)
            .min_by_key(|o| OrderedFloat(o.position_2d().distance_squared(position)))
            .map(|o| o.id)
    }
}

impl Default for Idle {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl State for Idle {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        let Some(object) = ctx.entities.get_mut(owner) else {
            return StateResult::Failed;
        };
        if object.orders.has_queued() {
            return StateResult::Completed;
        }
        if !self.started {
            self.started = true;
            object.animation.play(AnimationClip::idle());
        }

        self.timer -= dt;
        if self.timer > 0.0 {
            return StateResult::Active;
        }
        let (min, max) = (ctx.config.idle_scan_min, ctx.config.idle_scan_max);
        self.timer = ctx.rng.gen_range(min..max);

        let can_fight = object.combat.attack.1 > 0.0;
        if can_fight {
            if let Some(target) = Self::scan(owner, ctx) {
                debug!("{:?} spotted {:?}", owner, target);
                ctx.request_state(owner, Behavior::Attack(Attack::target(target)));
            }
        }
        StateResult::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlayerId;
    use crate::entity::kind::EntityKind;
    use crate::entity::object::{CombatStats, Footprint, GameObject};
    use crate::entity::player::Player;
    use crate::world::World;
    use glam::Vec3;

    fn footman(world: &mut World, owner: u8, x: f32) -> EntityId {
        world.add(
            GameObject::new("Footman", EntityKind::Fighter)
                .with_owner(PlayerId(owner))
                .with_position(Vec3::new(x, 50.0, 0.0))
                .with_footprint(Footprint::Circle { radius: 2.0 })
                .with_health(100.0)
                .with_speed(10.0)
                .with_combat(CombatStats {
                    attack: (5.0, 10.0),
                    ..CombatStats::default()
                }),
        )
    }

    fn two_teams() -> World {
        let mut world = World::flat(512.0, 64);
        world.add_player(Player::new(PlayerId(1), "red", 0));
        world.add_player(Player::new(PlayerId(2), "blue", 1));
        world
    }

    #[test]
    fn test_completes_when_commands_queued() {
        let mut world = two_teams();
        let id = footman(&mut world, 1, 50.0);
        world.set_state(id, None);
        world.enqueue_state(id, Behavior::Idle(Idle::new(5.0)));

        let mut idle = Idle::new(5.0);
        let result = world.with_context(|ctx| idle.update(id, ctx, 0.1));
        assert_eq!(result, StateResult::Completed);
    }

    #[test]
    fn test_scan_requests_attack_on_opponent() {
        let mut world = two_teams();
        let id = footman(&mut world, 1, 50.0);
        let enemy = footman(&mut world, 2, 120.0);
        let _friend = footman(&mut world, 1, 60.0);

        let mut idle = Idle::new(0.05);
        world.with_context(|ctx| {
            assert_eq!(idle.update(id, ctx, 0.1), StateResult::Active);
        });
        match world.entities().get(id).unwrap().state() {
            Some(Behavior::Attack(attack)) => assert_eq!(attack.target_id(), Some(enemy)),
            other => panic!("expected attack, got {:?}", other.map(Behavior::state_id)),
        }
        assert!((1.0..2.0).contains(&idle.timer()));
    }

    #[test]
    fn test_ignores_opponent_out_of_view() {
        let mut world = two_teams();
        let id = footman(&mut world, 1, 50.0);
        footman(&mut world, 2, 400.0);

        let mut idle = Idle::new(0.0);
        world.with_context(|ctx| idle.update(id, ctx, 0.1));
        assert!(!matches!(
            world.entities().get(id).unwrap().state(),
            Some(Behavior::Attack(_))
        ));
    }
}
