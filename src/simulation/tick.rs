//! Simulation tick - one step of the world
//!
//! Order within a tick:
//! 1. invalidate per-tick caches (picker)
//! 2. for each entity in insertion order: animation triggers, structure
//!    progress, state update, deferred commands
//! 3. path service update
//! 4. scene index reindex

use crate::behavior::StateId;
use crate::core::types::{EntityId, PlayerId, Tick};
use crate::entity::kind::BuildingState;
use crate::simulation::context::SimContext;
use crate::state::{State, StateResult};
use crate::world::World;
use tracing::{debug, info};

/// Resource delivered to a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Lumber,
    Gold,
}

/// Events generated during simulation tick
///
/// Returned by `run_simulation_tick` for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// The entity's current state was replaced
    StateChanged {
        entity: EntityId,
        from: Option<StateId>,
        to: Option<StateId>,
    },
    /// A worker dropped resources at a deposit
    ResourceDeposited {
        player: PlayerId,
        worker: EntityId,
        resource: ResourceKind,
        amount: u32,
    },
    /// Combat: attacker hit defender
    CombatHit {
        attacker: EntityId,
        defender: EntityId,
        damage: f32,
    },
    /// A harvester gave up its resource node for another one
    Retargeted {
        entity: EntityId,
        from: Option<EntityId>,
        to: Option<EntityId>,
    },
    ConstructionComplete {
        building: EntityId,
    },
    EntityDied {
        entity: EntityId,
    },
    EntityDestroyed {
        entity: EntityId,
        class_id: String,
    },
}

/// Summary of one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: Tick,
    pub updated: usize,
    pub events: Vec<SimulationEvent>,
}

/// Advance the world by `dt` seconds
pub fn run_simulation_tick(world: &mut World, dt: f32) -> TickReport {
    world.picker_mut().invalidate();
    let tick = world.advance_tick();
    let ids = world.entities().ids();
    let updated = ids.len();

    world.with_context(|ctx| {
        for &id in &ids {
            update_entity(ctx, id, dt);
        }
        ctx.paths.update(dt);
        ctx.index.reindex(ctx.entities);
    });

    TickReport {
        tick,
        updated,
        events: world.take_events(),
    }
}

/// One entity's update slot
pub fn update_entity(ctx: &mut SimContext<'_>, id: EntityId, dt: f32) {
    let triggers = match ctx.entities.get_mut(id) {
        Some(object) => object.animation.advance(dt),
        None => return,
    };

    update_structure(ctx, id, dt);

    let Some(mut state) = ctx.entities.get_mut(id).and_then(|o| o.orders.take()) else {
        ctx.apply_commands();
        return;
    };

    for trigger in triggers {
        state.on_trigger(id, trigger, ctx);
    }
    let result = state.update(id, ctx, dt);

    match ctx.entities.get_mut(id) {
        Some(object) => {
            if let Some(mut stale) = object.orders.restore(state) {
                stale.terminate(id, ctx);
            }
        }
        None => state.terminate(id, ctx),
    }

    if !ctx.has_pending(id) {
        match result {
            StateResult::Completed => {
                ctx.set_state(id, None, false);
            }
            StateResult::Failed => {
                if let Some(object) = ctx.entities.get_mut(id) {
                    object.orders.clear_queue();
                }
                ctx.set_state(id, None, false);
            }
            _ => {}
        }
    }

    ctx.apply_commands();
}

/// Construction and repair progress of buildings with builders
fn update_structure(ctx: &mut SimContext<'_>, id: EntityId, dt: f32) {
    let tradeoff = ctx.config.builder_tradeoff;
    let repair_rate = ctx.config.repair_rate;
    let Some(object) = ctx.entities.get_mut(id) else {
        return;
    };
    let max_health = object.max_health;
    let health = object.health();
    let Some(building) = object.kind.building_mut() else {
        return;
    };
    let crew = building.crew_factor(tradeoff);
    if crew <= 0.0 {
        return;
    }

    match building.state {
        BuildingState::Constructing => {
            building.construction_elapsed += dt * crew;
            if building.construction_elapsed >= building.construction_time {
                building.construction_elapsed = building.construction_time;
                building.state = BuildingState::Normal;
                object.set_health(max_health);
                info!("{} {:?} construction complete", object.class_id, id);
                ctx.emit(SimulationEvent::ConstructionComplete {
                    building: id,
                });
            }
        }
        BuildingState::Normal if health < max_health && building.construction_time > 0.0 => {
            let heal = repair_rate * max_health / building.construction_time * dt * crew;
            object.set_health(health + heal);
            debug!("{:?} repaired to {:.1}", id, object.health());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::kind::{BuildingData, EntityKind};
    use crate::entity::object::{Footprint, GameObject};
    use glam::{Vec2, Vec3};

    fn building(state: BuildingState, builders: u32) -> GameObject {
        let mut data = BuildingData::new(10.0);
        data.state = state;
        data.builder_count = builders;
        GameObject::new("Townhall", EntityKind::Building(data))
            .with_footprint(Footprint::Rectangle {
                size: Vec2::splat(20.0),
            })
            .with_position(Vec3::new(100.0, 100.0, 0.0))
            .with_health(100.0)
    }

    #[test]
    fn test_tick_counts_and_reports() {
        let mut world = World::flat(256.0, 32);
        let report = run_simulation_tick(&mut world, 0.1);
        assert_eq!(report.tick, 1);
        assert_eq!(report.updated, 0);
        let report = run_simulation_tick(&mut world, 0.1);
        assert_eq!(report.tick, 2);
    }

    #[test]
    fn test_construction_scales_with_builders() {
        let mut world = World::flat(256.0, 32);
        let solo = world.add(building(BuildingState::Constructing, 1));
        let crew = world.add(building(BuildingState::Constructing, 3));

        run_simulation_tick(&mut world, 1.0);

        let elapsed = |id| {
            world
                .entities()
                .get(id)
                .and_then(|o| o.kind.building())
                .map(|b| b.construction_elapsed)
                .unwrap()
        };
        assert!((elapsed(solo) - 1.0).abs() < 1e-5);
        assert!((elapsed(crew) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_construction_completes_with_full_health() {
        let mut world = World::flat(256.0, 32);
        let mut object = building(BuildingState::Constructing, 2);
        object.set_health(10.0);
        let id = world.add(object);

        let mut completed = false;
        for _ in 0..8 {
            let report = run_simulation_tick(&mut world, 1.0);
            completed |= report
                .events
                .contains(&SimulationEvent::ConstructionComplete { building: id });
        }
        let object = world.entities().get(id).unwrap();
        assert!(completed);
        assert_eq!(object.kind.building().unwrap().state, BuildingState::Normal);
        assert_eq!(object.health(), 100.0);
    }

    #[test]
    fn test_repair_rate() {
        let mut world = World::flat(256.0, 32);
        let mut object = building(BuildingState::Normal, 1);
        object.set_health(50.0);
        let id = world.add(object);

        run_simulation_tick(&mut world, 1.0);
        // 0.2 * 100 / 10 * 1s
        let health = world.entities().get(id).unwrap().health();
        assert!((health - 52.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_builders_no_progress() {
        let mut world = World::flat(256.0, 32);
        let id = world.add(building(BuildingState::Constructing, 0));
        run_simulation_tick(&mut world, 5.0);
        let b = world.entities().get(id).unwrap().kind.building().cloned().unwrap();
        assert_eq!(b.construction_elapsed, 0.0);
    }
}
