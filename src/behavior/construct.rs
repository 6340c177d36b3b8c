//! Construct and repair: walk to a building and work on it until done
//!
//! A worker in its work phase counts as one builder of the building. The
//! building's own update turns the builder count into construction progress
//! or repaired health. The building must belong to the worker's player and
//! be under construction (construct) or operational (repair).

use crate::behavior::movement::MoveToTarget;
use crate::core::types::EntityId;
use crate::entity::kind::BuildingState;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::state::{Activation, AnimationClip, State, StateResult};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    Construct,
    Repair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    MoveToBuilding,
    Work,
}

#[derive(Debug, Clone)]
pub struct BuildingWork {
    activation: Activation,
    mode: WorkMode,
    phase: Phase,
    building: EntityId,
    mover: Option<MoveToTarget>,
    /// This worker is counted in the building's builder count
    claimed: bool,
}

impl BuildingWork {
    pub fn construct(building: EntityId) -> Self {
        Self::new(WorkMode::Construct, building)
    }

    pub fn repair(building: EntityId) -> Self {
        Self::new(WorkMode::Repair, building)
    }

    fn new(mode: WorkMode, building: EntityId) -> Self {
        Self {
            activation: Activation::default(),
            mode,
            phase: Phase::MoveToBuilding,
            building,
            mover: None,
            claimed: false,
        }
    }

    pub fn mode(&self) -> WorkMode {
        self.mode
    }

    pub fn building(&self) -> EntityId {
        self.building
    }

    pub fn is_working(&self) -> bool {
        self.phase == Phase::Work
    }

    /// Construction: gone or no longer under construction.
    /// Repair: gone, not operational, or back at full health.
    fn is_done(&self, entities: &EntityStore) -> bool {
        let Some(object) = entities.get(self.building) else {
            return true;
        };
        let Some(building) = object.kind.building() else {
            return true;
        };
        match self.mode {
            WorkMode::Construct => building.state != BuildingState::Constructing,
            WorkMode::Repair => {
                building.state != BuildingState::Normal || object.health() >= object.max_health
            }
        }
    }

    /// Panics unless the building belongs to the worker's player and is in
    /// the phase this work needs. A building that finished or was destroyed
    /// since the order was given only ends the work.
    fn assert_assignable(&self, owner: EntityId, entities: &EntityStore) {
        let (Some(worker), Some(object)) = (entities.get(owner), entities.get(self.building))
        else {
            return;
        };
        let Some(building) = object.kind.building() else {
            return;
        };
        assert_eq!(
            worker.owner, object.owner,
            "{:?} on a building of another player",
            self.mode
        );
        let allowed = match self.mode {
            WorkMode::Construct => matches!(
                building.state,
                BuildingState::Constructing | BuildingState::Normal | BuildingState::Destroyed
            ),
            WorkMode::Repair => matches!(
                building.state,
                BuildingState::Normal | BuildingState::Destroyed
            ),
        };
        assert!(
            allowed,
            "{:?} on a building in state {:?}",
            self.mode, building.state
        );
    }

    fn stop(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(mut mover) = self.mover.take() {
            mover.terminate(owner, ctx);
        }
    }

    fn release(&mut self, ctx: &mut SimContext<'_>) {
        if !std::mem::take(&mut self.claimed) {
            return;
        }
        if let Some(building) = ctx
            .entities
            .get_mut(self.building)
            .and_then(|o| o.kind.building_mut())
        {
            building.release_builder();
        }
    }

    fn start_work(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        self.stop(owner, ctx);
        if let Some(building) = ctx
            .entities
            .get_mut(self.building)
            .and_then(|o| o.kind.building_mut())
        {
            building.claim_builder();
            self.claimed = true;
        }
        let target = ctx.entities.get(self.building).map(|b| b.position_2d());
        if let Some(worker) = ctx.entities.get_mut(owner) {
            if let Some(to) = target {
                let facing = to - worker.position_2d();
                if facing.length_squared() > 0.0 {
                    worker.set_rotation(facing.y.atan2(facing.x));
                }
            }
            worker.animation.play(AnimationClip::new("Build", 1.0, true));
        }
        debug!("{:?} starts {:?} on {:?}", owner, self.mode, self.building);
        self.phase = Phase::Work;
    }
}

impl State for BuildingWork {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        if self.activation.activate_if_inactive() {
            self.assert_assignable(owner, ctx.entities);
        }

        match self.phase {
            Phase::MoveToBuilding => {
                if self.is_done(ctx.entities) {
                    self.stop(owner, ctx);
                    return self.activation.finish(StateResult::Completed);
                }
                let building = self.building;
                let result = self
                    .mover
                    .get_or_insert_with(|| MoveToTarget::touching(building))
                    .update(owner, ctx, dt);
                if result == StateResult::Failed {
                    return self.activation.finish(StateResult::Failed);
                }

                let reached = match (ctx.entities.get(owner), ctx.entities.get(building)) {
                    (Some(worker), Some(target)) => worker.reached(target),
                    _ => false,
                };
                if reached {
                    self.start_work(owner, ctx);
                } else if result == StateResult::Completed {
                    self.stop(owner, ctx);
                }
                StateResult::Active
            }
            Phase::Work => {
                if self.is_done(ctx.entities) {
                    self.release(ctx);
                    if let Some(worker) = ctx.entities.get_mut(owner) {
                        worker.animation.stop();
                    }
                    return self.activation.finish(StateResult::Completed);
                }
                StateResult::Active
            }
        }
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        self.stop(owner, ctx);
        if self.claimed {
            if let Some(worker) = ctx.entities.get_mut(owner) {
                worker.animation.stop();
            }
        }
        self.release(ctx);
        self.phase = Phase::MoveToBuilding;
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        if let Some(mover) = &self.mover {
            mover.draw(owner, entities, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::core::types::PlayerId;
    use crate::entity::kind::{BuildingData, EntityKind, WorkerData};
    use crate::entity::object::{Footprint, GameObject};
    use crate::entity::player::Player;
    use crate::simulation::tick::{run_simulation_tick, SimulationEvent};
    use crate::world::World;
    use glam::{Vec2, Vec3};

    fn world() -> World {
        let mut world = World::flat(512.0, 64);
        world.add_player(Player::new(PlayerId(1), "red", 0));
        world
    }

    fn worker(world: &mut World, x: f32) -> EntityId {
        world.add(
            GameObject::new("Follower", EntityKind::Worker(WorkerData::default()))
                .with_owner(PlayerId(1))
                .with_position(Vec3::new(x, 100.0, 0.0))
                .with_footprint(Footprint::Circle { radius: 2.0 })
                .with_health(20.0)
                .with_speed(30.0),
        )
    }

    fn site(world: &mut World, state: BuildingState, health: f32) -> EntityId {
        let mut data = BuildingData::new(4.0);
        data.state = state;
        let mut object = GameObject::new("Farmhouse", EntityKind::Building(data))
            .with_owner(PlayerId(1))
            .with_position(Vec3::new(200.0, 100.0, 0.0))
            .with_footprint(Footprint::Rectangle {
                size: Vec2::splat(20.0),
            })
            .with_health(100.0);
        object.set_health(health);
        world.add(object)
    }

    fn builders(world: &World, building: EntityId) -> u32 {
        world
            .entities()
            .get(building)
            .and_then(|o| o.kind.building())
            .map_or(0, |b| b.builder_count)
    }

    #[test]
    fn test_construct_until_complete() {
        let mut world = world();
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::Constructing, 10.0);
        world.set_state(peon, Some(Behavior::Construct(BuildingWork::construct(farm))));

        let mut completed = false;
        for _ in 0..200 {
            let report = run_simulation_tick(&mut world, 0.1);
            completed |= report
                .events
                .contains(&SimulationEvent::ConstructionComplete { building: farm });
            if completed && builders(&world, farm) == 0 {
                break;
            }
        }
        assert!(completed);
        assert_eq!(builders(&world, farm), 0);
        let state = world.entities().get(farm).and_then(|o| o.kind.building()).map(|b| b.state);
        assert_eq!(state, Some(BuildingState::Normal));
    }

    #[test]
    fn test_repair_stops_at_full_health() {
        let mut world = world();
        let peon = worker(&mut world, 188.0);
        let farm = site(&mut world, BuildingState::Normal, 90.0);
        world.set_state(peon, Some(Behavior::Repair(BuildingWork::repair(farm))));

        for _ in 0..100 {
            run_simulation_tick(&mut world, 0.1);
        }
        assert_eq!(world.entities().get(farm).unwrap().health(), 100.0);
        assert_eq!(builders(&world, farm), 0);
        assert!(matches!(
            world.entities().get(peon).unwrap().state(),
            Some(Behavior::Idle(_))
        ));
    }

    #[test]
    fn test_interrupted_builder_released_once() {
        let mut world = world();
        let a = worker(&mut world, 188.0);
        let b = worker(&mut world, 188.0);
        let farm = site(&mut world, BuildingState::Constructing, 10.0);
        world.set_state(a, Some(Behavior::Construct(BuildingWork::construct(farm))));
        world.set_state(b, Some(Behavior::Construct(BuildingWork::construct(farm))));

        run_simulation_tick(&mut world, 0.1);
        assert_eq!(builders(&world, farm), 2);

        world.set_state(a, None);
        assert_eq!(builders(&world, farm), 1);
        world.set_state(a, None);
        assert_eq!(builders(&world, farm), 1);
    }

    #[test]
    fn test_finished_building_completes() {
        let mut world = world();
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::Normal, 100.0);
        let mut work = BuildingWork::construct(farm);
        let result = world.with_context(|ctx| work.update(peon, ctx, 0.1));
        assert_eq!(result, StateResult::Completed);
    }

    #[test]
    fn test_missing_building_completes() {
        let mut world = world();
        let peon = worker(&mut world, 150.0);
        let mut work = BuildingWork::construct(EntityId(999));
        let result = world.with_context(|ctx| work.update(peon, ctx, 0.1));
        assert_eq!(result, StateResult::Completed);
    }

    #[test]
    #[should_panic(expected = "state PreConstruct")]
    fn test_construct_before_placement_panics() {
        let mut world = world();
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::PreConstruct, 10.0);
        let mut work = BuildingWork::construct(farm);
        world.with_context(|ctx| work.update(peon, ctx, 0.1));
    }

    #[test]
    #[should_panic(expected = "state Wait")]
    fn test_construct_waiting_site_panics() {
        let mut world = world();
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::Wait, 10.0);
        let mut work = BuildingWork::construct(farm);
        world.with_context(|ctx| work.update(peon, ctx, 0.1));
    }

    #[test]
    #[should_panic(expected = "another player")]
    fn test_finished_foreign_building_panics() {
        let mut world = world();
        world.add_player(Player::new(PlayerId(2), "blue", 1));
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::Normal, 100.0);
        world.entities_mut().get_mut(farm).unwrap().owner = Some(PlayerId(2));
        let mut work = BuildingWork::construct(farm);
        world.with_context(|ctx| work.update(peon, ctx, 0.1));
    }

    #[test]
    #[should_panic(expected = "state Constructing")]
    fn test_repair_of_site_under_construction_panics() {
        let mut world = world();
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::Constructing, 10.0);
        let mut work = BuildingWork::repair(farm);
        world.with_context(|ctx| work.update(peon, ctx, 0.1));
    }

    #[test]
    #[should_panic]
    fn test_foreign_site_panics() {
        let mut world = world();
        world.add_player(Player::new(PlayerId(2), "blue", 1));
        let peon = worker(&mut world, 150.0);
        let farm = site(&mut world, BuildingState::Constructing, 10.0);
        world.entities_mut().get_mut(farm).unwrap().owner = Some(PlayerId(2));
        let mut work = BuildingWork::construct(farm);
        world.with_context(|ctx| work.update(peon, ctx, 0.1));
    }
}
