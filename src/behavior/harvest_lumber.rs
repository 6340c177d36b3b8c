//! Lumber harvesting: walk to a tree, chop until full, carry it home
//!
//! Chopping happens on the `HarvestHit` trigger of the looping harvest clip.
//! A tree admits a limited number of choppers; the claim is taken when the
//! worker starts chopping and released when it stops for any reason.

use crate::behavior::deposit::{self, find_deposit, is_valid_deposit};
use crate::behavior::movement::MoveToTarget;
use crate::core::types::EntityId;
use crate::entity::kind::BuildingState;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::simulation::tick::{ResourceKind, SimulationEvent};
use crate::state::{Activation, AnimationClip, State, StateResult, TriggerId};
use glam::Vec2;
use ordered_float::OrderedFloat;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    MoveToTree,
    Harvest,
    BackToDeposit,
}

#[derive(Debug, Clone)]
pub struct HarvestLumber {
    activation: Activation,
    phase: Phase,
    tree: Option<EntityId>,
    deposit: Option<EntityId>,
    mover: Option<MoveToTarget>,
    /// Tree whose harvester count this state incremented
    claimed: Option<EntityId>,
}

/// Tree exists, has lumber left and room for another chopper
pub fn can_harvest_tree(entities: &EntityStore, tree: Option<EntityId>) -> bool {
    tree.and_then(|t| entities.get(t))
        .and_then(|o| o.kind.tree())
        .is_some_and(|node| node.amount > 0 && node.has_room())
}

/// Nearest harvestable tree within `radius` of `position`, other than `existing`
pub fn find_another_tree(
    ctx: &SimContext<'_>,
    existing: Option<EntityId>,
    position: Vec2,
    radius: f32,
) -> Option<EntityId> {
    ctx.index
        .nearby_objects_precise(ctx.entities, position, radius)
        .into_iter()
        .filter(|&id| Some(id) != existing && can_harvest_tree(ctx.entities, Some(id)))
        .filter_map(|id| ctx.entities.get(id))
        .min_by_key(|o| OrderedFloat(o.position_2d().distance_squared(position)))
        .map(|o| o.id)
}

impl HarvestLumber {
    /// Start at a tree
    pub fn tree(tree: EntityId) -> Self {
        Self::new(Phase::MoveToTree, Some(tree), None)
    }

    /// Start by carrying the current load to `deposit`
    pub fn from_deposit(deposit: EntityId) -> Self {
        Self::new(Phase::BackToDeposit, None, Some(deposit))
    }

    fn new(phase: Phase, tree: Option<EntityId>, deposit: Option<EntityId>) -> Self {
        Self {
            activation: Activation::default(),
            phase,
            tree,
            deposit,
            mover: None,
            claimed: None,
        }
    }

    pub fn tree_id(&self) -> Option<EntityId> {
        self.tree
    }

    pub fn is_harvesting(&self) -> bool {
        self.phase == Phase::Harvest
    }

    fn activate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(deposit) = self.deposit {
            if let (Some(worker), Some(building)) =
                (ctx.entities.get(owner), ctx.entities.get(deposit))
            {
                assert_eq!(
                    worker.owner, building.owner,
                    "lumber deposit {:?} not owned by the worker's player",
                    deposit
                );
                if building.kind.building().map(|b| b.state) != Some(BuildingState::Normal) {
                    self.deposit = None;
                }
            }
        }
        if let Some(worker) = ctx.entities.get_mut(owner).and_then(|o| o.kind.worker_mut()) {
            worker.gold_carried = 0;
        }
    }

    fn stop(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(mut mover) = self.mover.take() {
            mover.terminate(owner, ctx);
        }
    }

    fn release(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(tree) = self.claimed.take() {
            if let Some(node) = ctx.entities.get_mut(tree).and_then(|o| o.kind.tree_mut()) {
                node.release();
            }
        }
    }

    fn retarget(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        let Some(position) = ctx.entities.get(owner).map(|o| o.position_2d()) else {
            return;
        };
        let radius = ctx.config.resource_search_radius;
        let next = find_another_tree(ctx, self.tree, position, radius);
        debug!("{:?} retargets tree {:?} -> {:?}", owner, self.tree, next);
        ctx.emit(SimulationEvent::Retargeted {
            entity: owner,
            from: self.tree,
            to: next,
        });
        self.tree = next;
        self.stop(owner, ctx);
    }

    fn update_move_to_tree(
        &mut self,
        owner: EntityId,
        ctx: &mut SimContext<'_>,
        dt: f32,
    ) -> StateResult {
        if !can_harvest_tree(ctx.entities, self.tree) {
            self.retarget(owner, ctx);
            if self.tree.is_none() {
                if deposit::carried(ctx, owner, ResourceKind::Lumber) == 0 {
                    return StateResult::Failed;
                }
                self.phase = Phase::BackToDeposit;
                return StateResult::Active;
            }
        }
        let Some(tree) = self.tree else {
            return StateResult::Failed;
        };

        let result = self
            .mover
            .get_or_insert_with(|| MoveToTarget::touching(tree))
            .update(owner, ctx, dt);
        if result == StateResult::Failed {
            return StateResult::Failed;
        }

        let reached = match (ctx.entities.get(owner), ctx.entities.get(tree)) {
            (Some(worker), Some(target)) => worker.reached(target),
            _ => false,
        };
        if reached {
            self.stop(owner, ctx);
            let hit_time = ctx.config.harvest_hit_time;
            let tree_position = ctx.entities.get(tree).map(|t| t.position_2d());
            if let Some(worker) = ctx.entities.get_mut(owner) {
                if let Some(to) = tree_position {
                    let facing = to - worker.position_2d();
                    if facing.length_squared() > 0.0 {
                        worker.set_rotation(facing.y.atan2(facing.x));
                    }
                }
                worker.animation.play(AnimationClip::harvest(hit_time));
            }
            if let Some(node) = ctx.entities.get_mut(tree).and_then(|o| o.kind.tree_mut()) {
                node.claim();
                self.claimed = Some(tree);
            }
            self.phase = Phase::Harvest;
        } else if result == StateResult::Completed {
            self.retarget(owner, ctx);
        }
        StateResult::Active
    }

    fn update_back_to_deposit(
        &mut self,
        owner: EntityId,
        ctx: &mut SimContext<'_>,
        dt: f32,
    ) -> StateResult {
        let valid = self
            .deposit
            .is_some_and(|d| is_valid_deposit(ctx, owner, d, ResourceKind::Lumber));
        if !valid {
            self.deposit = find_deposit(ctx, owner, ResourceKind::Lumber);
            self.stop(owner, ctx);
        }
        let Some(deposit) = self.deposit else {
            return StateResult::Failed;
        };

        let result = self
            .mover
            .get_or_insert_with(|| MoveToTarget::touching(deposit))
            .update(owner, ctx, dt);
        if result == StateResult::Failed {
            return StateResult::Failed;
        }

        let reached = match (ctx.entities.get(owner), ctx.entities.get(deposit)) {
            (Some(worker), Some(target)) => worker.reached(target),
            _ => false,
        };
        if reached {
            self.stop(owner, ctx);
            deposit::unload(ctx, owner, ResourceKind::Lumber);
            self.deposit = None;
            self.phase = Phase::MoveToTree;
        } else if result == StateResult::Completed {
            self.deposit = find_deposit(ctx, owner, ResourceKind::Lumber);
            self.stop(owner, ctx);
        }
        StateResult::Active
    }

    /// One axe hit on the claimed tree
    fn harvest_once(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        let Some(tree) = self.tree.filter(|_| self.phase == Phase::Harvest) else {
            return;
        };
        let per_hit = ctx.config.lumber_per_hit;
        let space = match ctx.entities.get(owner).and_then(|o| o.kind.worker()) {
            Some(worker) => worker.lumber_space(),
            None => return,
        };
        let Some(node) = ctx.entities.get_mut(tree).and_then(|o| o.kind.tree_mut()) else {
            return;
        };
        let taken = node.take(per_hit.min(space));
        let felled = node.amount == 0;

        let full = match ctx.entities.get_mut(owner).and_then(|o| o.kind.worker_mut()) {
            Some(worker) => {
                worker.lumber_carried += taken;
                worker.lumber_space() == 0
            }
            None => return,
        };

        if felled {
            self.release(ctx);
            debug!("{:?} felled tree {:?}", owner, tree);
            self.tree = None;
            self.phase = Phase::MoveToTree;
        }
        if full {
            self.release(ctx);
            self.phase = Phase::BackToDeposit;
        }
        if felled || full {
            if let Some(worker) = ctx.entities.get_mut(owner) {
                worker.animation.stop();
            }
        }
    }
}

impl State for HarvestLumber {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        if self.activation.activate_if_inactive() {
            self.activate(owner, ctx);
        }

        let result = match self.phase {
            Phase::MoveToTree => self.update_move_to_tree(owner, ctx, dt),
            Phase::Harvest => {
                // Tree removed or felled by someone else
                let lumber = self
                    .tree
                    .and_then(|t| ctx.entities.get(t))
                    .and_then(|o| o.kind.tree())
                    .map_or(0, |node| node.amount);
                if lumber == 0 {
                    self.release(ctx);
                    self.tree = None;
                    self.phase = Phase::MoveToTree;
                }
                StateResult::Active
            }
            Phase::BackToDeposit => self.update_back_to_deposit(owner, ctx, dt),
        };
        if result.is_terminal() {
            self.activation.finish(result)
        } else {
            result
        }
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        self.stop(owner, ctx);
        self.release(ctx);
        if self.phase == Phase::Harvest {
            if let Some(worker) = ctx.entities.get_mut(owner) {
                worker.animation.stop();
            }
        }
        self.phase = Phase::MoveToTree;
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        if let Some(mover) = &self.mover {
            mover.draw(owner, entities, sink);
        }
    }

    fn on_trigger(&mut self, owner: EntityId, trigger: TriggerId, ctx: &mut SimContext<'_>) {
        if trigger == TriggerId::HarvestHit {
            self.harvest_once(owner, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::core::types::PlayerId;
    use crate::entity::kind::{BuildingData, EntityKind, ResourceNode, WorkerData};
    use crate::entity::object::{Footprint, GameObject};
    use crate::entity::player::Player;
    use crate::simulation::tick::run_simulation_tick;
    use crate::world::World;
    use glam::Vec3;

    fn world() -> World {
        let mut world = World::flat(512.0, 64);
        world.add_player(Player::new(PlayerId(1), "red", 0));
        world
    }

    fn worker(world: &mut World, x: f32, y: f32) -> EntityId {
        world.add(
            GameObject::new("Follower", EntityKind::Worker(WorkerData::default()))
                .with_owner(PlayerId(1))
                .with_position(Vec3::new(x, y, 0.0))
                .with_footprint(Footprint::Circle { radius: 2.0 })
                .with_health(20.0)
                .with_speed(30.0),
        )
    }

    fn tree(world: &mut World, x: f32, y: f32, lumber: u32) -> EntityId {
        world.add(
            GameObject::new("Tree", EntityKind::Tree(ResourceNode::new(lumber, 2)))
                .with_position(Vec3::new(x, y, 0.0))
                .with_footprint(Footprint::Circle { radius: 3.0 }),
        )
    }

    fn townhall(world: &mut World, x: f32, y: f32) -> EntityId {
        world.add(
            GameObject::new("Townhall", EntityKind::Building(BuildingData::new(60.0)))
                .with_owner(PlayerId(1))
                .with_position(Vec3::new(x, y, 0.0))
                .with_footprint(Footprint::Rectangle {
                    size: Vec2::splat(20.0),
                })
                .with_health(1000.0),
        )
    }

    fn harvesters(world: &World, tree: EntityId) -> u32 {
        world
            .entities()
            .get(tree)
            .and_then(|o| o.kind.tree())
            .map_or(0, |n| n.harvester_count)
    }

    #[test]
    fn test_harvest_and_deposit_cycle() {
        let mut world = world();
        let _hall = townhall(&mut world, 100.0, 100.0);
        let peon = worker(&mut world, 130.0, 100.0);
        let oak = tree(&mut world, 180.0, 100.0, 100);
        world.set_state(peon, Some(Behavior::HarvestLumber(HarvestLumber::tree(oak))));

        for _ in 0..400 {
            run_simulation_tick(&mut world, 0.1);
            if world.players().get(PlayerId(1)).unwrap().lumber > 0 {
                break;
            }
        }
        assert_eq!(world.players().get(PlayerId(1)).unwrap().lumber, 10);
        let remaining = world.entities().get(oak).and_then(|o| o.kind.tree()).unwrap();
        assert_eq!(remaining.amount, 90);
        assert_eq!(remaining.harvester_count, 0);
    }

    #[test]
    fn test_no_tree_and_empty_pocket_fails() {
        let mut world = world();
        let peon = worker(&mut world, 130.0, 100.0);
        let stump = tree(&mut world, 150.0, 100.0, 0);
        let mut harvest = HarvestLumber::tree(stump);

        let result = world.with_context(|ctx| harvest.update(peon, ctx, 0.1));
        assert_eq!(result, StateResult::Failed);
    }

    #[test]
    fn test_no_tree_with_lumber_goes_home() {
        let mut world = world();
        let _hall = townhall(&mut world, 100.0, 100.0);
        let peon = worker(&mut world, 130.0, 100.0);
        world
            .entities_mut()
            .get_mut(peon)
            .and_then(|o| o.kind.worker_mut())
            .unwrap()
            .lumber_carried = 4;
        let mut harvest = HarvestLumber::tree(EntityId(999));

        let result = world.with_context(|ctx| harvest.update(peon, ctx, 0.1));
        assert_eq!(result, StateResult::Active);
        assert_eq!(harvest.phase, Phase::BackToDeposit);
    }

    #[test]
    fn test_full_tree_retargets_to_nearest_other() {
        let mut world = world();
        let peon = worker(&mut world, 100.0, 100.0);
        let busy = tree(&mut world, 110.0, 100.0, 50);
        let far = tree(&mut world, 200.0, 100.0, 50);
        let near = tree(&mut world, 140.0, 100.0, 50);
        for _ in 0..2 {
            world
                .entities_mut()
                .get_mut(busy)
                .and_then(|o| o.kind.tree_mut())
                .unwrap()
                .claim();
        }

        let mut harvest = HarvestLumber::tree(busy);
        world.with_context(|ctx| harvest.update(peon, ctx, 0.1));
        assert_eq!(harvest.tree_id(), Some(near));
        assert_ne!(harvest.tree_id(), Some(far));
        assert!(world.take_events().contains(&SimulationEvent::Retargeted {
            entity: peon,
            from: Some(busy),
            to: Some(near),
        }));
    }

    #[test]
    fn test_terminate_releases_claim() {
        let mut world = world();
        let peon = worker(&mut world, 100.0, 100.0);
        let oak = tree(&mut world, 104.0, 100.0, 50);
        world.set_state(peon, Some(Behavior::HarvestLumber(HarvestLumber::tree(oak))));

        for _ in 0..5 {
            run_simulation_tick(&mut world, 0.1);
        }
        assert_eq!(harvesters(&world, oak), 1);

        world.set_state(peon, None);
        assert_eq!(harvesters(&world, oak), 0);
    }

    #[test]
    #[should_panic]
    fn test_foreign_deposit_panics() {
        let mut world = world();
        world.add_player(Player::new(PlayerId(2), "blue", 1));
        let peon = worker(&mut world, 100.0, 100.0);
        let hall = townhall(&mut world, 150.0, 100.0);
        world.entities_mut().get_mut(hall).unwrap().owner = Some(PlayerId(2));

        let mut harvest = HarvestLumber::from_deposit(hall);
        world.with_context(|ctx| harvest.update(peon, ctx, 0.1));
    }
}
