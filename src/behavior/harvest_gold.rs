//! Gold harvesting: enter a goldmine, work inside, carry the gold home
//!
//! The worker disappears from the world while inside the mine and comes
//! back out at the mine's spawn point. Only a limited number of workers
//! may work inside at once; the others wait unspawned for their turn.

use crate::behavior::deposit::{self, find_deposit, is_valid_deposit};
use crate::behavior::movement::MoveToTarget;
use crate::core::types::EntityId;
use crate::entity::kind::BuildingState;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::simulation::tick::{ResourceKind, SimulationEvent};
use crate::state::{Activation, State, StateResult};
use glam::Vec2;
use ordered_float::OrderedFloat;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    MoveToGoldmine,
    Wait,
    Harvest,
    BackToDeposit,
}

#[derive(Debug, Clone)]
pub struct HarvestGold {
    activation: Activation,
    phase: Phase,
    goldmine: Option<EntityId>,
    deposit: Option<EntityId>,
    mover: Option<MoveToTarget>,
    /// Mine whose harvester count this state incremented
    claimed: Option<EntityId>,
    /// Where the worker comes back out, set while it is inside a mine
    exit: Option<Vec2>,
    elapsed: f32,
}

/// Goldmine exists and has gold left
pub fn can_harvest_goldmine(entities: &EntityStore, goldmine: Option<EntityId>) -> bool {
    goldmine
        .and_then(|g| entities.get(g))
        .and_then(|o| o.kind.goldmine())
        .is_some_and(|mine| mine.node.amount > 0)
}

/// Spawn point of a goldmine in world coordinates
pub fn spawn_position(entities: &EntityStore, goldmine: EntityId) -> Option<Vec2> {
    let object = entities.get(goldmine)?;
    let mine = object.kind.goldmine()?;
    Some(object.position_2d() + mine.spawn_point)
}

/// Nearest goldmine with gold left within `radius`, other than `existing`
pub fn find_another_goldmine(
    ctx: &SimContext<'_>,
    existing: Option<EntityId>,
    position: Vec2,
    radius: f32,
) -> Option<EntityId> {
    ctx.index
        .nearby_objects_precise(ctx.entities, position, radius)
        .into_iter()
        .filter(|&id| Some(id) != existing && can_harvest_goldmine(ctx.entities, Some(id)))
        .filter_map(|id| ctx.entities.get(id))
        .min_by_key(|o| OrderedFloat(o.position_2d().distance_squared(position)))
        .map(|o| o.id)
}

impl HarvestGold {
    pub fn goldmine(goldmine: EntityId) -> Self {
        Self::new(Phase::MoveToGoldmine, Some(goldmine), None)
    }

    /// Start by carrying the current load to `deposit`
    pub fn from_deposit(deposit: EntityId) -> Self {
        Self::new(Phase::BackToDeposit, None, Some(deposit))
    }

    fn new(phase: Phase, goldmine: Option<EntityId>, deposit: Option<EntityId>) -> Self {
        Self {
            activation: Activation::default(),
            phase,
            goldmine,
            deposit,
            mover: None,
            claimed: None,
            exit: None,
            elapsed: 0.0,
        }
    }

    pub fn goldmine_id(&self) -> Option<EntityId> {
        self.goldmine
    }

    /// Worker is currently unspawned inside a mine
    pub fn is_inside(&self) -> bool {
        self.exit.is_some()
    }

    fn activate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(deposit) = self.deposit {
            if let (Some(worker), Some(building)) =
                (ctx.entities.get(owner), ctx.entities.get(deposit))
            {
                assert_eq!(
                    worker.owner, building.owner,
                    "gold deposit {:?} not owned by the worker's player",
                    deposit
                );
                if building.kind.building().map(|b| b.state) != Some(BuildingState::Normal) {
                    self.deposit = None;
                }
            }
        }
        if let Some(worker) = ctx.entities.get_mut(owner).and_then(|o| o.kind.worker_mut()) {
            worker.lumber_carried = 0;
        }
    }

    fn stop(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(mut mover) = self.mover.take() {
            mover.terminate(owner, ctx);
        }
    }

    fn release(&mut self, ctx: &mut SimContext<'_>) {
        if let Some(goldmine) = self.claimed.take() {
            if let Some(mine) = ctx.entities.get_mut(goldmine).and_then(|o| o.kind.goldmine_mut()) {
                mine.node.release();
            }
        }
    }

    fn leave_mine(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(exit) = self.exit.take() {
            ctx.respawn(owner, exit);
        }
    }

    fn retarget(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        let Some(position) = ctx.entities.get(owner).map(|o| o.position_2d()) else {
            return;
        };
        let radius = ctx.config.resource_search_radius;
        let next = find_another_goldmine(ctx, self.goldmine, position, radius);
        debug!("{:?} retargets goldmine {:?} -> {:?}", owner, self.goldmine, next);
        ctx.emit(SimulationEvent::Retargeted {
            entity: owner,
            from: self.goldmine,
            to: next,
        });
        self.goldmine = next;
        self.stop(owner, ctx);
    }

    fn update_move_to_goldmine(
        &mut self,
        owner: EntityId,
        ctx: &mut SimContext<'_>,
        dt: f32,
    ) -> StateResult {
        if !can_harvest_goldmine(ctx.entities, self.goldmine) {
            self.retarget(owner, ctx);
            if self.goldmine.is_none() {
                if deposit::carried(ctx, owner, ResourceKind::Gold) == 0 {
                    return StateResult::Failed;
                }
                self.phase = Phase::BackToDeposit;
                return StateResult::Active;
            }
        }
        let Some(goldmine) = self.goldmine else {
            return StateResult::Failed;
        };

        let result = self
            .mover
            .get_or_insert_with(|| MoveToTarget::touching(goldmine))
            .update(owner, ctx, dt);
        if result == StateResult::Failed {
            return StateResult::Failed;
        }

        let reached = match (ctx.entities.get(owner), ctx.entities.get(goldmine)) {
            (Some(worker), Some(target)) => worker.reached(target),
            _ => false,
        };
        if reached {
            self.stop(owner, ctx);
            self.exit = spawn_position(ctx.entities, goldmine);
            ctx.unspawn(owner);
            debug!("{:?} entered goldmine {:?}", owner, goldmine);
            self.phase = Phase::Wait;
        } else if result == StateResult::Completed {
            self.retarget(owner, ctx);
        }
        StateResult::Active
    }

    fn update_wait(&mut self, ctx: &mut SimContext<'_>) -> StateResult {
        let Some(goldmine) = self.goldmine.filter(|&g| can_harvest_goldmine(ctx.entities, Some(g)))
        else {
            return StateResult::Failed;
        };
        if let Some(mine) = ctx.entities.get_mut(goldmine).and_then(|o| o.kind.goldmine_mut()) {
            if mine.node.has_room() {
                mine.node.claim();
                self.claimed = Some(goldmine);
                self.elapsed = 0.0;
                self.phase = Phase::Harvest;
            }
        }
        StateResult::Active
    }

    fn update_harvest(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        self.elapsed += dt;
        if self.elapsed < ctx.config.goldmine_work_time {
            return StateResult::Active;
        }
        self.elapsed = 0.0;

        let per_visit = ctx.config.gold_per_visit;
        let space = ctx
            .entities
            .get(owner)
            .and_then(|o| o.kind.worker())
            .map_or(0, |w| w.gold_space());
        let mined = self
            .goldmine
            .and_then(|g| ctx.entities.get_mut(g))
            .and_then(|o| o.kind.goldmine_mut())
            .map(|mine| (mine.node.take(per_visit.min(space)), mine.node.amount == 0));
        let Some((taken, exhausted)) = mined else {
            // Mine collapsed while we were inside
            return StateResult::Failed;
        };
        if let Some(worker) = ctx.entities.get_mut(owner).and_then(|o| o.kind.worker_mut()) {
            worker.gold_carried += taken;
        }

        self.release(ctx);
        self.leave_mine(owner, ctx);
        if exhausted {
            if let Some(goldmine) = self.goldmine.take() {
                debug!("goldmine {:?} exhausted", goldmine);
                ctx.request_destroy(goldmine);
            }
        }
        self.phase = Phase::BackToDeposit;
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
            .is_some_and(|d| is_valid_deposit(ctx, owner, d, ResourceKind::Gold));
        if !valid {
            self.deposit = find_deposit(ctx, owner, ResourceKind::Gold);
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
            deposit::unload(ctx, owner, ResourceKind::Gold);
            self.deposit = None;
            self.phase = Phase::MoveToGoldmine;
        } else if result == StateResult::Completed {
            self.deposit = find_deposit(ctx, owner, ResourceKind::Gold);
            self.stop(owner, ctx);
        }
        StateResult::Active
    }
}

impl State for HarvestGold {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        if self.activation.activate_if_inactive() {
            self.activate(owner, ctx);
        }

        let result = match self.phase {
            Phase::MoveToGoldmine => self.update_move_to_goldmine(owner, ctx, dt),
            Phase::Wait => self.update_wait(ctx),
            Phase::Harvest => self.update_harvest(owner, ctx, dt),
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
        self.leave_mine(owner, ctx);
        self.phase = Phase::MoveToGoldmine;
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        if let Some(mover) = &self.mover {
            mover.draw(owner, entities, sink);
        }
    }
}
