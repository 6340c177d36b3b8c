//! Unit behaviors
//!
//! Every state an entity can be in is a variant of the closed `Behavior`
//! enum. Each variant owns its data; `impl State for Behavior` dispatches to
//! the variant.

pub mod attack;
pub mod combat;
pub mod construct;
pub mod deposit;
pub mod die;
pub mod harvest_gold;
pub mod harvest_lumber;
pub mod idle;
pub mod movement;

pub use attack::Attack;
pub use combat::Combat;
pub use construct::{BuildingWork, WorkMode};
pub use die::Die;
pub use harvest_gold::HarvestGold;
pub use harvest_lumber::HarvestLumber;
pub use idle::Idle;
pub use movement::{MoveToPosition, MoveToTarget};

use crate::core::types::EntityId;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::state::{Composite, EventStatus, InputEvent, Sequential, State, StateResult, TriggerId};
use serde::{Deserialize, Serialize};

/// Discriminant of a behavior, for events and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateId {
    Idle,
    Move,
    Follow,
    HarvestLumber,
    HarvestGold,
    Construct,
    Repair,
    Attack,
    Die,
    Composite,
    Sequence,
}

impl StateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateId::Idle => "Idle",
            StateId::Move => "Move",
            StateId::Follow => "Follow",
            StateId::HarvestLumber => "HarvestLumber",
            StateId::HarvestGold => "HarvestGold",
            StateId::Construct => "Construct",
            StateId::Repair => "Repair",
            StateId::Attack => "Attack",
            StateId::Die => "Die",
            StateId::Composite => "Composite",
            StateId::Sequence => "Sequence",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Idle(Idle),
    Move(MoveToPosition),
    Follow(MoveToTarget),
    HarvestLumber(HarvestLumber),
    HarvestGold(HarvestGold),
    Construct(BuildingWork),
    Repair(BuildingWork),
    Attack(Attack),
    Die(Die),
    Composite(Composite<Behavior>),
    Sequence(Sequential<Behavior>),
}

impl Behavior {
    pub fn state_id(&self) -> StateId {
        match self {
            Behavior::Idle(_) => StateId::Idle,
            Behavior::Move(_) => StateId::Move,
            Behavior::Follow(_) => StateId::Follow,
            Behavior::HarvestLumber(_) => StateId::HarvestLumber,
            Behavior::HarvestGold(_) => StateId::HarvestGold,
            Behavior::Construct(_) => StateId::Construct,
            Behavior::Repair(_) => StateId::Repair,
            Behavior::Attack(_) => StateId::Attack,
            Behavior::Die(_) => StateId::Die,
            Behavior::Composite(_) => StateId::Composite,
            Behavior::Sequence(_) => StateId::Sequence,
        }
    }

    fn as_state(&self) -> &dyn State {
        match self {
            Behavior::Idle(s) => s,
            Behavior::Move(s) => s,
            Behavior::Follow(s) => s,
            Behavior::HarvestLumber(s) => s,
            Behavior::HarvestGold(s) => s,
            Behavior::Construct(s) | Behavior::Repair(s) => s,
            Behavior::Attack(s) => s,
            Behavior::Die(s) => s,
            Behavior::Composite(s) => s,
            Behavior::Sequence(s) => s,
        }
    }

    fn as_state_mut(&mut self) -> &mut dyn State {
        match self {
            Behavior::Idle(s) => s,
            Behavior::Move(s) => s,
            Behavior::Follow(s) => s,
            Behavior::HarvestLumber(s) => s,
            Behavior::HarvestGold(s) => s,
            Behavior::Construct(s) | Behavior::Repair(s) => s,
            Behavior::Attack(s) => s,
            Behavior::Die(s) => s,
            Behavior::Composite(s) => s,
            Behavior::Sequence(s) => s,
        }
    }
}

impl State for Behavior {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        self.as_state_mut().update(owner, ctx, dt)
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        self.as_state_mut().terminate(owner, ctx)
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        self.as_state().draw(owner, entities, sink)
    }

    fn handle_event(
        &mut self,
        owner: EntityId,
        event: &InputEvent,
        ctx: &mut SimContext<'_>,
    ) -> EventStatus {
        self.as_state_mut().handle_event(owner, event, ctx)
    }

    fn on_trigger(&mut self, owner: EntityId, trigger: TriggerId, ctx: &mut SimContext<'_>) {
        self.as_state_mut().on_trigger(owner, trigger, ctx)
    }
}
