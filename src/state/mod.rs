//! State machine core
//!
//! A state is a unit of work driven by `update` once per tick until it
//! reports `Completed` or `Failed`. Leaf states activate lazily on their
//! first update. `Composite` runs children in parallel and `Sequential`
//! runs them one after another.

pub mod animation;
pub mod composite;
pub mod sequential;
#[cfg(test)]
pub(crate) mod testing;

pub use animation::{AnimationClip, AnimationPlayer, TriggerId};
pub use composite::Composite;
pub use sequential::Sequential;

use crate::core::types::EntityId;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use glam::Vec2;

/// Outcome of a state update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateResult {
    Active,
    /// Not yet updated
    #[default]
    Inactive,
    Completed,
    Failed,
}

impl StateResult {
    /// Completed and Failed states are never updated again
    pub fn is_terminal(self) -> bool {
        matches!(self, StateResult::Completed | StateResult::Failed)
    }
}

/// Player input a state may intercept
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Command click on the ground or on an entity
    Command {
        position: Vec2,
        target: Option<EntityId>,
    },
    /// Hotkey press
    Key(char),
    /// Stop the current action
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Handled,
    Unhandled,
}

/// Contract of every state
pub trait State {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult;

    /// Called exactly once when the state stops being current
    fn terminate(&mut self, _owner: EntityId, _ctx: &mut SimContext<'_>) {}

    /// Debug presentation only, must not mutate the world
    fn draw(&self, _owner: EntityId, _entities: &EntityStore, _sink: &mut dyn DrawSink) {}

    fn handle_event(
        &mut self,
        _owner: EntityId,
        _event: &InputEvent,
        _ctx: &mut SimContext<'_>,
    ) -> EventStatus {
        EventStatus::Unhandled
    }

    /// Animation trigger crossed by the owner's current clip
    fn on_trigger(&mut self, _owner: EntityId, _trigger: TriggerId, _ctx: &mut SimContext<'_>) {}
}

/// Lazy activation of a leaf state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activation {
    status: StateResult,
}

impl Activation {
    /// Returns `true` exactly once, on the first call
    pub fn activate_if_inactive(&mut self) -> bool {
        if self.status == StateResult::Inactive {
            self.status = StateResult::Active;
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == StateResult::Active
    }

    pub fn status(&self) -> StateResult {
        self.status
    }

    /// Record a result, passing it through
    pub fn finish(&mut self, result: StateResult) -> StateResult {
        self.status = result;
        result
    }
}
