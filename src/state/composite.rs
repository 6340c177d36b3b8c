//! Parallel composition: every child must complete

use crate::core::types::EntityId;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::state::{EventStatus, InputEvent, State, StateResult, TriggerId};

/// Updates all children each tick
///
/// Completed children are terminated and dropped. A single failure
/// terminates every child and fails the whole composite.
#[derive(Debug, Clone)]
pub struct Composite<S> {
    children: Vec<S>,
}

impl<S> Default for Composite<S> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
        }
    }
}

impl<S: State> Composite<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, child: S) {
        self.children.push(child);
    }

    pub fn with(mut self, child: S) -> Self {
        self.add(child);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[S] {
        &self.children
    }

    fn terminate_all(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        for mut child in self.children.drain(..) {
            child.terminate(owner, ctx);
        }
    }
}

impl<S: State> State for Composite<S> {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        let mut i = 0;
        while i < self.children.len() {
            match self.children[i].update(owner, ctx, dt) {
                StateResult::Failed => {
                    self.terminate_all(owner, ctx);
                    return StateResult::Failed;
                }
                StateResult::Completed => {
                    let mut done = self.children.remove(i);
                    done.terminate(owner, ctx);
                }
                _ => i += 1,
            }
        }

        if self.children.is_empty() {
            StateResult::Completed
        } else {
            StateResult::Active
        }
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        self.terminate_all(owner, ctx);
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        for child in &self.children {
            child.draw(owner, entities, sink);
        }
    }

    fn handle_event(
        &mut self,
        owner: EntityId,
        event: &InputEvent,
        ctx: &mut SimContext<'_>,
    ) -> EventStatus {
        for child in &mut self.children {
            if child.handle_event(owner, event, ctx) == EventStatus::Handled {
                return EventStatus::Handled;
            }
        }
        EventStatus::Unhandled
    }

    fn on_trigger(&mut self, owner: EntityId, trigger: TriggerId, ctx: &mut SimContext<'_>) {
        for child in &mut self.children {
            child.on_trigger(owner, trigger, ctx);
        }
    }
}
