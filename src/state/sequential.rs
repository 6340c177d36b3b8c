//! Serial composition: one child at a time

use crate::core::types::EntityId;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::state::{EventStatus, InputEvent, State, StateResult, TriggerId};
use std::collections::VecDeque;

/// Runs the head child until it completes, then the next one
///
/// Only the head is ever updated, drawn, or sent events and triggers.
/// Children behind the head have not started, so on failure they are
/// dropped without being terminated.
#[derive(Debug, Clone)]
pub struct Sequential<S> {
    queue: VecDeque<S>,
}

impl<S> Default for Sequential<S> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<S: State> Sequential<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, child: S) {
        self.queue.push_back(child);
    }

    pub fn then(mut self, child: S) -> Self {
        self.add(child);
        self
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn head(&self) -> Option<&S> {
        self.queue.front()
    }
}

impl<S: State> State for Sequential<S> {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        let Some(head) = self.queue.front_mut() else {
            return StateResult::Completed;
        };

        match head.update(owner, ctx, dt) {
            StateResult::Failed => {
                head.terminate(owner, ctx);
                self.queue.clear();
                StateResult::Failed
            }
            StateResult::Completed => {
                head.terminate(owner, ctx);
                self.queue.pop_front();
                if self.queue.is_empty() {
                    StateResult::Completed
                } else {
                    StateResult::Active
                }
            }
            _ => StateResult::Active,
        }
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(head) = self.queue.front_mut() {
            head.terminate(owner, ctx);
        }
        self.queue.clear();
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        if let Some(head) = self.queue.front() {
            head.draw(owner, entities, sink);
        }
    }

    fn handle_event(
        &mut self,
        owner: EntityId,
        event: &InputEvent,
        ctx: &mut SimContext<'_>,
    ) -> EventStatus {
        match self.queue.front_mut() {
            Some(head) => head.handle_event(owner, event, ctx),
            None => EventStatus::Unhandled,
        }
    }

    fn on_trigger(&mut self, owner: EntityId, trigger: TriggerId, ctx: &mut SimContext<'_>) {
        if let Some(head) = self.queue.front_mut() {
            head.on_trigger(owner, trigger, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notify::DebugLines;
    use crate::state::testing::{Probe, ProbeLog};
    use crate::world::World;

    #[test]
    fn test_runs_children_in_order() {
        let log = ProbeLog::default();
        let mut world = World::flat(64.0, 8);
        let mut seq = Sequential::new()
            .then(Probe::new("a", &log).completes_after(1))
            .then(Probe::new("b", &log).completes_after(1));

        world.with_context(|ctx| {
            assert_eq!(seq.update(EntityId(0), ctx, 0.1), StateResult::Active);
            assert_eq!(log.count("update b"), 0);
            assert_eq!(seq.update(EntityId(0), ctx, 0.1), StateResult::Completed);
            assert_eq!(seq.update(EntityId(0), ctx, 0.1), StateResult::Completed);
        });
        assert_eq!(log.entries()[0], "update a");
    }

    #[test]
    fn test_failure_clears_queue() {
        let log = ProbeLog::default();
        let mut world = World::flat(64.0, 8);
        let mut seq = Sequential::new()
            .then(Probe::new("a", &log).fails_after(1))
            .then(Probe::new("b", &log));

        world.with_context(|ctx| {
            assert_eq!(seq.update(EntityId(0), ctx, 0.1), StateResult::Failed);
        });
        assert!(seq.is_empty());
        assert_eq!(log.count("terminate a"), 1);
        assert_eq!(log.count("terminate b"), 0);
    }

    #[test]
    fn test_only_head_sees_draw_events_and_triggers() {
        let log = ProbeLog::default();
        let mut world = World::flat(64.0, 8);
        let mut seq = Sequential::new()
            .then(Probe::new("a", &log))
            .then(Probe::new("b", &log).handles_events());

        let mut lines = DebugLines::default();
        seq.draw(EntityId(0), world.entities(), &mut lines);
        let status = world.with_context(|ctx| {
            seq.on_trigger(EntityId(0), TriggerId::AttackHit, ctx);
            seq.handle_event(EntityId(0), &InputEvent::Cancel, ctx)
        });

        assert_eq!(status, EventStatus::Unhandled);
        assert_eq!(log.count("draw a"), 1);
        assert_eq!(log.count("event a"), 1);
        assert_eq!(log.count("trigger a"), 1);
        assert_eq!(log.count("draw b"), 0);
        assert_eq!(log.count("event b"), 0);
        assert_eq!(log.count("trigger b"), 0);
    }
}
