//! Scripted states for exercising the composition rules

use crate::core::types::EntityId;
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::state::{EventStatus, InputEvent, State, StateResult, TriggerId};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared record of probe calls, in call order
#[derive(Debug, Clone, Default)]
pub struct ProbeLog(Rc<RefCell<Vec<String>>>);

impl ProbeLog {
    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }
}

/// State that reports a scripted result after a number of updates
#[derive(Debug, Clone)]
pub struct Probe {
    name: &'static str,
    log: ProbeLog,
    updates: u32,
    finish_after: Option<(u32, StateResult)>,
    handles_events: bool,
}

impl Probe {
    pub fn new(name: &'static str, log: &ProbeLog) -> Self {
        Self {
            name,
            log: log.clone(),
            updates: 0,
            finish_after: None,
            handles_events: false,
        }
    }

    pub fn completes_after(mut self, updates: u32) -> Self {
        self.finish_after = Some((updates, StateResult::Completed));
        self
    }

    pub fn fails_after(mut self, updates: u32) -> Self {
        self.finish_after = Some((updates, StateResult::Failed));
        self
    }

    pub fn handles_events(mut self) -> Self {
        self.handles_events = true;
        self
    }
}

impl State for Probe {
    fn update(&mut self, _owner: EntityId, _ctx: &mut SimContext<'_>, _dt: f32) -> StateResult {
        self.log.push(format!("update {}", self.name));
        self.updates += 1;
        match self.finish_after {
            Some((n, result)) if self.updates >= n => result,
            _ => StateResult::Active,
        }
    }

    fn terminate(&mut self, _owner: EntityId, _ctx: &mut SimContext<'_>) {
        self.log.push(format!("terminate {}", self.name));
    }

    fn draw(&self, _owner: EntityId, _entities: &EntityStore, _sink: &mut dyn DrawSink) {
        self.log.push(format!("draw {}", self.name));
    }

    fn handle_event(
        &mut self,
        _owner: EntityId,
        _event: &InputEvent,
        _ctx: &mut SimContext<'_>,
    ) -> EventStatus {
        self.log.push(format!("event {}", self.name));
        if self.handles_events {
            EventStatus::Handled
        } else {
            EventStatus::Unhandled
        }
    }

    fn on_trigger(&mut self, _owner: EntityId, _trigger: TriggerId, _ctx: &mut SimContext<'_>) {
        self.log.push(format!("trigger {}", self.name));
    }
}
