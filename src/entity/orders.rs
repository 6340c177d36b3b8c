//! Current behavior and the FIFO of queued commands

use crate::behavior::Behavior;
use std::collections::VecDeque;

/// The running state of an entity plus states waiting behind it
///
/// Queued states only start once the current one completes. The current
/// state is taken out while it updates, so `current` can be briefly empty
/// for an entity that is not idle.
#[derive(Debug, Clone, Default)]
pub struct Orders {
    current: Option<Behavior>,
    queued: VecDeque<Behavior>,
}

impl Orders {
    pub fn new() -> Self {
        Self {
            current: None,
            queued: VecDeque::new(),
        }
    }

    pub fn current(&self) -> Option<&Behavior> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Behavior> {
        self.current.as_mut()
    }

    /// Replace the current state, returning the previous one
    pub fn replace(&mut self, state: Option<Behavior>) -> Option<Behavior> {
        std::mem::replace(&mut self.current, state)
    }

    /// Take the current state out for an update
    pub fn take(&mut self) -> Option<Behavior> {
        self.current.take()
    }

    /// Put a state back after its update, unless a transition installed
    /// a new one meanwhile
    pub fn restore(&mut self, state: Behavior) -> Option<Behavior> {
        if self.current.is_none() {
            self.current = Some(state);
            None
        } else {
            Some(state)
        }
    }

    pub fn enqueue(&mut self, state: Behavior) {
        self.queued.push_back(state);
    }

    pub fn pop_queued(&mut self) -> Option<Behavior> {
        self.queued.pop_front()
    }

    pub fn clear_queue(&mut self) {
        self.queued.clear();
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Behavior> {
        self.queued.iter()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queued.is_empty()
    }
}
