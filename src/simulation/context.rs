//! Borrow bundle handed to every state update
//!
//! States never hold references into the world. Each call receives a
//! `SimContext` with mutable access to the entity store, the scene index
//! and the services. Transitions and destruction requested while an entity
//! updates are queued and applied right after its update slot.

use crate::behavior::idle::Idle;
use crate::behavior::Behavior;
use crate::core::config::SimulationConfig;
use crate::core::types::{Color, EntityId, Tick};
use crate::entity::kind::BuildingState;
use crate::entity::object::GameObject;
use crate::entity::player::PlayerRegistry;
use crate::entity::store::EntityStore;
use crate::services::landscape::Landscape;
use crate::services::notify::{Notification, NotificationSink};
use crate::services::paths::PathService;
use crate::simulation::tick::SimulationEvent;
use crate::spatial::scene_index::SceneIndex;
use crate::state::State;
use glam::{Vec2, Vec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Deferred world mutation
#[derive(Debug)]
pub enum WorldCommand {
    /// Assign a state; `None` resumes the queue or goes idle
    SetState {
        entity: EntityId,
        state: Option<Behavior>,
        queue: bool,
    },
    Destroy(EntityId),
}

impl WorldCommand {
    fn entity(&self) -> EntityId {
        match self {
            WorldCommand::SetState { entity, .. } => *entity,
            WorldCommand::Destroy(entity) => *entity,
        }
    }
}

pub struct SimContext<'a> {
    pub entities: &'a mut EntityStore,
    pub players: &'a mut PlayerRegistry,
    pub index: &'a mut SceneIndex,
    pub landscape: &'a dyn Landscape,
    pub paths: &'a mut dyn PathService,
    pub notifications: &'a mut dyn NotificationSink,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a SimulationConfig,
    pub tick: Tick,
    pub events: &'a mut Vec<SimulationEvent>,
    commands: Vec<WorldCommand>,
}

impl<'a> SimContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entities: &'a mut EntityStore,
        players: &'a mut PlayerRegistry,
        index: &'a mut SceneIndex,
        landscape: &'a dyn Landscape,
        paths: &'a mut dyn PathService,
        notifications: &'a mut dyn NotificationSink,
        rng: &'a mut ChaCha8Rng,
        config: &'a SimulationConfig,
        tick: Tick,
        events: &'a mut Vec<SimulationEvent>,
    ) -> Self {
        Self {
            entities,
            players,
            index,
            landscape,
            paths,
            notifications,
            rng,
            config,
            tick,
            events,
            commands: Vec::new(),
        }
    }

    pub fn object(&self, id: EntityId) -> Option<&GameObject> {
        self.entities.get(id)
    }

    pub fn object_mut(&mut self, id: EntityId) -> Option<&mut GameObject> {
        self.entities.get_mut(id)
    }

    /// Both entities are owned by players of different teams
    pub fn is_opponent(&self, a: EntityId, b: EntityId) -> bool {
        match (self.entities.get(a), self.entities.get(b)) {
            (Some(a), Some(b)) => self.players.are_opponents(a.owner, b.owner),
            _ => false,
        }
    }

    pub fn emit(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }

    pub fn notify(&mut self, message: impl Into<String>, position: Vec3, color: Color) {
        self.notifications.show(Notification {
            message: message.into(),
            position,
            color,
        });
    }

    /// Ground position with the terrain height filled in
    pub fn on_ground(&self, p: Vec2) -> Vec3 {
        p.extend(self.landscape.height(p.x, p.y))
    }

    /// Fresh idle state with a randomized first scan
    pub fn new_idle(&mut self) -> Idle {
        let min = self.config.idle_scan_min;
        let max = self.config.idle_scan_max;
        Idle::new(self.rng.gen_range(min..max))
    }

    // === DEFERRED REQUESTS ===

    pub fn request_state(&mut self, entity: EntityId, state: Behavior) {
        self.commands.push(WorldCommand::SetState {
            entity,
            state: Some(state),
            queue: false,
        });
    }

    pub fn request_idle(&mut self, entity: EntityId) {
        self.commands.push(WorldCommand::SetState {
            entity,
            state: None,
            queue: false,
        });
    }

    pub fn request_destroy(&mut self, entity: EntityId) {
        self.commands.push(WorldCommand::Destroy(entity));
    }

    /// Any deferred command targets `entity`
    pub fn has_pending(&self, entity: EntityId) -> bool {
        self.commands.iter().any(|c| c.entity() == entity)
    }

    /// Apply deferred commands in order, including those raised meanwhile
    pub fn apply_commands(&mut self) {
        while !self.commands.is_empty() {
            let batch = std::mem::take(&mut self.commands);
            for command in batch {
                match command {
                    WorldCommand::SetState {
                        entity,
                        state,
                        queue,
                    } => {
                        self.set_state(entity, state, queue);
                    }
                    WorldCommand::Destroy(entity) => self.destroy(entity),
                }
            }
        }
    }

    // === IMMEDIATE MUTATIONS ===

    /// Run the entity's transition hook; returns whether `state` was accepted
    ///
    /// Dead entities accept nothing but `Die`. `None` resumes the next
    /// queued state, or idles a character. An explicit state clears the
    /// queue unless it is being enqueued. The previous state is terminated
    /// before the new one is installed.
    pub fn set_state(&mut self, id: EntityId, state: Option<Behavior>, queue: bool) -> bool {
        let Some(object) = self.entities.get_mut(id) else {
            return false;
        };
        let alive = object.is_alive();
        let character = object.is_character();

        let state = match state {
            Some(state) if queue && alive && object.orders.current().is_some() => {
                object.orders.enqueue(state);
                return true;
            }
            other => other,
        };

        let resolved = if !alive {
            match state {
                Some(Behavior::Die(die)) => {
                    object.orders.clear_queue();
                    Some(Behavior::Die(die))
                }
                other => {
                    debug!(
                        "{:?} is dead, rejecting {:?}",
                        id,
                        other.as_ref().map(Behavior::state_id)
                    );
                    return false;
                }
            }
        } else {
            match state {
                Some(state) => {
                    object.orders.clear_queue();
                    Some(state)
                }
                None => match object.orders.pop_queued() {
                    Some(next) => Some(next),
                    None if character => Some(Behavior::Idle(self.new_idle())),
                    None => None,
                },
            }
        };

        let previous = self
            .entities
            .get_mut(id)
            .and_then(|object| object.orders.replace(None));
        let from = previous.as_ref().map(Behavior::state_id);
        if let Some(mut previous) = previous {
            previous.terminate(id, self);
        }

        let to = resolved.as_ref().map(Behavior::state_id);
        if let Some(object) = self.entities.get_mut(id) {
            object.orders.replace(resolved);
        }
        debug!("{:?}: {:?} -> {:?}", id, from, to);
        self.emit(SimulationEvent::StateChanged {
            entity: id,
            from,
            to,
        });
        true
    }

    /// Remove an entity from the world
    pub fn destroy(&mut self, id: EntityId) {
        let previous = match self.entities.get_mut(id) {
            Some(object) => object.orders.replace(None),
            None => return,
        };
        if let Some(mut previous) = previous {
            previous.terminate(id, self);
        }

        let Some(mut object) = self.entities.remove(id) else {
            return;
        };
        self.index.deactivate(&mut object);
        if object.is_character() {
            self.paths.remove_movable(id);
        }
        if !object.obstruction.is_empty() {
            self.paths.unmark(&object.obstruction);
        }
        if let Some(player) = object.owner.and_then(|p| self.players.get_mut(p)) {
            player.remove(&object.class_id, id);
        }

        debug!("Destroyed {} {:?}", object.class_id, id);
        self.emit(SimulationEvent::EntityDestroyed {
            entity: id,
            class_id: object.class_id,
        });
    }

    /// Subtract health from `target`, running the on-die hook on a kill
    pub fn apply_damage(&mut self, attacker: EntityId, target: EntityId, amount: f32) {
        let Some(object) = self.entities.get_mut(target) else {
            return;
        };
        let died = object.set_health(object.health() - amount.max(0.0));
        self.emit(SimulationEvent::CombatHit {
            attacker,
            defender: target,
            damage: amount,
        });
        if died {
            self.on_die(target);
        }
    }

    /// Leave the movement service and start dying
    fn on_die(&mut self, id: EntityId) {
        let Some(object) = self.entities.get_mut(id) else {
            return;
        };
        let character = object.is_character();
        if let Some(building) = object.kind.building_mut() {
            building.state = BuildingState::Destroyed;
        }
        if character {
            self.paths.remove_movable(id);
        }
        debug!("{:?} died", id);
        self.emit(SimulationEvent::EntityDied { entity: id });
        self.commands.push(WorldCommand::SetState {
            entity: id,
            state: Some(Behavior::Die(Default::default())),
            queue: false,
        });
    }

    /// Hide a worker inside a building
    pub fn unspawn(&mut self, id: EntityId) {
        if let Some(object) = self.entities.get_mut(id) {
            self.index.deactivate(object);
            object.visible = false;
            self.paths.remove_movable(id);
        }
    }

    /// Bring a hidden worker back at `position`
    pub fn respawn(&mut self, id: EntityId, position: Vec2) {
        let Some(object) = self.entities.get(id) else {
            return;
        };
        let brush = self.paths.create_brush(object.outline().radius());
        let position = self.paths.find_valid_position(position, &brush);
        let ground = self.on_ground(position);
        if let Some(object) = self.entities.get_mut(id) {
            object.set_position(ground);
            object.visible = true;
            self.index.activate(object);
            self.paths.add_movable(id, position, brush);
        }
    }
}
