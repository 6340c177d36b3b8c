//! The game world: entities, players, spatial index and services
//!
//! `World` owns everything a tick touches. Mutations that run state hooks
//! (state changes, damage, destruction) go through a `SimContext` built by
//! `with_context`, so they behave exactly like the ones made from inside a
//! tick.

use crate::behavior::{Behavior, Die};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{EntityId, Ray, Tick};
use crate::entity::kind::EntityKind;
use crate::entity::object::GameObject;
use crate::entity::player::{Player, PlayerRegistry};
use crate::entity::store::EntityStore;
use crate::services::landscape::{HeightField, Landscape};
use crate::services::notify::{DrawSink, LogNotifications, NotificationSink};
use crate::services::paths::{PathService, StraightLinePaths};
use crate::simulation::context::SimContext;
use crate::simulation::tick::SimulationEvent;
use crate::spatial::picker::Picker;
use crate::spatial::scene_index::SceneIndex;
use crate::state::{EventStatus, InputEvent, State};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Name under which a flat test landscape is saved
pub const FLAT_LANDSCAPE: &str = "flat";

pub struct World {
    pub name: String,
    landscape_name: String,
    entities: EntityStore,
    players: PlayerRegistry,
    index: SceneIndex,
    landscape: Box<dyn Landscape>,
    paths: Box<dyn PathService>,
    notifications: Box<dyn NotificationSink>,
    rng: ChaCha8Rng,
    config: SimulationConfig,
    picker: Picker,
    tick: Tick,
    events: Vec<SimulationEvent>,
}

impl World {
    /// Empty world on `landscape`, with the reference path service
    ///
    /// Fails when `config` does not validate.
    pub fn new(landscape: Box<dyn Landscape>, config: SimulationConfig) -> Result<Self> {
        config.validate().map_err(SimError::InvalidConfig)?;
        Ok(Self::with_valid_config(landscape, config))
    }

    /// Like `new`, for a config that already passed `validate`
    pub(crate) fn with_valid_config(landscape: Box<dyn Landscape>, config: SimulationConfig) -> Self {
        let cell = landscape.cell_size();
        let paths = StraightLinePaths::new(landscape.size(), cell.min_element() * 0.5);
        Self {
            name: String::new(),
            landscape_name: FLAT_LANDSCAPE.to_string(),
            entities: EntityStore::new(),
            players: PlayerRegistry::new(),
            index: SceneIndex::for_landscape(landscape.as_ref()),
            paths: Box::new(paths),
            notifications: Box::new(LogNotifications),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            picker: Picker::new(config.pick_precision, config.max_entity_height),
            landscape,
            config,
            tick: 0,
            events: Vec::new(),
        }
    }

    /// Flat square world of `size` units with `grid_count` cells per side
    pub fn flat(size: f32, grid_count: usize) -> Self {
        let landscape = HeightField::flat(Vec2::splat(size), grid_count, grid_count);
        Self::with_valid_config(Box::new(landscape), SimulationConfig::default())
    }

    /// Replace the path service; call before adding objects
    pub fn with_paths(mut self, paths: Box<dyn PathService>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_notifications(mut self, notifications: Box<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_landscape_name(mut self, name: impl Into<String>) -> Self {
        self.landscape_name = name.into();
        self
    }

    /// Run `f` with a simulation context, then apply the commands it queued
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut SimContext<'_>) -> R) -> R {
        let mut ctx = SimContext::new(
            &mut self.entities,
            &mut self.players,
            &mut self.index,
            self.landscape.as_ref(),
            self.paths.as_mut(),
            self.notifications.as_mut(),
            &mut self.rng,
            &self.config,
            self.tick,
            &mut self.events,
        );
        let result = f(&mut ctx);
        ctx.apply_commands();
        result
    }

    // === OBJECTS ===

    /// Insert an object and register it with its player and the services
    ///
    /// Characters become movables and start idle (or dying, when loaded
    /// dead). Buildings and goldmines obstruct the path grid. Interactive
    /// objects enter the scene index.
    pub fn add(&mut self, object: GameObject) -> EntityId {
        let id = self.entities.insert(object);
        let Some(object) = self.entities.get_mut(id) else {
            return id;
        };

        if let Some(player) = object.owner.and_then(|p| self.players.get_mut(p)) {
            player.add(&object.class_id, id);
        }
        let character = object.is_character();
        if character && object.is_alive() {
            let brush = self.paths.create_brush(object.outline().radius());
            self.paths.add_movable(id, object.position_2d(), brush);
        }
        if matches!(object.kind, EntityKind::Building(_) | EntityKind::Goldmine(_)) {
            let cells = self.paths.enumerate_grids_in_outline(&object.outline());
            self.paths.mark(&cells);
            object.obstruction = cells;
        }
        if object.interactive {
            self.index.activate(object);
        }
        info!(
            "Added {} {:?} at ({:.1}, {:.1})",
            object.class_id,
            id,
            object.position().x,
            object.position().y
        );

        if character {
            let state = (!object.is_alive()).then(|| Behavior::Die(Die::default()));
            self.set_state(id, state);
        }
        id
    }

    /// Remove an object, terminating its state first
    pub fn destroy(&mut self, id: EntityId) {
        self.with_context(|ctx| ctx.destroy(id));
    }

    /// Deal damage as if `attacker` had hit `target`
    pub fn damage(&mut self, attacker: EntityId, target: EntityId, amount: f32) {
        self.with_context(|ctx| ctx.apply_damage(attacker, target, amount));
    }

    /// Assign a state; `None` resumes the queue or idles
    pub fn set_state(&mut self, id: EntityId, state: Option<Behavior>) -> bool {
        self.with_context(|ctx| ctx.set_state(id, state, false))
    }

    /// Queue a state behind the current one
    pub fn enqueue_state(&mut self, id: EntityId, state: Behavior) -> bool {
        self.with_context(|ctx| ctx.set_state(id, Some(state), true))
    }

    /// Offer player input to the entity's current state
    pub fn handle_event(&mut self, id: EntityId, event: &InputEvent) -> EventStatus {
        self.with_context(|ctx| {
            let Some(mut state) = ctx.entities.get_mut(id).and_then(|o| o.orders.take()) else {
                return EventStatus::Unhandled;
            };
            let status = state.handle_event(id, event, ctx);
            match ctx.entities.get_mut(id) {
                Some(object) => {
                    if let Some(mut stale) = object.orders.restore(state) {
                        stale.terminate(id, ctx);
                    }
                }
                None => state.terminate(id, ctx),
            }
            status
        })
    }

    /// Debug presentation of every current state
    pub fn draw(&self, sink: &mut dyn DrawSink) {
        for object in self.entities.iter() {
            if let Some(state) = object.state() {
                state.draw(object.id, &self.entities, sink);
            }
        }
    }

    /// Entity under the ray, cached until the next tick
    pub fn pick(&mut self, ray: &Ray) -> Option<EntityId> {
        self.picker
            .pick(ray, self.landscape.as_ref(), &self.index, &self.entities)
    }

    pub fn object_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities.by_name(name)
    }

    // === PLAYERS ===

    pub fn add_player(&mut self, player: Player) {
        info!("Player {:?} '{}' joins team {}", player.id, player.name, player.team);
        self.players.add(player);
    }

    // === ACCESSORS ===

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut PlayerRegistry {
        &mut self.players
    }

    pub fn index(&self) -> &SceneIndex {
        &self.index
    }

    pub fn landscape(&self) -> &dyn Landscape {
        self.landscape.as_ref()
    }

    pub fn landscape_name(&self) -> &str {
        &self.landscape_name
    }

    pub fn paths(&self) -> &dyn PathService {
        self.paths.as_ref()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn picker_mut(&mut self) -> &mut Picker {
        &mut self.picker
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn advance_tick(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }

    /// Drain the events recorded since the last call
    pub fn take_events(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }
}
