//! Players: resource stock, team and the collection of owned objects

use crate::core::types::{EntityId, PlayerId};
use crate::entity::object::GameObject;
use crate::entity::store::EntityStore;
use ahash::AHashMap;
use glam::Vec2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A participant of the match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub team: u8,
    #[serde(default)]
    pub lumber: u32,
    #[serde(default)]
    pub gold: u32,
    /// Class id -> owned entities, newest first
    #[serde(skip)]
    objects: AHashMap<String, Vec<EntityId>>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, team: u8) -> Self {
        Self {
            id,
            name: name.into(),
            team,
            lumber: 0,
            gold: 0,
            objects: AHashMap::new(),
        }
    }

    pub fn add(&mut self, class_id: &str, id: EntityId) {
        self.objects.entry(class_id.to_string()).or_default().insert(0, id);
    }

    pub fn remove(&mut self, class_id: &str, id: EntityId) {
        if let Some(list) = self.objects.get_mut(class_id) {
            list.retain(|&e| e != id);
        }
    }

    pub fn objects_of(&self, class_id: &str) -> &[EntityId] {
        self.objects.get(class_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn object_count(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    /// Nearest live owned object of one of `classes` accepted by `filter`
    pub fn find_nearest_by<F>(
        &self,
        entities: &EntityStore,
        position: Vec2,
        classes: &[&str],
        filter: F,
    ) -> Option<EntityId>
    where
        F: Fn(&GameObject) -> bool,
    {
        classes
            .iter()
            .flat_map(|class| self.objects_of(class).iter())
            .filter_map(|&id| entities.get(id))
            .filter(|o| o.is_alive() && filter(o))
            .min_by_key(|o| OrderedFloat(o.position_2d().distance_squared(position)))
            .map(|o| o.id)
    }

    pub fn find_nearest(
        &self,
        entities: &EntityStore,
        position: Vec2,
        classes: &[&str],
        excluded: Option<EntityId>,
    ) -> Option<EntityId> {
        self.find_nearest_by(entities, position, classes, |o| Some(o.id) != excluded)
    }
}

/// All players of a world
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, player: Player) {
        debug_assert!(self.get(player.id).is_none(), "duplicate player {:?}", player.id);
        self.players.push(player);
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Both owned and on different teams
    pub fn are_opponents(&self, a: Option<PlayerId>, b: Option<PlayerId>) -> bool {
        match (a.and_then(|a| self.get(a)), b.and_then(|b| self.get(b))) {
            (Some(a), Some(b)) => a.team != b.team,
            _ => false,
        }
    }
}
