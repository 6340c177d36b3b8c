//! Entity storage with stable insertion order

use crate::core::types::EntityId;
use crate::entity::object::GameObject;
use ahash::AHashMap;

/// Owns every game object of a world
///
/// Ids are slot indices handed out sequentially and never reused, so
/// iterating slots visits entities in insertion order.
#[derive(Debug, Default)]
pub struct EntityStore {
    slots: Vec<Option<GameObject>>,
    names: AHashMap<String, EntityId>,
    live: usize,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, assigning its id and registering its name
    pub fn insert(&mut self, mut object: GameObject) -> EntityId {
        let id = EntityId(self.slots.len() as u32);
        object.id = id;
        if let Some(name) = &object.name {
            if let Some(previous) = self.names.insert(name.clone(), id) {
                tracing::warn!("Name {:?} moved from {:?} to {:?}", name, previous, id);
            }
        }
        self.slots.push(Some(object));
        self.live += 1;
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<GameObject> {
        let object = self.slots.get_mut(id.0 as usize)?.take()?;
        if let Some(name) = &object.name {
            if self.names.get(name) == Some(&id) {
                self.names.remove(name);
            }
        }
        self.live -= 1;
        Some(object)
    }

    pub fn get(&self, id: EntityId) -> Option<&GameObject> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut GameObject> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn by_name(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Live ids in insertion order
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|o| o.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameObject> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameObject> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
