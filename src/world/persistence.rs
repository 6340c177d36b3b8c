//! World documents and per-object attribute bags
//!
//! A world is saved as JSON:
//!
//! ```json
//! { "World": { "version": 1, "Landscape": "flat", "Name": "...",
//!              "Players": [ ... ],
//!              "Objects": [ { "Class": "Follower", "Position": "10 20", ... } ] } }
//! ```
//!
//! Every object is a class id plus a flat bag of string attributes. Vectors
//! are written as space separated numbers; commas are accepted on input.

use crate::core::error::Result;
use crate::core::types::PlayerId;
use crate::entity::kind::{BuildingState, EntityKind};
use crate::entity::object::GameObject;
use crate::entity::player::Player;
use crate::services::landscape::Landscape;
use crate::world::game_world::World;
use crate::world::loader::{ObjectLoadError, WorldLoadError};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const WORLD_ROOT: &str = "World";
pub const WORLD_VERSION: u32 = 1;

/// Attribute name -> string value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag(BTreeMap<String, String>);

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> std::result::Result<Option<T>, ObjectLoadError> {
        self.get(name)
            .map(|value| value.trim().parse::<T>().map_err(|_| malformed(name, value)))
            .transpose()
    }

    /// Numbers separated by spaces or commas
    pub fn floats(&self, name: &str) -> std::result::Result<Option<Vec<f32>>, ObjectLoadError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f32>().map_err(|_| malformed(name, value)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn vec2(&self, name: &str) -> std::result::Result<Option<Vec2>, ObjectLoadError> {
        match self.floats(name)?.as_deref() {
            None => Ok(None),
            Some([x, y]) => Ok(Some(Vec2::new(*x, *y))),
            Some(_) => Err(malformed(name, self.get(name).unwrap_or_default())),
        }
    }

    /// `(min, max)` range; a single number is both
    pub fn range(&self, name: &str) -> std::result::Result<Option<(f32, f32)>, ObjectLoadError> {
        match self.floats(name)?.as_deref() {
            None => Ok(None),
            Some([v]) => Ok(Some((*v, *v))),
            Some([lo, hi]) if lo <= hi => Ok(Some((*lo, *hi))),
            Some(_) => Err(malformed(name, self.get(name).unwrap_or_default())),
        }
    }
}

fn malformed(attribute: &str, value: &str) -> ObjectLoadError {
    ObjectLoadError::Malformed {
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

fn join(values: &[f32]) -> String {
    values
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One saved object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(flatten)]
    pub attributes: AttributeBag,
}

impl ObjectRecord {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: AttributeBag::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn from_object(object: &GameObject) -> Self {
        Self {
            class: object.class_id.clone(),
            attributes: object_attributes(object),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldBody {
    #[serde(default)]
    pub version: u32,
    #[serde(rename = "Landscape", default, skip_serializing_if = "Option::is_none")]
    pub landscape: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Players", default)]
    pub players: Vec<Player>,
    /// Kept as raw JSON so one bad object does not fail the document
    #[serde(rename = "Objects", default)]
    pub objects: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldDocument {
    #[serde(rename = "World")]
    pub world: WorldBody,
}

impl WorldDocument {
    /// Parse and validate the root element and version
    pub fn from_json(json: &str) -> std::result::Result<Self, WorldLoadError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let root = match value.as_object() {
            Some(map) if map.len() == 1 && map.contains_key(WORLD_ROOT) => WORLD_ROOT.to_string(),
            Some(map) => map.keys().next().cloned().unwrap_or_default(),
            None => String::new(),
        };
        if root != WORLD_ROOT {
            return Err(WorldLoadError::InvalidRoot(root));
        }

        let document: WorldDocument = serde_json::from_value(value)?;
        if document.world.version != WORLD_VERSION {
            return Err(WorldLoadError::UnsupportedVersion(document.world.version));
        }
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Apply saved attributes on top of a freshly created object
///
/// A two component `Position` is placed on the ground. Kind specific
/// attributes are ignored on other kinds.
pub fn apply_attributes(
    object: &mut GameObject,
    bag: &AttributeBag,
    landscape: &dyn Landscape,
) -> std::result::Result<(), ObjectLoadError> {
    if let Some(name) = bag.get("Name") {
        object.name = Some(name.to_string());
    }
    if let Some(owner) = bag.parse::<u8>("Owner")? {
        object.owner = Some(PlayerId(owner));
    }
    if let Some(values) = bag.floats("Position")? {
        let position = match values.as_slice() {
            [x, y] => Vec3::new(*x, *y, landscape.height(*x, *y)),
            [x, y, z] => Vec3::new(*x, *y, *z),
            _ => return Err(malformed("Position", bag.get("Position").unwrap_or_default())),
        };
        object.set_position(position);
    }
    if let Some(rotation) = bag.parse::<f32>("Rotation")? {
        object.set_rotation(rotation);
    }
    if let Some(visible) = bag.parse::<bool>("Visible")? {
        object.visible = visible;
    }

    if let Some(max) = bag.parse::<f32>("MaxHealth")? {
        object.reset_health(max);
    }
    if let Some(health) = bag.parse::<f32>("Health")? {
        object.reset_health(object.max_health.max(health));
        object.set_health(health);
    }
    if let Some(attack) = bag.range("Attack")? {
        object.combat.attack = attack;
    }
    if let Some(defense) = bag.range("Defense")? {
        object.combat.defense = defense;
    }
    if let Some(range) = bag.range("AttackRange")? {
        object.combat.attack_range = range;
    }
    if let Some(speed) = bag.parse::<f32>("Speed")? {
        object.speed = speed;
    }
    if let Some(view) = bag.parse::<f32>("ViewDistance")? {
        object.view_distance = view;
    }

    match &mut object.kind {
        EntityKind::Worker(worker) => {
            if let Some(lumber) = bag.parse::<u32>("Lumber")? {
                worker.lumber_carried = lumber.min(worker.lumber_capacity);
            }
            if let Some(gold) = bag.parse::<u32>("Gold")? {
                worker.gold_carried = gold.min(worker.gold_capacity);
            }
        }
        EntityKind::Tree(node) => {
            if let Some(lumber) = bag.parse::<u32>("Lumber")? {
                node.amount = lumber;
            }
        }
        EntityKind::Goldmine(mine) => {
            if let Some(gold) = bag.parse::<u32>("Gold")? {
                mine.node.amount = gold;
            }
            if let Some(spawn) = bag.vec2("SpawnPoint")? {
                mine.spawn_point = spawn;
            }
        }
        EntityKind::Building(building) => {
            if let Some(time) = bag.parse::<f32>("ConstructionTime")? {
                building.construction_time = time.max(0.0);
            }
            if let Some(elapsed) = bag.parse::<f32>("ConstructionElapsed")? {
                building.construction_elapsed = elapsed.max(0.0);
            }
            if let Some(value) = bag.get("State") {
                building.state =
                    BuildingState::parse(value.trim()).ok_or_else(|| malformed("State", value))?;
            }
        }
        EntityKind::Fighter | EntityKind::Prop => {}
    }
    Ok(())
}

/// Attributes that recreate `object` through `apply_attributes`
pub fn object_attributes(object: &GameObject) -> AttributeBag {
    let mut bag = AttributeBag::new();
    let p = object.position();
    bag.set("Position", join(&[p.x, p.y, p.z]));
    if object.rotation() != 0.0 {
        bag.set("Rotation", object.rotation());
    }
    if let Some(name) = &object.name {
        bag.set("Name", name);
    }
    if let Some(owner) = object.owner {
        bag.set("Owner", owner.0);
    }
    if object.max_health > 0.0 {
        bag.set("MaxHealth", object.max_health);
        bag.set("Health", object.health());
    }
    if !object.visible {
        bag.set("Visible", false);
    }

    match &object.kind {
        EntityKind::Worker(worker) => {
            if worker.lumber_carried > 0 {
                bag.set("Lumber", worker.lumber_carried);
            }
            if worker.gold_carried > 0 {
                bag.set("Gold", worker.gold_carried);
            }
        }
        EntityKind::Tree(node) => bag.set("Lumber", node.amount),
        EntityKind::Goldmine(mine) => {
            bag.set("Gold", mine.node.amount);
            bag.set("SpawnPoint", join(&[mine.spawn_point.x, mine.spawn_point.y]));
        }
        EntityKind::Building(building) => {
            bag.set("State", building.state.as_str());
            bag.set("ConstructionTime", building.construction_time);
            if building.construction_elapsed > 0.0 {
                bag.set("ConstructionElapsed", building.construction_elapsed);
            }
        }
        EntityKind::Fighter | EntityKind::Prop => {}
    }
    bag
}

impl World {
    /// Snapshot of players and objects; states and queues are not saved
    pub fn to_document(&self) -> WorldDocument {
        let objects = self
            .entities()
            .iter()
            .filter_map(|o| serde_json::to_value(ObjectRecord::from_object(o)).ok())
            .collect();
        WorldDocument {
            world: WorldBody {
                version: WORLD_VERSION,
                landscape: Some(self.landscape_name().to_string()),
                name: self.name.clone(),
                players: self.players().iter().cloned().collect(),
                objects,
            },
        }
    }

    pub fn save_json(&self) -> Result<String> {
        self.to_document().to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::kind::{ResourceNode, WorkerData};
    use crate::services::landscape::HeightField;

    fn ground() -> HeightField {
        HeightField::flat(Vec2::splat(256.0), 32, 32)
    }

    #[test]
    fn test_bag_parsing() {
        let mut bag = AttributeBag::new();
        bag.set("Position", "10, 20");
        bag.set("Attack", "3 5");
        bag.set("Speed", "fast");
        assert_eq!(bag.vec2("Position").unwrap(), Some(Vec2::new(10.0, 20.0)));
        assert_eq!(bag.range("Attack").unwrap(), Some((3.0, 5.0)));
        assert_eq!(bag.parse::<f32>("Missing").unwrap(), None);
        assert!(matches!(
            bag.parse::<f32>("Speed"),
            Err(ObjectLoadError::Malformed { attribute, .. }) if attribute == "Speed"
        ));
    }

    #[test]
    fn test_record_flattens_attributes() {
        let record: ObjectRecord =
            serde_json::from_str(r#"{ "Class": "Tree", "Position": "1 2", "Lumber": "7" }"#)
                .unwrap();
        assert_eq!(record.class, "Tree");
        assert_eq!(record.attributes.get("Lumber"), Some("7"));
        assert!(!record.attributes.contains("Class"));
    }

    #[test]
    fn test_apply_attributes() {
        let mut peon = GameObject::new("Follower", EntityKind::Worker(WorkerData::default()))
            .with_health(100.0);
        let record = ObjectRecord::new("Follower")
            .with("Position", "12 34")
            .with("Owner", 2)
            .with("Health", 40)
            .with("Lumber", 25);
        apply_attributes(&mut peon, &record.attributes, &ground()).unwrap();

        assert_eq!(peon.position(), Vec3::new(12.0, 34.0, 0.0));
        assert_eq!(peon.owner, Some(PlayerId(2)));
        assert_eq!(peon.health(), 40.0);
        assert_eq!(peon.max_health, 100.0);
        assert_eq!(peon.kind.worker().map(|w| w.lumber_carried), Some(10));
    }

    #[test]
    fn test_health_above_max_raises_max() {
        let mut object = GameObject::new("Footman", EntityKind::Fighter).with_health(50.0);
        let record = ObjectRecord::new("Footman").with("Health", 80);
        apply_attributes(&mut object, &record.attributes, &ground()).unwrap();
        assert_eq!(object.max_health, 80.0);
        assert_eq!(object.health(), 80.0);
    }

    #[test]
    fn test_bad_building_state() {
        let mut object = GameObject::new(
            "Farmhouse",
            EntityKind::Building(crate::entity::kind::BuildingData::new(10.0)),
        );
        let record = ObjectRecord::new("Farmhouse").with("State", "Rubble");
        let err = apply_attributes(&mut object, &record.attributes, &ground());
        assert!(matches!(err, Err(ObjectLoadError::Malformed { .. })));
    }

    #[test]
    fn test_attributes_recreate_object() {
        let mut tree = GameObject::new("Tree", EntityKind::Tree(ResourceNode::new(50, 2)))
            .with_position(Vec3::new(5.0, 6.0, 0.0));
        tree.kind.tree_mut().unwrap().amount = 17;
        let bag = object_attributes(&tree);

        let mut copy = GameObject::new("Tree", EntityKind::Tree(ResourceNode::new(50, 2)));
        apply_attributes(&mut copy, &bag, &ground()).unwrap();
        assert_eq!(copy.position(), tree.position());
        assert_eq!(copy.kind, tree.kind);
    }

    #[test]
    fn test_root_and_version_checked() {
        assert!(matches!(
            WorldDocument::from_json(r#"{ "Map": {} }"#),
            Err(WorldLoadError::InvalidRoot(root)) if root == "Map"
        ));
        assert!(matches!(
            WorldDocument::from_json(r#"{ "World": { "version": 2, "Landscape": "flat" } }"#),
            Err(WorldLoadError::UnsupportedVersion(2))
        ));
        assert!(matches!(
            WorldDocument::from_json("[1, 2]"),
            Err(WorldLoadError::InvalidRoot(_))
        ));
    }
}
