//! Build worlds from JSON world documents
//!
//! `WorldLoader` owns a class-id factory for game objects and a registry of
//! named landscapes. Document-level problems abort the load with a
//! `WorldLoadError`; a bad object is logged and skipped.

use crate::core::config::SimulationConfig;
use crate::core::error::SimError;
use crate::entity::kind::{BuildingData, EntityKind, GoldmineData, ResourceNode, WorkerData};
use crate::entity::object::{CombatStats, Footprint, GameObject};
use crate::services::landscape::{HeightField, Landscape};
use crate::world::game_world::{World, FLAT_LANDSCAPE};
use crate::world::persistence::{apply_attributes, ObjectRecord, WorldDocument};
use ahash::AHashMap;
use glam::Vec2;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Fatal problems with a world document
#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Root element must be \"World\", found {0:?}")]
    InvalidRoot(String),

    #[error("Unsupported world version {0}")]
    UnsupportedVersion(u32),

    #[error("World has no Landscape attribute")]
    MissingLandscape,

    #[error("Unknown landscape: {0}")]
    UnknownLandscape(String),
}

/// Problems with a single object record; the object is skipped
#[derive(Debug, Error)]
pub enum ObjectLoadError {
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Malformed attribute {attribute}: {value:?}")]
    Malformed { attribute: String, value: String },

    #[error("Malformed object record: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ObjectConstructor = fn(&SimulationConfig) -> GameObject;

/// Creates game objects from their class id
#[derive(Debug, Clone)]
pub struct EntityFactory {
    constructors: AHashMap<String, ObjectConstructor>,
}

impl EntityFactory {
    /// Factory without any registered class
    pub fn empty() -> Self {
        Self {
            constructors: AHashMap::new(),
        }
    }

    pub fn register(&mut self, class_id: impl Into<String>, constructor: ObjectConstructor) {
        self.constructors.insert(class_id.into(), constructor);
    }

    pub fn create(&self, class_id: &str, config: &SimulationConfig) -> Option<GameObject> {
        self.constructors.get(class_id).map(|build| build(config))
    }

    pub fn contains(&self, class_id: &str) -> bool {
        self.constructors.contains_key(class_id)
    }

    /// Registered class ids, sorted
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }
}

impl Default for EntityFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register("Follower", follower);
        factory.register("Footman", footman);
        factory.register("Hunter", hunter);
        factory.register("Townhall", |_| building("Townhall", 40.0, 30.0, 1000.0, 60.0));
        factory.register("Lumbermill", |_| building("Lumbermill", 30.0, 20.0, 600.0, 40.0));
        factory.register("Farmhouse", |_| building("Farmhouse", 20.0, 15.0, 400.0, 30.0));
        factory.register("Barracks", |_| building("Barracks", 36.0, 25.0, 800.0, 50.0));
        factory.register("Tree", tree);
        factory.register("Goldmine", goldmine);
        factory
    }
}

// === DEFAULT CLASSES ===

fn unit(class_id: &str, kind: EntityKind, config: &SimulationConfig) -> GameObject {
    let mut object = GameObject::new(class_id, kind)
        .with_footprint(Footprint::Circle { radius: 3.0 })
        .with_view_distance(config.view_distance);
    object.model_height = 10.0;
    object
}

fn follower(config: &SimulationConfig) -> GameObject {
    unit("Follower", EntityKind::Worker(WorkerData::default()), config)
        .with_health(100.0)
        .with_speed(40.0)
        .with_combat(CombatStats {
            attack: (3.0, 5.0),
            defense: (0.0, 1.0),
            ..CombatStats::default()
        })
}

fn footman(config: &SimulationConfig) -> GameObject {
    unit("Footman", EntityKind::Fighter, config)
        .with_health(200.0)
        .with_speed(35.0)
        .with_combat(CombatStats {
            attack: (10.0, 14.0),
            defense: (2.0, 4.0),
            ..CombatStats::default()
        })
}

fn hunter(config: &SimulationConfig) -> GameObject {
    unit("Hunter", EntityKind::Fighter, config)
        .with_health(150.0)
        .with_speed(40.0)
        .with_combat(CombatStats {
            attack: (8.0, 12.0),
            defense: (1.0, 2.0),
            attack_range: (0.0, 80.0),
            attack_duration: 1.5,
        })
}

fn building(class_id: &str, size: f32, height: f32, health: f32, construction: f32) -> GameObject {
    let mut object = GameObject::new(class_id, EntityKind::Building(BuildingData::new(construction)))
        .with_footprint(Footprint::Rectangle {
            size: Vec2::splat(size),
        })
        .with_health(health);
    object.model_height = height;
    object
}

fn tree(config: &SimulationConfig) -> GameObject {
    let node = ResourceNode::new(50, config.max_peons_per_tree);
    let mut object =
        GameObject::new("Tree", EntityKind::Tree(node)).with_footprint(Footprint::Circle { radius: 4.0 });
    object.model_height = 20.0;
    object
}

fn goldmine(config: &SimulationConfig) -> GameObject {
    let data = GoldmineData {
        node: ResourceNode::new(10_000, config.max_peons_per_goldmine),
        spawn_point: Vec2::new(-30.0, 0.0),
    };
    let mut object = GameObject::new("Goldmine", EntityKind::Goldmine(data)).with_footprint(
        Footprint::Rectangle {
            size: Vec2::splat(40.0),
        },
    );
    object.model_height = 25.0;
    object
}

// === LOADER ===

pub type LandscapeConstructor = Box<dyn Fn() -> Box<dyn Landscape>>;

pub struct WorldLoader {
    config: SimulationConfig,
    factory: EntityFactory,
    landscapes: AHashMap<String, LandscapeConstructor>,
}

impl WorldLoader {
    /// Loader with the default classes and a 1024 unit flat landscape
    ///
    /// Fails when `config` does not validate.
    pub fn new(config: SimulationConfig) -> crate::core::error::Result<Self> {
        config.validate().map_err(SimError::InvalidConfig)?;
        let loader = Self {
            config,
            factory: EntityFactory::default(),
            landscapes: AHashMap::new(),
        };
        Ok(loader.with_landscape(FLAT_LANDSCAPE, || {
            Box::new(HeightField::flat(Vec2::splat(1024.0), 128, 128))
        }))
    }

    pub fn with_landscape(
        mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Box<dyn Landscape> + 'static,
    ) -> Self {
        self.landscapes.insert(name.into(), Box::new(constructor));
        self
    }

    pub fn with_factory(mut self, factory: EntityFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Create an empty world on a registered landscape
    pub fn create_world(&self, landscape: &str) -> Result<World, WorldLoadError> {
        let constructor = self
            .landscapes
            .get(landscape)
            .ok_or_else(|| WorldLoadError::UnknownLandscape(landscape.to_string()))?;
        Ok(World::with_valid_config(constructor(), self.config.clone()).with_landscape_name(landscape))
    }

    /// Create an object of `class_id` and apply its saved attributes
    pub fn create_object(
        &self,
        record: ObjectRecord,
        landscape: &dyn Landscape,
    ) -> Result<GameObject, ObjectLoadError> {
        let mut object = self
            .factory
            .create(&record.class, &self.config)
            .ok_or_else(|| ObjectLoadError::UnknownClass(record.class.clone()))?;
        apply_attributes(&mut object, &record.attributes, landscape)?;
        Ok(object)
    }

    pub fn load_str(&self, json: &str) -> Result<World, WorldLoadError> {
        let document = WorldDocument::from_json(json)?;
        let body = document.world;
        let landscape = body.landscape.ok_or(WorldLoadError::MissingLandscape)?;
        let mut world = self.create_world(&landscape)?;
        world.name = body.name;

        for player in body.players {
            world.add_player(player);
        }

        let mut skipped = 0;
        for (i, value) in body.objects.into_iter().enumerate() {
            let created = serde_json::from_value::<ObjectRecord>(value)
                .map_err(ObjectLoadError::from)
                .and_then(|record| self.create_object(record, world.landscape()));
            match created {
                Ok(object) => {
                    world.add(object);
                }
                Err(e) => {
                    warn!("Skipping object #{}: {}", i, e);
                    skipped += 1;
                }
            }
        }

        info!(
            "Loaded world '{}' on '{}': {} objects, {} players, {} skipped",
            world.name,
            landscape,
            world.entities().len(),
            world.players().len(),
            skipped
        );
        Ok(world)
    }

    pub fn load_file(&self, path: &Path) -> Result<World, WorldLoadError> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content)
    }
}
