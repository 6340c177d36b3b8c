//! The world: entity lifecycle, state transitions, saving and loading

pub mod game_world;
pub mod loader;
pub mod persistence;

pub use game_world::World;
pub use loader::{EntityFactory, ObjectLoadError, WorldLoadError, WorldLoader};
pub use persistence::{AttributeBag, ObjectRecord, WorldDocument};
