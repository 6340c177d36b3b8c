pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use types::{Aabb, Color, EntityId, Frustum, GridPoint, Plane, PlayerId, Ray, Tick};
