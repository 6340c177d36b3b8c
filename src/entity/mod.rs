pub mod kind;
pub mod object;
pub mod orders;
pub mod player;
pub mod store;

pub use kind::{BuildingData, BuildingState, EntityKind, GoldmineData, ResourceNode, WorkerData};
pub use object::{CombatStats, Footprint, GameObject, SpatialTag};
pub use orders::Orders;
pub use player::{Player, PlayerRegistry};
pub use store::EntityStore;
