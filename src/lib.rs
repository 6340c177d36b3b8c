//! Isles - real-time strategy simulation core
//!
//! A grid scene index with ray picking and region queries, plus a
//! hierarchical state machine driving workers, fighters and buildings
//! through harvesting, construction, repair and combat.

pub mod behavior;
pub mod core;
pub mod entity;
pub mod services;
pub mod simulation;
pub mod spatial;
pub mod state;
pub mod world;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{Result, SimError};
pub use crate::simulation::tick::{run_simulation_tick, SimulationEvent, TickReport};
pub use crate::world::{World, WorldLoader};
