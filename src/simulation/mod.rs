//! Tick orchestration and the per-update context

pub mod context;
pub mod tick;

pub use context::{SimContext, WorldCommand};
pub use tick::{run_simulation_tick, ResourceKind, SimulationEvent, TickReport};
