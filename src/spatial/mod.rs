//! Spatial data structures: outlines, grids, scene index and picking

pub mod enumerator;
pub mod grid;
pub mod outline;
pub mod picker;
pub mod scene_index;

pub use enumerator::{GridEnumerator, GridSpace};
pub use grid::Grid;
pub use outline::{Containment, Outline};
pub use picker::Picker;
pub use scene_index::SceneIndex;
