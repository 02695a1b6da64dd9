//! Core geometry types and preview mesh generation.

pub mod mesh;
pub mod types;

pub use mesh::{excellon_mesh, gerber_mesh};
pub use types::*;
