//! Geometry helpers: coordinate conversion, clip shapes and polygon editing.

pub mod clip;
pub mod polygon;
pub mod transform;

pub use clip::{ClipApi, ClipPlugin, ClipRequest, ClipShape};
pub use polygon::{PolygonApi, PolygonEditPlugin, move_vertex};
pub use transform::{local_to_world, world_to_local};
