//! GPU-backed resources: geometry, material, texture and the pool that owns
//! them once they are registered.

pub mod geometry;
pub mod material;
pub mod pool;
pub mod texture;

pub use geometry::{Attribute, Geometry};
pub use material::{Material, MaterialKind};
pub use pool::{GeometryHandle, MaterialHandle, ResourcePool};
pub use texture::Texture;
