//! Entity module - placement and lifecycle of dynamic objects on the grid
//!
//! Descriptors (JSON documents) declare how an entity moves and which
//! script hooks it carries; the manager validates them, binds tile or
//! pixel movement mode, and tracks occupancy and lifetimes.

mod descriptor;
mod manager;

pub use descriptor::{DescriptorError, EntityDescriptor, InitSection, MovementMode};
pub use manager::{Collider, Contact, Entity, EntityManager, Occupancy, TileCoord};
