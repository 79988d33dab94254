//! tidemap - the spatial/world core of a 2D tile-based game engine.
//!
//! Three tightly coupled pieces:
//! - World: layers of tiles built from raw graphic-id grids, with overlay
//!   object regions merged into per-tile walkability, exits and triggers.
//! - Entities: descriptor-validated dynamic objects placed on the grid,
//!   with tile- or pixel-aligned movement modes and lifecycle hooks.
//! - Frames: an offscreen workspace plus camera-placement math that keeps
//!   the player centered and clamped to the world's edges.
//!
//! Everything runs synchronously inside one simulation/render tick. Within
//! a tick the intended order is: build/patch the tile grid, then insert or
//! remove entities against it, then bind the frame (which reads the player
//! position). The frame's dirty flag is the only cross-tick state; the
//! rendering driver consumes it once per tick.
//!
//! Resource loading, script execution and trigger registration stay behind
//! the traits in [`ports`]; the core never touches disk or a scripting
//! runtime directly.

pub mod entity;
pub mod frame;
pub mod ports;
pub mod rect;
pub mod world;

pub use entity::{Entity, EntityManager, MovementMode};
pub use frame::{FrameConfig, FrameManager, FrameState, Surface};
pub use rect::Rect;
pub use world::{Layer, Tile, Tilemap, Tileset};
