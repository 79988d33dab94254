//! World module - the tile grid and its gameplay semantics
//!
//! A map is a stack of layers over shared geometry. Each layer is an arena
//! of tiles built from raw graphic ids; overlay object regions then project
//! walkability, exits, spawn triggers and custom triggers onto the covered
//! tiles. Everything downstream (entities, frames) addresses tiles by
//! coordinate, never by held reference.

mod layer;
mod tile;
mod tilemap;
mod tileset;

pub use layer::{Layer, LayerDoc, ObjectDoc, ObjectGroupDoc};
pub use tile::{Exit, ExitCoord, ExitKind, ExitParseError, ExitSpec, SpawnRequest, Tile, TileRule};
pub use tilemap::Tilemap;
pub use tileset::Tileset;
