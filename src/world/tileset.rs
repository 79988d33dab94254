//! Tileset metadata: which global graphic ids a sheet owns, how its tiles
//! are laid out in the source image, and per-tile default properties.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One tile sheet registered with a map.
///
/// The gid range is half-open: this set owns graphic ids in
/// `first_gid..last_gid`. Local ids are offsets into that range and index
/// the sheet image left-to-right, top-to-bottom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tileset {
    pub name: String,
    pub first_gid: u32,
    pub last_gid: u32,
    /// Tiles per row in the sheet image.
    pub columns: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Pixel gap between tiles in the sheet image.
    #[serde(default)]
    pub spacing: u32,
    /// Default properties applied to tiles by local id when a layer binds
    /// their graphic.
    #[serde(default)]
    pub tile_properties: HashMap<u32, HashMap<String, String>>,
}

impl Tileset {
    pub fn contains_gid(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid < self.last_gid
    }

    pub fn local_gid(&self, gid: u32) -> u32 {
        gid - self.first_gid
    }

    pub fn default_properties(&self, local_gid: u32) -> Option<&HashMap<String, String>> {
        self.tile_properties.get(&local_gid)
    }
}
