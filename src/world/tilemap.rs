//! The tilemap: global map geometry, the tileset arena, and the ordered
//! layer stack. Provided as context to entity insertion and frame
//! compositing.

use log::warn;

use crate::ports::TriggerExpander;
use crate::world::layer::{Layer, LayerDoc, ObjectGroupDoc};
use crate::world::tile::SpawnRequest;
use crate::world::tileset::Tileset;

pub struct Tilemap {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tilesets: Vec<Tileset>,
    pub layers: Vec<Layer>,
    /// Area-dirty flag: set by entity insertion/removal, consumed by the
    /// area redraw pass.
    pub changed: bool,
}

impl Tilemap {
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32, tilesets: Vec<Tileset>) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
            tilesets,
            layers: Vec::new(),
            changed: false,
        }
    }

    /// Map width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.width * self.tile_width
    }

    /// Map height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height * self.tile_height
    }

    /// Which tileset owns a global graphic id.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<usize> {
        self.tilesets.iter().position(|ts| ts.contains_gid(gid))
    }

    /// Is a pixel position exactly on a tile boundary?
    pub fn tile_aligned(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && x % self.tile_width as i32 == 0
            && y % self.tile_height as i32 == 0
    }

    /// Build a layer from a raw tile-layer segment and append it at the
    /// next z-position. Returns the new layer's index.
    pub fn push_layer(&mut self, doc: &LayerDoc) -> usize {
        let zpos = self.layers.len();
        self.layers
            .push(Layer::new(zpos, doc, self.width, self.height, &self.tilesets));
        zpos
    }

    /// Merge an object layer into the tile layer at `zpos`, returning the
    /// collected entity spawn requests for the caller to execute.
    pub fn process_objects(
        &mut self,
        zpos: usize,
        objdata: &ObjectGroupDoc,
        expander: &dyn TriggerExpander,
    ) -> Vec<SpawnRequest> {
        let (tw, th) = (self.tile_width, self.tile_height);
        match self.layers.get_mut(zpos) {
            Some(layer) => layer.process_objects(objdata, tw, th, expander),
            None => {
                warn!("tilemap: no layer at z-position {}", zpos);
                Vec::new()
            }
        }
    }

    /// Tear every layer down.
    pub fn clear_layers(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
        self.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn map() -> Tilemap {
        Tilemap::new(
            4,
            4,
            16,
            16,
            vec![
                Tileset {
                    name: "a".into(),
                    first_gid: 1,
                    last_gid: 9,
                    columns: 4,
                    tile_width: 16,
                    tile_height: 16,
                    spacing: 0,
                    tile_properties: HashMap::new(),
                },
                Tileset {
                    name: "b".into(),
                    first_gid: 9,
                    last_gid: 17,
                    columns: 4,
                    tile_width: 16,
                    tile_height: 16,
                    spacing: 0,
                    tile_properties: HashMap::new(),
                },
            ],
        )
    }

    #[test]
    fn test_tileset_for_gid_resolves_ranges() {
        let map = map();
        assert_eq!(map.tileset_for_gid(1), Some(0));
        assert_eq!(map.tileset_for_gid(8), Some(0));
        assert_eq!(map.tileset_for_gid(9), Some(1));
        assert_eq!(map.tileset_for_gid(17), None);
    }

    #[test]
    fn test_tile_aligned() {
        let map = map();
        assert!(map.tile_aligned(0, 0));
        assert!(map.tile_aligned(32, 48));
        assert!(!map.tile_aligned(33, 48));
        assert!(!map.tile_aligned(-16, 0));
    }

    #[test]
    fn test_push_layer_assigns_zpos() {
        let mut map = map();
        let doc = LayerDoc {
            data: vec![1; 16],
            properties: HashMap::new(),
        };
        assert_eq!(map.push_layer(&doc), 0);
        assert_eq!(map.push_layer(&doc), 1);
        assert_eq!(map.layers[1].zpos, 1);
        assert_eq!(map.pixel_width(), 64);
    }

    #[test]
    fn test_clear_layers() {
        let mut map = map();
        let doc = LayerDoc {
            data: vec![1; 16],
            properties: HashMap::new(),
        };
        map.push_layer(&doc);
        map.clear_layers();
        assert!(map.layers.is_empty());
    }
}
