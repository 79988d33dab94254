//! A layer: one z-slice of a map, an arena of tiles built from a raw
//! graphic-id grid, with an overlay-merge pass that projects object regions
//! (walkability, exits, spawn triggers, custom triggers) onto the tiles
//! they cover.

use std::collections::HashMap;

use log::{error, warn};
use serde::Deserialize;

use crate::ports::TriggerExpander;
use crate::world::tile::{
    parse_flag, Exit, ExitCoord, ExitKind, ExitSpec, SpawnRequest, Tile, TileRule,
};
use crate::world::tileset::Tileset;

/// Raw tile-layer segment of a map document: a linear gid list plus
/// optional layer-level properties. Gid 0 means no tile.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerDoc {
    pub data: Vec<u32>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Object-layer segment: rectangular regions with property sets, merged
/// onto the tile layer below.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectGroupDoc {
    #[serde(default)]
    pub properties: HashMap<String, String>,
    pub objects: Vec<ObjectDoc>,
}

/// One axis-aligned region of an object layer, in pixel coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDoc {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// An ordered grid of tiles at one z-position.
pub struct Layer {
    pub zpos: usize,
    pub properties: HashMap<String, String>,
    /// Tile arena, `width * height` long; cell `(x, y)` lives at linear
    /// index `y * width + x`.
    pub tiles: Vec<Tile>,
    width: u32,
    height: u32,
}

impl Layer {
    /// Build a layer from a raw gid list.
    ///
    /// Gid 0 becomes an empty tile. A gid matching no tileset range also
    /// becomes an empty tile, with a warning; the arena always stays
    /// `width * height` long so linear indices and grid coordinates never
    /// drift apart.
    pub fn new(zpos: usize, doc: &LayerDoc, width: u32, height: u32, tilesets: &[Tileset]) -> Self {
        let expected = (width as usize) * (height as usize);
        if doc.data.len() != expected {
            warn!(
                "layer {}: gid list has {} entries, expected {}",
                zpos,
                doc.data.len(),
                expected
            );
        }

        let mut tiles = Vec::with_capacity(expected);
        for seq in 0..expected {
            let gid = doc.data.get(seq).copied().unwrap_or(0);
            if gid == 0 {
                tiles.push(Tile::empty(seq, width));
                continue;
            }
            match tilesets.iter().position(|ts| ts.contains_gid(gid)) {
                Some(index) => tiles.push(Tile::new(seq, width, index, &tilesets[index], gid)),
                None => {
                    warn!("layer {}: gid {} matches no tileset, tile {} left empty", zpos, gid, seq);
                    tiles.push(Tile::empty(seq, width));
                }
            }
        }

        Self {
            zpos,
            properties: doc.properties.clone(),
            tiles,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Retrieve a tile by grid coordinates. None if out of bounds.
    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.tile_index(x, y).map(|i| &self.tiles[i])
    }

    /// Mutable tile lookup by grid coordinates.
    pub fn tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        self.tile_index(x, y).map(move |i| &mut self.tiles[i])
    }

    /// Linear arena index for a grid cell, the inverse of a tile's
    /// `(tx, ty)`. None if out of bounds.
    pub fn tile_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        if index < self.tiles.len() {
            Some(index)
        } else {
            warn!("layer {}: tried to lookup nonexistent tile at {}x{}", self.zpos, x, y);
            None
        }
    }

    /// Release every tile. After this the layer answers no lookups until
    /// rebuilt.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Merge an object layer into this tile layer.
    ///
    /// Each properly tile-aligned region unions its properties onto every
    /// tile it covers and derives the typed rules (walkability, exits with
    /// wide-exit fanning, spawn triggers, expanded custom triggers).
    /// Misaligned regions and malformed trigger values are logged and
    /// skipped; tiles already processed keep what they were given.
    ///
    /// Entity spawn triggers are not executed here: they come back as
    /// `SpawnRequest`s, one per region, for the caller to hand to the
    /// entity manager.
    pub fn process_objects(
        &mut self,
        objdata: &ObjectGroupDoc,
        tile_width: u32,
        tile_height: u32,
        expander: &dyn TriggerExpander,
    ) -> Vec<SpawnRequest> {
        let mut spawns = Vec::new();

        if !objdata.properties.is_empty() {
            self.properties
                .extend(objdata.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let tw = tile_width as i32;
        let th = tile_height as i32;

        for obj in &objdata.objects {
            // Regions must sit on the tile grid exactly.
            if obj.x % tw != 0 || obj.y % th != 0 || obj.width % tw != 0 || obj.height % th != 0 {
                error!(
                    "layer {}: invalid object size or placement at {},{} ({}x{})",
                    self.zpos, obj.x, obj.y, obj.width, obj.height
                );
                continue;
            }

            let (props, custom) = expand_properties(&obj.properties, expander);
            let cols = obj.width / tw;
            let rows = obj.height / th;
            let ox = obj.x / tw;
            let oy = obj.y / th;

            for cy in 0..rows {
                for cx in 0..cols {
                    let tx = ox + cx;
                    let ty = oy + cy;
                    let Some(index) = self.tile_index(tx, ty) else {
                        warn!(
                            "layer {}: object region covers {}x{}, outside the map",
                            self.zpos, tx, ty
                        );
                        continue;
                    };

                    {
                        let tile = &mut self.tiles[index];
                        tile.properties
                            .extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
                        for (event, handler) in &custom {
                            tile.rules
                                .push(TileRule::Custom(event.clone(), handler.clone()));
                        }
                        if let Some(value) = tile.properties.get("nowalk") {
                            let flag = parse_flag(value);
                            tile.nowalk = Some(flag);
                            tile.rules.push(TileRule::Walkability(!flag));
                        }
                    }

                    self.merge_exits(index, tx, ty, cx, cy, cols, rows);
                }
            }

            // Spawn triggers fire once per region; the covered tiles keep
            // the rule for queries.
            if let Some(raw) = props.get("entity") {
                match SpawnRequest::parse(raw) {
                    Some(request) => {
                        for cy in 0..rows {
                            for cx in 0..cols {
                                if let Some(index) = self.tile_index(ox + cx, oy + cy) {
                                    self.tiles[index]
                                        .rules
                                        .push(TileRule::EntitySpawn(request.clone()));
                                }
                            }
                        }
                        spawns.push(request);
                    }
                    None => {
                        error!("layer {}: invalid entity trigger \"{}\"", self.zpos, raw);
                    }
                }
            }
        }

        spawns
    }

    /// Derive exit triggers for the covered tile at `(tx, ty)`, which is
    /// cell `(cx, cy)` of a `cols x rows` region.
    ///
    /// Wide exits fan from the region's first cell only: a horizontal wide
    /// exit fans across the columns of the top row, a vertical one down the
    /// rows of the left column. Other cells of the region skip, so a tile
    /// never receives the same wide exit twice.
    fn merge_exits(&mut self, index: usize, tx: i32, ty: i32, cx: i32, cy: i32, cols: i32, rows: i32) {
        for kind in ExitKind::ALL {
            let Some(raw) = self.tiles[index].properties.get(kind.property_key()).cloned()
            else {
                continue;
            };

            let spec = match ExitSpec::parse(&raw) {
                Ok(spec) => spec,
                Err(e) => {
                    error!("layer {}: invalid exit trigger \"{}\": {}", self.zpos, raw, e);
                    continue;
                }
            };

            match (spec.x, spec.y) {
                (ExitCoord::At(x), ExitCoord::At(y)) => {
                    self.set_exit(
                        index,
                        kind,
                        Exit { area: spec.area, layer: spec.layer, x, y },
                    );
                }
                (ExitCoord::Fan(base), ExitCoord::At(y)) => {
                    if cx != 0 || cy != 0 {
                        continue;
                    }
                    for wx in 0..cols {
                        if let Some(i) = self.tile_index(tx + wx, ty) {
                            self.set_exit(
                                i,
                                kind,
                                Exit {
                                    area: spec.area.clone(),
                                    layer: spec.layer,
                                    x: base + wx,
                                    y,
                                },
                            );
                        }
                    }
                }
                (ExitCoord::At(x), ExitCoord::Fan(base)) => {
                    if cx != 0 || cy != 0 {
                        continue;
                    }
                    for wy in 0..rows {
                        if let Some(i) = self.tile_index(tx, ty + wy) {
                            self.set_exit(
                                i,
                                kind,
                                Exit {
                                    area: spec.area.clone(),
                                    layer: spec.layer,
                                    x,
                                    y: base + wy,
                                },
                            );
                        }
                    }
                }
                // Both axes wide is an ExitSpec parse error.
                (ExitCoord::Fan(_), ExitCoord::Fan(_)) => unreachable!(),
            }
        }
    }

    fn set_exit(&mut self, index: usize, kind: ExitKind, exit: Exit) {
        let tile = &mut self.tiles[index];
        tile.rules.push(TileRule::Exit(kind, exit.clone()));
        tile.exits.insert(kind, exit);
    }
}

/// Expand registered trigger shorthands into canonical `event -> handler`
/// pairs, dropping the shorthand keys. Returns the rewritten property map
/// and the expanded pairs.
fn expand_properties(
    properties: &HashMap<String, String>,
    expander: &dyn TriggerExpander,
) -> (HashMap<String, String>, Vec<(String, String)>) {
    let mut out = HashMap::new();
    let mut custom = Vec::new();

    for (key, value) in properties {
        if expander.is_custom_trigger(key) {
            match expander.expand(key, value) {
                Some((event, handler)) => {
                    out.insert(event.clone(), handler.clone());
                    custom.push((event, handler));
                }
                None => {
                    warn!("trigger shorthand \"{}\" failed to expand", key);
                }
            }
        } else {
            out.insert(key.clone(), value.clone());
        }
    }

    (out, custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NoTriggers;

    fn tilesets() -> Vec<Tileset> {
        vec![Tileset {
            name: "terrain".into(),
            first_gid: 1,
            last_gid: 65,
            columns: 8,
            tile_width: 16,
            tile_height: 16,
            spacing: 0,
            tile_properties: HashMap::new(),
        }]
    }

    fn grid_layer(width: u32, height: u32) -> Layer {
        let doc = LayerDoc {
            data: vec![1; (width * height) as usize],
            properties: HashMap::new(),
        };
        Layer::new(0, &doc, width, height, &tilesets())
    }

    fn region(x: i32, y: i32, w: i32, h: i32, props: &[(&str, &str)]) -> ObjectGroupDoc {
        ObjectGroupDoc {
            properties: HashMap::new(),
            objects: vec![ObjectDoc {
                x,
                y,
                width: w,
                height: h,
                properties: props
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_index_coordinate_roundtrip() {
        let layer = grid_layer(7, 5);
        for i in 0..layer.tiles.len() {
            let tile = &layer.tiles[i];
            assert_eq!((tile.tx as usize, tile.ty as usize), (i % 7, i / 7));
            assert_eq!(layer.tile_index(tile.tx as i32, tile.ty as i32), Some(i));
        }
    }

    #[test]
    fn test_out_of_bounds_lookup() {
        let layer = grid_layer(4, 4);
        assert!(layer.tile(-1, 0).is_none());
        assert!(layer.tile(4, 0).is_none());
        assert!(layer.tile(0, 4).is_none());
        assert!(layer.tile(3, 3).is_some());
    }

    #[test]
    fn test_unmatched_gid_degrades_to_empty() {
        let doc = LayerDoc {
            data: vec![1, 999, 0, 2],
            properties: HashMap::new(),
        };
        let layer = Layer::new(0, &doc, 2, 2, &tilesets());
        assert_eq!(layer.tiles.len(), 4); // Index alignment preserved
        assert!(!layer.tiles[0].is_empty());
        assert!(layer.tiles[1].is_empty());
        assert!(layer.tiles[2].is_empty());
        assert!(!layer.tiles[3].is_empty());
    }

    #[test]
    fn test_tileset_default_properties_bind() {
        let mut sets = tilesets();
        sets[0]
            .tile_properties
            .insert(4, [("slippery".to_string(), "1".to_string())].into());
        let doc = LayerDoc {
            data: vec![5], // local gid 4
            properties: HashMap::new(),
        };
        let layer = Layer::new(0, &doc, 1, 1, &sets);
        assert_eq!(layer.tiles[0].properties.get("slippery").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_misaligned_region_rejected() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(8, 3, 16, 16, &[("nowalk", "1")]); // y not tile-aligned
        let spawns = layer.process_objects(&objdata, 16, 16, &NoTriggers);
        assert!(spawns.is_empty());
        for tile in &layer.tiles {
            assert!(tile.properties.is_empty());
            assert!(tile.nowalk.is_none());
        }
    }

    #[test]
    fn test_nowalk_sets_walkability() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(16, 16, 32, 16, &[("nowalk", "1")]);
        layer.process_objects(&objdata, 16, 16, &NoTriggers);

        let blocked = layer.tile(1, 1).unwrap();
        assert_eq!(blocked.nowalk, Some(true));
        assert!(!blocked.walkable());
        assert!(blocked.rules.contains(&TileRule::Walkability(false)));
        // Neighbor outside the region untouched.
        assert!(layer.tile(0, 1).unwrap().nowalk.is_none());
    }

    #[test]
    fn test_plain_exit_copied_to_each_covered_tile() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(0, 0, 32, 16, &[("exit", "town,0,5,5")]);
        layer.process_objects(&objdata, 16, 16, &NoTriggers);

        let expected = Exit { area: "town".into(), layer: 0, x: 5, y: 5 };
        assert_eq!(layer.tile(0, 0).unwrap().exit(ExitKind::Default), Some(&expected));
        assert_eq!(layer.tile(1, 0).unwrap().exit(ExitKind::Default), Some(&expected));
        assert!(layer.tile(2, 0).unwrap().exit(ExitKind::Default).is_none());
    }

    #[test]
    fn test_horizontal_wide_exit_fans_left_to_right() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(0, 0, 48, 16, &[("exit:up", "town,0,5+,5")]);
        layer.process_objects(&objdata, 16, 16, &NoTriggers);

        for (tx, x) in [(0, 5), (1, 6), (2, 7)] {
            let exit = layer.tile(tx, 0).unwrap().exit(ExitKind::Up).unwrap();
            assert_eq!((exit.x, exit.y), (x, 5));
            assert_eq!(exit.area, "town");
        }
        assert!(layer.tile(3, 0).unwrap().exit(ExitKind::Up).is_none());
    }

    #[test]
    fn test_vertical_wide_exit_fans_top_to_bottom() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(16, 0, 16, 48, &[("exit", "cave,1,2,9+")]);
        layer.process_objects(&objdata, 16, 16, &NoTriggers);

        for (ty, y) in [(0, 9), (1, 10), (2, 11)] {
            let exit = layer.tile(1, ty).unwrap().exit(ExitKind::Default).unwrap();
            assert_eq!((exit.x, exit.y), (2, y));
        }
    }

    // Pins the decided interpretation for regions both wider and taller
    // than one tile: wide exits fan a single row/column from the region's
    // first cell, not a full grid.
    #[test]
    fn test_wide_exit_fans_single_row_only() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(0, 0, 48, 32, &[("exit", "town,0,5+,5")]);
        layer.process_objects(&objdata, 16, 16, &NoTriggers);

        for tx in 0..3 {
            assert!(layer.tile(tx, 0).unwrap().exit(ExitKind::Default).is_some());
            assert!(layer.tile(tx, 1).unwrap().exit(ExitKind::Default).is_none());
        }
    }

    #[test]
    fn test_two_axis_wide_exit_skipped() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(0, 0, 32, 16, &[("exit", "town,0,5+,5+")]);
        layer.process_objects(&objdata, 16, 16, &NoTriggers);
        for tile in &layer.tiles {
            assert!(tile.exits.is_empty());
        }
    }

    #[test]
    fn test_spawn_trigger_collected_once_per_region() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(16, 16, 32, 32, &[("entity", "npc/guard.json,0,16,16")]);
        let spawns = layer.process_objects(&objdata, 16, 16, &NoTriggers);

        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].template, "npc/guard.json");
        assert_eq!((spawns[0].layer, spawns[0].x, spawns[0].y), (0, 16, 16));
        // Every covered tile carries the rule.
        assert!(layer
            .tile(2, 2)
            .unwrap()
            .rules
            .iter()
            .any(|r| matches!(r, TileRule::EntitySpawn(_))));
    }

    #[test]
    fn test_malformed_spawn_trigger_skipped() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(0, 0, 16, 16, &[("entity", "npc.json,zero,16,16")]);
        let spawns = layer.process_objects(&objdata, 16, 16, &NoTriggers);
        assert!(spawns.is_empty());
    }

    #[test]
    fn test_later_region_overwrites_earlier_keys() {
        let mut layer = grid_layer(4, 4);
        let mut objdata = region(0, 0, 16, 16, &[("nowalk", "1")]);
        objdata.objects.push(ObjectDoc {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
            properties: [("nowalk".to_string(), "0".to_string())].into(),
        });
        layer.process_objects(&objdata, 16, 16, &NoTriggers);
        assert_eq!(layer.tile(0, 0).unwrap().nowalk, Some(false));
        assert!(layer.tile(0, 0).unwrap().walkable());
    }

    struct StepTriggers;

    impl TriggerExpander for StepTriggers {
        fn is_custom_trigger(&self, key: &str) -> bool {
            key == "step_on"
        }

        fn expand(&self, _key: &str, value: &str) -> Option<(String, String)> {
            Some(("on_step".to_string(), value.to_string()))
        }
    }

    #[test]
    fn test_custom_trigger_shorthand_expanded() {
        let mut layer = grid_layer(4, 4);
        let objdata = region(0, 0, 16, 16, &[("step_on", "traps.py,spring")]);
        layer.process_objects(&objdata, 16, 16, &StepTriggers);

        let tile = layer.tile(0, 0).unwrap();
        assert!(tile.properties.get("step_on").is_none()); // Shorthand removed
        assert_eq!(tile.properties.get("on_step").map(String::as_str), Some("traps.py,spring"));
        assert!(tile
            .rules
            .contains(&TileRule::Custom("on_step".into(), "traps.py,spring".into())));
    }

    #[test]
    fn test_object_layer_properties_merge_into_layer() {
        let mut layer = grid_layer(2, 2);
        let objdata = ObjectGroupDoc {
            properties: [("music".to_string(), "dungeon.ogg".to_string())].into(),
            objects: Vec::new(),
        };
        layer.process_objects(&objdata, 16, 16, &NoTriggers);
        assert_eq!(layer.properties.get("music").map(String::as_str), Some("dungeon.ogg"));
    }

    #[test]
    fn test_clear_releases_all_tiles() {
        let mut layer = grid_layer(3, 3);
        assert_eq!(layer.tiles.len(), 9);
        layer.clear();
        assert!(layer.tiles.is_empty());
        assert!(layer.tile(0, 0).is_none());
    }
}
